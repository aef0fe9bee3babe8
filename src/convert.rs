// ABOUTME: Conversion pipeline for the slides-creator application
// ABOUTME: Parses, plans and fans a deck out to every requested renderer

use crate::cache::{CacheKey, PlanCache};
use crate::config::{Config, ThemeConfig};
use crate::deck::SlideDeck;
use crate::errors::{RenderCause, RenderError, Result, SlidesError};
use crate::google_slides::{GoogleSlidesClient, GoogleSlidesRenderer};
use crate::notes;
use crate::parser::ArticleParser;
use crate::planner::SlidePlanner;
use crate::pptx::PptxRenderer;
use crate::render::{Artifact, Backend, RemoteRef, Renderer};
use crate::speaker_deck::{SpeakerDeckClient, SpeakerDeckPublisher};
use crate::utils::{slugify, validate_directory_writable, validate_file_exists};
use clap::ValueEnum;
use log::{debug, error, info};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

pub const SPEAKER_NOTES_FILE: &str = "speaker_notes.txt";
pub const METADATA_FILE: &str = "metadata.json";
pub const SNAPSHOT_FILE: &str = "article_snapshot.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputTarget {
    Pptx,
    GoogleSlides,
    SpeakerDeck,
    All,
}

impl OutputTarget {
    pub fn backends(self) -> Vec<Backend> {
        match self {
            OutputTarget::Pptx => vec![Backend::Pptx],
            OutputTarget::GoogleSlides => vec![Backend::GoogleSlides],
            OutputTarget::SpeakerDeck => vec![Backend::SpeakerDeck],
            OutputTarget::All => vec![Backend::Pptx, Backend::GoogleSlides, Backend::SpeakerDeck],
        }
    }
}

/// One conversion of one article.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub source: PathBuf,
    pub targets: Vec<Backend>,
    pub theme: ThemeConfig,
    pub output_root: PathBuf,
    pub force_regenerate: bool,
    pub dry_run: bool,
}

impl ConvertRequest {
    /// Directory relative image references resolve against
    pub fn asset_root(&self) -> PathBuf {
        match self.source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    File(PathBuf),
    Remote(RemoteRef),
}

#[derive(Debug)]
pub struct RenderOutcome {
    pub backend: Backend,
    pub result: std::result::Result<Output, RenderError>,
}

#[derive(Debug)]
pub struct ConversionReport {
    pub slug: String,
    pub deck: SlideDeck,
    /// `None` for dry runs, which write nothing.
    pub output_dir: Option<PathBuf>,
    pub from_cache: bool,
    pub outcomes: Vec<RenderOutcome>,
}

impl ConversionReport {
    pub fn failures(&self) -> impl Iterator<Item = &RenderError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Builds the production renderers from global configuration.
pub struct Converter {
    config: Config,
}

impl Converter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn renderer(&self, backend: Backend, asset_root: &Path) -> Box<dyn Renderer> {
        let timeout = self.config.http_timeout();
        let pptx = PptxRenderer::new(asset_root).with_fetch_timeout(timeout);
        match backend {
            Backend::Pptx => Box::new(pptx),
            Backend::GoogleSlides => Box::new(GoogleSlidesRenderer::new(GoogleSlidesClient::new(
                self.config.google_credentials.clone(),
                self.config.google_api_url.clone(),
                timeout,
            ))),
            Backend::SpeakerDeck => Box::new(SpeakerDeckPublisher::new(
                pptx,
                SpeakerDeckClient::new(
                    self.config.speakerdeck_credentials.clone(),
                    self.config.speakerdeck_api_url.clone(),
                    timeout,
                ),
            )),
        }
    }

    pub fn convert(&self, request: &ConvertRequest) -> Result<ConversionReport> {
        let asset_root = request.asset_root();
        let renderers: Vec<Box<dyn Renderer>> = request
            .targets
            .iter()
            .map(|backend| self.renderer(*backend, &asset_root))
            .collect();
        convert_with(request, &renderers)
    }
}

/// Slug of the deck title, falling back to the source file stem.
pub fn deck_slug(title: &str, source: &Path) -> String {
    let slug = slugify(title);
    if !slug.is_empty() {
        return slug;
    }
    let stem = source
        .file_stem()
        .map(|s| slugify(&s.to_string_lossy()))
        .unwrap_or_default();
    if stem.is_empty() {
        "presentation".to_string()
    } else {
        stem
    }
}

/// Run the whole pipeline with the given renderers.
pub fn convert_with(
    request: &ConvertRequest,
    renderers: &[Box<dyn Renderer>],
) -> Result<ConversionReport> {
    validate_file_exists(&request.source)?;
    info!("Reading article: {:?}", request.source);
    let text =
        fs::read_to_string(&request.source).map_err(|e| SlidesError::file(&request.source, e))?;

    let doc = ArticleParser::new().parse(&text)?;
    info!("Parsed {:?} with {} sections", doc.metadata.title, doc.sections.len());

    let slug = deck_slug(&doc.metadata.title, &request.source);
    let output_dir = request.output_root.join(&slug);
    let key = CacheKey::new(&text, &request.theme)?;
    let cache = PlanCache::new(&output_dir);

    let cached = if request.force_regenerate {
        debug!("Plan cache bypassed");
        None
    } else {
        cache.lookup(&key)
    };
    let from_cache = cached.is_some();
    let deck = match cached {
        Some(deck) => deck,
        None => SlidePlanner::new(&request.theme).plan(&doc)?,
    };
    info!("Planned {} slides", deck.len());

    if request.dry_run {
        return Ok(ConversionReport {
            slug,
            deck,
            output_dir: None,
            from_cache,
            outcomes: Vec::new(),
        });
    }

    validate_directory_writable(&output_dir)?;
    write_file(&output_dir.join(SNAPSHOT_FILE), &text)?;
    if request.theme.include_speaker_notes {
        write_file(&output_dir.join(SPEAKER_NOTES_FILE), &notes::export(&deck))?;
    }
    if !from_cache {
        cache.store(&key, &deck)?;
    }

    let outcomes = render_all(renderers, &deck, &request.theme, &output_dir, &slug);
    for outcome in &outcomes {
        match &outcome.result {
            Ok(Output::File(path)) => info!("{} written to {:?}", outcome.backend, path),
            Ok(Output::Remote(remote)) => info!("{} available at {}", outcome.backend, remote.url),
            Err(e) => error!("{}", e),
        }
    }

    write_metadata(request, &key, &deck, &output_dir, &outcomes)?;

    Ok(ConversionReport {
        slug,
        deck,
        output_dir: Some(output_dir),
        from_cache,
        outcomes,
    })
}

/// Render concurrently; each task writes only its own destination.
fn render_all(
    renderers: &[Box<dyn Renderer>],
    deck: &SlideDeck,
    cfg: &ThemeConfig,
    dir: &Path,
    slug: &str,
) -> Vec<RenderOutcome> {
    thread::scope(|scope| {
        let handles: Vec<_> = renderers
            .iter()
            .map(|renderer| {
                let backend = renderer.backend();
                debug!("Starting {} renderer", backend);
                let handle =
                    scope.spawn(move || render_one(renderer.as_ref(), deck, cfg, dir, slug));
                (backend, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(backend, handle)| RenderOutcome {
                backend,
                result: handle
                    .join()
                    .unwrap_or_else(|_| Err(RenderError::new(backend, RenderCause::Panicked))),
            })
            .collect()
    })
}

fn render_one(
    renderer: &dyn Renderer,
    deck: &SlideDeck,
    cfg: &ThemeConfig,
    dir: &Path,
    slug: &str,
) -> std::result::Result<Output, RenderError> {
    match renderer.render(deck, cfg)? {
        Artifact::Local { file_name, bytes } => {
            let extension = Path::new(&file_name)
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_else(|| "bin".to_string());
            let path = dir.join(format!("{}.{}", slug, extension));
            fs::write(&path, bytes).map_err(|e| RenderError::new(renderer.backend(), e))?;
            Ok(Output::File(path))
        }
        Artifact::Remote(remote) => Ok(Output::Remote(remote)),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    debug!("Writing {:?}", path);
    fs::write(path, contents).map_err(|e| SlidesError::file(path, e))
}

fn write_metadata(
    request: &ConvertRequest,
    key: &CacheKey,
    deck: &SlideDeck,
    dir: &Path,
    outcomes: &[RenderOutcome],
) -> Result<()> {
    let outputs: Vec<_> = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(Output::File(path)) => json!({
                "backend": outcome.backend,
                "status": "ok",
                "path": path,
            }),
            Ok(Output::Remote(remote)) => json!({
                "backend": outcome.backend,
                "status": "ok",
                "id": remote.id,
                "url": remote.url,
            }),
            Err(e) => json!({
                "backend": outcome.backend,
                "status": "error",
                "error": e.to_string(),
            }),
        })
        .collect();

    let metadata = json!({
        "source": request.source,
        "sourceHash": key.source_hash,
        "theme": request.theme,
        "themeHash": key.theme_hash,
        "generatedAt": chrono::Utc::now().to_rfc3339(),
        "title": deck.title(),
        "slideCount": deck.len(),
        "outputs": outputs,
    });
    let text =
        serde_json::to_string_pretty(&metadata).map_err(|source| SlidesError::SerializationError {
            what: "metadata",
            source,
        })?;
    write_file(&dir.join(METADATA_FILE), &text)
}
