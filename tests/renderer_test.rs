use quick_xml::events::Event;
use quick_xml::Reader;
use slides_creator::convert::{convert_with, ConvertRequest, Output};
use slides_creator::errors::{PublishError, RenderCause, RenderError, ServiceError};
use slides_creator::google_slides::{build_presentation, RemotePresentation};
use slides_creator::render::RemoteRef;
use slides_creator::speaker_deck::Upload;
use slides_creator::{
    parse, plan, Artifact, Backend, GoogleSlidesRenderer, PptxRenderer, PublishingService, Renderer,
    SlideDeck, SlideService, SpeakerDeckPublisher, ThemeConfig,
};
use std::fs;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use zip::ZipArchive;

const ARTICLE: &str = "# Async Patterns\n\n## Why Async Matters\n\nThreads are expensive.\n\n## Example\n\n```python\nimport asyncio\nasyncio.run(main())\n```\n\n![Event loop](https://example.com/loop.png \"The loop\")\n\n![Local](local.png)\n\n## Conclusion\n\n- Use async for IO\n- Measure first\n";

/// Same article without network references, for tests that render PPTX.
fn offline_article() -> String {
    ARTICLE.replace("https://example.com/loop.png", "loop.png")
}

fn deck(cfg: &ThemeConfig) -> SlideDeck {
    plan(&parse(&offline_article()).unwrap(), cfg).unwrap()
}

#[derive(Default, Clone)]
struct FakeSlides {
    created: Arc<Mutex<Vec<RemotePresentation>>>,
}

impl SlideService for FakeSlides {
    fn create_presentation(
        &self,
        presentation: &RemotePresentation,
    ) -> Result<RemoteRef, ServiceError> {
        self.created.lock().unwrap().push(presentation.clone());
        Ok(RemoteRef {
            id: "abc123".to_string(),
            url: "https://docs.google.com/presentation/d/abc123/edit".to_string(),
        })
    }
}

#[derive(Default, Clone)]
struct FakePublisher {
    uploads: Arc<Mutex<Vec<Upload>>>,
}

impl PublishingService for FakePublisher {
    fn publish(&self, upload: &Upload) -> Result<String, PublishError> {
        self.uploads.lock().unwrap().push(upload.clone());
        Ok("https://speakerdeck.com/jane/async-patterns".to_string())
    }
}

struct RejectingPublisher;

impl PublishingService for RejectingPublisher {
    fn publish(&self, _upload: &Upload) -> Result<String, PublishError> {
        Err(PublishError::Rejected {
            status: 422,
            body: "duplicate talk".to_string(),
        })
    }
}

struct PanickingRenderer;

impl Renderer for PanickingRenderer {
    fn backend(&self) -> Backend {
        Backend::GoogleSlides
    }

    fn render(&self, _deck: &SlideDeck, _cfg: &ThemeConfig) -> Result<Artifact, RenderError> {
        panic!("renderer exploded");
    }
}

fn pptx_headings(bytes: Vec<u8>, count: usize) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (1..=count)
        .map(|n| {
            let mut xml = String::new();
            archive
                .by_name(&format!("ppt/slides/slide{}.xml", n))
                .unwrap()
                .read_to_string(&mut xml)
                .unwrap();
            first_text(&xml).unwrap_or_default()
        })
        .collect()
}

fn first_text(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"a:t" => in_text = true,
            Ok(Event::Text(t)) if in_text => return Some(t.unescape().unwrap().into_owned()),
            Ok(Event::Eof) => return None,
            Err(e) => panic!("invalid XML: {}", e),
            _ => {}
        }
    }
}

#[test]
fn test_headings_match_across_backends() {
    let cfg = ThemeConfig::default();
    let deck = deck(&cfg);
    let temp_dir = TempDir::new().unwrap();

    let bytes = match PptxRenderer::new(temp_dir.path()).render(&deck, &cfg).unwrap() {
        Artifact::Local { bytes, .. } => bytes,
        other => panic!("expected a local artifact, got {:?}", other),
    };
    let service = FakeSlides::default();
    let renderer = GoogleSlidesRenderer::new(service);
    let artifact = renderer.render(&deck, &cfg).unwrap();
    assert_eq!(
        artifact,
        Artifact::Remote(RemoteRef {
            id: "abc123".to_string(),
            url: "https://docs.google.com/presentation/d/abc123/edit".to_string(),
        })
    );

    let remote = build_presentation(&deck, &cfg);
    let remote_headings: Vec<String> = remote.slides.iter().map(|s| s.title.clone()).collect();
    assert_eq!(pptx_headings(bytes, deck.len()), remote_headings);
    assert_eq!(remote_headings, deck.headings());
}

#[test]
fn test_remote_presentation_mapping() {
    let cfg = ThemeConfig::default();
    let online = plan(&parse(ARTICLE).unwrap(), &cfg).unwrap();
    let remote = build_presentation(&online, &cfg);

    assert_eq!(remote.title, "Async Patterns");
    assert_eq!(remote.slides[0].layout, "TITLE");
    assert_eq!(remote.slides[0].object_id, "slide_001");
    assert!(remote.slides[2].monospace);
    assert_eq!(remote.slides[2].body, vec!["import asyncio", "asyncio.run(main())"]);
    assert_eq!(remote.slides[3].image_url.as_deref(), Some("https://example.com/loop.png"));
    assert_eq!(remote.slides[4].image_url, None);
    assert!(remote.slides[4].body.contains(&"[image: local.png]".to_string()));

    let last = remote.slides.last().unwrap();
    assert_eq!(last.title, "Key Takeaways");
    assert_eq!(last.body[0], "✓ Use async for IO");
    assert_eq!(last.body.last().unwrap(), "Check out the full article and code examples");
    assert!(remote.slides.iter().any(|s| !s.notes.is_empty()));

    let quiet = ThemeConfig {
        include_speaker_notes: false,
        ..ThemeConfig::default()
    };
    let remote = build_presentation(&online, &quiet);
    assert!(remote.slides.iter().all(|s| s.notes.is_empty()));
}

#[test]
fn test_google_renderer_sends_one_presentation() {
    let cfg = ThemeConfig::default();
    let deck = deck(&cfg);
    let service = FakeSlides::default();
    let renderer = GoogleSlidesRenderer::new(service.clone());
    renderer.render(&deck, &cfg).unwrap();

    let created = service.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0], build_presentation(&deck, &cfg));
    assert_eq!(renderer.backend(), Backend::GoogleSlides);
}

#[test]
fn test_speaker_deck_uploads_pptx() {
    let cfg = ThemeConfig::default();
    let deck = deck(&cfg);
    let temp_dir = TempDir::new().unwrap();
    let service = FakePublisher::default();
    let publisher = SpeakerDeckPublisher::new(PptxRenderer::new(temp_dir.path()), service.clone());

    let artifact = publisher.render(&deck, &cfg).unwrap();
    {
        let uploads = service.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].title, "Async Patterns");
        assert_eq!(uploads[0].file_name, "async-patterns.pptx");
        assert!(uploads[0].bytes.starts_with(b"PK"));
    }
    assert_eq!(
        artifact,
        Artifact::Remote(RemoteRef {
            id: "async-patterns".to_string(),
            url: "https://speakerdeck.com/jane/async-patterns".to_string(),
        })
    );

    let remote = Artifact::Remote(RemoteRef {
        id: "x".to_string(),
        url: "https://example.com".to_string(),
    });
    assert!(matches!(publisher.publish(&remote, "t"), Err(PublishError::NotPublishable)));
}

#[test]
fn test_speaker_deck_publish_of_existing_artifact() {
    let temp_dir = TempDir::new().unwrap();
    let service = FakePublisher::default();
    let publisher = SpeakerDeckPublisher::new(PptxRenderer::new(temp_dir.path()), service);
    let artifact = Artifact::Local {
        file_name: "talk.pptx".to_string(),
        bytes: b"PK fake".to_vec(),
    };
    let url = publisher.publish(&artifact, "Talk").unwrap();
    assert_eq!(url, "https://speakerdeck.com/jane/async-patterns");

    let not_pptx = Artifact::Local {
        file_name: "notes.txt".to_string(),
        bytes: vec![],
    };
    assert!(matches!(publisher.publish(&not_pptx, "Talk"), Err(PublishError::NotPublishable)));
}

#[test]
fn test_rejected_publish_is_render_error() {
    let cfg = ThemeConfig::default();
    let temp_dir = TempDir::new().unwrap();
    let publisher =
        SpeakerDeckPublisher::new(PptxRenderer::new(temp_dir.path()), RejectingPublisher);

    let err = publisher.render(&deck(&cfg), &cfg).unwrap_err();
    assert_eq!(err.backend, Backend::SpeakerDeck);
    assert!(matches!(
        err.cause,
        RenderCause::Publish(PublishError::Rejected { status: 422, .. })
    ));
}

#[test]
fn test_failures_are_isolated_per_backend() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("article.md");
    fs::write(&source, offline_article()).unwrap();
    let output_root = temp_dir.path().join("out");

    let renderers: Vec<Box<dyn Renderer>> = vec![
        Box::new(PptxRenderer::new(temp_dir.path())),
        Box::new(PanickingRenderer),
        Box::new(SpeakerDeckPublisher::new(PptxRenderer::new(temp_dir.path()), RejectingPublisher)),
        Box::new(GoogleSlidesRenderer::new(FakeSlides::default())),
    ];
    let request = ConvertRequest {
        source,
        targets: vec![],
        theme: ThemeConfig::default(),
        output_root: output_root.clone(),
        force_regenerate: false,
        dry_run: false,
    };

    let report = convert_with(&request, &renderers).unwrap();
    assert_eq!(report.slug, "async-patterns");
    assert_eq!(report.outcomes.len(), 4);
    assert!(report.has_failures());

    let pptx_path = output_root.join("async-patterns").join("async-patterns.pptx");
    assert_eq!(report.outcomes[0].result.as_ref().unwrap(), &Output::File(pptx_path.clone()));
    assert!(pptx_path.exists());
    assert!(matches!(
        report.outcomes[1].result.as_ref().unwrap_err().cause,
        RenderCause::Panicked
    ));
    assert!(report.outcomes[2].result.is_err());
    assert!(matches!(report.outcomes[3].result, Ok(Output::Remote(_))));
    assert_eq!(report.failures().count(), 2);
}

#[test]
fn test_dry_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("article.md");
    fs::write(&source, ARTICLE).unwrap();
    let output_root = temp_dir.path().join("out");

    let renderers: Vec<Box<dyn Renderer>> = vec![Box::new(PptxRenderer::new(temp_dir.path()))];
    let request = ConvertRequest {
        source,
        targets: vec![Backend::Pptx],
        theme: ThemeConfig::default(),
        output_root: output_root.clone(),
        force_regenerate: false,
        dry_run: true,
    };

    let report = convert_with(&request, &renderers).unwrap();
    assert!(report.outcomes.is_empty());
    assert!(report.output_dir.is_none());
    assert_eq!(report.deck.len(), 6);
    assert!(!output_root.exists());
}
