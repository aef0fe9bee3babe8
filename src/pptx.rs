// ABOUTME: PPTX renderer for the slides-creator application
// ABOUTME: Writes an OOXML presentation package with one physical slide per planned slide

use crate::config::{Palette, ThemeConfig};
use crate::deck::{Slide, SlideDeck, SlideKind};
use crate::errors::{RenderCause, RenderError};
use crate::render::{Artifact, Backend, Renderer};
use crate::resources::{ImageAsset, LoadedImage};
use crate::utils::slugify;
use log::{debug, info, warn};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::time::Duration;
use zip::{write::FileOptions, ZipWriter};

pub const PPTX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const GROUP_PROPS: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;
const CLR_MAP: &str = r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const EMU_PER_INCH: u64 = 914400;
const MARGIN: u64 = EMU_PER_INCH / 2;

/// Fixed layouts, indexed by `layout_number - 1`.
const LAYOUTS: [&str; 5] = [
    "Title Slide",
    "Bulleted Content",
    "Code",
    "Full-Bleed Image",
    "Takeaways",
];

fn layout_number(kind: &SlideKind) -> usize {
    match kind {
        SlideKind::Title => 1,
        SlideKind::Content => 2,
        SlideKind::Code { .. } => 3,
        SlideKind::Visual { .. } => 4,
        SlideKind::Conclusion { .. } => 5,
    }
}

/// Renders decks into `.pptx` bytes.
pub struct PptxRenderer {
    asset_root: PathBuf,
    fetch_timeout: Duration,
}

impl PptxRenderer {
    /// `asset_root` is the directory relative image paths are resolved against.
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            fetch_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn file_name(deck: &SlideDeck) -> String {
        let slug = slugify(deck.title());
        if slug.is_empty() {
            "presentation.pptx".to_string()
        } else {
            format!("{}.pptx", slug)
        }
    }

    /// Build the complete package in memory
    pub fn build(&self, deck: &SlideDeck, cfg: &ThemeConfig) -> Result<Vec<u8>, RenderCause> {
        info!("Generating PPTX for {:?} ({} slides)", deck.title(), deck.len());

        let palette = cfg.theme.palette();
        let size = cfg.aspect_ratio.dimensions();
        let slides = deck.slides();
        let pictures: Vec<Option<LoadedImage>> =
            slides.iter().map(|s| self.load_picture(s)).collect();
        let has_notes: Vec<bool> = slides
            .iter()
            .map(|s| cfg.include_speaker_notes && !s.speaker_notes.trim().is_empty())
            .collect();

        let mut package = Package::new();

        package.add("[Content_Types].xml", &content_types_xml(&has_notes, &pictures))?;
        package.add("_rels/.rels", ROOT_RELS)?;
        let notes_count = has_notes.iter().filter(|n| **n).count();
        package.add("docProps/app.xml", &app_xml(slides.len(), notes_count))?;
        package.add("docProps/core.xml", &core_xml(deck))?;

        package.add("ppt/_rels/presentation.xml.rels", &presentation_rels_xml(slides.len()))?;
        package.add("ppt/presentation.xml", &presentation_xml(slides.len(), size, cfg))?;

        package.add("ppt/theme/theme1.xml", &theme_xml("Deck", &palette))?;
        let notes_palette = crate::config::Theme::Light.palette();
        package.add("ppt/theme/theme2.xml", &theme_xml("Notes", &notes_palette))?;
        package.add("ppt/slideMasters/slideMaster1.xml", &slide_master_xml(&palette))?;
        package.add("ppt/slideMasters/_rels/slideMaster1.xml.rels", &slide_master_rels_xml())?;
        for (i, name) in LAYOUTS.iter().enumerate() {
            package.add(
                &format!("ppt/slideLayouts/slideLayout{}.xml", i + 1),
                &slide_layout_xml(name),
            )?;
            package.add(
                &format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", i + 1),
                &relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
            )?;
        }
        package.add("ppt/notesMasters/notesMaster1.xml", &notes_master_xml())?;
        package.add(
            "ppt/notesMasters/_rels/notesMaster1.xml.rels",
            &relationships(&[("rId1", "theme", "../theme/theme2.xml")]),
        )?;

        for (i, slide) in slides.iter().enumerate() {
            let number = i + 1;
            debug!("Creating slide XML: ppt/slides/slide{}.xml ({})", number, slide.kind.name());

            let mut rels = vec![(
                "rId1".to_string(),
                "slideLayout",
                format!("../slideLayouts/slideLayout{}.xml", layout_number(&slide.kind)),
            )];
            if has_notes[i] {
                rels.push((
                    "rId2".to_string(),
                    "notesSlide",
                    format!("../notesSlides/notesSlide{}.xml", number),
                ));
            }
            if let Some(picture) = &pictures[i] {
                let media = format!("image{}.{}", number, picture.extension);
                package.add_bytes(&format!("ppt/media/{}", media), &picture.bytes)?;
                rels.push(("rId3".to_string(), "image", format!("../media/{}", media)));
            }
            let rels: Vec<(&str, &str, &str)> = rels
                .iter()
                .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
                .collect();
            package.add(
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                &relationships(&rels),
            )?;

            let xml = SlideWriter::new(&palette, size).slide_xml(
                slide,
                number,
                slides.len(),
                pictures[i].as_ref(),
            );
            package.add(&format!("ppt/slides/slide{}.xml", number), &xml)?;

            if has_notes[i] {
                package.add(
                    &format!("ppt/notesSlides/notesSlide{}.xml", number),
                    &notes_slide_xml(slide),
                )?;
                let slide_target = format!("../slides/slide{}.xml", number);
                package.add(
                    &format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", number),
                    &relationships(&[
                        ("rId1", "notesMaster", "../notesMasters/notesMaster1.xml"),
                        ("rId2", "slide", slide_target.as_str()),
                    ]),
                )?;
            }
        }

        info!("Finalizing PPTX package");
        package.finish()
    }

    fn load_picture(&self, slide: &Slide) -> Option<LoadedImage> {
        let SlideKind::Visual { image } = &slide.kind else {
            return None;
        };
        match ImageAsset::new(&image.path_or_url).load(&self.asset_root, self.fetch_timeout) {
            Ok(picture) => Some(picture),
            Err(e) => {
                warn!(
                    "Image {:?} cannot be embedded, using a placeholder: {}",
                    image.path_or_url, e
                );
                None
            }
        }
    }
}

impl Renderer for PptxRenderer {
    fn backend(&self) -> Backend {
        Backend::Pptx
    }

    fn render(&self, deck: &SlideDeck, cfg: &ThemeConfig) -> Result<Artifact, RenderError> {
        let bytes = self
            .build(deck, cfg)
            .map_err(|cause| RenderError::new(Backend::Pptx, cause))?;
        Ok(Artifact::Local {
            file_name: Self::file_name(deck),
            bytes,
        })
    }
}

struct Package {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl Package {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    fn add(&mut self, name: &str, xml: &str) -> Result<(), RenderCause> {
        self.add_bytes(name, xml.as_bytes())
    }

    fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), RenderCause> {
        self.zip.start_file(name, FileOptions::default())?;
        self.zip.write_all(bytes)?;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, RenderCause> {
        Ok(self.zip.finish()?.into_inner())
    }
}

/// Escape text for XML, dropping control characters XML cannot carry
fn xml_text(text: &str) -> String {
    let cleaned: String = text.chars().filter(|c| !c.is_control() || *c == '\t').collect();
    escape(&cleaned).into_owned()
}

fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(
        "{}\n<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        XML_DECL
    );
    for (id, kind, target) in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
            id, REL_NS, kind, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
    <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

fn content_types_xml(has_notes: &[bool], pictures: &[Option<LoadedImage>]) -> String {
    let mut overrides = vec![
        ("/ppt/presentation.xml", "presentationml.presentation.main+xml"),
        ("/ppt/slideMasters/slideMaster1.xml", "presentationml.slideMaster+xml"),
        ("/ppt/notesMasters/notesMaster1.xml", "presentationml.notesMaster+xml"),
        ("/ppt/theme/theme1.xml", "theme+xml"),
        ("/ppt/theme/theme2.xml", "theme+xml"),
        ("/docProps/app.xml", "extended-properties+xml"),
    ]
    .into_iter()
    .map(|(part, kind)| (part.to_string(), kind))
    .collect::<Vec<_>>();
    for i in 1..=LAYOUTS.len() {
        overrides.push((
            format!("/ppt/slideLayouts/slideLayout{}.xml", i),
            "presentationml.slideLayout+xml",
        ));
    }
    for (i, notes) in has_notes.iter().enumerate() {
        overrides.push((format!("/ppt/slides/slide{}.xml", i + 1), "presentationml.slide+xml"));
        if *notes {
            overrides.push((
                format!("/ppt/notesSlides/notesSlide{}.xml", i + 1),
                "presentationml.notesSlide+xml",
            ));
        }
    }

    let mut extensions: Vec<&str> = pictures.iter().flatten().map(|p| p.extension).collect();
    extensions.sort_unstable();
    extensions.dedup();

    let mut xml = format!(
        r#"{}
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="xml" ContentType="application/xml"/>
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
"#,
        XML_DECL
    );
    for ext in extensions {
        xml.push_str(&format!(
            "    <Default Extension=\"{}\" ContentType=\"image/{}\"/>\n",
            ext, ext
        ));
    }
    xml.push_str(r#"    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
    xml.push('\n');
    for (part, kind) in overrides {
        xml.push_str(&format!(
            "    <Override PartName=\"{}\" ContentType=\"application/vnd.openxmlformats-officedocument.{}\"/>\n",
            part, kind
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn app_xml(slides: usize, notes: usize) -> String {
    format!(
        r#"{}
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <Application>slides-creator</Application>
    <Slides>{}</Slides>
    <Notes>{}</Notes>
</Properties>"#,
        XML_DECL, slides, notes
    )
}

fn core_xml(deck: &SlideDeck) -> String {
    let meta = deck.metadata();
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"{}
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:title>{}</dc:title>
    <dc:creator>{}</dc:creator>
    <cp:keywords>{}</cp:keywords>
    <dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>
    <dcterms:modified xsi:type="dcterms:W3CDTF">{}</dcterms:modified>
    <cp:revision>1</cp:revision>
</cp:coreProperties>"#,
        XML_DECL,
        xml_text(&meta.title),
        xml_text(meta.author.as_deref().unwrap_or("slides-creator")),
        xml_text(&meta.tags.join(", ")),
        now,
        now
    )
}

fn presentation_rels_xml(slide_count: usize) -> String {
    let slide_targets: Vec<(String, String)> = (1..=slide_count)
        .map(|n| (format!("rId{}", n + 9), format!("slides/slide{}.xml", n)))
        .collect();
    let mut rels = vec![
        ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
        ("rId2", "notesMaster", "notesMasters/notesMaster1.xml"),
        ("rId3", "theme", "theme/theme1.xml"),
    ];
    rels.extend(slide_targets.iter().map(|(id, target)| (id.as_str(), "slide", target.as_str())));
    relationships(&rels)
}

fn presentation_xml(slide_count: usize, (cx, cy): (u64, u64), cfg: &ThemeConfig) -> String {
    let slide_ids = (1..=slide_count)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 9))
        .collect::<Vec<String>>()
        .join("");
    let size_type = match cfg.aspect_ratio {
        crate::config::AspectRatio::Widescreen => "screen16x9",
        crate::config::AspectRatio::Standard => "screen4x3",
    };
    format!(
        r#"{}
<p:presentation {} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:notesMasterIdLst><p:notesMasterId r:id="rId2"/></p:notesMasterIdLst><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="{}" cy="{}" type="{}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
        XML_DECL, NAMESPACES, slide_ids, cx, cy, size_type
    )
}

fn theme_xml(name: &str, palette: &Palette) -> String {
    let color = |tag: &str, val: &str| format!(r#"<a:{tag}><a:srgbClr val="{val}"/></a:{tag}>"#);
    let colors = [
        color("dk1", palette.text),
        color("lt1", palette.background),
        color("dk2", palette.primary),
        color("lt2", palette.code_background),
        color("accent1", palette.primary),
        color("accent2", palette.secondary),
        color("accent3", palette.accent),
        color("accent4", palette.primary),
        color("accent5", palette.secondary),
        color("accent6", palette.accent),
        color("hlink", palette.secondary),
        color("folHlink", palette.accent),
    ]
    .join("");
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let lines = [6350, 12700, 19050]
        .iter()
        .map(|w| format!(r#"<a:ln w="{}"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#, w))
        .collect::<String>();
    format!(
        r#"{decl}
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="{name}"><a:themeElements><a:clrScheme name="{name}">{colors}</a:clrScheme><a:fontScheme name="{name}"><a:majorFont><a:latin typeface="{major}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="{minor}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="{name}"><a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst><a:lnStyleLst>{lines}</a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#,
        decl = XML_DECL,
        name = xml_text(name),
        colors = colors,
        major = xml_text(palette.heading_font),
        minor = xml_text(palette.body_font),
        fill = fill,
        lines = lines
    )
}

fn slide_master_xml(palette: &Palette) -> String {
    let layout_ids = (1..=LAYOUTS.len())
        .map(|n| format!(r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#, 2147483648u64 + n as u64, n))
        .collect::<String>();
    format!(
        r#"{}
<p:sldMaster {}><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree>{}</p:spTree></p:cSld>{}<p:sldLayoutIdLst>{}</p:sldLayoutIdLst></p:sldMaster>"#,
        XML_DECL, NAMESPACES, palette.background, GROUP_PROPS, CLR_MAP, layout_ids
    )
}

fn slide_master_rels_xml() -> String {
    let targets: Vec<(String, String)> = (1..=LAYOUTS.len())
        .map(|n| (format!("rId{}", n), format!("../slideLayouts/slideLayout{}.xml", n)))
        .collect();
    let theme_id = format!("rId{}", LAYOUTS.len() + 1);
    let mut rels: Vec<(&str, &str, &str)> = targets
        .iter()
        .map(|(id, target)| (id.as_str(), "slideLayout", target.as_str()))
        .collect();
    rels.push((theme_id.as_str(), "theme", "../theme/theme1.xml"));
    relationships(&rels)
}

fn slide_layout_xml(name: &str) -> String {
    format!(
        r#"{}
<p:sldLayout {} preserve="1"><p:cSld name="{}"><p:spTree>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        XML_DECL, NAMESPACES, xml_text(name), GROUP_PROPS
    )
}

fn notes_master_xml() -> String {
    format!(
        r#"{}
<p:notesMaster {}><p:cSld><p:spTree>{}</p:spTree></p:cSld>{}</p:notesMaster>"#,
        XML_DECL, NAMESPACES, GROUP_PROPS, CLR_MAP
    )
}

fn notes_slide_xml(slide: &Slide) -> String {
    let paragraphs = slide
        .speaker_notes
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#.to_string()
            } else {
                format!(r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#, xml_text(line))
            }
        })
        .collect::<String>();
    format!(
        r#"{}
<p:notes {}><p:cSld><p:spTree>{}<p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image Placeholder 1"/><p:cNvSpPr><a:spLocks noGrp="1" noRot="1" noChangeAspect="1"/></p:cNvSpPr><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:notes>"#,
        XML_DECL, NAMESPACES, GROUP_PROPS, paragraphs
    )
}

#[derive(Clone, Copy)]
struct Frame {
    x: u64,
    y: u64,
    cx: u64,
    cy: u64,
}

#[derive(Clone, Copy)]
struct TextStyle<'a> {
    size: u32,
    bold: bool,
    italic: bool,
    color: &'a str,
    font: &'a str,
}

impl<'a> TextStyle<'a> {
    fn new(size: u32, color: &'a str, font: &'a str) -> Self {
        Self {
            size,
            bold: false,
            italic: false,
            color,
            font,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    fn run(&self, text: &str) -> String {
        format!(
            r#"<a:r><a:rPr lang="en-US" sz="{}" b="{}" i="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:latin typeface="{}"/></a:rPr><a:t>{}</a:t></a:r>"#,
            self.size,
            self.bold as u8,
            self.italic as u8,
            self.color,
            xml_text(self.font),
            xml_text(text)
        )
    }
}

/// Paragraph without bullet, optionally aligned (`l`, `ctr`, `r`)
fn paragraph(text: &str, style: TextStyle, align: &str) -> String {
    if text.is_empty() {
        return format!(r#"<a:p><a:pPr algn="{}"><a:buNone/></a:pPr><a:endParaRPr lang="en-US" sz="{}"/></a:p>"#, align, style.size);
    }
    format!(r#"<a:p><a:pPr algn="{}"><a:buNone/></a:pPr>{}</a:p>"#, align, style.run(text))
}

fn bullet_paragraph(text: &str, level: usize, bullet: &str, style: TextStyle) -> String {
    format!(
        r#"<a:p><a:pPr marL="{}" lvl="{}" indent="-285750"><a:buFont typeface="Arial"/><a:buChar char="{}"/></a:pPr>{}</a:p>"#,
        342900 * (level as u64 + 1),
        level,
        xml_text(bullet),
        style.run(text)
    )
}

/// Body lines use `- text` for bullets, two leading spaces per nesting level
fn body_paragraph(line: &str, style: TextStyle) -> String {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix("- ") {
        Some(text) => {
            let level = (line.len() - trimmed.len()) / 2;
            bullet_paragraph(text, level, "•", style)
        }
        None => paragraph(line, style, "l"),
    }
}

struct SlideWriter<'a> {
    palette: &'a Palette,
    cx: u64,
    cy: u64,
    shapes: String,
    next_id: u32,
}

impl<'a> SlideWriter<'a> {
    fn new(palette: &'a Palette, (cx, cy): (u64, u64)) -> Self {
        Self {
            palette,
            cx,
            cy,
            shapes: String::new(),
            next_id: 2,
        }
    }

    fn content_width(&self) -> u64 {
        self.cx - 2 * MARGIN
    }

    fn text_shape(
        &mut self,
        name: &str,
        frame: Frame,
        paragraphs: &str,
        fill: Option<&str>,
        anchor: &str,
    ) {
        let fill_xml = match fill {
            Some(color) => format!(
                r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:ln w="12700"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:ln>"#,
                color, self.palette.accent
            ),
            None => "<a:noFill/>".to_string(),
        };
        self.shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom>{}</p:spPr><p:txBody><a:bodyPr wrap="square" lIns="91440" tIns="45720" rIns="91440" bIns="45720" anchor="{}" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{}</p:txBody></p:sp>"#,
            self.next_id,
            xml_text(name),
            frame.x,
            frame.y,
            frame.cx,
            frame.cy,
            fill_xml,
            anchor,
            paragraphs
        ));
        self.next_id += 1;
    }

    fn picture(&mut self, picture: &LoadedImage, descr: &str, frame: Frame) {
        // Scale to fit the frame, centered
        let scale = (frame.cx as f64 / picture.width.max(1) as f64)
            .min(frame.cy as f64 / picture.height.max(1) as f64);
        let ext_cx = ((picture.width as f64 * scale) as u64).min(frame.cx);
        let ext_cy = ((picture.height as f64 * scale) as u64).min(frame.cy);
        let x = frame.x + (frame.cx - ext_cx) / 2;
        let y = frame.y + (frame.cy - ext_cy) / 2;
        self.shapes.push_str(&format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="Image" descr="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId3"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
            self.next_id, xml_text(descr), x, y, ext_cx, ext_cy
        ));
        self.next_id += 1;
    }

    fn heading(&mut self, text: &str, y: u64) {
        let style = TextStyle::new(3600, self.palette.primary, self.palette.heading_font).bold();
        let frame = Frame {
            x: MARGIN,
            y,
            cx: self.content_width(),
            cy: EMU_PER_INCH * 4 / 5,
        };
        self.text_shape("Title", frame, &paragraph(text, style, "l"), None, "b");
    }

    fn slide_xml(
        mut self,
        slide: &Slide,
        number: usize,
        total: usize,
        picture: Option<&LoadedImage>,
    ) -> String {
        let palette = self.palette;
        let heading = slide.heading();
        let top = EMU_PER_INCH * 2 / 5;
        let body_top = EMU_PER_INCH * 7 / 5;
        let body_height = self.cy.saturating_sub(body_top + EMU_PER_INCH * 3 / 5);

        match &slide.kind {
            SlideKind::Title => {
                let title_style =
                    TextStyle::new(5400, palette.primary, palette.heading_font).bold();
                let frame = Frame {
                    x: MARGIN,
                    y: self.cy * 27 / 100,
                    cx: self.content_width(),
                    cy: self.cy * 27 / 100,
                };
                self.text_shape(
                    "Title",
                    frame,
                    &paragraph(&heading, title_style, "ctr"),
                    None,
                    "ctr",
                );

                let mut lines = slide.body_lines.iter();
                if let Some(author) = lines.next() {
                    let style = TextStyle::new(2400, palette.text, palette.body_font);
                    let frame = Frame {
                        x: MARGIN,
                        y: self.cy * 57 / 100,
                        cx: self.content_width(),
                        cy: EMU_PER_INCH / 2,
                    };
                    self.text_shape("Subtitle", frame, &paragraph(author, style, "ctr"), None, "t");
                }
                let byline_style = TextStyle::new(1400, palette.secondary, palette.body_font);
                let rest: String = lines.map(|line| paragraph(line, byline_style, "ctr")).collect();
                if !rest.is_empty() {
                    let frame = Frame {
                        x: MARGIN,
                        y: self.cy * 71 / 100,
                        cx: self.content_width(),
                        cy: EMU_PER_INCH * 3 / 4,
                    };
                    self.text_shape("Byline", frame, &rest, None, "t");
                }
            }
            SlideKind::Content => {
                self.heading(&heading, top);
                let style = TextStyle::new(2000, palette.text, palette.body_font);
                let body: String = slide
                    .body_lines
                    .iter()
                    .map(|line| body_paragraph(line, style))
                    .collect();
                let frame = Frame {
                    x: MARGIN,
                    y: body_top,
                    cx: self.content_width(),
                    cy: body_height,
                };
                self.text_shape("Body", frame, &body, None, "t");
            }
            SlideKind::Code { language, caption } => {
                self.heading(&heading, top);
                let label_style = TextStyle::new(1000, palette.secondary, palette.code_font).bold();
                let label_frame = Frame {
                    x: MARGIN,
                    y: top + EMU_PER_INCH * 4 / 5,
                    cx: self.content_width(),
                    cy: EMU_PER_INCH / 4,
                };
                let label = format!("Code: {}", language.to_uppercase());
                self.text_shape(
                    "Language",
                    label_frame,
                    &paragraph(&label, label_style, "l"),
                    None,
                    "t",
                );

                let size = if slide.body_lines.len() > 12 { 1100 } else { 1400 };
                let code_style = TextStyle::new(size, palette.text, palette.code_font);
                let code: String = slide
                    .body_lines
                    .iter()
                    .map(|line| paragraph(line, code_style, "l"))
                    .collect();
                let code_height = if caption.is_some() {
                    body_height.saturating_sub(EMU_PER_INCH / 3)
                } else {
                    body_height
                };
                let frame = Frame {
                    x: MARGIN,
                    y: body_top,
                    cx: self.content_width(),
                    cy: code_height,
                };
                self.text_shape("Code", frame, &code, Some(palette.code_background), "t");

                if let Some(caption) = caption {
                    let style = TextStyle::new(1200, palette.text, palette.body_font).italic();
                    let frame = Frame {
                        x: MARGIN,
                        y: body_top + code_height,
                        cx: self.content_width(),
                        cy: EMU_PER_INCH / 3,
                    };
                    self.text_shape("Caption", frame, &paragraph(caption, style, "ctr"), None, "t");
                }
            }
            SlideKind::Visual { image } => {
                self.heading(&heading, top);
                let caption_top = self.cy.saturating_sub(EMU_PER_INCH * 9 / 10);
                let frame = Frame {
                    x: MARGIN,
                    y: body_top,
                    cx: self.content_width(),
                    cy: caption_top.saturating_sub(body_top),
                };
                match picture {
                    Some(picture) => self.picture(picture, &image.alt_text, frame),
                    None => {
                        let style = TextStyle::new(1600, palette.secondary, palette.code_font);
                        let mut text = paragraph(&image.placeholder(), style, "ctr");
                        if !image.alt_text.is_empty() {
                            text.push_str(&paragraph(&image.alt_text, style.italic(), "ctr"));
                        }
                        self.text_shape(
                            "Image Placeholder",
                            frame,
                            &text,
                            Some(palette.code_background),
                            "ctr",
                        );
                    }
                }
                if let Some(caption) = slide.body_lines.first() {
                    let style = TextStyle::new(1200, palette.text, palette.body_font).italic();
                    let frame = Frame {
                        x: MARGIN,
                        y: caption_top,
                        cx: self.content_width(),
                        cy: EMU_PER_INCH / 2,
                    };
                    self.text_shape("Caption", frame, &paragraph(caption, style, "ctr"), None, "t");
                }
            }
            SlideKind::Conclusion { call_to_action } => {
                self.heading(&heading, top);
                let style = TextStyle::new(1800, palette.text, palette.body_font);
                let body: String = slide
                    .body_lines
                    .iter()
                    .map(|line| bullet_paragraph(line, 0, "✓", style))
                    .collect();
                let frame = Frame {
                    x: MARGIN * 2,
                    y: body_top,
                    cx: self.content_width() - MARGIN,
                    cy: body_height.saturating_sub(EMU_PER_INCH * 3 / 5),
                };
                self.text_shape("Takeaways", frame, &body, None, "t");

                let cta_style = TextStyle::new(1600, palette.secondary, palette.body_font).bold();
                let frame = Frame {
                    x: MARGIN,
                    y: self.cy.saturating_sub(EMU_PER_INCH * 6 / 5),
                    cx: self.content_width(),
                    cy: EMU_PER_INCH * 3 / 5,
                };
                self.text_shape(
                    "Call To Action",
                    frame,
                    &paragraph(call_to_action, cta_style, "ctr"),
                    None,
                    "ctr",
                );
            }
        }

        let footer_style = TextStyle::new(800, palette.text, palette.body_font);
        let footer = Frame {
            x: self.cx - MARGIN - EMU_PER_INCH,
            y: self.cy - EMU_PER_INCH * 3 / 10,
            cx: EMU_PER_INCH,
            cy: EMU_PER_INCH / 4,
        };
        let number = format!("{}/{}", number, total);
        self.text_shape(
            "Slide Number",
            footer,
            &paragraph(&number, footer_style, "r"),
            None,
            "b",
        );

        format!(
            r#"{}
<p:sld {}><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree>{}{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
            XML_DECL, NAMESPACES, palette.background, GROUP_PROPS, self.shapes
        )
    }
}
