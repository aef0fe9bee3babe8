// ABOUTME: Slide planner for the slides-creator application
// ABOUTME: Packs a parsed Document into a deck of typed slides under theme budgets

use crate::config::ThemeConfig;
use crate::deck::{Part, Slide, SlideDeck, SlideKind, CALL_TO_ACTION, TAKEAWAYS_TITLE};
use crate::document::{Block, CodeBlock, Document, ImageRef, Section};
use crate::errors::PlanningError;
use crate::utils::line_word_count;
use log::{debug, info, warn};

/// Plans decks for one theme configuration. Holds no state between plans.
pub struct SlidePlanner<'a> {
    cfg: &'a ThemeConfig,
}

impl<'a> SlidePlanner<'a> {
    pub fn new(cfg: &'a ThemeConfig) -> Self {
        Self { cfg }
    }

    pub fn plan(&self, doc: &Document) -> Result<SlideDeck, PlanningError> {
        self.cfg.validate()?;
        if doc.sections.is_empty() {
            return Err(PlanningError::NoSections);
        }

        let conclusion = doc.conclusion();
        let mut slides = vec![self.title_slide(doc)];

        for section in &doc.sections {
            if conclusion.map(|c| c.id) == Some(section.id) {
                continue;
            }
            if section.is_conclusion() {
                warn!(
                    "Section {:?} on line {} repeats the conclusion; planning it as regular content",
                    section.heading.text, section.line
                );
            }
            if section.is_empty() {
                warn!(
                    "Skipping section {:?} on line {}: it has a heading but no content",
                    section.heading.text, section.line
                );
                continue;
            }
            self.plan_section(section, &mut slides);
        }

        if let Some(section) = conclusion {
            slides.push(self.conclusion_slide(section));
        }

        info!("Planned {} slides for {:?}", slides.len(), doc.metadata.title);
        Ok(SlideDeck::new(doc.metadata.clone(), slides))
    }

    fn title_slide(&self, doc: &Document) -> Slide {
        let meta = &doc.metadata;
        let mut body_lines = Vec::new();
        if let Some(author) = &meta.author {
            body_lines.push(author.clone());
        }
        let mut byline: Vec<String> = meta.date.iter().cloned().collect();
        if !meta.tags.is_empty() {
            byline.push(meta.tags.join(", "));
        }
        if !byline.is_empty() {
            body_lines.push(byline.join(" | "));
        }

        let speaker_notes = if !self.cfg.include_speaker_notes {
            String::new()
        } else if !doc.preamble.is_empty() {
            doc.preamble.join("\n\n")
        } else {
            match &meta.author {
                Some(author) => format!("Presenting: {}\nAuthor: {}", meta.title, author),
                None => format!("Presenting: {}", meta.title),
            }
        };

        Slide {
            kind: SlideKind::Title,
            title: meta.title.clone(),
            body_lines,
            speaker_notes,
            source_section_id: None,
            part: Part::SINGLE,
        }
    }

    fn plan_section(&self, section: &Section, slides: &mut Vec<Slide>) {
        let notes = self.notes_for(section);
        let mut units: Vec<String> = Vec::new();

        for block in &section.blocks {
            match block {
                Block::Paragraph(text) => units.push(text.clone()),
                Block::Bullet { text, depth } => {
                    units.push(format!("{}- {}", "  ".repeat(*depth), text))
                }
                Block::SubHeading { text, .. } => units.push(format!("- {}", text)),
                Block::Code(code) => {
                    self.content_slides(section, &units, &notes, slides);
                    units.clear();
                    self.code_slides(section, code, &notes, slides);
                }
                Block::Image(image) => {
                    self.content_slides(section, &units, &notes, slides);
                    units.clear();
                    slides.push(self.visual_slide(section, image, &notes));
                }
            }
        }
        self.content_slides(section, &units, &notes, slides);
    }

    fn content_slides(
        &self,
        section: &Section,
        units: &[String],
        notes: &str,
        slides: &mut Vec<Slide>,
    ) {
        let pages = pack_units(units, self.cfg.max_words_per_slide);
        let total = pages.len();
        for (i, body_lines) in pages.into_iter().enumerate() {
            debug!(
                "Content slide {:?} {}/{}: {} lines",
                section.heading.text,
                i + 1,
                total,
                body_lines.len()
            );
            slides.push(Slide {
                kind: SlideKind::Content,
                title: section.heading.text.clone(),
                body_lines,
                speaker_notes: notes.to_string(),
                source_section_id: Some(section.id),
                part: Part { index: i + 1, total },
            });
        }
    }

    fn code_slides(
        &self,
        section: &Section,
        code: &CodeBlock,
        notes: &str,
        slides: &mut Vec<Slide>,
    ) {
        if code.lines.is_empty() {
            warn!(
                "Skipping empty {} code block in section {:?}",
                code.language, section.heading.text
            );
            return;
        }

        let chunks = code.lines.chunks(self.cfg.max_code_lines_per_slide);
        let total = chunks.len();
        for (i, chunk) in chunks.enumerate() {
            slides.push(Slide {
                kind: SlideKind::Code {
                    language: code.language.clone(),
                    caption: code.caption.clone(),
                },
                title: section.heading.text.clone(),
                body_lines: chunk.to_vec(),
                speaker_notes: notes.to_string(),
                source_section_id: Some(section.id),
                part: Part { index: i + 1, total },
            });
        }
    }

    fn visual_slide(&self, section: &Section, image: &ImageRef, notes: &str) -> Slide {
        let body_lines = match &image.caption {
            Some(caption) => vec![caption.clone()],
            None => {
                warn!(
                    "Image {:?} in section {:?} has no caption; its slide is left unlabeled",
                    image.path_or_url, section.heading.text
                );
                Vec::new()
            }
        };

        Slide {
            kind: SlideKind::Visual {
                image: image.clone(),
            },
            title: section.heading.text.clone(),
            body_lines,
            speaker_notes: notes.to_string(),
            source_section_id: Some(section.id),
            part: Part::SINGLE,
        }
    }

    fn conclusion_slide(&self, section: &Section) -> Slide {
        let limit = self.cfg.max_takeaways;
        let mut takeaways: Vec<String> = section.bullets(0).take(limit).map(String::from).collect();
        if takeaways.is_empty() {
            takeaways = section.paragraphs().take(limit).map(String::from).collect();
        }
        if takeaways.is_empty() {
            warn!(
                "Conclusion section on line {} has no bullet points or paragraphs",
                section.line
            );
        }

        Slide {
            kind: SlideKind::Conclusion {
                call_to_action: CALL_TO_ACTION.to_string(),
            },
            title: TAKEAWAYS_TITLE.to_string(),
            body_lines: takeaways,
            speaker_notes: self.notes_for(section),
            source_section_id: Some(section.id),
            part: Part::SINGLE,
        }
    }

    fn notes_for(&self, section: &Section) -> String {
        if self.cfg.include_speaker_notes {
            section.prose()
        } else {
            String::new()
        }
    }
}

/// Plan a document with the given theme configuration
pub fn plan(doc: &Document, cfg: &ThemeConfig) -> Result<SlideDeck, PlanningError> {
    SlidePlanner::new(cfg).plan(doc)
}

/// Greedy packing: a unit never splits, an oversized unit gets its own page
fn pack_units(units: &[String], max_words: usize) -> Vec<Vec<String>> {
    let mut pages = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut words = 0;

    for unit in units {
        let unit_words = line_word_count(unit);
        if !current.is_empty() && words + unit_words > max_words {
            pages.push(std::mem::take(&mut current));
            words = 0;
        }
        current.push(unit.clone());
        words += unit_words;
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}
