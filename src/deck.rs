// ABOUTME: Slide deck model shared by the planner, renderers and notes exporter
// ABOUTME: Typed slides with provenance back to their source sections

use crate::document::{ImageRef, Metadata, SectionId};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CALL_TO_ACTION: &str = "Check out the full article and code examples";
pub const TAKEAWAYS_TITLE: &str = "Key Takeaways";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SlideKind {
    Title,
    Content,
    Code { language: String, caption: Option<String> },
    Visual { image: ImageRef },
    Conclusion { call_to_action: String },
}

impl SlideKind {
    pub fn name(&self) -> &'static str {
        match self {
            SlideKind::Title => "Title",
            SlideKind::Content => "Content",
            SlideKind::Code { .. } => "Code",
            SlideKind::Visual { .. } => "Visual",
            SlideKind::Conclusion { .. } => "Conclusion",
        }
    }
}

/// 1-based position of a slide within a run split from one source element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub index: usize,
    pub total: usize,
}

impl Part {
    pub const SINGLE: Part = Part { index: 1, total: 1 };

    pub fn is_continuation(&self) -> bool {
        self.index > 1
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub kind: SlideKind,
    pub title: String,
    pub body_lines: Vec<String>,
    pub speaker_notes: String,
    pub source_section_id: Option<SectionId>,
    pub part: Part,
}

impl Slide {
    /// Title as shown on the slide, with the continuation marker.
    pub fn heading(&self) -> String {
        if self.part.is_continuation() {
            format!("{} (continued)", self.title)
        } else {
            self.title.clone()
        }
    }
}

/// Ordered slides. Slide 0 is always the title slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideDeck {
    metadata: Metadata,
    slides: Vec<Slide>,
}

impl SlideDeck {
    pub(crate) fn new(metadata: Metadata, slides: Vec<Slide>) -> Self {
        debug_assert!(matches!(
            slides.first().map(|s| &s.kind),
            Some(SlideKind::Title)
        ));
        Self { metadata, slides }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn headings(&self) -> Vec<String> {
        self.slides.iter().map(Slide::heading).collect()
    }

    pub fn has_speaker_notes(&self) -> bool {
        self.slides.iter().any(|s| !s.speaker_notes.is_empty())
    }
}
