// ABOUTME: Canonical content model produced by the article parser
// ABOUTME: Documents, sections and their interleaved prose, code and image blocks

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub author: Option<String>,
    pub date: Option<String>,
    pub tags: Vec<String>,
}

/// Position of a section within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(pub usize);

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "section-{}", self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub text: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub lines: Vec<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub path_or_url: String,
    pub alt_text: String,
    pub caption: Option<String>,
    pub is_diagram: bool,
}

impl ImageRef {
    pub fn is_remote(&self) -> bool {
        self.path_or_url.starts_with("http://") || self.path_or_url.starts_with("https://")
    }

    /// Text shown where the picture itself cannot be embedded.
    pub fn placeholder(&self) -> String {
        let kind = if self.is_diagram { "diagram" } else { "image" };
        format!("[{}: {}]", kind, self.path_or_url)
    }
}

/// One element of a section, kept in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    Paragraph(String),
    Bullet { text: String, depth: usize },
    SubHeading { text: String, level: u8 },
    Code(CodeBlock),
    Image(ImageRef),
}

impl Block {
    /// Prose text of the block, `None` for code and images.
    pub fn prose(&self) -> Option<&str> {
        match self {
            Block::Paragraph(text)
            | Block::Bullet { text, .. }
            | Block::SubHeading { text, .. } => Some(text.as_str()),
            Block::Code(_) | Block::Image(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub heading: Heading,
    pub line: usize,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn is_conclusion(&self) -> bool {
        self.heading.text.trim().eq_ignore_ascii_case("conclusion")
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Paragraph(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Bullet items at the given nesting depth.
    pub fn bullets(&self, depth: usize) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(move |block| match block {
            Block::Bullet { text, depth: d } if *d == depth => Some(text.as_str()),
            _ => None,
        })
    }

    /// All prose of the section, one block per paragraph.
    pub fn prose(&self) -> String {
        self.blocks
            .iter()
            .filter_map(Block::prose)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: Metadata,
    pub preamble: Vec<String>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn conclusion(&self) -> Option<&Section> {
        self.sections.iter().find(|s| s.is_conclusion())
    }
}
