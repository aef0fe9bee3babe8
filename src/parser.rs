// ABOUTME: Article parser for the slides-creator application
// ABOUTME: Turns markdown article text into the canonical Document model

use crate::document::{Block, CodeBlock, Document, Heading, ImageRef, Metadata, Section, SectionId};
use crate::errors::{ParseError, ParseErrorKind};
use comrak::nodes::{AstNode, NodeValue};
use comrak::{parse_document, Arena, ComrakOptions};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_yaml_ng::Value;

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Raw YAML frontmatter, scalars are accepted loosely.
#[derive(Debug, Default, Deserialize)]
struct RawFrontmatter {
    title: Option<Value>,
    author: Option<Value>,
    date: Option<Value>,
    tags: Option<Value>,
}

/// Header metadata plus the index of the first body line.
struct Header {
    title: Option<String>,
    author: Option<String>,
    date: Option<String>,
    tags: Vec<String>,
    body_start: usize,
}

/// Parses articles into [`Document`] values. Pure, holds only markdown options.
pub struct ArticleParser {
    options: ComrakOptions,
}

impl Default for ArticleParser {
    fn default() -> Self {
        let mut options = ComrakOptions::default();
        options.extension.strikethrough = true;
        Self { options }
    }
}

impl ArticleParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&self, text: &str) -> ParseResult<Document> {
        let normalized = text.replace("\r\n", "\n");
        let lines: Vec<&str> = normalized.split('\n').collect();

        let header = read_header(&lines)?;
        let body_lines = &lines[header.body_start..];

        let body = body_lines.join("\n");
        let arena = Arena::new();
        let root = parse_document(&arena, &body, &self.options);
        check_fences(root, body_lines, header.body_start)?;

        let mut builder = BodyBuilder::new(header.body_start);
        for node in root.children() {
            builder.visit(node)?;
        }

        let title = match (header.title, builder.h1_title.take()) {
            (Some(front), Some((h1, line))) => {
                if !front.eq_ignore_ascii_case(&h1) {
                    warn!(
                        "Heading {:?} on line {} differs from the frontmatter title {:?}; using the frontmatter title",
                        h1, line, front
                    );
                }
                front
            }
            (Some(front), None) => front,
            (None, Some((h1, _))) => h1,
            (None, None) => return Err(ParseError::new(ParseErrorKind::MissingTitle, 1)),
        };

        if !builder.has_content {
            return Err(ParseError::new(ParseErrorKind::EmptyBody, lines.len().max(1)));
        }

        info!(
            "Parsed article {:?}: {} sections, {} preamble paragraphs",
            title,
            builder.sections.len(),
            builder.preamble.len()
        );

        Ok(Document {
            metadata: Metadata {
                title,
                author: header.author,
                date: header.date,
                tags: header.tags,
            },
            preamble: builder.preamble,
            sections: builder.sections,
        })
    }
}

/// Parse article text with the default parser
pub fn parse(text: &str) -> ParseResult<Document> {
    ArticleParser::new().parse(text)
}

fn read_header(lines: &[&str]) -> ParseResult<Header> {
    let first = lines.first().map(|l| l.trim_end()).unwrap_or_default();

    if first == "---" {
        let close = lines
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, l)| matches!(l.trim_end(), "---" | "..."))
            .map(|(i, _)| i)
            .ok_or_else(|| {
                ParseError::new(
                    ParseErrorKind::InvalidFrontmatter("missing closing `---`".to_string()),
                    1,
                )
            })?;

        let yaml = lines[1..close].join("\n");
        let raw: RawFrontmatter = if yaml.trim().is_empty() {
            RawFrontmatter::default()
        } else {
            serde_yaml_ng::from_str(&yaml).map_err(|e| {
                let line = e.location().map(|loc| loc.line() + 1).unwrap_or(1);
                ParseError::new(ParseErrorKind::InvalidFrontmatter(e.to_string()), line)
            })?
        };

        return Ok(Header {
            title: raw.title.and_then(scalar_text),
            author: raw.author.and_then(scalar_text),
            date: raw.date.and_then(scalar_text),
            tags: raw.tags.map(tag_list).unwrap_or_default(),
            body_start: close + 1,
        });
    }

    // Pandoc-style header: % Title, % Author, % Date
    let pandoc: Vec<String> = lines
        .iter()
        .take(3)
        .map_while(|l| l.strip_prefix("% "))
        .map(|l| l.trim().to_string())
        .collect();
    let mut fields = pandoc.iter().cloned().map(|s| Some(s).filter(|s| !s.is_empty()));

    Ok(Header {
        title: fields.next().flatten(),
        author: fields.next().flatten(),
        date: fields.next().flatten(),
        tags: Vec::new(),
        body_start: pandoc.len(),
    })
}

fn scalar_text(value: Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn tag_list(value: Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.into_iter().filter_map(scalar_text).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

/// Reject fenced code blocks whose last line is not a closing fence.
/// Comrak closes an unterminated fence at the end of its container, so the
/// block's final source line tells the two cases apart.
fn check_fences<'a>(
    root: &'a AstNode<'a>,
    lines: &[&str],
    line_offset: usize,
) -> ParseResult<()> {
    for node in root.descendants() {
        let data = node.data.borrow();
        let code = match &data.value {
            NodeValue::CodeBlock(code) if code.fenced => code,
            _ => continue,
        };
        let start = data.sourcepos.start.line;
        let end = data.sourcepos.end.line;
        let fence_char = code.fence_char as char;
        let closed = end > start
            && lines
                .get(end.saturating_sub(1))
                .map_or(false, |line| is_closing_fence(line, fence_char, code.fence_length));
        if !closed {
            return Err(ParseError::new(
                ParseErrorKind::UnterminatedCodeFence,
                start + line_offset,
            ));
        }
    }
    Ok(())
}

fn is_closing_fence(line: &str, fence_char: char, fence_length: usize) -> bool {
    // Block quote markers and list indentation come before the fence itself
    let trimmed = line.trim_start_matches(|c: char| c == '>' || c.is_whitespace());
    let run = trimmed.chars().take_while(|&c| c == fence_char).count();
    run >= fence_length && trimmed[run * fence_char.len_utf8()..].trim().is_empty()
}

struct BodyBuilder {
    line_offset: usize,
    h1_title: Option<(String, usize)>,
    preamble: Vec<String>,
    sections: Vec<Section>,
    has_content: bool,
    in_quote: bool,
}

impl BodyBuilder {
    fn new(line_offset: usize) -> Self {
        Self {
            line_offset,
            h1_title: None,
            preamble: Vec::new(),
            sections: Vec::new(),
            has_content: false,
            in_quote: false,
        }
    }

    fn line_of<'a>(&self, node: &'a AstNode<'a>) -> usize {
        node.data.borrow().sourcepos.start.line + self.line_offset
    }

    fn visit<'a>(&mut self, node: &'a AstNode<'a>) -> ParseResult<()> {
        let line = self.line_of(node);
        let data = node.data.borrow();

        match &data.value {
            NodeValue::Heading(heading) => {
                let text = flatten_inline(node).0;
                match heading.level {
                    // Quoted headings stay inside the surrounding section
                    level if self.in_quote => {
                        self.has_content = true;
                        self.push_block(Block::SubHeading { text, level }, line);
                    }
                    1 if text.is_empty() => warn!("Ignoring empty title heading on line {}", line),
                    1 => {
                        if self.h1_title.is_some() {
                            return Err(ParseError::new(ParseErrorKind::MultipleTitles, line));
                        }
                        self.h1_title = Some((text, line));
                    }
                    2 => {
                        self.has_content = true;
                        debug!("Section {:?} starts on line {}", text, line);
                        self.sections.push(Section {
                            id: SectionId(self.sections.len()),
                            heading: Heading { text, level: 2 },
                            line,
                            blocks: Vec::new(),
                        });
                    }
                    level => {
                        self.has_content = true;
                        self.push_block(Block::SubHeading { text, level }, line);
                    }
                }
            }
            NodeValue::Paragraph => {
                let (text, images) = flatten_inline(node);
                if !text.is_empty() {
                    self.push_block(Block::Paragraph(text), line);
                }
                for image in images {
                    self.push_block(Block::Image(image), line);
                }
            }
            NodeValue::List(_) => {
                let mut blocks = Vec::new();
                collect_list(node, 0, &mut blocks);
                for block in blocks {
                    self.push_block(block, line);
                }
            }
            NodeValue::CodeBlock(code) => {
                let block = code_block(&code.info, &code.literal);
                self.push_block(Block::Code(block), line);
            }
            NodeValue::BlockQuote => {
                let outer = std::mem::replace(&mut self.in_quote, true);
                for child in node.children() {
                    self.visit(child)?;
                }
                self.in_quote = outer;
            }
            NodeValue::HtmlBlock(_) => debug!("Skipping raw HTML block on line {}", line),
            _ => {}
        }
        Ok(())
    }

    fn push_block(&mut self, block: Block, line: usize) {
        self.has_content = true;
        match self.sections.last_mut() {
            Some(section) => section.blocks.push(block),
            None => match block {
                Block::Paragraph(text) | Block::Bullet { text, .. } => self.preamble.push(text),
                Block::SubHeading { text, .. } => {
                    warn!("Ignoring heading {:?} on line {} before the first section", text, line)
                }
                Block::Code(_) => {
                    warn!("Dropping code block on line {} before the first section", line)
                }
                Block::Image(image) => warn!(
                    "Dropping image {:?} on line {} before the first section",
                    image.path_or_url, line
                ),
            },
        }
    }
}

fn collect_list<'a>(list: &'a AstNode<'a>, depth: usize, out: &mut Vec<Block>) {
    for item in list.children() {
        let mut parts = Vec::new();
        let mut images = Vec::new();
        let mut nested = Vec::new();

        for child in item.children() {
            match &child.data.borrow().value {
                NodeValue::Paragraph => {
                    let (text, found) = flatten_inline(child);
                    if !text.is_empty() {
                        parts.push(text);
                    }
                    images.extend(found);
                }
                NodeValue::List(_) => collect_list(child, depth + 1, &mut nested),
                NodeValue::CodeBlock(code) => {
                    nested.push(Block::Code(code_block(&code.info, &code.literal)))
                }
                _ => {}
            }
        }

        if !parts.is_empty() {
            out.push(Block::Bullet {
                text: parts.join(" "),
                depth,
            });
        }
        out.extend(images.into_iter().map(Block::Image));
        out.extend(nested);
    }
}

fn code_block(info: &str, literal: &str) -> CodeBlock {
    let info = info.trim();
    let (language, rest) = match info.split_once(char::is_whitespace) {
        Some((lang, rest)) => (lang, rest.trim()),
        None => (info, ""),
    };
    let rest = rest.strip_prefix("title=").unwrap_or(rest);
    let caption = rest.trim_matches('"').trim();

    CodeBlock {
        language: if language.is_empty() { "text" } else { language }.to_string(),
        lines: literal.lines().map(String::from).collect(),
        caption: (!caption.is_empty()).then(|| caption.to_string()),
    }
}

/// Plain text of an inline container plus any images found inside it
fn flatten_inline<'a>(node: &'a AstNode<'a>) -> (String, Vec<ImageRef>) {
    let mut text = String::new();
    let mut images = Vec::new();
    collect_inline(node, &mut text, &mut images);
    (normalize_space(&text), images)
}

fn collect_inline<'a>(node: &'a AstNode<'a>, text: &mut String, images: &mut Vec<ImageRef>) {
    for child in node.children() {
        let data = child.data.borrow();
        match &data.value {
            NodeValue::Text(t) => text.push_str(t),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            NodeValue::HtmlInline(_) => {}
            NodeValue::Image(link) => {
                let mut alt = String::new();
                let mut nested = Vec::new();
                collect_inline(child, &mut alt, &mut nested);
                let caption = link.title.trim();
                images.push(ImageRef {
                    path_or_url: link.url.clone(),
                    alt_text: normalize_space(&alt),
                    caption: (!caption.is_empty()).then(|| caption.to_string()),
                    is_diagram: is_diagram(&link.url),
                });
            }
            _ => collect_inline(child, text, images),
        }
    }
}

fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_diagram(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.contains("mermaid") || lower.contains("plantuml")
}
