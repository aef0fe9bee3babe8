// ABOUTME: Error types for the slides-creator application
// ABOUTME: Provides structured error handling for each stage of the pipeline

use crate::render::Backend;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlidesError {
    #[error("Failed to access {path:?}: {source}")]
    FileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFoundError(PathBuf),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error("Input validation error: {0}")]
    ValidationError(String),

    #[error("Failed to fetch remote resource: {0}")]
    FetchError(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to serialize {what}: {source}")]
    SerializationError {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl SlidesError {
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SlidesError::FileError {
            path: path.into(),
            source,
        }
    }
}

/// What went wrong while reading an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    MissingTitle,
    MultipleTitles,
    UnterminatedCodeFence,
    EmptyBody,
    InvalidFrontmatter(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::MissingTitle => {
                write!(f, "article has no title (frontmatter `title` or a `#` heading)")
            }
            ParseErrorKind::MultipleTitles => {
                write!(f, "article has more than one top-level title")
            }
            ParseErrorKind::UnterminatedCodeFence => write!(f, "code fence is never closed"),
            ParseErrorKind::EmptyBody => write!(f, "article has no content besides its title"),
            ParseErrorKind::InvalidFrontmatter(reason) => {
                write!(f, "invalid frontmatter: {}", reason)
            }
        }
    }
}

/// Fatal article error, `line` is 1-based in the original text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Parse error at line {line}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: usize) -> Self {
        Self { kind, line }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("Planning error: document has no sections")]
    NoSections,

    #[error("Planning error: {name} must be greater than zero (got {value})")]
    InvalidBudget { name: &'static str, value: usize },
}

/// Failure talking to the remote slide service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to load credentials from {path:?}: {reason}")]
    Credentials { path: PathBuf, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid service endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Unexpected service response: {0}")]
    InvalidResponse(String),
}

/// Failure publishing an artifact. Never retried internally.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Publishing credentials unavailable at {path:?}: {reason}")]
    Auth { path: PathBuf, reason: String },

    #[error("Network error while publishing: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Publishing service rejected the upload with {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Only local artifacts can be published")]
    NotPublishable,

    #[error("Publishing service response had no URL")]
    MissingUrl,
}

#[derive(Error, Debug)]
pub enum RenderCause {
    #[error("PPTX packaging failed: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("renderer task panicked")]
    Panicked,
}

/// Isolated per-backend failure; sibling renderers are unaffected.
#[derive(Error, Debug)]
#[error("{backend} renderer failed: {cause}")]
pub struct RenderError {
    pub backend: Backend,
    #[source]
    pub cause: RenderCause,
}

impl RenderError {
    pub fn new(backend: Backend, cause: impl Into<RenderCause>) -> Self {
        Self {
            backend,
            cause: cause.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SlidesError>;
