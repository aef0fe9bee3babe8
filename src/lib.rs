// ABOUTME: Library module for the slides-creator program.
// ABOUTME: Compiles markdown articles into slide decks and renders them to several backends.

// Reexport modules
pub mod cache;
pub mod config;
pub mod convert;
pub mod deck;
pub mod document;
pub mod errors;
pub mod google_slides;
pub mod notes;
pub mod parser;
pub mod planner;
pub mod pptx;
pub mod render;
pub mod resources;
pub mod speaker_deck;
pub mod utils;

// Reexport common types and functions
pub use config::{AspectRatio, Config, Theme, ThemeConfig};
pub use convert::{convert_with, ConversionReport, ConvertRequest, Converter, Output, OutputTarget};
pub use deck::{Slide, SlideDeck, SlideKind};
pub use document::Document;
pub use errors::{ParseError, PlanningError, RenderError, Result, SlidesError};
pub use google_slides::{GoogleSlidesClient, GoogleSlidesRenderer, SlideService};
pub use parser::{parse, ArticleParser};
pub use planner::{plan, SlidePlanner};
pub use pptx::PptxRenderer;
pub use render::{Artifact, Backend, Renderer};
pub use speaker_deck::{PublishingService, SpeakerDeckClient, SpeakerDeckPublisher};
