// ABOUTME: Renderer capability shared by every output backend
// ABOUTME: Defines backends, artifacts and the Renderer trait

use crate::config::ThemeConfig;
use crate::deck::SlideDeck;
use crate::errors::RenderError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    Pptx,
    GoogleSlides,
    SpeakerDeck,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Pptx => "pptx",
            Backend::GoogleSlides => "google-slides",
            Backend::SpeakerDeck => "speaker-deck",
        };
        f.write_str(name)
    }
}

/// Reference to a resource held by a remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    pub id: String,
    pub url: String,
}

/// Output of one renderer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Local { file_name: String, bytes: Vec<u8> },
    Remote(RemoteRef),
}

/// One output format produced from a deck. Implementations share no mutable state,
/// so several can render the same deck at once.
pub trait Renderer: Send + Sync {
    fn backend(&self) -> Backend;

    fn render(&self, deck: &SlideDeck, cfg: &ThemeConfig) -> Result<Artifact, RenderError>;
}
