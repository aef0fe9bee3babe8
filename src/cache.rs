// ABOUTME: Plan cache for the slides-creator application
// ABOUTME: Reuses a planned deck when neither the article nor the theme changed

use crate::config::ThemeConfig;
use crate::deck::SlideDeck;
use crate::errors::{Result, SlidesError};
use crate::utils::sha256_hex;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PLAN_CACHE_FILE: &str = "plan_cache.json";

/// Key of a cached plan: hashes of the source text and the theme settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    pub source_hash: String,
    pub theme_hash: String,
}

impl CacheKey {
    pub fn new(source: &str, cfg: &ThemeConfig) -> Result<Self> {
        Ok(Self {
            source_hash: sha256_hex(source.as_bytes()),
            theme_hash: theme_hash(cfg)?,
        })
    }
}

pub fn theme_hash(cfg: &ThemeConfig) -> Result<String> {
    let bytes = serde_json::to_vec(cfg).map_err(|source| SlidesError::SerializationError {
        what: "theme config",
        source,
    })?;
    Ok(sha256_hex(&bytes))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    #[serde(flatten)]
    key: CacheKey,
    deck: SlideDeck,
}

pub struct PlanCache {
    path: PathBuf,
}

impl PlanCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(PLAN_CACHE_FILE),
        }
    }

    /// Cached deck for `key`, if any. Unreadable entries count as a miss.
    pub fn lookup(&self, key: &CacheKey) -> Option<SlideDeck> {
        if !self.path.exists() {
            debug!("No plan cache at {:?}", self.path);
            return None;
        }
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Ignoring unreadable plan cache {:?}: {}", self.path, e);
                return None;
            }
        };
        match serde_json::from_str::<CacheEntry>(&text) {
            Ok(entry) if entry.key == *key => {
                info!("Reusing cached plan from {:?}", self.path);
                Some(entry.deck)
            }
            Ok(_) => {
                debug!("Plan cache is stale");
                None
            }
            Err(e) => {
                warn!("Ignoring corrupt plan cache {:?}: {}", self.path, e);
                None
            }
        }
    }

    pub fn store(&self, key: &CacheKey, deck: &SlideDeck) -> Result<()> {
        let entry = CacheEntry {
            key: key.clone(),
            deck: deck.clone(),
        };
        let json = serde_json::to_string_pretty(&entry).map_err(|source| {
            SlidesError::SerializationError {
                what: "plan cache",
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(|e| SlidesError::file(&self.path, e))
    }
}
