// ABOUTME: Configuration module for the slides-creator application
// ABOUTME: Provides theme/planning settings and environment variable handling

use crate::errors::{PlanningError, Result, SlidesError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_WORDS_PER_SLIDE: usize = 120;
pub const DEFAULT_MAX_CODE_LINES_PER_SLIDE: usize = 18;
pub const DEFAULT_MAX_TAKEAWAYS: usize = 5;

const DEFAULT_OUTPUT_DIR: &str = "presentations";
const DEFAULT_GOOGLE_SLIDES_API: &str = "https://slides.googleapis.com/v1/";
const DEFAULT_SPEAKERDECK_API: &str = "https://speakerdeck.com/api/v1/talks";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Technical,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                background: "FFFFFF",
                text: "333333",
                primary: "2E5090",
                secondary: "FF6B6B",
                accent: "4ECDC4",
                code_background: "F5F5F5",
                heading_font: "Calibri Light",
                body_font: "Calibri",
                code_font: "Consolas",
            },
            Theme::Dark => Palette {
                background: "1E1E1E",
                text: "FFFFFF",
                primary: "4ECDC4",
                secondary: "FF6B6B",
                accent: "FFE66D",
                code_background: "2D2D2D",
                heading_font: "Segoe UI Semibold",
                body_font: "Segoe UI",
                code_font: "Consolas",
            },
            Theme::Technical => Palette {
                background: "0D1117",
                text: "E6EDF3",
                primary: "58A6FF",
                secondary: "79C0FF",
                accent: "79C0FF",
                code_background: "161B22",
                heading_font: "Helvetica Neue",
                body_font: "Helvetica Neue",
                code_font: "Menlo",
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Technical => "technical",
        };
        f.write_str(name)
    }
}

/// Colors are hex RGB without the leading `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub code_background: &'static str,
    pub heading_font: &'static str,
    pub body_font: &'static str,
    pub code_font: &'static str,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    #[value(name = "16:9")]
    Widescreen,
    #[serde(rename = "4:3")]
    #[value(name = "4:3")]
    Standard,
}

impl AspectRatio {
    /// Slide size in EMUs.
    pub fn dimensions(self) -> (u64, u64) {
        match self {
            AspectRatio::Widescreen => (9144000, 5143500),
            AspectRatio::Standard => (9144000, 6858000),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Widescreen => f.write_str("16:9"),
            AspectRatio::Standard => f.write_str("4:3"),
        }
    }
}

/// Visual and planning parameters for one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConfig {
    pub theme: Theme,
    pub max_words_per_slide: usize,
    pub max_code_lines_per_slide: usize,
    pub aspect_ratio: AspectRatio,
    pub include_speaker_notes: bool,
    pub max_takeaways: usize,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            max_words_per_slide: DEFAULT_MAX_WORDS_PER_SLIDE,
            max_code_lines_per_slide: DEFAULT_MAX_CODE_LINES_PER_SLIDE,
            aspect_ratio: AspectRatio::default(),
            include_speaker_notes: true,
            max_takeaways: DEFAULT_MAX_TAKEAWAYS,
        }
    }
}

impl ThemeConfig {
    pub fn validate(&self) -> std::result::Result<(), PlanningError> {
        if self.max_words_per_slide == 0 {
            return Err(PlanningError::InvalidBudget {
                name: "maxWordsPerSlide",
                value: self.max_words_per_slide,
            });
        }
        if self.max_code_lines_per_slide == 0 {
            return Err(PlanningError::InvalidBudget {
                name: "maxCodeLinesPerSlide",
                value: self.max_code_lines_per_slide,
            });
        }
        Ok(())
    }
}

/// Global configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub google_credentials: Option<PathBuf>,
    pub google_api_url: String,
    pub speakerdeck_credentials: Option<PathBuf>,
    pub speakerdeck_api_url: String,
    pub http_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            google_credentials: None,
            google_api_url: DEFAULT_GOOGLE_SLIDES_API.to_string(),
            speakerdeck_credentials: default_speakerdeck_credentials(),
            speakerdeck_api_url: DEFAULT_SPEAKERDECK_API.to_string(),
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let output_dir = env::var("SLIDES_OUTPUT_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let google_credentials = env::var("GOOGLE_SLIDES_CREDENTIALS").ok().map(PathBuf::from);
        let google_api_url = env::var("GOOGLE_SLIDES_API_URL")
            .unwrap_or_else(|_| DEFAULT_GOOGLE_SLIDES_API.to_string());
        let speakerdeck_credentials = env::var("SPEAKERDECK_CREDENTIALS")
            .ok()
            .map(PathBuf::from)
            .or_else(default_speakerdeck_credentials);
        let speakerdeck_api_url = env::var("SPEAKERDECK_API_URL")
            .unwrap_or_else(|_| DEFAULT_SPEAKERDECK_API.to_string());
        let http_timeout_ms = parse_timeout_ms(env::var("SLIDES_HTTP_TIMEOUT_MS").ok())?;

        Ok(Self {
            output_dir,
            google_credentials,
            google_api_url,
            speakerdeck_credentials,
            speakerdeck_api_url,
            http_timeout_ms,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Get a theme configuration with CLI overrides applied over the defaults
    pub fn theme_config(
        &self,
        theme: Option<Theme>,
        max_words_per_slide: Option<usize>,
        max_code_lines_per_slide: Option<usize>,
        aspect_ratio: Option<AspectRatio>,
        include_speaker_notes: bool,
    ) -> ThemeConfig {
        let defaults = ThemeConfig::default();
        ThemeConfig {
            theme: theme.unwrap_or(defaults.theme),
            max_words_per_slide: max_words_per_slide.unwrap_or(defaults.max_words_per_slide),
            max_code_lines_per_slide: max_code_lines_per_slide
                .unwrap_or(defaults.max_code_lines_per_slide),
            aspect_ratio: aspect_ratio.unwrap_or(defaults.aspect_ratio),
            include_speaker_notes,
            max_takeaways: defaults.max_takeaways,
        }
    }
}

/// Unset or empty means the default; anything else must be a positive integer
pub(crate) fn parse_timeout_ms(value: Option<String>) -> Result<u64> {
    let value = match value.as_deref().map(str::trim) {
        None | Some("") => return Ok(DEFAULT_HTTP_TIMEOUT_MS),
        Some(value) => value,
    };
    match value.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(SlidesError::ConfigError(format!(
            "SLIDES_HTTP_TIMEOUT_MS must be a positive number of milliseconds, got {:?}",
            value
        ))),
    }
}

fn default_speakerdeck_credentials() -> Option<PathBuf> {
    env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("slides-creator")
            .join("speakerdeck.json")
    })
}
