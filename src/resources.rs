// ABOUTME: Image resource handling for the slides-creator application
// ABOUTME: Loads local and remote images referenced by articles for embedding

use crate::errors::{Result, SlidesError};
use image::io::Reader as ImageReader;
use image::ImageFormat;
use log::info;
use reqwest::blocking::Client;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An image reference that can be either a local path or a URL.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub path: String,
    pub is_remote: bool,
}

/// Image bytes in a format the PPTX package can embed.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
    pub width: u32,
    pub height: u32,
}

impl ImageAsset {
    /// Create a new ImageAsset from a path string.
    /// Relative local paths are resolved against the article's directory.
    pub fn new(path: &str) -> Self {
        let is_remote = path.starts_with("http://") || path.starts_with("https://");
        Self {
            path: path.to_string(),
            is_remote,
        }
    }

    pub fn local_path(&self, base_dir: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Load and validate the image, fetching it first when remote.
    pub fn load(&self, base_dir: &Path, timeout: Duration) -> Result<LoadedImage> {
        let bytes = if self.is_remote {
            self.fetch_remote_content(timeout)?
        } else {
            self.read_local_content(base_dir)?
        };

        let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| SlidesError::ImageError(format!("{}: {}", self.path, e)))?;
        let extension = match reader.format() {
            Some(ImageFormat::Png) => "png",
            Some(ImageFormat::Jpeg) => "jpeg",
            Some(ImageFormat::Gif) => "gif",
            other => {
                return Err(SlidesError::ImageError(format!(
                    "{}: unsupported image format {:?}",
                    self.path, other
                )))
            }
        };
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| SlidesError::ImageError(format!("{}: {}", self.path, e)))?;

        Ok(LoadedImage {
            bytes,
            extension,
            width,
            height,
        })
    }

    /// Fetch content from a remote URL with retry capability
    fn fetch_remote_content(&self, timeout: Duration) -> Result<Vec<u8>> {
        info!("Fetching remote image: {}", self.path);

        let client = Client::builder().timeout(timeout).build()?;

        // Try up to 3 times with increasing backoff
        let mut retry_delay = 1000;
        let mut last_error = None;

        for attempt in 1..=3 {
            match client.get(&self.path).send() {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response.bytes()?.to_vec());
                    }
                    last_error = Some(SlidesError::ImageError(format!(
                        "{}: HTTP error {}",
                        self.path,
                        response.status()
                    )));
                }
                Err(e) => {
                    last_error = Some(SlidesError::FetchError(e));
                }
            }

            if attempt < 3 {
                info!(
                    "Fetch attempt {} failed, retrying in {} ms",
                    attempt, retry_delay
                );
                std::thread::sleep(Duration::from_millis(retry_delay));
                retry_delay *= 2;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SlidesError::ImageError(format!("{}: unknown error fetching image", self.path))
        }))
    }

    /// Read content from a local file
    fn read_local_content(&self, base_dir: &Path) -> Result<Vec<u8>> {
        let path = self.local_path(base_dir);
        info!("Reading local image: {:?}", path);
        if !path.exists() {
            return Err(SlidesError::PathNotFoundError(path));
        }

        fs::read(&path).map_err(|e| SlidesError::file(path, e))
    }
}
