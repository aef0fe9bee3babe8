// ABOUTME: Speaker Deck publisher for the slides-creator application
// ABOUTME: Uploads a rendered PPTX package to a Speaker Deck account

use crate::config::ThemeConfig;
use crate::deck::SlideDeck;
use crate::errors::{PublishError, RenderError};
use crate::pptx::{PptxRenderer, PPTX_MEDIA_TYPE};
use crate::render::{Artifact, Backend, RemoteRef, Renderer};
use log::info;
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// A finished local artifact ready for upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub title: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Remote publishing service, returns the public URL
pub trait PublishingService: Send + Sync {
    fn publish(&self, upload: &Upload) -> Result<String, PublishError>;
}

pub struct SpeakerDeckPublisher<P> {
    pptx: PptxRenderer,
    service: P,
}

impl<P: PublishingService> SpeakerDeckPublisher<P> {
    pub fn new(pptx: PptxRenderer, service: P) -> Self {
        Self { pptx, service }
    }

    /// Upload an already produced PPTX artifact.
    pub fn publish(&self, artifact: &Artifact, title: &str) -> Result<String, PublishError> {
        match artifact {
            Artifact::Local { file_name, bytes } if file_name.ends_with(".pptx") => {
                info!("Publishing {} to Speaker Deck ({} bytes)", file_name, bytes.len());
                self.service.publish(&Upload {
                    title: title.to_string(),
                    file_name: file_name.clone(),
                    bytes: bytes.clone(),
                })
            }
            _ => Err(PublishError::NotPublishable),
        }
    }
}

impl<P: PublishingService> Renderer for SpeakerDeckPublisher<P> {
    fn backend(&self) -> Backend {
        Backend::SpeakerDeck
    }

    fn render(&self, deck: &SlideDeck, cfg: &ThemeConfig) -> Result<Artifact, RenderError> {
        let artifact = self
            .pptx
            .render(deck, cfg)
            .map_err(|e| RenderError::new(Backend::SpeakerDeck, e.cause))?;
        let url = self
            .publish(&artifact, deck.title())
            .map_err(|e| RenderError::new(Backend::SpeakerDeck, e))?;
        info!("Published to Speaker Deck: {}", url);
        Ok(Artifact::Remote(RemoteRef {
            id: talk_id(&url),
            url,
        }))
    }
}

/// Last path segment of the talk URL
fn talk_id(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_else(|| url.to_string())
}

#[derive(Debug, Deserialize)]
struct AccountCredentials {
    username: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    url: Option<String>,
}

/// Multipart upload client. Never retries.
pub struct SpeakerDeckClient {
    credentials: Option<PathBuf>,
    endpoint: String,
    timeout: Duration,
}

impl SpeakerDeckClient {
    pub fn new(
        credentials: Option<PathBuf>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    fn account(&self) -> Result<(PathBuf, AccountCredentials), PublishError> {
        let path = self.credentials.clone().ok_or_else(|| PublishError::Auth {
            path: PathBuf::new(),
            reason: "no credentials file configured (SPEAKERDECK_CREDENTIALS)".to_string(),
        })?;
        let text = fs::read_to_string(&path).map_err(|e| PublishError::Auth {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let account = serde_json::from_str(&text).map_err(|e| PublishError::Auth {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok((path, account))
    }
}

impl PublishingService for SpeakerDeckClient {
    fn publish(&self, upload: &Upload) -> Result<String, PublishError> {
        let (path, account) = self.account()?;
        let client = Client::builder().timeout(self.timeout).build()?;

        let file = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(PPTX_MEDIA_TYPE)?;
        let form = multipart::Form::new()
            .text("title", upload.title.clone())
            .text("username", account.username.clone())
            .part("file", file);

        let response = client
            .post(&self.endpoint)
            .bearer_auth(&account.token)
            .multipart(form)
            .send()?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(PublishError::Auth {
                path,
                reason: format!("account {} was rejected ({})", account.username, status),
            });
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let published: PublishResponse = response.json()?;
        published
            .url
            .filter(|url| !url.is_empty())
            .ok_or(PublishError::MissingUrl)
    }
}
