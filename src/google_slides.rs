// ABOUTME: Google Slides renderer for the slides-creator application
// ABOUTME: Maps a deck onto remote slides and drives the Slides REST API

use crate::config::ThemeConfig;
use crate::deck::{SlideDeck, SlideKind};
use crate::errors::{RenderError, ServiceError};
use crate::render::{Artifact, Backend, RemoteRef, Renderer};
use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const MONOSPACE_FONT: &str = "Courier New";

/// A slide as sent to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSlide {
    pub object_id: String,
    pub layout: &'static str,
    pub title: String,
    pub body: Vec<String>,
    pub monospace: bool,
    pub image_url: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemotePresentation {
    pub title: String,
    pub slides: Vec<RemoteSlide>,
}

/// Remote presentation service
pub trait SlideService: Send + Sync {
    fn create_presentation(
        &self,
        presentation: &RemotePresentation,
    ) -> Result<RemoteRef, ServiceError>;
}

/// Map a deck onto remote slides, one per planned slide.
pub fn build_presentation(deck: &SlideDeck, cfg: &ThemeConfig) -> RemotePresentation {
    let slides = deck
        .slides()
        .iter()
        .enumerate()
        .map(|(i, slide)| {
            let (layout, body, monospace, image_url) = match &slide.kind {
                SlideKind::Title => ("TITLE", slide.body_lines.clone(), false, None),
                SlideKind::Content => ("TITLE_AND_BODY", slide.body_lines.clone(), false, None),
                SlideKind::Code { caption, .. } => {
                    let mut body = slide.body_lines.clone();
                    if let Some(caption) = caption {
                        body.push(String::new());
                        body.push(caption.clone());
                    }
                    ("TITLE_AND_BODY", body, true, None)
                }
                SlideKind::Visual { image } => {
                    let mut body = slide.body_lines.clone();
                    if image.is_remote() {
                        ("TITLE_AND_BODY", body, false, Some(image.path_or_url.clone()))
                    } else {
                        // Local files cannot be referenced by the service
                        body.push(image.placeholder());
                        ("TITLE_AND_BODY", body, false, None)
                    }
                }
                SlideKind::Conclusion { call_to_action } => {
                    let mut body: Vec<String> =
                        slide.body_lines.iter().map(|line| format!("✓ {}", line)).collect();
                    body.push(String::new());
                    body.push(call_to_action.clone());
                    ("TITLE_AND_BODY", body, false, None)
                }
            };
            let notes = if cfg.include_speaker_notes {
                slide.speaker_notes.clone()
            } else {
                String::new()
            };
            RemoteSlide {
                object_id: format!("slide_{:03}", i + 1),
                layout,
                title: slide.heading(),
                body,
                monospace,
                image_url,
                notes,
            }
        })
        .collect();

    RemotePresentation {
        title: deck.title().to_string(),
        slides,
    }
}

/// Requests for the single batch update that fills a fresh presentation.
pub fn batch_requests(
    presentation: &RemotePresentation,
    default_slide_id: Option<&str>,
) -> Vec<Value> {
    let mut requests = Vec::new();
    for (i, slide) in presentation.slides.iter().enumerate() {
        let title_id = format!("{}_title", slide.object_id);
        let body_id = format!("{}_body", slide.object_id);
        let (title_type, body_type) = if slide.layout == "TITLE" {
            ("CENTERED_TITLE", "SUBTITLE")
        } else {
            ("TITLE", "BODY")
        };

        requests.push(json!({
            "createSlide": {
                "objectId": slide.object_id,
                "insertionIndex": i,
                "slideLayoutReference": { "predefinedLayout": slide.layout },
                "placeholderIdMappings": [
                    { "layoutPlaceholder": { "type": title_type, "index": 0 }, "objectId": title_id },
                    { "layoutPlaceholder": { "type": body_type, "index": 0 }, "objectId": body_id },
                ],
            }
        }));
        requests.push(json!({
            "insertText": { "objectId": title_id, "insertionIndex": 0, "text": slide.title }
        }));

        let body = slide.body.join("\n");
        if !body.is_empty() {
            requests.push(json!({
                "insertText": { "objectId": body_id, "insertionIndex": 0, "text": body }
            }));
            if slide.monospace {
                requests.push(json!({
                    "updateTextStyle": {
                        "objectId": body_id,
                        "textRange": { "type": "ALL" },
                        "style": { "fontFamily": MONOSPACE_FONT },
                        "fields": "fontFamily",
                    }
                }));
            }
        }

        if let Some(url) = &slide.image_url {
            requests.push(json!({
                "createImage": {
                    "url": url,
                    "elementProperties": { "pageObjectId": slide.object_id },
                }
            }));
        }
    }

    if let Some(id) = default_slide_id {
        requests.push(json!({ "deleteObject": { "objectId": id } }));
    }
    requests
}

pub struct GoogleSlidesRenderer<S> {
    service: S,
}

impl<S: SlideService> GoogleSlidesRenderer<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S: SlideService> Renderer for GoogleSlidesRenderer<S> {
    fn backend(&self) -> Backend {
        Backend::GoogleSlides
    }

    fn render(&self, deck: &SlideDeck, cfg: &ThemeConfig) -> Result<Artifact, RenderError> {
        let presentation = build_presentation(deck, cfg);
        info!(
            "Creating Google Slides presentation {:?} ({} slides)",
            presentation.title,
            presentation.slides.len()
        );
        let remote = self
            .service
            .create_presentation(&presentation)
            .map_err(|e| RenderError::new(Backend::GoogleSlides, e))?;
        info!("Google Slides presentation created: {}", remote.url);
        Ok(Artifact::Remote(remote))
    }
}

/// Slides REST API client. Credentials are read on each call so a missing
/// file only fails this backend.
pub struct GoogleSlidesClient {
    credentials: Option<PathBuf>,
    api_url: String,
    timeout: Duration,
}

impl GoogleSlidesClient {
    pub fn new(
        credentials: Option<PathBuf>,
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            api_url: api_url.into(),
            timeout,
        }
    }

    fn access_token(&self) -> Result<String, ServiceError> {
        let path = self.credentials.clone().ok_or_else(|| ServiceError::Credentials {
            path: PathBuf::new(),
            reason: "no credentials file configured (--google-credentials or GOOGLE_SLIDES_CREDENTIALS)"
                .to_string(),
        })?;
        let text = fs::read_to_string(&path).map_err(|e| ServiceError::Credentials {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|e| ServiceError::Credentials {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        value
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or(ServiceError::Credentials {
                path,
                reason: "missing `access_token`".to_string(),
            })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        let mut base = self.api_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Url::parse(&base)?.join(path)?)
    }

    fn send(&self, request: RequestBuilder, token: &str) -> Result<Value, ServiceError> {
        let response = request.bearer_auth(token).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>()?)
    }

    fn batch_update(
        &self,
        client: &Client,
        token: &str,
        id: &str,
        requests: Vec<Value>,
    ) -> Result<Value, ServiceError> {
        debug!("Sending batchUpdate with {} requests", requests.len());
        let url = self.endpoint(&format!("presentations/{}:batchUpdate", id))?;
        self.send(client.post(url).json(&json!({ "requests": requests })), token)
    }
}

impl SlideService for GoogleSlidesClient {
    fn create_presentation(
        &self,
        presentation: &RemotePresentation,
    ) -> Result<RemoteRef, ServiceError> {
        let token = self.access_token()?;
        let client = Client::builder().timeout(self.timeout).build()?;

        let created = self.send(
            client
                .post(self.endpoint("presentations")?)
                .json(&json!({ "title": presentation.title })),
            &token,
        )?;
        let id = created
            .get("presentationId")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::InvalidResponse("missing presentationId".to_string()))?
            .to_string();
        let default_slide = created
            .pointer("/slides/0/objectId")
            .and_then(Value::as_str)
            .map(str::to_string);

        let requests = batch_requests(presentation, default_slide.as_deref());
        self.batch_update(&client, &token, &id, requests)?;

        // Notes placeholders only exist once the slides do
        let fetched = self.send(
            client.get(self.endpoint(&format!("presentations/{}", id))?),
            &token,
        )?;
        let notes_ids = speaker_notes_ids(&fetched);
        let notes_requests: Vec<Value> = presentation
            .slides
            .iter()
            .filter(|slide| !slide.notes.trim().is_empty())
            .filter_map(|slide| {
                notes_ids.get(&slide.object_id).map(|notes_id| {
                    json!({ "insertText": { "objectId": notes_id, "insertionIndex": 0, "text": slide.notes } })
                })
            })
            .collect();
        if !notes_requests.is_empty() {
            self.batch_update(&client, &token, &id, notes_requests)?;
        }

        Ok(RemoteRef {
            url: format!("https://docs.google.com/presentation/d/{}/edit", id),
            id,
        })
    }
}

/// Slide object id to speaker notes shape id
fn speaker_notes_ids(presentation: &Value) -> HashMap<String, String> {
    presentation
        .get("slides")
        .and_then(Value::as_array)
        .map(|slides| {
            slides
                .iter()
                .filter_map(|slide| {
                    let id = slide.get("objectId")?.as_str()?;
                    let notes = slide
                        .pointer("/slideProperties/notesPage/notesProperties/speakerNotesObjectId")?
                        .as_str()?;
                    Some((id.to_string(), notes.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presentation() -> RemotePresentation {
        RemotePresentation {
            title: "Deck".to_string(),
            slides: vec![
                RemoteSlide {
                    object_id: "slide_001".to_string(),
                    layout: "TITLE",
                    title: "Deck".to_string(),
                    body: vec![],
                    monospace: false,
                    image_url: None,
                    notes: String::new(),
                },
                RemoteSlide {
                    object_id: "slide_002".to_string(),
                    layout: "TITLE_AND_BODY",
                    title: "Example".to_string(),
                    body: vec!["fn main() {}".to_string()],
                    monospace: true,
                    image_url: Some("https://example.com/a.png".to_string()),
                    notes: "say hi".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_batch_requests_order_and_cleanup() {
        let requests = batch_requests(&presentation(), Some("p"));
        let kinds: Vec<&str> = requests
            .iter()
            .map(|r| r.as_object().and_then(|o| o.keys().next()).map(String::as_str).unwrap_or(""))
            .collect();
        assert_eq!(
            kinds,
            vec![
                "createSlide",
                "insertText",
                "createSlide",
                "insertText",
                "insertText",
                "updateTextStyle",
                "createImage",
                "deleteObject"
            ]
        );
        assert_eq!(
            requests[0]["createSlide"]["placeholderIdMappings"][0]["layoutPlaceholder"]["type"],
            "CENTERED_TITLE"
        );
        assert_eq!(requests[3]["insertText"]["text"], "Example");
    }

    #[test]
    fn test_speaker_notes_ids() {
        let value = json!({
            "slides": [
                { "objectId": "p" },
                { "objectId": "slide_002", "slideProperties": { "notesPage": { "notesProperties": { "speakerNotesObjectId": "n2" } } } }
            ]
        });
        let ids = speaker_notes_ids(&value);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids["slide_002"], "n2");
    }

    #[test]
    fn test_missing_credentials_is_service_error() {
        let client =
            GoogleSlidesClient::new(None, "http://127.0.0.1:9/", Duration::from_millis(10));
        let err = client.create_presentation(&presentation()).unwrap_err();
        assert!(matches!(err, ServiceError::Credentials { .. }));
    }
}
