//! Mistral implementation of [`EngineClient`].
//!
//! Two endpoints are used:
//!
//! * `POST /v1/ocr` — the dedicated document-recognition model
//!   (`mistral-ocr-*`): accepts an image or document data URL, returns
//!   page-indexed markdown.
//! * `POST /v1/chat/completions` — multimodal chat, used for the fallback
//!   transcription path and for the structuring call (with
//!   `response_format: {"type": "json_object"}`).
//!
//! The client is constructed once from `MISTRAL_API_KEY` and shared for the
//! process lifetime. A missing key is not an error here — [`from_env`]
//! returns `None` and the pipeline degrades to `success: false` instead of
//! failing at construction time.
//!
//! [`from_env`]: MistralEngine::from_env

use super::{
    ChatMessage, ChatResponse, CompletionOptions, DocumentSource, EngineClient, EngineError,
    OcrResponse, Page,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";

/// HTTP client for the Mistral OCR and chat APIs.
pub struct MistralEngine {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl MistralEngine {
    /// Build a client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Build a client from `MISTRAL_API_KEY`, or `None` when it is unset.
    pub fn from_env() -> Option<Self> {
        match std::env::var("MISTRAL_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(Self::new(key)),
            _ => None,
        }
    }

    /// Point the client at a different host (self-hosted gateway, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| EngineError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| EngineError::Decode(e.to_string()))
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OcrApiResponse {
    #[serde(default)]
    pages: Vec<Page>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// One content part of a multimodal user message.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: String },
}

fn encode_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| {
            if m.images.is_empty() {
                json!({ "role": m.role.as_str(), "content": m.content })
            } else {
                let mut parts = vec![ContentPart::Text {
                    text: m.content.clone(),
                }];
                parts.extend(m.images.iter().map(|img| ContentPart::ImageUrl {
                    image_url: img.to_data_url(),
                }));
                json!({ "role": m.role.as_str(), "content": parts })
            }
        })
        .collect()
}

#[async_trait]
impl EngineClient for MistralEngine {
    fn name(&self) -> &str {
        "mistral"
    }

    fn supports_document_ocr(&self) -> bool {
        true
    }

    async fn process_document(
        &self,
        source: &DocumentSource,
        model: &str,
    ) -> Result<OcrResponse, EngineError> {
        let document = match source {
            DocumentSource::ImageUrl(url) => json!({
                "type": "image_url",
                "image_url": { "url": url },
            }),
            DocumentSource::DocumentUrl(url) => json!({
                "type": "document_url",
                "document_url": url,
            }),
        };

        let body = json!({ "model": model, "document": document });
        let raw = self.post_json("/v1/ocr", &body).await?;
        let parsed: OcrApiResponse =
            serde_json::from_value(raw).map_err(|e| EngineError::Decode(e.to_string()))?;

        if parsed.pages.is_empty() {
            return Err(EngineError::EmptyResponse);
        }
        debug!(pages = parsed.pages.len(), "OCR endpoint returned pages");

        Ok(OcrResponse {
            pages: parsed.pages,
            model: parsed.model,
        })
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChatResponse, EngineError> {
        let mut body = json!({
            "model": options.model,
            "messages": encode_messages(messages),
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });
        if let Some(top_p) = options.top_p {
            body["top_p"] = json!(top_p);
        }
        if options.json_object {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let raw = self.post_json("/v1/chat/completions", &body).await?;
        let parsed: ChatApiResponse =
            serde_json::from_value(raw).map_err(|e| EngineError::Decode(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(EngineError::EmptyResponse);
        }

        Ok(ChatResponse {
            content,
            model: parsed.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ImageData;

    #[test]
    fn text_only_message_stays_string() {
        let msgs = encode_messages(&[ChatMessage::system("hi")]);
        assert_eq!(msgs[0]["content"], "hi");
    }

    #[test]
    fn image_message_becomes_content_parts() {
        let msgs = encode_messages(&[ChatMessage::user_with_image(
            "transcribe",
            ImageData::new("abc", "image/png"),
        )]);
        let parts = msgs[0]["content"].as_array().expect("array content");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"], "data:image/png;base64,abc");
    }

    #[test]
    fn from_env_absent_key_is_none() {
        std::env::remove_var("MISTRAL_API_KEY");
        assert!(MistralEngine::from_env().is_none());
    }
}
