//! The recognition-engine seam: one trait, plain wire types.
//!
//! Everything network-shaped lives behind [`EngineClient`] so the pipeline's
//! decision tree (primary → fallback, retry, degradation) can be unit-tested
//! against a mock without an API key or a network. The trait is object-safe
//! and shared as `Arc<dyn EngineClient>` — a single read-only handle created
//! once at process start, never mutated (see
//! [`crate::config::ExtractionConfig`]).
//!
//! Two capabilities, matching the two recognition paths:
//!
//! 1. [`EngineClient::process_document`] — the dedicated document-recognition
//!    endpoint: whole document in, page-indexed markdown out.
//! 2. [`EngineClient::chat`] — a multimodal completion call, used both for
//!    the fallback transcription path (image attached) and for the
//!    structuring call (text only, JSON output mode).

pub mod mistral;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mistral::MistralEngine;

/// A single recognized page as returned by the document-recognition endpoint.
///
/// Pages are sortable by `index`; the adapter concatenates them in ascending
/// order separated by a blank line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub markdown: String,
}

/// Response from the document-recognition endpoint.
#[derive(Debug, Clone, Default)]
pub struct OcrResponse {
    pub pages: Vec<Page>,
    /// Model identifier reported by the engine, if any.
    pub model: Option<String>,
}

/// How the document bytes are presented to the engine.
///
/// Both variants carry a MIME-tagged base64 data URL; the engine API
/// distinguishes images from whole documents (PDFs) at the request level.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// `data:image/...;base64,...`
    ImageUrl(String),
    /// `data:application/pdf;base64,...`
    DocumentUrl(String),
}

/// A base64-encoded image attachment for a multimodal chat message.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Base64 payload (no data-URL prefix).
    pub data: String,
    /// e.g. `image/png`.
    pub mime_type: String,
}

impl ImageData {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Render as a `data:` URL for APIs that take URL-shaped image references.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// One turn of a chat conversation, with optional image attachments.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub images: Vec<ImageData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn user_with_image(content: impl Into<String>, image: ImageData) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: vec![image],
        }
    }
}

/// Sampling and output-contract options for a completion call.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub max_tokens: usize,
    /// Enforce a single-JSON-object response (`response_format: json_object`).
    pub json_object: bool,
}

/// Response from a completion call.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,
    pub model: Option<String>,
}

/// Errors produced by an engine implementation.
///
/// These never escape the pipeline: the adapter converts them into a failed
/// attempt (and ultimately a `success: false` result) after retries are
/// exhausted.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Transport-level failure (connect, TLS, read).
    #[error("engine request failed: {0}")]
    Http(String),

    /// The engine returned a non-success HTTP status.
    #[error("engine API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The call exceeded the configured per-call timeout.
    #[error("engine call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The engine answered but the body carried no usable content.
    #[error("engine returned an empty response")]
    EmptyResponse,

    /// Response body could not be decoded.
    #[error("failed to decode engine response: {0}")]
    Decode(String),
}

/// A document-recognition engine: OCR endpoint plus multimodal chat.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Short engine identifier for logs and result metadata.
    fn name(&self) -> &str;

    /// Whether the dedicated document-recognition endpoint is available.
    ///
    /// When `false` the adapter goes straight to the chat-based fallback.
    fn supports_document_ocr(&self) -> bool;

    /// Run the dedicated document-recognition call.
    async fn process_document(
        &self,
        source: &DocumentSource,
        model: &str,
    ) -> Result<OcrResponse, EngineError>;

    /// Run a (possibly multimodal) completion call.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChatResponse, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_data_url_round_trip() {
        let img = ImageData::new("aGVsbG8=", "image/png");
        assert_eq!(img.to_data_url(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn chat_message_constructors() {
        let m = ChatMessage::system("be terse");
        assert_eq!(m.role, Role::System);
        assert!(m.images.is_empty());

        let m = ChatMessage::user_with_image("", ImageData::new("x", "image/jpeg"));
        assert_eq!(m.role, Role::User);
        assert_eq!(m.images.len(), 1);
    }

    #[test]
    fn pages_sort_by_index() {
        let mut pages = vec![
            Page { index: 2, markdown: "c".into() },
            Page { index: 0, markdown: "a".into() },
            Page { index: 1, markdown: "b".into() },
        ];
        pages.sort_by_key(|p| p.index);
        let joined: Vec<&str> = pages.iter().map(|p| p.markdown.as_str()).collect();
        assert_eq!(joined, ["a", "b", "c"]);
    }
}
