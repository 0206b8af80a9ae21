//! The single return contract of the pipeline.
//!
//! Every entry point — image or PDF, success or degradation — produces one
//! [`PipelineResult`]. Callers treat `success: false` as "no structured data
//! available" and surface `raw_data.text` when present so a human can still
//! read the document. Nothing here is persisted by this crate; the merge
//! into a domain record is the caller's concern.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which recognition path produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionPath {
    /// Dedicated document-recognition endpoint.
    Primary,
    /// Multimodal chat transcription fallback.
    Fallback,
    /// PDF embedded text layer; no engine call was made.
    EmbeddedText,
}

/// Engine-side details attached to the result for diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMetadata {
    /// Engine identifier, e.g. "mistral". Absent on the embedded-text path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    /// Model reported by the engine, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Which path produced the text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<RecognitionPath>,

    /// Number of recognized pages (1 for fallback/embedded-text).
    pub page_count: usize,

    /// Engine attempts made (0 for embedded text, at most 2).
    pub attempts: usize,

    /// Whether the structured data passed the completeness check
    /// ([`crate::schema::is_recognition_complete`]).
    pub complete: bool,
}

/// Raw recognition output preserved alongside the structured fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecognition {
    pub text: String,
    /// Non-blank lines of `text`, for callers that render previews.
    pub lines: Vec<String>,
    pub engine_metadata: EngineMetadata,
}

impl RawRecognition {
    pub fn new(text: String, engine_metadata: EngineMetadata) -> Self {
        let lines = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect();
        Self {
            text,
            lines,
            engine_metadata,
        }
    }
}

/// The one object exposed across the subsystem boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// Whether recognition produced usable text. Structuring failure alone
    /// does not clear this flag — a readable document with empty
    /// `invoice_data` is still a success.
    pub success: bool,

    /// Recognized (and normalized) document text.
    pub text: String,

    /// 0–100. Fixed per path: the underlying engines expose no per-document
    /// confidence signal.
    pub confidence: u8,

    /// Canonical structured fields; `{}` when structuring failed.
    pub invoice_data: Map<String, Value>,

    pub raw_data: RawRecognition,

    /// Human-readable error when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    /// A degraded result: no text, no fields, confidence 0.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            text: String::new(),
            confidence: 0,
            invoice_data: Map::new(),
            raw_data: RawRecognition::default(),
            error: Some(error.into()),
        }
    }

    /// Degraded result for a missing engine credential.
    pub fn not_configured() -> Self {
        Self::failure(
            "recognition engine not configured; set MISTRAL_API_KEY or inject an engine client",
        )
    }
}
