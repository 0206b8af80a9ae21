//! Result assembly: fold recognition, cleaning, and structuring into one
//! [`PipelineResult`].
//!
//! Confidence is fixed per path rather than measured. The engines expose no
//! per-document confidence signal, so the value encodes the *reliability of
//! the path that produced the text*: the dedicated recognition endpoint is
//! more reliable than a chat transcription, and a PDF's own text layer is
//! not a guess at all.

use crate::pipeline::ocr::{AttemptOutcome, EngineKind, Recognition};
use crate::result::{EngineMetadata, PipelineResult, RawRecognition, RecognitionPath};
use crate::schema::is_recognition_complete;
use serde_json::{Map, Value};
use tracing::info;

/// Dedicated document-recognition endpoint.
pub const PRIMARY_CONFIDENCE: u8 = 95;
/// Multimodal chat transcription.
pub const FALLBACK_CONFIDENCE: u8 = 90;
/// Embedded PDF text layer: the document's own bytes, not a recognition.
pub const EMBEDDED_TEXT_CONFIDENCE: u8 = 100;

/// Assemble the result of an engine-backed recognition run.
pub fn from_recognition(
    engine_name: &str,
    recognition: &Recognition,
    cleaned_text: String,
    invoice_data: Map<String, Value>,
) -> PipelineResult {
    let Some(terminal) = recognition.terminal() else {
        return PipelineResult::failure("no recognition attempt was made");
    };

    let (success, confidence, path, page_count, error) = match &terminal.outcome {
        AttemptOutcome::Succeeded(pages) => {
            let (confidence, path) = match terminal.engine {
                EngineKind::Primary => (PRIMARY_CONFIDENCE, RecognitionPath::Primary),
                EngineKind::Fallback => (FALLBACK_CONFIDENCE, RecognitionPath::Fallback),
            };
            (true, confidence, Some(path), pages.len(), None)
        }
        AttemptOutcome::Failed(detail) => (false, 0, None, 0, Some(detail.clone())),
    };

    let completeness = is_recognition_complete(&invoice_data);
    let metadata = EngineMetadata {
        engine: Some(engine_name.to_string()),
        model: terminal.model.clone(),
        path,
        page_count,
        attempts: recognition.attempts.len(),
        complete: completeness.complete,
    };

    info!(
        success,
        confidence,
        attempts = metadata.attempts,
        complete = metadata.complete,
        missing = ?completeness.missing_fields,
        "assembled extraction result"
    );

    PipelineResult {
        success,
        text: if success { cleaned_text.clone() } else { String::new() },
        confidence,
        invoice_data,
        raw_data: RawRecognition::new(cleaned_text, metadata),
        error,
    }
}

/// Assemble a result from a PDF's embedded text layer. No engine was called.
pub fn from_embedded_text(
    cleaned_text: String,
    invoice_data: Map<String, Value>,
) -> PipelineResult {
    let completeness = is_recognition_complete(&invoice_data);
    let metadata = EngineMetadata {
        engine: None,
        model: None,
        path: Some(RecognitionPath::EmbeddedText),
        page_count: 1,
        attempts: 0,
        complete: completeness.complete,
    };

    info!(
        chars = cleaned_text.len(),
        complete = metadata.complete,
        "assembled result from embedded text layer"
    );

    PipelineResult {
        success: true,
        text: cleaned_text.clone(),
        confidence: EMBEDDED_TEXT_CONFIDENCE,
        invoice_data,
        raw_data: RawRecognition::new(cleaned_text, metadata),
        error: None,
    }
}
