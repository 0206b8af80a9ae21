//! End-to-end pipeline tests against a mock engine client.
//!
//! No network, no credentials: the engine seam is injected through the
//! config, and every scenario asserts the degrade-and-report contract of
//! the public entry points.

use async_trait::async_trait;
use receipt2data::engine::{
    ChatMessage, ChatResponse, CompletionOptions, DocumentSource, EngineError, OcrResponse, Page,
};
use receipt2data::{
    recognize_image, recognize_pdf, EngineClient, ExtractionConfig, PipelineResult,
    RecognitionPath,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scripted engine: fixed responses per endpoint, call counting.
struct MockEngine {
    supports_document_ocr: bool,
    /// `Err` simulates a primary-endpoint outage.
    ocr_markdown: Result<String, u16>,
    /// Response to the fallback transcription call (json_object = false).
    transcription: String,
    /// Response to the structuring call (json_object = true).
    structured: String,
    ocr_calls: AtomicUsize,
    chat_calls: AtomicUsize,
}

impl MockEngine {
    fn healthy(structured: &str) -> Self {
        Self {
            supports_document_ocr: true,
            ocr_markdown: Ok("# Invoice\n\nInvoice Number: 24331800000012345678".into()),
            transcription: "transcribed text".into(),
            structured: structured.into(),
            ocr_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EngineClient for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_document_ocr(&self) -> bool {
        self.supports_document_ocr
    }

    async fn process_document(
        &self,
        _source: &DocumentSource,
        model: &str,
    ) -> Result<OcrResponse, EngineError> {
        self.ocr_calls.fetch_add(1, Ordering::SeqCst);
        match &self.ocr_markdown {
            Ok(markdown) => Ok(OcrResponse {
                pages: vec![Page {
                    index: 0,
                    markdown: markdown.clone(),
                }],
                model: Some(model.to_string()),
            }),
            Err(status) => Err(EngineError::Api {
                status: *status,
                message: "engine unavailable".into(),
            }),
        }
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChatResponse, EngineError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let content = if options.json_object {
            self.structured.clone()
        } else {
            self.transcription.clone()
        };
        Ok(ChatResponse {
            content,
            model: Some(options.model.clone()),
        })
    }
}

fn config_with(engine: MockEngine) -> ExtractionConfig {
    ExtractionConfig::builder()
        .engine(Arc::new(engine))
        .max_retries(0)
        .retry_backoff_ms(1)
        .build()
        .unwrap()
}

fn temp_image(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("receipt.jpg");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(b"\xFF\xD8\xFF\xE0 fake jpeg")
        .unwrap();
    path
}

const STRUCTURED: &str = r#"{
    "invoiceNumber": "24331800000012345678",
    "invoiceDate": "2022年07月12日",
    "Seller": "携程广州",
    "vendorTaxId": "91440101MA59N7XU1X",
    "buyerTaxId": "91110108795101314X",
    "totalAmount": "¥1,234.56",
    "taxAmount": "免税"
}"#;

// ── Scenario: healthy primary path ───────────────────────────────────────

#[tokio::test]
async fn healthy_image_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let image = temp_image(&dir);
    let config = config_with(MockEngine::healthy(STRUCTURED));

    let result = recognize_image(&image, &config).await.unwrap();

    assert!(result.success);
    assert_eq!(result.confidence, 95);
    assert!(result.text.contains("24331800000012345678"));
    assert_eq!(result.invoice_data["vendorName"], "携程广州");
    assert!(!result.invoice_data.contains_key("Seller"));
    assert_eq!(result.invoice_data["invoiceDate"], "2022-07-12");
    assert_eq!(result.invoice_data["totalAmount"].as_f64(), Some(1234.56));
    assert_eq!(result.invoice_data["taxAmount"].as_f64(), Some(0.0));
    assert_eq!(
        result.raw_data.engine_metadata.path,
        Some(RecognitionPath::Primary)
    );
    assert_eq!(result.raw_data.engine_metadata.attempts, 1);
    assert!(result.error.is_none());
}

// ── Scenario: no credential configured ───────────────────────────────────

#[tokio::test]
async fn missing_credential_degrades() {
    // No injected engine and no key in the environment.
    std::env::remove_var("MISTRAL_API_KEY");
    let dir = tempfile::tempdir().unwrap();
    let image = temp_image(&dir);
    let config = ExtractionConfig::default();

    let result = recognize_image(&image, &config).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.confidence, 0);
    assert!(result.text.is_empty());
    assert!(result.invoice_data.is_empty());
    assert!(result.error.is_some());
}

// ── Scenario: primary outage falls back to chat transcription ────────────

#[tokio::test]
async fn primary_outage_uses_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let image = temp_image(&dir);

    let mut engine = MockEngine::healthy(STRUCTURED);
    engine.ocr_markdown = Err(503);
    engine.transcription = "Invoice Number: 24331800000012345678".into();
    let config = config_with(engine);

    let result = recognize_image(&image, &config).await.unwrap();

    assert!(result.success);
    assert_eq!(result.confidence, 90);
    assert!(result.text.contains("24331800000012345678"));
    assert_eq!(
        result.raw_data.engine_metadata.path,
        Some(RecognitionPath::Fallback)
    );
    assert_eq!(result.raw_data.engine_metadata.attempts, 2);
}

// ── Scenario: engine without a document-OCR endpoint ─────────────────────

#[tokio::test]
async fn chat_only_engine_same_result_shape() {
    let dir = tempfile::tempdir().unwrap();
    let image = temp_image(&dir);

    let mut engine = MockEngine::healthy(STRUCTURED);
    engine.supports_document_ocr = false;
    engine.transcription = "Invoice Number: 24331800000012345678".into();
    let config = config_with(engine);

    let result = recognize_image(&image, &config).await.unwrap();

    assert!(result.success);
    assert_eq!(result.confidence, 90);
    assert_eq!(
        result.raw_data.engine_metadata.path,
        Some(RecognitionPath::Fallback)
    );
    // No primary call was attempted, so a single attempt is recorded.
    assert_eq!(result.raw_data.engine_metadata.attempts, 1);
    assert_eq!(result.invoice_data["vendorName"], "携程广州");
}

// ── Scenario: structuring output is not JSON ─────────────────────────────

#[tokio::test]
async fn malformed_structuring_keeps_text() {
    let dir = tempfile::tempdir().unwrap();
    let image = temp_image(&dir);
    let config = config_with(MockEngine::healthy("sorry, I cannot do that"));

    let result = recognize_image(&image, &config).await.unwrap();

    assert!(result.success, "recognition succeeded even if structuring failed");
    assert!(!result.text.is_empty());
    assert!(result.invoice_data.is_empty());
    assert!(!result.raw_data.engine_metadata.complete);
}

// ── Scenario: PDF with no raster utility uses the text layer ─────────────

/// Minimal one-page PDF with "Invoice 42" in its text layer.
fn tiny_text_pdf() -> Vec<u8> {
    let content = "BT /F1 24 Tf 72 720 Td (Invoice 42) Tj ET";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, obj));
    }
    let xref_offset = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    pdf.push_str("0000000000 65535 f \n");
    for off in &offsets {
        pdf.push_str(&format!("{off:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));
    pdf.into_bytes()
}

#[tokio::test]
async fn pdf_text_layer_has_confidence_100() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("invoice.pdf");
    std::fs::File::create(&pdf)
        .unwrap()
        .write_all(&tiny_text_pdf())
        .unwrap();

    let engine = MockEngine::healthy(r#"{"invoiceNumber": "42"}"#);
    let config = ExtractionConfig::builder()
        .engine(Arc::new(engine))
        .pdftoppm_path("/nonexistent/pdftoppm")
        .max_retries(0)
        .build()
        .unwrap();

    let result = recognize_pdf(&pdf, 1, &config).await.unwrap();

    assert!(result.success);
    assert_eq!(result.confidence, 100);
    assert!(result.text.contains("Invoice 42"));
    assert_eq!(
        result.raw_data.engine_metadata.path,
        Some(RecognitionPath::EmbeddedText)
    );
    assert_eq!(result.raw_data.engine_metadata.attempts, 0);
    assert!(result.raw_data.engine_metadata.engine.is_none());
    assert_eq!(result.invoice_data["invoiceNumber"], "42");
}

// ── Contract: confidence bounds and serialized shape ─────────────────────

#[tokio::test]
async fn result_serializes_with_camel_case_keys() {
    let dir = tempfile::tempdir().unwrap();
    let image = temp_image(&dir);
    let config = config_with(MockEngine::healthy(STRUCTURED));

    let result = recognize_image(&image, &config).await.unwrap();
    assert!(result.confidence <= 100);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("invoiceData").is_some());
    assert!(json.get("rawData").is_some());
    assert!(json["rawData"].get("engineMetadata").is_some());
    assert!(json["rawData"]["engineMetadata"].get("pageCount").is_some());
}

#[tokio::test]
async fn degraded_result_is_still_serializable() {
    let result = PipelineResult::failure("engine unavailable");
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["confidence"], 0);
}
