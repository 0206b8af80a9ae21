//! # receipt2data
//!
//! Extract structured invoice data from receipt and invoice documents
//! (images and PDFs) using a hosted recognition engine.
//!
//! ## Why this crate?
//!
//! Expense-tracking backends receive receipts as photos, scans, and
//! digitally-produced PDFs. This crate turns any of them into one uniform
//! JSON-friendly result: the recognized document text plus a canonical set
//! of invoice fields (number, dates, parties, tax IDs, amounts, line
//! items). Engine outages, unreadable scans, and malformed model output
//! all *degrade* into that result instead of failing the call, so a batch
//! of uploads never aborts on one bad document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image / PDF
//!  │
//!  ├─ 1. Load       validate path, resolve MIME type
//!  ├─ 2. Raster     (PDF only) pdftoppm page → PNG, or embedded text layer
//!  ├─ 3. Encode     bytes → base64 data URLs
//!  ├─ 4. Recognize  dedicated OCR endpoint, multimodal chat fallback
//!  ├─ 5. Normalize  strip image refs, prune empty table rows
//!  ├─ 6. Structure  schema-driven completion → canonical field map
//!  └─ 7. Assemble   PipelineResult { success, text, confidence, invoiceData, rawData }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use receipt2data::{recognize_image, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Engine auto-detected from MISTRAL_API_KEY
//!     let config = ExtractionConfig::default();
//!     let result = recognize_image("receipt.jpg", &config).await?;
//!     if result.success {
//!         println!("{}", serde_json::to_string_pretty(&result.invoice_data)?);
//!     } else {
//!         eprintln!("recognition degraded: {:?}", result.error);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `receipt2data` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! receipt2data = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod recognize;
pub mod result;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use engine::{EngineClient, EngineError, MistralEngine};
pub use error::ExtractError;
pub use recognize::{recognize_image, recognize_image_sync, recognize_pdf, recognize_pdf_sync};
pub use result::{EngineMetadata, PipelineResult, RawRecognition, RecognitionPath};
pub use schema::{is_recognition_complete, Completeness};
