//! Pipeline stages for document-to-structured-data extraction.
//!
//! Each submodule implements exactly one transformation step, so every stage
//! is independently testable and a fallback branch in one stage never
//! reaches into another.
//!
//! ## Data Flow
//!
//! ```text
//! loader ──▶ raster (PDF) ──▶ ocr ──▶ normalize ──▶ extract ──▶ assemble
//! (bytes)    (pdftoppm /      (engine  (markdown     (JSON       (PipelineResult)
//!             text layer)      calls)   cleanup)      structuring)
//! ```
//!
//! 1. [`loader`]    — resolve the path, validate readability, infer MIME
//! 2. [`encode`]    — file bytes → base64 data URLs / image attachments
//! 3. [`raster`]    — PDF page → PNG via pdftoppm, or the embedded text layer
//! 4. [`ocr`]       — recognition engine adapter: primary call, one fallback
//! 5. [`normalize`] — markdown cleanup that never drops short tokens
//! 6. [`extract`]   — schema-constrained structuring with parse repair
//! 7. [`assemble`]  — compose the final [`crate::result::PipelineResult`]

pub mod assemble;
pub mod encode;
pub mod extract;
pub mod loader;
pub mod normalize;
pub mod ocr;
pub mod raster;
