//! Error types for the receipt2data library.
//!
//! Two distinct failure modes, handled differently:
//!
//! * [`ExtractError`] — **Fatal**: the invocation cannot produce a result at
//!   all (missing input file, unreadable file, PDF that can neither be
//!   rasterized nor text-extracted, invalid config). Returned as
//!   `Err(ExtractError)` from the top-level `recognize_*` functions.
//!
//! * **Degraded results** — every other failure (engine credential absent,
//!   recognition call failed after fallback, structuring response not valid
//!   JSON) is reported *inside* the returned
//!   [`crate::result::PipelineResult`], never thrown. A failed extraction
//!   must not interrupt the caller's upload workflow, and a successful
//!   recognition with failed structuring still carries the raw text.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the receipt2data library.
///
/// Recognition and structuring failures are not represented here — they
/// degrade into the returned [`crate::result::PipelineResult`].
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// File exists but cannot be opened for reading.
    #[error("cannot read document '{path}': {detail}")]
    Unreadable { path: PathBuf, detail: String },

    // ── Rasterization ─────────────────────────────────────────────────────
    /// Both the page-to-image utility and the embedded text layer failed.
    ///
    /// The one point in the pipeline allowed to propagate: with no raster
    /// image and no text layer there is nothing left to recognize.
    #[error(
        "rasterization failed for page {page} of '{path}': {detail}\n\
         Install poppler (pdftoppm) or provide a PDF with a text layer."
    )]
    RasterizationFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, temp I/O).
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_display() {
        let e = ExtractError::FileNotFound {
            path: PathBuf::from("/tmp/missing.jpg"),
        };
        assert!(e.to_string().contains("/tmp/missing.jpg"));
    }

    #[test]
    fn rasterization_failed_display() {
        let e = ExtractError::RasterizationFailed {
            path: PathBuf::from("a.pdf"),
            page: 2,
            detail: "pdftoppm not found".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 2"), "got: {msg}");
        assert!(msg.contains("pdftoppm"));
    }
}
