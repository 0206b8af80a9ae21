//! PDF rasterization with an embedded-text fallback.
//!
//! The conversion utility (`pdftoppm` from poppler) is external by design:
//! it is ubiquitous on servers, battle-tested on malformed PDFs, and keeps
//! this crate free of a rendering engine. When it is missing or fails, the
//! PDF's own text layer is the fallback — a digitally-produced invoice
//! usually carries one, and that text is *better* than recognition output
//! (the Result Assembler reports it at confidence 100).
//!
//! Both paths failing is the one fatal, thrown error in the pipeline:
//! [`crate::error::ExtractError::RasterizationFailed`].
//!
//! The produced PNG is written next to the source PDF and its lifecycle
//! belongs to the caller; this module never deletes it.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Outcome of rasterizing one PDF page.
///
/// A single tagged type for both branches — callers never have to guess
/// whether they were handed a path or a result object.
#[derive(Debug, Clone)]
pub enum RasterOutcome {
    /// Page rendered to a PNG at this path.
    Image(PathBuf),
    /// No raster utility available; the PDF's embedded text layer instead.
    EmbeddedText(String),
}

/// Convert page `page_number` (1-based) of a PDF to a PNG, or fall back to
/// the embedded text layer.
pub async fn rasterize(
    pdf_path: &Path,
    page_number: usize,
    config: &ExtractionConfig,
) -> Result<RasterOutcome, ExtractError> {
    // Page numbers are 1-based; 0 must not alias to the first page.
    if page_number == 0 {
        return Err(ExtractError::RasterizationFailed {
            path: pdf_path.to_path_buf(),
            page: 0,
            detail: "page numbers are 1-based; got 0".to_string(),
        });
    }

    let raster_err = match convert_with_pdftoppm(pdf_path, page_number, config).await {
        Ok(image_path) => return Ok(RasterOutcome::Image(image_path)),
        Err(e) => e,
    };
    warn!(
        pdf = %pdf_path.display(),
        page = page_number,
        error = %raster_err,
        "raster utility failed; trying embedded text layer"
    );

    match extract_text_layer(pdf_path, page_number).await {
        Ok(text) if !text.trim().is_empty() => {
            debug!(chars = text.len(), "using embedded text layer");
            Ok(RasterOutcome::EmbeddedText(text))
        }
        Ok(_) => Err(ExtractError::RasterizationFailed {
            path: pdf_path.to_path_buf(),
            page: page_number,
            detail: format!("{raster_err}; embedded text layer is empty"),
        }),
        Err(text_err) => Err(ExtractError::RasterizationFailed {
            path: pdf_path.to_path_buf(),
            page: page_number,
            detail: format!("{raster_err}; text layer: {text_err}"),
        }),
    }
}

/// Run `pdftoppm -png -singlefile` and locate the PNG it produced.
async fn convert_with_pdftoppm(
    pdf_path: &Path,
    page_number: usize,
    config: &ExtractionConfig,
) -> Result<PathBuf, String> {
    let binary: PathBuf = config
        .pdftoppm_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("pdftoppm"));

    let out_dir = pdf_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = pdf_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    let prefix = out_dir.join(format!("{stem}_page{page_number}"));

    let output = Command::new(&binary)
        .arg("-png")
        .arg("-r")
        .arg(config.raster_dpi.to_string())
        .arg("-f")
        .arg(page_number.to_string())
        .arg("-l")
        .arg(page_number.to_string())
        .arg("-singlefile")
        .arg(pdf_path)
        .arg(&prefix)
        .output()
        .await
        .map_err(|e| format!("failed to run {}: {e}", binary.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "{} exited with {}: {}",
            binary.display(),
            output.status,
            stderr.trim()
        ));
    }

    // -singlefile writes `prefix.png`, but some poppler builds keep the page
    // suffix; probe the known variants.
    let candidates = [
        prefix.with_extension("png"),
        out_dir.join(format!("{stem}_page{page_number}-{page_number}.png")),
        out_dir.join(format!("{stem}_page{page_number}-1.png")),
    ];
    for candidate in &candidates {
        if candidate.exists() {
            debug!(image = %candidate.display(), "rasterized PDF page");
            return Ok(candidate.clone());
        }
    }

    Err(format!(
        "conversion produced no image (expected one of: {})",
        candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

/// Extract the embedded text layer of one page.
///
/// `pdf_extract` is synchronous and CPU-bound, so it runs on the blocking
/// pool — same pattern as any in-process PDF work.
async fn extract_text_layer(pdf_path: &Path, page_number: usize) -> Result<String, String> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        match pdf_extract::extract_text_by_pages(&path) {
            Ok(pages) => pages
                .get(page_number.saturating_sub(1))
                .cloned()
                .ok_or_else(|| format!("page {page_number} out of range ({} pages)", pages.len())),
            // Per-page splitting can fail on odd files; whole-document text
            // is still usable for single-page receipts.
            Err(_) => pdf_extract::extract_text(&path).map_err(|e| e.to_string()),
        }
    })
    .await
    .map_err(|e| format!("text extraction task panicked: {e}"))?
}
