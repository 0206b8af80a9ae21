//! Entry points: one call in, one [`PipelineResult`] out.
//!
//! [`recognize_image`] and [`recognize_pdf`] are the only two operations the
//! subsystem exposes. Both follow the same contract: the returned `Result`
//! is `Err` only for input problems (the file cannot be loaded, or a PDF
//! page cannot be rasterized *and* has no text layer). Every downstream
//! problem — engine outage, unparsable structuring output, a missing
//! credential — degrades into the `PipelineResult` instead, so a batch of
//! uploads never aborts on one bad document.

use crate::config::ExtractionConfig;
use crate::engine::{EngineClient, MistralEngine};
use crate::error::ExtractError;
use crate::pipeline::ocr::RecognitionSources;
use crate::pipeline::raster::RasterOutcome;
use crate::pipeline::{assemble, encode, extract, loader, normalize, ocr, raster};
use crate::result::PipelineResult;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Recognize a receipt or invoice image and extract structured fields.
///
/// `Err` only when the file cannot be loaded; every other failure degrades
/// into the result. A PDF passed here is routed to [`recognize_pdf`] with
/// page 1.
pub async fn recognize_image(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<PipelineResult, ExtractError> {
    let path = path.as_ref();
    let document = loader::load_document(path, None)?;
    if document.is_pdf() {
        return recognize_pdf(path, 1, config).await;
    }
    info!(path = %document.path.display(), mime = %document.mime_type, "recognizing image");

    let Some(engine) = resolve_engine(config) else {
        warn!("no engine client available; returning degraded result");
        return Ok(PipelineResult::not_configured());
    };

    let sources = RecognitionSources {
        primary: encode::document_source(&document).await?,
        fallback_image: Some(encode::image_attachment(&document.path).await?),
    };
    Ok(run(&engine, &sources, config).await)
}

/// Recognize one page of a PDF (1-based `page_number`).
///
/// The page is rasterized with the external utility; when that is
/// unavailable the PDF's embedded text layer is used directly (reported at
/// confidence 100, no engine recognition call). Both paths failing is the
/// one fatal error beyond loading:
/// [`ExtractError::RasterizationFailed`].
pub async fn recognize_pdf(
    path: impl AsRef<Path>,
    page_number: usize,
    config: &ExtractionConfig,
) -> Result<PipelineResult, ExtractError> {
    let document = loader::load_document(path.as_ref(), Some("application/pdf"))?;
    info!(path = %document.path.display(), page = page_number, "recognizing PDF page");

    let Some(engine) = resolve_engine(config) else {
        warn!("no engine client available; returning degraded result");
        return Ok(PipelineResult::not_configured());
    };

    match raster::rasterize(&document.path, page_number, config).await? {
        RasterOutcome::EmbeddedText(text) => {
            let cleaned = normalize::clean(&text);
            let invoice_data = extract::extract(&engine, &cleaned, config).await;
            Ok(assemble::from_embedded_text(cleaned, invoice_data))
        }
        RasterOutcome::Image(image_path) => {
            let sources = RecognitionSources {
                primary: encode::document_source(&document).await?,
                fallback_image: Some(encode::image_attachment(&image_path).await?),
            };
            Ok(run(&engine, &sources, config).await)
        }
    }
}

/// Blocking wrapper around [`recognize_image`] for synchronous callers.
pub fn recognize_image_sync(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<PipelineResult, ExtractError> {
    runtime()?.block_on(recognize_image(path, config))
}

/// Blocking wrapper around [`recognize_pdf`] for synchronous callers.
pub fn recognize_pdf_sync(
    path: impl AsRef<Path>,
    page_number: usize,
    config: &ExtractionConfig,
) -> Result<PipelineResult, ExtractError> {
    runtime()?.block_on(recognize_pdf(path, page_number, config))
}

fn runtime() -> Result<tokio::runtime::Runtime, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("failed to create tokio runtime: {e}")))
}

/// Injected client first, then the process environment.
fn resolve_engine(config: &ExtractionConfig) -> Option<Arc<dyn EngineClient>> {
    if let Some(engine) = &config.engine {
        return Some(Arc::clone(engine));
    }
    MistralEngine::from_env().map(|e| Arc::new(e) as Arc<dyn EngineClient>)
}

/// Shared tail of both entry points: recognize, clean, structure, assemble.
async fn run(
    engine: &Arc<dyn EngineClient>,
    sources: &RecognitionSources,
    config: &ExtractionConfig,
) -> PipelineResult {
    let recognition = ocr::recognize(engine, sources, config).await;
    let cleaned = normalize::clean(&recognition.text());
    let invoice_data = extract::extract(engine, &cleaned, config).await;
    assemble::from_recognition(engine.name(), &recognition, cleaned, invoice_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let config = ExtractionConfig::default();
        let err = recognize_image("/no/such/receipt.jpg", &config).await;
        assert!(matches!(err, Err(ExtractError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn missing_pdf_is_fatal() {
        let config = ExtractionConfig::default();
        let err = recognize_pdf("/no/such/invoice.pdf", 1, &config).await;
        assert!(matches!(err, Err(ExtractError::FileNotFound { .. })));
    }
}
