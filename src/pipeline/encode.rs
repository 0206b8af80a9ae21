//! Encoding: file bytes → base64 data URLs and image attachments.
//!
//! The engine APIs accept documents as MIME-tagged base64 data URLs embedded
//! in the JSON request body, so the whole file is read and encoded in one
//! pass. Nothing here re-compresses or resizes — the bytes on disk are what
//! the engine sees.

use crate::engine::{DocumentSource, ImageData};
use crate::error::ExtractError;
use crate::pipeline::loader::{mime_from_extension, Document};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// Encode a loaded document as the source for the primary recognition call.
///
/// PDFs become `document_url` sources, everything else `image_url`.
pub async fn document_source(document: &Document) -> Result<DocumentSource, ExtractError> {
    let url = data_url(&document.path, &document.mime_type).await?;
    if document.is_pdf() {
        Ok(DocumentSource::DocumentUrl(url))
    } else {
        Ok(DocumentSource::ImageUrl(url))
    }
}

/// Encode an image file as a chat attachment for the fallback path.
pub async fn image_attachment(path: &Path) -> Result<ImageData, ExtractError> {
    let mime = mime_from_extension(path).unwrap_or("image/png");
    let bytes = read_bytes(path).await?;
    let b64 = STANDARD.encode(&bytes);
    debug!(path = %path.display(), b64_len = b64.len(), "encoded image attachment");
    Ok(ImageData::new(b64, mime))
}

/// Read a file and render it as a `data:` URL.
pub async fn data_url(path: &Path, mime_type: &str) -> Result<String, ExtractError> {
    let bytes = read_bytes(path).await?;
    let b64 = STANDARD.encode(&bytes);
    debug!(path = %path.display(), b64_len = b64.len(), "encoded data URL");
    Ok(format!("data:{mime_type};base64,{b64}"))
}

async fn read_bytes(path: &Path) -> Result<Vec<u8>, ExtractError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ExtractError::Unreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn data_url_has_mime_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("r.png");
        std::fs::File::create(&file)
            .unwrap()
            .write_all(b"pixels")
            .unwrap();

        let url = data_url(&file, "image/png").await.unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let b64 = url.rsplit(',').next().unwrap();
        assert_eq!(STANDARD.decode(b64).unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn pdf_document_becomes_document_url() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("inv.pdf");
        std::fs::File::create(&file)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();

        let doc = crate::pipeline::loader::load_document(&file, None).unwrap();
        let source = document_source(&doc).await.unwrap();
        assert!(matches!(source, DocumentSource::DocumentUrl(_)));
    }

    #[tokio::test]
    async fn image_attachment_uses_extension_mime() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("page.jpg");
        std::fs::File::create(&file)
            .unwrap()
            .write_all(b"jfif")
            .unwrap();

        let img = image_attachment(&file).await.unwrap();
        assert_eq!(img.mime_type, "image/jpeg");
    }
}
