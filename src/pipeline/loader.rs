//! Document loader: resolve a path, validate it, infer the MIME type.
//!
//! Loader failures are the fatal kind — with no readable bytes there is
//! nothing to degrade to, so [`load_document`] returns `Err` instead of a
//! `success: false` result.

use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An input document, created per invocation and never deleted by this crate.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub mime_type: String,
    pub byte_size: u64,
}

impl Document {
    pub fn is_pdf(&self) -> bool {
        self.mime_type == "application/pdf"
    }
}

/// Map a file extension to a MIME type.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Resolve and validate an input document.
///
/// The declared MIME type (from upload metadata) wins over the extension;
/// with neither, images default to `image/jpeg` — the engine tolerates a
/// mislabeled image far better than the pipeline tolerates a hard error on
/// an odd extension.
pub fn load_document(
    path: impl AsRef<Path>,
    declared_mime: Option<&str>,
) -> Result<Document, ExtractError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ExtractError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let resolved = std::fs::canonicalize(path).map_err(|e| ExtractError::Unreadable {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    // Readability check up front; later stages assume open() succeeds.
    let metadata = std::fs::File::open(&resolved)
        .and_then(|f| f.metadata())
        .map_err(|e| ExtractError::Unreadable {
            path: resolved.clone(),
            detail: e.to_string(),
        })?;

    let mime_type = declared_mime
        .map(|m| m.to_string())
        .or_else(|| mime_from_extension(&resolved).map(|m| m.to_string()))
        .unwrap_or_else(|| "image/jpeg".to_string());

    debug!(
        path = %resolved.display(),
        mime = %mime_type,
        bytes = metadata.len(),
        "loaded document"
    );

    Ok(Document {
        path: resolved,
        mime_type,
        byte_size: metadata.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mime_mapping() {
        assert_eq!(mime_from_extension(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("a.png")), Some("image/png"));
        assert_eq!(mime_from_extension(Path::new("a.gif")), Some("image/gif"));
        assert_eq!(mime_from_extension(Path::new("a.webp")), Some("image/webp"));
        assert_eq!(
            mime_from_extension(Path::new("a.pdf")),
            Some("application/pdf")
        );
        assert_eq!(mime_from_extension(Path::new("a.txt")), None);
        assert_eq!(mime_from_extension(Path::new("noext")), None);
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = load_document("/definitely/not/here.png", None);
        assert!(matches!(err, Err(ExtractError::FileNotFound { .. })));
    }

    #[test]
    fn declared_mime_wins_over_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scan.png");
        std::fs::File::create(&file)
            .unwrap()
            .write_all(b"fake")
            .unwrap();

        let doc = load_document(&file, Some("image/webp")).unwrap();
        assert_eq!(doc.mime_type, "image/webp");
        assert_eq!(doc.byte_size, 4);
    }

    #[test]
    fn unknown_extension_defaults_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("upload.bin");
        std::fs::File::create(&file)
            .unwrap()
            .write_all(b"fake")
            .unwrap();

        let doc = load_document(&file, None).unwrap();
        assert_eq!(doc.mime_type, "image/jpeg");
    }

    #[test]
    fn pdf_detection() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.pdf");
        std::fs::File::create(&file)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();

        let doc = load_document(&file, None).unwrap();
        assert!(doc.is_pdf());
    }
}
