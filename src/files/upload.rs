use std::path::Path;

use serde::Serialize;

use crate::errors::FileError;
use crate::paths::{self, CORPUS_DIR};

/// Every PDF starts with this header.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoredUpload {
    pub success: bool,
    pub filename: String,
    pub size: u64,
}

pub(crate) fn has_pdf_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// True when `bytes` starts with the PDF header.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Store an uploaded PDF in the corpus under a sanitized name.
///
/// An existing file with the same name is replaced.
pub async fn store_upload(
    root: &Path,
    original_name: &str,
    bytes: &[u8],
    max_bytes: u64,
) -> Result<StoredUpload, FileError> {
    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(FileError::TooLarge {
            size,
            max: max_bytes,
        });
    }

    let filename = paths::sanitize_filename(original_name)
        .ok_or_else(|| FileError::InvalidFilename(original_name.to_string()))?;
    if !has_pdf_extension(&filename) || !looks_like_pdf(bytes) {
        return Err(FileError::NotPdf);
    }

    let corpus = root.join(CORPUS_DIR);
    tokio::fs::create_dir_all(&corpus)
        .await
        .map_err(|e| FileError::io(&corpus, e))?;

    let path = corpus.join(&filename);
    super::write_atomic(&path, bytes)
        .await
        .map_err(|e| FileError::io(&path, e))?;

    tracing::info!(filename = %filename, size, "stored corpus upload");
    Ok(StoredUpload {
        success: true,
        filename,
        size,
    })
}
