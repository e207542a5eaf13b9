//! Filesystem operations behind the dashboard API.
//!
//! | Module    | Responsibility                                           |
//! |-----------|----------------------------------------------------------|
//! | `listing` | Enumerate and delete files in well-known directories     |
//! | `upload`  | Store uploaded PDFs in the corpus after magic-byte checks |
//! | `content` | Read and write small text files with size caps           |
//!
//! Every entry point takes the project root explicitly and validates paths
//! through `crate::paths` before touching the disk.

pub mod content;
pub mod listing;
pub mod upload;

use std::path::Path;

pub use content::{Content, ContentLimits, read_content, read_readme, read_text, write_content};
pub use listing::{FileStat, Listing, delete_file, list_dir};
pub use upload::{PDF_MAGIC, StoredUpload, store_upload};

/// Number of `.pdf` files directly inside `dir`; 0 when it does not exist.
pub fn count_pdfs(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| upload::has_pdf_extension(&e.file_name().to_string_lossy()))
        .count()
}

/// Write `bytes` to a temporary sibling of `path` and rename it into place.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
