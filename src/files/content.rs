use std::path::Path;

use serde::Serialize;

use crate::config::LimitsSection;
use crate::errors::FileError;
use crate::paths::{self, CONTENT_READ_DIRS, CONTENT_WRITE_DIRS};

/// Project documentation shown on the dashboard's docs page.
pub const README_FILE: &str = "README.md";

/// Size caps for the content API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLimits {
    pub max_content_bytes: u64,
    pub max_path_length: usize,
}

impl From<&LimitsSection> for ContentLimits {
    fn from(limits: &LimitsSection) -> Self {
        Self {
            max_content_bytes: limits.max_content_bytes,
            max_path_length: limits.max_path_length,
        }
    }
}

impl Default for ContentLimits {
    fn default() -> Self {
        (&LimitsSection::default()).into()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Content {
    pub content: String,
    pub path: String,
}

/// Read a text file from one of the `CONTENT_READ_DIRS`.
pub async fn read_content(
    root: &Path,
    relative: &str,
    limits: ContentLimits,
) -> Result<Content, FileError> {
    read_text(root, relative, CONTENT_READ_DIRS, limits).await
}

/// Read a text file from any of `allowed_dirs`, enforcing the size cap.
pub async fn read_text(
    root: &Path,
    relative: &str,
    allowed_dirs: &[&str],
    limits: ContentLimits,
) -> Result<Content, FileError> {
    let validated = paths::validate_path(relative, allowed_dirs, root, limits.max_path_length)?;
    read_file(&validated.full, validated.relative, limits.max_content_bytes).await
}

/// Read the project's `README.md` for the documentation page.
pub async fn read_readme(root: &Path, limits: ContentLimits) -> Result<Content, FileError> {
    read_file(
        &root.join(README_FILE),
        README_FILE.to_string(),
        limits.max_content_bytes,
    )
    .await
}

async fn read_file(full: &Path, relative: String, max_bytes: u64) -> Result<Content, FileError> {
    let meta = match tokio::fs::metadata(full).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FileError::NotFound(relative));
        }
        Err(e) => return Err(FileError::io(full, e)),
    };
    if meta.is_dir() {
        return Err(FileError::IsDirectory(relative));
    }
    if meta.len() > max_bytes {
        return Err(FileError::TooLarge {
            size: meta.len(),
            max: max_bytes,
        });
    }

    let bytes = tokio::fs::read(full)
        .await
        .map_err(|e| FileError::io(full, e))?;
    let content = String::from_utf8(bytes).map_err(|_| FileError::NotText(relative.clone()))?;

    Ok(Content {
        content,
        path: relative,
    })
}

/// Write a text file into one of the `CONTENT_WRITE_DIRS`, creating parents.
pub async fn write_content(
    root: &Path,
    relative: &str,
    content: &str,
    limits: ContentLimits,
) -> Result<String, FileError> {
    let size = content.len() as u64;
    if size > limits.max_content_bytes {
        return Err(FileError::TooLarge {
            size,
            max: limits.max_content_bytes,
        });
    }

    let validated =
        paths::validate_path(relative, CONTENT_WRITE_DIRS, root, limits.max_path_length)?;
    if let Some(parent) = validated.full.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FileError::io(parent, e))?;
    }
    if tokio::fs::metadata(&validated.full)
        .await
        .is_ok_and(|m| m.is_dir())
    {
        return Err(FileError::IsDirectory(validated.relative));
    }

    super::write_atomic(&validated.full, content.as_bytes())
        .await
        .map_err(|e| FileError::io(&validated.full, e))?;

    tracing::info!(path = %validated.relative, bytes = size, "wrote content");
    Ok(validated.relative)
}
