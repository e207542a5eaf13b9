use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::FileError;
use crate::paths::{self, DELETABLE_DIRS, FILE_DIRS};

/// Metadata for one directory entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileStat {
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub is_directory: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Listing {
    pub dir: String,
    pub files: Vec<FileStat>,
    pub total: usize,
}

/// List the visible entries of one of the `FILE_DIRS`, creating it if missing.
pub async fn list_dir(root: &Path, dir: &str) -> Result<Listing, FileError> {
    let dir = paths::validate_dir_name(dir, FILE_DIRS)
        .ok_or_else(|| FileError::InvalidDirectory(dir.to_string()))?;
    let dir_path = root.join(dir);

    tokio::fs::create_dir_all(&dir_path)
        .await
        .map_err(|e| FileError::io(&dir_path, e))?;

    let mut entries = tokio::fs::read_dir(&dir_path)
        .await
        .map_err(|e| FileError::io(&dir_path, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| FileError::io(&dir_path, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        // Entries can vanish between readdir and stat.
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        files.push(FileStat {
            name,
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            is_directory: meta.is_dir(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::debug!(dir, count = files.len(), "listed directory");
    Ok(Listing {
        dir: dir.to_string(),
        total: files.len(),
        files,
    })
}

/// Delete a single file from one of the `DELETABLE_DIRS`.
pub async fn delete_file(root: &Path, dir: &str, filename: &str) -> Result<(), FileError> {
    let known = paths::validate_dir_name(dir, FILE_DIRS)
        .ok_or_else(|| FileError::InvalidDirectory(dir.to_string()))?;
    let dir = paths::validate_dir_name(known, DELETABLE_DIRS)
        .ok_or_else(|| FileError::DeleteForbidden(known.to_string()))?;
    if !paths::is_plain_filename(filename) {
        return Err(FileError::InvalidFilename(filename.to_string()));
    }

    let path = root.join(dir).join(filename);
    let meta = match tokio::fs::symlink_metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FileError::NotFound(format!("{}/{}", dir, filename)));
        }
        Err(e) => return Err(FileError::io(&path, e)),
    };
    if meta.is_dir() {
        return Err(FileError::IsDirectory(format!("{}/{}", dir, filename)));
    }

    tokio::fs::remove_file(&path)
        .await
        .map_err(|e| FileError::io(&path, e))?;
    tracing::info!(dir, filename, "deleted file");
    Ok(())
}
