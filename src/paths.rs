//! Confinement of user-supplied paths to the project's well-known directories.
//!
//! Every path that reaches the filesystem from an HTTP request goes through
//! [`validate_path`] (relative paths) or [`validate_dir_name`] (bare directory
//! names). Traversal components are rejected outright rather than stripped.

use std::path::{Path, PathBuf};

use crate::errors::PathError;

/// Default maximum length of a user-supplied path, in bytes.
pub const MAX_PATH_LENGTH: usize = 500;

pub const CORPUS_DIR: &str = "corpus";
pub const OUTPUTS_DIR: &str = "outputs";
pub const PROMPTS_DIR: &str = "prompts";
pub const QUICK_START_DIR: &str = "quick-start";
pub const SETTINGS_DIR: &str = "settings";
pub const TEMPLATE_DIR: &str = "template";

/// Every directory `init` creates below the project root.
pub const PROJECT_DIRS: &[&str] = &[
    CORPUS_DIR,
    OUTPUTS_DIR,
    PROMPTS_DIR,
    QUICK_START_DIR,
    SETTINGS_DIR,
    TEMPLATE_DIR,
];

/// Directories whose contents may be listed.
pub const FILE_DIRS: &[&str] = &[CORPUS_DIR, OUTPUTS_DIR, PROMPTS_DIR, SETTINGS_DIR, TEMPLATE_DIR];

/// Directories whose files may be deleted.
pub const DELETABLE_DIRS: &[&str] = &[CORPUS_DIR];

/// Directories readable through the content API.
pub const CONTENT_READ_DIRS: &[&str] = &[
    PROMPTS_DIR,
    QUICK_START_DIR,
    SETTINGS_DIR,
    OUTPUTS_DIR,
    TEMPLATE_DIR,
];

/// Directories writable through the content API.
pub const CONTENT_WRITE_DIRS: &[&str] = &[SETTINGS_DIR];

/// Directories an agent prompt may be loaded from.
pub const PROMPT_DIRS: &[&str] = &[PROMPTS_DIR, QUICK_START_DIR];

/// A path that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath {
    /// The allow-list entry the path lives under.
    pub dir: String,
    /// Normalized, `/`-separated form relative to the project root.
    pub relative: String,
    /// Absolute location on disk.
    pub full: PathBuf,
}

/// Validate `relative` against `allowed_dirs` below `root`.
pub fn validate_path(
    relative: &str,
    allowed_dirs: &[&str],
    root: &Path,
    max_len: usize,
) -> Result<ValidatedPath, PathError> {
    let trimmed = relative.trim();
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }
    if trimmed.len() > max_len {
        return Err(PathError::TooLong {
            len: trimmed.len(),
            max: max_len,
        });
    }
    if trimmed.contains('\0') {
        return Err(PathError::InvalidCharacter);
    }
    if is_absolute(trimmed) {
        return Err(PathError::Absolute);
    }

    let mut components = Vec::new();
    for part in trimmed.split(['/', '\\']) {
        match part {
            "" | "." => continue,
            ".." => return Err(PathError::Traversal),
            other => components.push(other),
        }
    }

    let first = components.first().copied().ok_or(PathError::Empty)?;
    let dir = allowed_dirs
        .iter()
        .find(|d| **d == first)
        .ok_or_else(|| PathError::NotAllowed {
            root: first.to_string(),
        })?;
    if components.len() < 2 {
        return Err(PathError::NoEntry {
            dir: dir.to_string(),
        });
    }

    let full = components.iter().fold(root.to_path_buf(), |acc, c| acc.join(c));
    ensure_within(&full, &root.join(dir))?;

    Ok(ValidatedPath {
        dir: dir.to_string(),
        relative: components.join("/"),
        full,
    })
}

/// Accept `name` only when it is exactly one of `allowed`.
pub fn validate_dir_name<'a>(name: &str, allowed: &[&'a str]) -> Option<&'a str> {
    allowed.iter().copied().find(|d| *d == name)
}

/// Reduce an uploaded file name to a safe basename.
///
/// Characters outside `[A-Za-z0-9._-]` become `_` and leading dots are
/// dropped so the result can never be hidden or empty.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let mapped: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = mapped.trim_start_matches('.');
    if cleaned.chars().all(|c| c == '_' || c == '.') {
        return None;
    }
    Some(cleaned.to_string())
}

/// True when `name` is a plain, visible file name with no path syntax.
pub fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

fn is_absolute(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Reject paths whose deepest existing ancestor resolves (through symlinks)
/// outside `allowed`.
fn ensure_within(full: &Path, allowed: &Path) -> Result<(), PathError> {
    let Ok(allowed_canonical) = allowed.canonicalize() else {
        // Nothing exists yet, so nothing can point elsewhere.
        return Ok(());
    };
    let existing = full.ancestors().find(|p| p.exists()).unwrap_or(full);
    let canonical = existing.canonicalize().map_err(|_| PathError::Escapes)?;
    if canonical.starts_with(&allowed_canonical) {
        Ok(())
    } else {
        Err(PathError::Escapes)
    }
}
