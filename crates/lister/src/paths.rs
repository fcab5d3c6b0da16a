use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScanError};

const WRAPPING_QUOTES: &[char] = &['"', '\'', '`'];

/// Strips whitespace and wrapping quote pairs from a directory argument.
///
/// Some callers hand over values such as `"'/srv/data'"`; without this the lookup fails and the
/// caller cannot tell that apart from an empty directory.
pub fn normalize_directory_arg(raw: &str) -> String {
    let mut value = raw.trim();
    loop {
        let Some(first) = value.chars().next() else {
            break;
        };
        if value.len() < 2 || !WRAPPING_QUOTES.contains(&first) || !value.ends_with(first) {
            break;
        }
        value = value[1..value.len() - 1].trim();
    }
    value.to_string()
}

fn expand_home(value: &str) -> PathBuf {
    if value == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(value)
}

/// Resolves a caller-supplied directory to a canonical, existing directory.
pub fn resolve_directory(raw: &str) -> Result<PathBuf> {
    let normalized = normalize_directory_arg(raw);
    if normalized.is_empty() {
        return Err(ScanError::InvalidArgument(
            "directory must not be empty".to_string(),
        ));
    }
    let candidate = expand_home(&normalized);
    let canonical = candidate
        .canonicalize()
        .map_err(|err| ScanError::from_root_io(&candidate, err))?;
    ensure_directory(&canonical)?;
    Ok(canonical)
}

pub(crate) fn ensure_directory(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|err| ScanError::from_root_io(path, err))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}
