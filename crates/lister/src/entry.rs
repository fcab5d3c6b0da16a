use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use std::time::UNIX_EPOCH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One filesystem child of a scan root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    /// Path relative to the scan root, `/`-separated on every platform.
    pub relative_path: String,
    pub is_file: bool,
    pub is_directory: bool,
    /// Always 0 for directories.
    pub size_bytes: u64,
    /// Seconds since the Unix epoch.
    pub modified_time: f64,
    /// Lower-cased, without the leading dot. Empty for directories.
    pub extension: String,
}

impl FileEntry {
    pub fn kind(&self) -> EntryKind {
        if self.is_directory {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }
}

/// Stats `path` and describes it relative to `root`.
///
/// Returns `None` when the entry vanished or cannot be stat-ed between listing and probing; a
/// walk drops such entries instead of failing.
pub fn probe(root: &Path, path: &Path) -> Option<FileEntry> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) => {
            log::debug!("Skipping {}: {err}", path.display());
            return None;
        }
    };

    let name = path.file_name()?.to_string_lossy().into_owned();
    let relative_path = relative_display(root, path)?;
    let is_directory = metadata.is_dir();
    let modified_time = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0.0, |d| d.as_secs_f64());

    let (size_bytes, extension) = if is_directory {
        (0, String::new())
    } else {
        (metadata.len(), extension_of(&name))
    };

    Some(FileEntry {
        name,
        relative_path,
        is_file: !is_directory,
        is_directory,
        size_bytes,
        modified_time,
        extension,
    })
}

pub(crate) fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn relative_display(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
