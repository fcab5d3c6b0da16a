use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::entry::{probe, FileEntry};
use crate::error::{Result, ScanError};
use crate::filters::ScanFilters;
use crate::paths::ensure_directory;

const HIDDEN_MARKER: char = '.';

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with(HIDDEN_MARKER)
}

/// Produces bounded traversals of one root directory.
#[derive(Debug, Clone)]
pub struct BoundedWalker {
    root: PathBuf,
    filters: ScanFilters,
}

impl BoundedWalker {
    pub fn new(root: impl AsRef<Path>, filters: ScanFilters) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            filters,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filters(&self) -> &ScanFilters {
        &self.filters
    }

    /// Starts a fresh traversal. A missing or unreadable root is an error here, never an empty
    /// walk.
    pub fn walk(&self) -> Result<Walk> {
        ensure_directory(&self.root)?;

        let source = if self.filters.max_depth() == 1 {
            let listing =
                fs::read_dir(&self.root).map_err(|err| ScanError::from_root_io(&self.root, err))?;
            Source::Listing(listing)
        } else {
            // Surface a root-level permission failure up front; walkdir would only report it
            // as a per-entry error.
            fs::read_dir(&self.root).map_err(|err| ScanError::from_root_io(&self.root, err))?;
            let descent = WalkDir::new(&self.root)
                .min_depth(1)
                .max_depth(self.filters.max_depth())
                // Entries are probed through their links, so descent follows them too.
                // walkdir reports link cycles as per-entry errors.
                .follow_links(true)
                .sort_by_file_name()
                .into_iter();
            Source::Descent(descent)
        };

        Ok(Walk {
            root: self.root.clone(),
            filters: self.filters.clone(),
            source,
            yielded: 0,
        })
    }
}

enum Source {
    /// Immediate children only.
    Listing(fs::ReadDir),
    Descent(walkdir::IntoIter),
}

/// A lazy, finite traversal. Not rewindable: call [`BoundedWalker::walk`] again to restart.
pub struct Walk {
    root: PathBuf,
    filters: ScanFilters,
    source: Source,
    yielded: usize,
}

impl Walk {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries_yielded(&self) -> usize {
        self.yielded
    }

    fn next_path(&mut self) -> Option<PathBuf> {
        let include_hidden = self.filters.include_hidden();
        loop {
            match &mut self.source {
                Source::Listing(listing) => match listing.next()? {
                    Ok(entry) => {
                        if !include_hidden && is_hidden(&entry.file_name()) {
                            continue;
                        }
                        return Some(entry.path());
                    }
                    Err(err) => {
                        log::debug!("Skipping unreadable entry in {}: {err}", self.root.display());
                    }
                },
                Source::Descent(descent) => match descent.next()? {
                    Ok(entry) => {
                        if !include_hidden && is_hidden(entry.file_name()) {
                            if entry.file_type().is_dir() {
                                descent.skip_current_dir();
                            }
                            continue;
                        }
                        return Some(entry.into_path());
                    }
                    Err(err) => {
                        log::debug!("Skipping unreadable entry in {}: {err}", self.root.display());
                    }
                },
            }
        }
    }
}

impl Iterator for Walk {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        loop {
            let path = self.next_path()?;
            let Some(entry) = probe(&self.root, &path) else {
                continue;
            };
            if entry.is_file && !self.filters.allows_extension(&entry.extension) {
                continue;
            }
            self.yielded += 1;
            return Some(entry);
        }
    }
}
