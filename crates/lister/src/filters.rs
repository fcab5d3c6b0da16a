use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::entry::FileEntry;
use crate::error::ScanError;

pub const MIN_DEPTH: usize = 1;
pub const MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Modified,
    Type,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Size => "size",
            Self::Modified => "modified",
            Self::Type => "type",
        }
    }

    /// Ascending comparison under this key. Ties are left to the caller's stable sort.
    pub fn compare(self, a: &FileEntry, b: &FileEntry) -> Ordering {
        match self {
            Self::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
            Self::Size => a.size_bytes.cmp(&b.size_bytes),
            Self::Modified => a.modified_time.total_cmp(&b.modified_time),
            Self::Type => b
                .is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.extension.cmp(&b.extension)),
        }
    }
}

impl FromStr for SortKey {
    type Err = ScanError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "size" => Ok(Self::Size),
            "modified" | "mtime" => Ok(Self::Modified),
            "type" | "kind" => Ok(Self::Type),
            other => Err(ScanError::InvalidArgument(format!(
                "unknown sort key '{other}' (expected name, size, modified or type)"
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ScanError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(ScanError::InvalidArgument(format!(
                "unknown sort order '{other}' (expected asc or desc)"
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Walk and ordering configuration for one call. Built once at the boundary, read-only after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFilters {
    max_depth: usize,
    include_hidden: bool,
    file_types: BTreeSet<String>,
    sort_by: SortKey,
    sort_order: SortOrder,
}

impl Default for ScanFilters {
    fn default() -> Self {
        Self {
            max_depth: MIN_DEPTH,
            include_hidden: false,
            file_types: BTreeSet::new(),
            sort_by: SortKey::Name,
            sort_order: SortOrder::Asc,
        }
    }
}

impl ScanFilters {
    pub fn new<I, S>(
        max_depth: usize,
        include_hidden: bool,
        file_types: I,
        sort_by: SortKey,
        sort_order: SortOrder,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            max_depth: max_depth.clamp(MIN_DEPTH, MAX_DEPTH),
            include_hidden,
            file_types: file_types
                .into_iter()
                .filter_map(|raw| normalize_extension(raw.as_ref()))
                .collect(),
            sort_by,
            sort_order,
        }
    }

    /// Parses the loosely-typed values a tool call carries.
    pub fn parse(
        max_depth: Option<usize>,
        include_hidden: Option<bool>,
        file_types: &[String],
        sort_by: Option<&str>,
        sort_order: Option<&str>,
    ) -> Result<Self, ScanError> {
        let sort_by = match sort_by.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse()?,
            None => SortKey::default(),
        };
        let sort_order = match sort_order.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse()?,
            None => SortOrder::default(),
        };
        Ok(Self::new(
            max_depth.unwrap_or(MIN_DEPTH),
            include_hidden.unwrap_or(false),
            file_types,
            sort_by,
            sort_order,
        ))
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn include_hidden(&self) -> bool {
        self.include_hidden
    }

    pub fn file_types(&self) -> &BTreeSet<String> {
        &self.file_types
    }

    pub fn sort_by(&self) -> SortKey {
        self.sort_by
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Directories never reach this check; only files are subject to the allowlist.
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.file_types.is_empty() || self.file_types.contains(extension)
    }

    pub fn compare(&self, a: &FileEntry, b: &FileEntry) -> Ordering {
        self.sort_order.apply(self.sort_by.compare(a, b))
    }

    /// Canonical text form, stable across argument spelling differences.
    pub fn fingerprint(&self) -> String {
        let types: Vec<&str> = self.file_types.iter().map(String::as_str).collect();
        format!(
            "depth={};hidden={};types={};sort={};order={}",
            self.max_depth,
            self.include_hidden,
            types.join(","),
            self.sort_by,
            self.sort_order
        )
    }
}

fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('*').trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase())
}
