use dirscope_lister::{ScanFilters, ScanRequest};
use rmcp::schemars;
use serde::Deserialize;

use super::{clamp_batch_size, clamp_depth, clamp_offset};

/// Arguments shared by `scan` and `scan_metadata_only`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanToolRequest {
    /// Directory to list
    #[schemars(
        description = "Directory to list: absolute, relative to the server working directory, or ~-prefixed. Stray surrounding quotes are ignored."
    )]
    pub directory: String,

    #[schemars(description = "Entries per batch (default 20, clamped to 5..=50).")]
    pub batch_size: Option<i64>,

    #[schemars(
        description = "Index of the first entry to return (default 0). Use nextOffset from the previous batch."
    )]
    pub offset: Option<i64>,

    #[schemars(description = "Descent depth; 1 lists immediate children only (default 1, max 3).")]
    pub max_depth: Option<i64>,

    #[schemars(description = "Include dot-prefixed entries (default false).")]
    pub include_hidden: Option<bool>,

    #[schemars(
        description = "Extension allowlist for files, e.g. [\"rs\", \".md\"]. Directories are always listed."
    )]
    pub file_types: Option<Vec<String>>,

    #[schemars(description = "Sort key: 'name' (default), 'size', 'modified' or 'type'.")]
    pub sort_by: Option<String>,

    #[schemars(description = "Sort order: 'asc' (default) or 'desc'.")]
    pub sort_order: Option<String>,

    #[schemars(description = "Serve a fresh cached result when available (default true).")]
    pub use_cache: Option<bool>,

    #[schemars(
        description = "Override the memory budget in MB for this call. Scans abort with memory_budget_exceeded past it."
    )]
    pub memory_limit_mb: Option<f64>,
}

impl ScanToolRequest {
    pub(in crate::tools) fn into_scan_request(self) -> dirscope_lister::Result<ScanRequest> {
        let filters = ScanFilters::parse(
            Some(clamp_depth(self.max_depth)),
            self.include_hidden,
            self.file_types.as_deref().unwrap_or_default(),
            self.sort_by.as_deref(),
            self.sort_order.as_deref(),
        )?;
        Ok(ScanRequest {
            directory: self.directory,
            filters,
            batch_size: clamp_batch_size(self.batch_size),
            offset: clamp_offset(self.offset),
            use_cache: self.use_cache.unwrap_or(true),
            memory_limit_mb: self.memory_limit_mb,
        })
    }
}
