use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::entry::FileEntry;
use crate::error::{Result, ScanError};
use crate::filters::ScanFilters;
use crate::governor::{AbortReason, Checkpoint, MemoryGovernor};
use crate::walker::{BoundedWalker, Walk};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A window into a sorted listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub entries: Vec<FileEntry>,
    pub offset: usize,
    pub limit: usize,
    pub total_count: usize,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}

/// Aggregates over the whole walk, not just the returned window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub total_files: usize,
    pub total_directories: usize,
    pub total_size_mb: f64,
    /// Directories are counted under the empty extension.
    pub extension_counts: BTreeMap<String, usize>,
    pub processing_time_secs: f64,
    pub memory_delta_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub batch: Batch,
    pub summary: ScanSummary,
}

/// Offsets a caller needs to visit every batch of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationPlan {
    pub total_files: usize,
    pub total_directories: usize,
    pub total_items: usize,
    pub batch_size: usize,
    pub total_batches: usize,
    pub batch_offsets: Vec<usize>,
}

impl PaginationPlan {
    pub fn from_summary(summary: &ScanSummary, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        let total_items = summary.total_files + summary.total_directories;
        let batch_offsets: Vec<usize> = (0..total_items).step_by(batch_size).collect();
        Self {
            total_files: summary.total_files,
            total_directories: summary.total_directories,
            total_items,
            batch_size,
            total_batches: batch_offsets.len(),
            batch_offsets,
        }
    }
}

/// Materializes a governed walk, sorts it and cuts out one window.
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    governor: MemoryGovernor,
}

impl PaginationEngine {
    pub fn new(governor: MemoryGovernor) -> Self {
        Self { governor }
    }

    pub fn governor(&self) -> &MemoryGovernor {
        &self.governor
    }

    pub fn scan(
        &self,
        root: &Path,
        filters: &ScanFilters,
        batch_size: usize,
        offset: usize,
    ) -> Result<ScanOutcome> {
        let started = Instant::now();
        let baseline = self.governor.sample();

        let walk = BoundedWalker::new(root, filters.clone()).walk()?;
        let mut entries = materialize(walk, &self.governor, baseline)?;
        entries.sort_by(|a, b| filters.compare(a, b));

        let summary = summarize(
            &entries,
            started.elapsed(),
            self.governor.delta_mb(baseline),
        );
        let batch = window(entries, batch_size, offset);
        Ok(ScanOutcome { batch, summary })
    }
}

/// Drains `walk`, consulting the governor at its cadence.
pub fn materialize(
    walk: Walk,
    governor: &MemoryGovernor,
    baseline_mb: Option<f64>,
) -> Result<Vec<FileEntry>> {
    let root = walk.root().to_path_buf();
    let mut entries = Vec::new();
    for entry in walk {
        entries.push(entry);
        if !governor.is_due(entries.len()) {
            continue;
        }
        match governor.checkpoint(baseline_mb) {
            Checkpoint::Continue => {}
            Checkpoint::Abort(AbortReason::MemoryBudget { used_mb, budget_mb }) => {
                log::warn!(
                    "Scan of {} aborted: {used_mb:.1} MB over baseline exceeds {budget_mb:.1} MB budget after {} entries",
                    root.display(),
                    entries.len()
                );
                return Err(ScanError::MemoryBudgetExceeded {
                    entries_processed: entries.len(),
                    used_mb,
                    budget_mb,
                });
            }
            Checkpoint::Abort(AbortReason::Deadline) => {
                log::warn!(
                    "Scan of {} hit its deadline after {} entries",
                    root.display(),
                    entries.len()
                );
                return Err(ScanError::DeadlineExceeded {
                    entries_processed: entries.len(),
                });
            }
        }
    }
    Ok(entries)
}

/// Cuts `[offset, offset + batch_size)` out of a sorted listing, clamping `offset`.
pub fn window(mut entries: Vec<FileEntry>, batch_size: usize, offset: usize) -> Batch {
    let limit = batch_size.max(1);
    let total_count = entries.len();
    let offset = offset.min(total_count);
    let end = offset.saturating_add(limit).min(total_count);

    entries.truncate(end);
    let page: Vec<FileEntry> = entries.drain(offset..).collect();
    let has_more = end < total_count;

    Batch {
        entries: page,
        offset,
        limit,
        total_count,
        has_more,
        next_offset: has_more.then_some(end),
    }
}

pub fn summarize(entries: &[FileEntry], elapsed: Duration, memory_delta_mb: f64) -> ScanSummary {
    let mut total_files = 0usize;
    let mut total_directories = 0usize;
    let mut total_bytes = 0u64;
    let mut extension_counts: BTreeMap<String, usize> = BTreeMap::new();

    for entry in entries {
        if entry.is_directory {
            total_directories += 1;
        } else {
            total_files += 1;
            total_bytes = total_bytes.saturating_add(entry.size_bytes);
        }
        *extension_counts.entry(entry.extension.clone()).or_insert(0) += 1;
    }

    ScanSummary {
        total_files,
        total_directories,
        total_size_mb: round_to(total_bytes as f64 / BYTES_PER_MB, 2),
        extension_counts,
        processing_time_secs: round_to(elapsed.as_secs_f64(), 3),
        memory_delta_mb: round_to(memory_delta_mb, 2),
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
