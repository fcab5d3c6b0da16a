//! # Dirscope Lister
//!
//! Bounded, paginated directory enumeration.
//!
//! ## Pipeline
//!
//! ```text
//! Directory argument
//!     │
//!     ├──> Path resolution (quotes, ~, canonical form)
//!     │
//!     ├──> Bounded walker (depth 1..=3, hidden + extension filters)
//!     │      └─> FileEntry stream
//!     │
//!     ├──> Memory governor (RSS checkpoints, optional deadline)
//!     │
//!     ├──> Pagination engine (sort, summarize, window)
//!     │      └─> Batch + ScanSummary ──> Result cache (TTL, optional disk)
//!     │
//!     └──> Session registry (pull-based cursors for streaming)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use dirscope_lister::{EngineConfig, Lister, ScanFilters, ScanRequest};
//!
//! fn main() -> dirscope_lister::Result<()> {
//!     let lister = Lister::new(EngineConfig::default());
//!     let filters = ScanFilters::parse(Some(2), None, &[], Some("size"), Some("desc"))?;
//!     let response = lister.scan(&ScanRequest::new("/var/log", filters))?;
//!
//!     println!(
//!         "{} of {} entries",
//!         response.batch.entries.len(),
//!         response.batch.total_count
//!     );
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod engine;
mod entry;
mod error;
mod filters;
mod governor;
mod pagination;
mod paths;
mod session;
mod walker;

pub use cache::{CacheKey, CacheRecord, ResultCache, DEFAULT_CACHE_TTL};
pub use config::{
    default_cache_dir, EngineConfig, DEFAULT_METADATA_MEMORY_MB, DEFAULT_SCAN_MEMORY_MB,
    DEFAULT_STREAM_MEMORY_MB,
};
pub use engine::{
    Lister, MetadataBatch, MetadataEntry, MetadataScanResponse, PaginationInfo, ScanRequest,
    ScanResponse, StreamOpened,
};
pub use entry::{probe, EntryKind, FileEntry};
pub use error::{Result, ScanError};
pub use filters::{ScanFilters, SortKey, SortOrder, MAX_DEPTH, MIN_DEPTH};
pub use governor::{
    AbortReason, Checkpoint, MemoryGovernor, MemoryProbe, ProcessMemoryProbe,
    DEFAULT_CHECKPOINT_EVERY,
};
pub use pagination::{
    materialize, summarize, window, Batch, PaginationEngine, PaginationPlan, ScanOutcome,
    ScanSummary,
};
pub use paths::{normalize_directory_arg, resolve_directory};
pub use session::{
    SessionConfig, SessionRegistry, StreamBatch, StreamSession, StreamStopped,
    DEFAULT_SESSION_IDLE_TTL, DEFAULT_TOMBSTONE_TTL,
};
pub use walker::{BoundedWalker, Walk};
