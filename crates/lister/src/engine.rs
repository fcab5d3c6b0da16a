use dirscope_protocol::ToolNextAction;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheKey, CacheRecord, ResultCache};
use crate::config::EngineConfig;
use crate::entry::EntryKind;
use crate::error::{Result, ScanError};
use crate::filters::ScanFilters;
use crate::governor::{MemoryGovernor, MemoryProbe, ProcessMemoryProbe};
use crate::pagination::{Batch, PaginationEngine, PaginationPlan, ScanOutcome, ScanSummary};
use crate::paths::resolve_directory;
use crate::session::{SessionConfig, SessionRegistry, StreamBatch, StreamStopped};

/// Arguments of a one-shot scan, already defaulted and clamped by the caller.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub directory: String,
    pub filters: ScanFilters,
    pub batch_size: usize,
    pub offset: usize,
    pub use_cache: bool,
    /// Overrides the configured budget for this call.
    pub memory_limit_mb: Option<f64>,
}

impl ScanRequest {
    pub fn new(directory: impl Into<String>, filters: ScanFilters) -> Self {
        Self {
            directory: directory.into(),
            filters,
            batch_size: 20,
            offset: 0,
            use_cache: true,
            memory_limit_mb: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub batch: Batch,
    pub summary: ScanSummary,
    pub directory: String,
    pub filters: ScanFilters,
    pub cached: bool,
    /// Suggested follow-up calls. Left empty here; the tool layer fills it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<ToolNextAction>,
}

/// Entry shape that carries nothing a client could mistake for an openable path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size_bytes: u64,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataBatch {
    pub entries: Vec<MetadataEntry>,
    pub offset: usize,
    pub limit: usize,
    pub total_count: usize,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}

impl From<Batch> for MetadataBatch {
    fn from(batch: Batch) -> Self {
        Self {
            entries: batch
                .entries
                .into_iter()
                .map(|entry| MetadataEntry {
                    kind: entry.kind(),
                    name: entry.name,
                    size_bytes: entry.size_bytes,
                    extension: entry.extension,
                })
                .collect(),
            offset: batch.offset,
            limit: batch.limit,
            total_count: batch.total_count,
            has_more: batch.has_more,
            next_offset: batch.next_offset,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataScanResponse {
    pub batch: MetadataBatch,
    pub summary: ScanSummary,
    pub filters: ScanFilters,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub directory: String,
    #[serde(flatten)]
    pub plan: PaginationPlan,
}

/// A freshly opened stream: the canonical root it walks and its first batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOpened {
    pub directory: String,
    pub first_batch: StreamBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Full,
    MetadataOnly,
}

impl Variant {
    fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::MetadataOnly => "metadata",
        }
    }
}

/// The listing service: one result cache and one session registry per process, shared by every
/// caller through a reference.
pub struct Lister {
    config: EngineConfig,
    probe: Arc<dyn MemoryProbe>,
    cache: ResultCache,
    sessions: SessionRegistry,
}

impl Lister {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_memory_probe(config, Arc::new(ProcessMemoryProbe))
    }

    pub fn with_memory_probe(config: EngineConfig, probe: Arc<dyn MemoryProbe>) -> Self {
        let cache = match config.cache_dir.as_ref() {
            Some(dir) => ResultCache::persistent(config.cache_ttl, dir),
            None => ResultCache::in_memory(config.cache_ttl),
        };
        let sessions = SessionRegistry::new(
            SessionConfig {
                memory_budget_mb: config.stream_memory_mb,
                idle_ttl: config.stream_idle_ttl,
                ..SessionConfig::default()
            },
            MemoryGovernor::with_probe(config.stream_memory_mb, probe.clone())
                .checkpoint_every(config.checkpoint_every),
        );
        Self {
            config,
            probe,
            cache,
            sessions,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    fn governor(&self, budget_mb: f64) -> MemoryGovernor {
        MemoryGovernor::with_probe(budget_mb, self.probe.clone())
            .checkpoint_every(self.config.checkpoint_every)
            .deadline(self.config.scan_timeout.map(|timeout| Instant::now() + timeout))
    }

    fn budget_for(&self, variant: Variant, override_mb: Option<f64>) -> Result<f64> {
        match override_mb {
            Some(mb) if mb.is_finite() && mb > 0.0 => Ok(mb),
            Some(mb) => Err(ScanError::InvalidArgument(format!(
                "memory limit must be a positive number of MB (got {mb})"
            ))),
            None => Ok(match variant {
                Variant::Full => self.config.scan_memory_mb,
                Variant::MetadataOnly => self.config.metadata_memory_mb,
            }),
        }
    }

    fn run_scan(&self, request: &ScanRequest, variant: Variant) -> Result<(ScanOutcome, String, bool)> {
        let budget_mb = self.budget_for(variant, request.memory_limit_mb)?;
        let root = resolve_directory(&request.directory)?;
        let directory = root.to_string_lossy().into_owned();
        let key = CacheKey::for_scan(
            &root,
            &request.filters,
            request.batch_size,
            request.offset,
            variant.as_str(),
        );

        if request.use_cache {
            if let Some(record) = self.cache.get(&key) {
                log::debug!("Cache hit for {directory} (offset {})", request.offset);
                return Ok((record.outcome.clone(), directory, true));
            }
        }

        let outcome = PaginationEngine::new(self.governor(budget_mb)).scan(
            &root,
            &request.filters,
            request.batch_size,
            request.offset,
        )?;
        log::debug!(
            "Scanned {directory}: {} entries in {:.3}s",
            outcome.batch.total_count,
            outcome.summary.processing_time_secs
        );
        self.cache
            .put(CacheRecord::new(key, directory.clone(), outcome.clone()));
        Ok((outcome, directory, false))
    }

    pub fn scan(&self, request: &ScanRequest) -> Result<ScanResponse> {
        let (outcome, directory, cached) = self.run_scan(request, Variant::Full)?;
        Ok(ScanResponse {
            batch: outcome.batch,
            summary: outcome.summary,
            directory,
            filters: request.filters.clone(),
            cached,
            next_actions: Vec::new(),
        })
    }

    pub fn scan_metadata_only(&self, request: &ScanRequest) -> Result<MetadataScanResponse> {
        let (outcome, _directory, cached) = self.run_scan(request, Variant::MetadataOnly)?;
        Ok(MetadataScanResponse {
            batch: outcome.batch.into(),
            summary: outcome.summary,
            filters: request.filters.clone(),
            cached,
        })
    }

    /// Walks the whole tree (never from cache) and lists the offsets of every batch.
    pub fn pagination_info(
        &self,
        directory: &str,
        filters: &ScanFilters,
        batch_size: usize,
    ) -> Result<PaginationInfo> {
        let root = resolve_directory(directory)?;
        let outcome = PaginationEngine::new(self.governor(self.config.scan_memory_mb))
            .scan(&root, filters, batch_size, 0)?;
        Ok(PaginationInfo {
            directory: root.to_string_lossy().into_owned(),
            plan: PaginationPlan::from_summary(&outcome.summary, batch_size),
        })
    }

    pub fn stream_start(
        &self,
        directory: &str,
        filters: ScanFilters,
        stream_id: Option<&str>,
        batch_size: usize,
    ) -> Result<StreamOpened> {
        let root = resolve_directory(directory)?;
        let first_batch = self.sessions.start(&root, filters, stream_id, batch_size)?;
        Ok(StreamOpened {
            directory: root.to_string_lossy().into_owned(),
            first_batch,
        })
    }

    pub fn stream_next(&self, stream_id: &str, batch_size: usize) -> Result<StreamBatch> {
        self.sessions.next(stream_id.trim(), batch_size)
    }

    pub fn stream_stop(&self, stream_id: &str) -> Result<StreamStopped> {
        self.sessions.stop(stream_id.trim())
    }
}
