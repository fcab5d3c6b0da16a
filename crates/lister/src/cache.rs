use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::filters::ScanFilters;
use crate::pagination::ScanOutcome;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

const CACHE_FILE_EXTENSION: &str = "json";

pub(crate) fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Hash of a canonical directory plus every argument that shapes a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `directory` must already be canonical; trailing slashes and quoting are resolved by
    /// [`crate::paths::resolve_directory`].
    pub fn for_scan(
        directory: &Path,
        filters: &ScanFilters,
        batch_size: usize,
        offset: usize,
        variant: &str,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(directory.to_string_lossy().as_bytes());
        hasher.update(
            format!(
                "|{}|batch={batch_size}|offset={offset}|variant={variant}",
                filters.fingerprint()
            )
            .as_bytes(),
        );
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One cached scan result. Replaced, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub key: CacheKey,
    pub directory: String,
    pub created_at_ms: u64,
    pub outcome: ScanOutcome,
}

impl CacheRecord {
    pub fn new(key: CacheKey, directory: impl Into<String>, outcome: ScanOutcome) -> Self {
        Self {
            key,
            directory: directory.into(),
            created_at_ms: unix_ms_now(),
            outcome,
        }
    }

    pub fn age(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.created_at_ms))
    }
}

/// On-disk layout of one record.
#[derive(Serialize, Deserialize)]
struct CacheFile {
    timestamp: u64,
    directory: String,
    result: ScanOutcome,
}

/// Most recent successful scan per key, readable until the TTL runs out.
///
/// Records live in memory and, when a directory is configured, are mirrored to one JSON file per
/// key so a restarted process can reuse them. Expired records are treated as absent; nothing is
/// evicted eagerly.
pub struct ResultCache {
    ttl: Duration,
    records: Mutex<HashMap<CacheKey, Arc<CacheRecord>>>,
    persist_dir: Option<PathBuf>,
}

impl ResultCache {
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            ttl,
            records: Mutex::new(HashMap::new()),
            persist_dir: None,
        }
    }

    pub fn persistent(ttl: Duration, dir: impl Into<PathBuf>) -> Self {
        Self {
            persist_dir: Some(dir.into()),
            ..Self::in_memory(ttl)
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn persist_dir(&self) -> Option<&Path> {
        self.persist_dir.as_deref()
    }

    fn is_fresh(&self, created_at_ms: u64, now_ms: u64) -> bool {
        Duration::from_millis(now_ms.saturating_sub(created_at_ms)) < self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheRecord>> {
        let now_ms = unix_ms_now();
        {
            let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(record) = records.get(key) {
                if self.is_fresh(record.created_at_ms, now_ms) {
                    return Some(record.clone());
                }
                return None;
            }
        }

        let record = self.load_from_disk(key, now_ms)?;
        let record = Arc::new(record);
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), record.clone());
        Some(record)
    }

    pub fn put(&self, record: CacheRecord) -> Arc<CacheRecord> {
        let record = Arc::new(record);
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.key.clone(), record.clone());
        if let Err(err) = self.write_to_disk(&record) {
            log::warn!(
                "Failed to persist cache record for {}: {err}",
                record.directory
            );
        }
        record
    }

    /// Drops every record, in memory and on disk. Returns how many files were removed.
    pub fn clear(&self) -> io::Result<usize> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let Some(dir) = self.persist_dir.as_deref() else {
            return Ok(0);
        };
        let listing = match fs::read_dir(dir) {
            Ok(listing) => listing,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err),
        };
        let mut removed = 0usize;
        for entry in listing.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(CACHE_FILE_EXTENSION) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn file_for(&self, key: &CacheKey) -> Option<PathBuf> {
        self.persist_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{CACHE_FILE_EXTENSION}", key.as_str())))
    }

    fn load_from_disk(&self, key: &CacheKey, now_ms: u64) -> Option<CacheRecord> {
        let path = self.file_for(key)?;
        let bytes = fs::read(&path).ok()?;
        let file: CacheFile = match serde_json::from_slice(&bytes) {
            Ok(file) => file,
            Err(err) => {
                log::warn!("Listing cache corrupted {}: {err}", path.display());
                return None;
            }
        };
        if !self.is_fresh(file.timestamp, now_ms) {
            return None;
        }
        Some(CacheRecord {
            key: key.clone(),
            directory: file.directory,
            created_at_ms: file.timestamp,
            outcome: file.result,
        })
    }

    fn write_to_disk(&self, record: &CacheRecord) -> io::Result<()> {
        let Some(path) = self.file_for(&record.key) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = CacheFile {
            timestamp: record.created_at_ms,
            directory: record.directory.clone(),
            result: record.outcome.clone(),
        };
        let data = serde_json::to_vec(&file).map_err(io::Error::other)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, &path)
    }
}
