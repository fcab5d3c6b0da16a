use getrandom::getrandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::entry::FileEntry;
use crate::error::{Result, ScanError};
use crate::filters::ScanFilters;
use crate::governor::{AbortReason, Checkpoint, MemoryGovernor};
use crate::walker::{BoundedWalker, Walk};

pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_TOMBSTONE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const MAX_SESSION_ID_CHARS: usize = 128;

/// A server-held cursor over one walk.
pub struct StreamSession {
    id: String,
    root: PathBuf,
    filters: ScanFilters,
    cursor: Peekable<Walk>,
    /// Entries pulled by a call that was then refused; served first on the next call.
    held: Vec<FileEntry>,
    entries_emitted: usize,
    started_at: Instant,
    last_used: Instant,
    governor: MemoryGovernor,
}

impl StreamSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filters(&self) -> &ScanFilters {
        &self.filters
    }

    pub fn entries_emitted(&self) -> usize {
        self.entries_emitted
    }

    fn pull(&mut self, batch_size: usize) -> Result<StreamBatch> {
        let batch_size = batch_size.max(1);
        // Growth is measured across this call only.
        let baseline_mb = self.governor.sample();

        let from_held = self.held.len().min(batch_size);
        let mut entries: Vec<FileEntry> = self.held.drain(..from_held).collect();
        entries.extend(self.cursor.by_ref().take(batch_size - entries.len()));
        self.last_used = Instant::now();

        if let Checkpoint::Abort(reason) = self.governor.checkpoint(baseline_mb) {
            log::warn!(
                "Stream {} over budget after {} entries",
                self.id,
                self.entries_emitted
            );
            entries.append(&mut self.held);
            self.held = entries;
            return Err(match reason {
                AbortReason::MemoryBudget { used_mb, budget_mb } => {
                    ScanError::MemoryBudgetExceeded {
                        entries_processed: self.entries_emitted,
                        used_mb,
                        budget_mb,
                    }
                }
                AbortReason::Deadline => ScanError::DeadlineExceeded {
                    entries_processed: self.entries_emitted,
                },
            });
        }

        self.entries_emitted += entries.len();
        let has_more = !self.held.is_empty() || self.cursor.peek().is_some();

        Ok(StreamBatch {
            stream_id: self.id.clone(),
            entries,
            entries_emitted: self.entries_emitted,
            has_more,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamBatch {
    pub stream_id: String,
    pub entries: Vec<FileEntry>,
    /// Running total across every batch of the session.
    pub entries_emitted: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStopped {
    pub stream_id: String,
    pub entries_emitted: usize,
    pub duration_secs: f64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub memory_budget_mb: f64,
    pub idle_ttl: Duration,
    /// How long a stopped or expired id keeps being refused for reuse.
    pub tombstone_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            memory_budget_mb: 10.0,
            idle_ttl: DEFAULT_SESSION_IDLE_TTL,
            tombstone_ttl: DEFAULT_TOMBSTONE_TTL,
        }
    }
}

/// Owns every live streaming session of this process.
///
/// Lifecycle per id: absent, then active after `start`, then terminated after `stop` (or after
/// sitting idle past the TTL). Terminated ids are refused for `tombstone_ttl`. The registry lock
/// only guards the map; each session has its own lock, so `next` on one id never waits on another
/// id. Idle sessions and old tombstones are swept on every `start`, `next` and `stop`.
pub struct SessionRegistry {
    config: SessionConfig,
    governor: MemoryGovernor,
    sessions: Mutex<HashMap<String, Arc<Mutex<StreamSession>>>>,
    terminated: Mutex<HashMap<String, Instant>>,
    fallback_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new(config: SessionConfig, governor: MemoryGovernor) -> Self {
        Self {
            config,
            governor,
            sessions: Mutex::new(HashMap::new()),
            terminated: Mutex::new(HashMap::new()),
            fallback_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn active_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of ids currently refused because they were stopped or expired.
    pub fn terminated_count(&self) -> usize {
        self.terminated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Opens a cursor over `root` and returns its first batch.
    pub fn start(
        &self,
        root: &Path,
        filters: ScanFilters,
        requested_id: Option<&str>,
        batch_size: usize,
    ) -> Result<StreamBatch> {
        self.reap_idle();

        let walk = BoundedWalker::new(root, filters.clone()).walk()?;
        let now = Instant::now();

        let id = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            let terminated = self
                .terminated
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let id = match requested_id.map(str::trim).filter(|s| !s.is_empty()) {
                Some(id) => {
                    if id.len() > MAX_SESSION_ID_CHARS {
                        return Err(ScanError::InvalidArgument(format!(
                            "stream id longer than {MAX_SESSION_ID_CHARS} characters"
                        )));
                    }
                    if sessions.contains_key(id) {
                        return Err(ScanError::InvalidArgument(format!(
                            "stream '{id}' is already active"
                        )));
                    }
                    if terminated.contains_key(id) {
                        return Err(ScanError::InvalidArgument(format!(
                            "stream '{id}' was stopped and cannot be reused"
                        )));
                    }
                    id.to_string()
                }
                None => loop {
                    let candidate = self.generate_id();
                    if !sessions.contains_key(&candidate) && !terminated.contains_key(&candidate)
                    {
                        break candidate;
                    }
                },
            };

            let session = StreamSession {
                id: id.clone(),
                root: root.to_path_buf(),
                filters,
                cursor: walk.peekable(),
                held: Vec::new(),
                entries_emitted: 0,
                started_at: now,
                last_used: now,
                governor: self.governor.clone(),
            };
            sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
            id
        };

        match self.pull(&id, batch_size) {
            Ok(batch) => {
                log::info!("Stream {id} started over {}", root.display());
                Ok(batch)
            }
            Err(err) => {
                // The caller never learns an id that failed on its first batch.
                self.sessions
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
                Err(err)
            }
        }
    }

    /// Pulls up to `batch_size` further entries. An exhausted session stays active and keeps
    /// returning empty batches with `has_more == false`.
    pub fn next(&self, id: &str, batch_size: usize) -> Result<StreamBatch> {
        self.reap_idle();
        self.pull(id, batch_size)
    }

    pub fn stop(&self, id: &str) -> Result<StreamStopped> {
        self.reap_idle();
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        let Some(session) = removed else {
            return Err(self.not_found(id));
        };
        self.terminated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), Instant::now());

        let session = session.lock().unwrap_or_else(PoisonError::into_inner);
        log::info!(
            "Stream {id} stopped after {} entries",
            session.entries_emitted
        );
        Ok(StreamStopped {
            stream_id: id.to_string(),
            entries_emitted: session.entries_emitted,
            duration_secs: session.started_at.elapsed().as_secs_f64(),
        })
    }

    fn pull(&self, id: &str, batch_size: usize) -> Result<StreamBatch> {
        let session = self.lookup(id)?;
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        session.pull(batch_size)
    }

    fn lookup(&self, id: &str) -> Result<Arc<Mutex<StreamSession>>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| self.not_found(id))
    }

    fn not_found(&self, id: &str) -> ScanError {
        let stopped = self
            .terminated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id);
        ScanError::SessionNotFound {
            id: id.to_string(),
            reason: if stopped {
                "the stream was stopped or expired"
            } else {
                "no such stream in this server process (streams are not persisted or shared between processes)"
            },
        }
    }

    /// Terminates sessions idle longer than the idle TTL and forgets tombstones older than the
    /// tombstone TTL.
    fn reap_idle(&self) {
        let idle_ttl = self.config.idle_ttl;
        let mut expired = Vec::new();
        {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            sessions.retain(|id, session| {
                // A session busy in `next` is by definition not idle.
                let Ok(session) = session.try_lock() else {
                    return true;
                };
                if session.last_used.elapsed() > idle_ttl {
                    expired.push(id.clone());
                    return false;
                }
                true
            });
        }

        let tombstone_ttl = self.config.tombstone_ttl;
        let mut terminated = self
            .terminated
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        terminated.retain(|_, at| at.elapsed() <= tombstone_ttl);
        if expired.is_empty() {
            return;
        }
        log::info!("Reaped {} idle stream(s)", expired.len());
        let now = Instant::now();
        terminated.extend(expired.into_iter().map(|id| (id, now)));
    }

    fn generate_id(&self) -> String {
        let mut bytes = [0u8; 8];
        let value = match getrandom(&mut bytes) {
            Ok(()) => u64::from_be_bytes(bytes),
            Err(_) => self.fallback_id.fetch_add(1, Ordering::Relaxed),
        };
        format!("{value:016x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{SortKey, SortOrder};
    use crate::governor::test_probes::{FlatProbe, SequenceProbe};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(
            SessionConfig::default(),
            MemoryGovernor::with_probe(10.0, Arc::new(FlatProbe)),
        )
    }

    fn filters() -> ScanFilters {
        ScanFilters::new(1, false, Vec::<String>::new(), SortKey::Name, SortOrder::Asc)
    }

    fn tree(files: usize) -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        for i in 0..files {
            fs::write(temp.path().join(format!("f{i:02}.txt")), b"x").unwrap();
        }
        temp
    }

    #[test]
    fn streams_every_entry_exactly_once() {
        let temp = tree(7);
        let registry = registry();
        let first = registry.start(temp.path(), filters(), None, 3).unwrap();
        assert_eq!(first.entries.len(), 3);
        assert!(first.has_more);
        assert_eq!(first.stream_id.len(), 16);

        let id = first.stream_id.clone();
        let second = registry.next(&id, 3).unwrap();
        let third = registry.next(&id, 3).unwrap();
        assert_eq!(second.entries.len(), 3);
        assert_eq!(third.entries.len(), 1);
        assert!(!third.has_more);
        assert_eq!(third.entries_emitted, 7);

        let mut seen: Vec<String> = first
            .entries
            .iter()
            .chain(&second.entries)
            .chain(&third.entries)
            .map(|e| e.name.clone())
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 7);

        let exhausted = registry.next(&id, 3).unwrap();
        assert!(exhausted.entries.is_empty());
        assert!(!exhausted.has_more);
    }

    #[test]
    fn exact_multiple_reports_no_more() {
        let temp = tree(4);
        let registry = registry();
        let first = registry.start(temp.path(), filters(), None, 2).unwrap();
        let second = registry.next(&first.stream_id, 2).unwrap();
        assert_eq!(second.entries.len(), 2);
        assert!(!second.has_more);
    }

    #[test]
    fn unknown_and_stopped_ids_are_rejected() {
        let temp = tree(2);
        let registry = registry();
        assert!(matches!(
            registry.next("never-started", 5),
            Err(ScanError::SessionNotFound { .. })
        ));
        assert!(matches!(
            registry.stop("never-started"),
            Err(ScanError::SessionNotFound { .. })
        ));

        let first = registry.start(temp.path(), filters(), None, 1).unwrap();
        let stopped = registry.stop(&first.stream_id).unwrap();
        assert_eq!(stopped.entries_emitted, 1);
        assert_eq!(registry.active_count(), 0);

        match registry.next(&first.stream_id, 5) {
            Err(ScanError::SessionNotFound { reason, .. }) => {
                assert!(reason.contains("stopped"));
            }
            other => panic!("expected session_not_found, got {:?}", other.map(|b| b.stream_id)),
        }
        assert!(matches!(
            registry.stop(&first.stream_id),
            Err(ScanError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn caller_ids_must_be_fresh() {
        let temp = tree(2);
        let registry = registry();
        let batch = registry
            .start(temp.path(), filters(), Some("mine"), 1)
            .unwrap();
        assert_eq!(batch.stream_id, "mine");
        assert!(matches!(
            registry.start(temp.path(), filters(), Some("mine"), 1),
            Err(ScanError::InvalidArgument(_))
        ));
        registry.stop("mine").unwrap();
        assert!(matches!(
            registry.start(temp.path(), filters(), Some("mine"), 1),
            Err(ScanError::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_root_does_not_create_a_session() {
        let temp = tempdir().unwrap();
        let registry = registry();
        let err = registry
            .start(&temp.path().join("missing"), filters(), None, 5)
            .unwrap_err();
        assert!(matches!(err, ScanError::DirectoryNotFound(_)));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn idle_sessions_are_reaped_on_start() {
        let temp = tree(3);
        let registry = SessionRegistry::new(
            SessionConfig {
                idle_ttl: Duration::ZERO,
                ..SessionConfig::default()
            },
            MemoryGovernor::with_probe(10.0, Arc::new(FlatProbe)),
        );
        let first = registry.start(temp.path(), filters(), None, 1).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        registry.start(temp.path(), filters(), None, 1).unwrap();
        assert!(matches!(
            registry.next(&first.stream_id, 1),
            Err(ScanError::SessionNotFound { .. })
        ));
    }

    fn names(batch: &StreamBatch) -> Vec<&str> {
        batch.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn idle_sessions_are_reaped_on_next() {
        let temp = tree(3);
        let registry = SessionRegistry::new(
            SessionConfig {
                idle_ttl: Duration::ZERO,
                ..SessionConfig::default()
            },
            MemoryGovernor::with_probe(10.0, Arc::new(FlatProbe)),
        );
        let first = registry.start(temp.path(), filters(), None, 1).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        match registry.next(&first.stream_id, 1) {
            Err(ScanError::SessionNotFound { reason, .. }) => assert!(reason.contains("expired")),
            other => panic!("expected session_not_found, got {:?}", other.map(|b| b.stream_id)),
        }
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn old_tombstones_are_forgotten() {
        let temp = tree(2);
        let registry = SessionRegistry::new(
            SessionConfig {
                tombstone_ttl: Duration::ZERO,
                ..SessionConfig::default()
            },
            MemoryGovernor::with_probe(10.0, Arc::new(FlatProbe)),
        );
        let first = registry.start(temp.path(), filters(), None, 1).unwrap();
        registry.stop(&first.stream_id).unwrap();
        assert_eq!(registry.terminated_count(), 1);

        std::thread::sleep(Duration::from_millis(5));
        let second = registry.start(temp.path(), filters(), None, 1).unwrap();
        registry.next(&second.stream_id, 1).unwrap();
        assert_eq!(registry.terminated_count(), 0);
    }

    #[test]
    fn growth_between_calls_does_not_count_against_the_stream() {
        let temp = tree(6);
        // Each call sees a flat reading; the process grows by 150 MB between calls.
        let registry = SessionRegistry::new(
            SessionConfig::default(),
            MemoryGovernor::with_probe(
                1.0,
                Arc::new(SequenceProbe::new(&[50.0, 50.0, 200.0, 200.0, 350.0, 350.0])),
            ),
        );
        let first = registry.start(temp.path(), filters(), None, 2).unwrap();
        let second = registry.next(&first.stream_id, 2).unwrap();
        let third = registry.next(&first.stream_id, 2).unwrap();
        assert_eq!(second.entries.len(), 2);
        assert_eq!(third.entries.len(), 2);
        assert_eq!(third.entries_emitted, 6);
        assert!(!third.has_more);
    }

    #[test]
    fn over_budget_call_keeps_its_entries_for_the_retry() {
        let temp = tree(5);
        // start: 50.0 -> 50.5 fits; second call: 51.0 -> 60.0 does not; then flat.
        let registry = SessionRegistry::new(
            SessionConfig::default(),
            MemoryGovernor::with_probe(
                1.0,
                Arc::new(SequenceProbe::new(&[50.0, 50.5, 51.0, 60.0])),
            ),
        );
        let first = registry.start(temp.path(), filters(), None, 2).unwrap();
        assert_eq!(first.entries.len(), 2);

        match registry.next(&first.stream_id, 2) {
            Err(ScanError::MemoryBudgetExceeded {
                entries_processed, ..
            }) => assert_eq!(entries_processed, 2),
            other => panic!("expected budget abort, got {:?}", other.map(|b| b.entries)),
        }
        assert_eq!(registry.active_count(), 1);

        let retry = registry.next(&first.stream_id, 2).unwrap();
        assert_eq!(retry.entries.len(), 2);
        assert_eq!(retry.entries_emitted, 4);
        assert!(retry.has_more);

        let last = registry.next(&first.stream_id, 2).unwrap();
        assert_eq!(last.entries.len(), 1);
        assert!(!last.has_more);

        let mut seen: Vec<&str> = names(&first);
        seen.extend(names(&retry));
        seen.extend(names(&last));
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn failed_first_batch_leaves_no_session_behind() {
        let temp = tree(3);
        let registry = SessionRegistry::new(
            SessionConfig::default(),
            MemoryGovernor::with_probe(1.0, Arc::new(SequenceProbe::new(&[50.0, 90.0]))),
        );
        let err = registry.start(temp.path(), filters(), None, 2).unwrap_err();
        assert!(matches!(err, ScanError::MemoryBudgetExceeded { .. }));
        assert_eq!(registry.active_count(), 0);
    }
}
