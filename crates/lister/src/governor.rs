use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::System;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub const DEFAULT_CHECKPOINT_EVERY: usize = 1_000;

/// Source of the process resident set size.
pub trait MemoryProbe: Send + Sync {
    /// Current resident memory in MB, or `None` when the platform cannot report it.
    fn resident_mb(&self) -> Option<f64>;
}

/// Reads the current process RSS through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessMemoryProbe;

impl MemoryProbe for ProcessMemoryProbe {
    fn resident_mb(&self) -> Option<f64> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = System::new();
        if !system.refresh_process(pid) {
            return None;
        }
        system
            .process(pid)
            .map(|process| process.memory() as f64 / BYTES_PER_MB)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbortReason {
    MemoryBudget { used_mb: f64, budget_mb: f64 },
    Deadline,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Checkpoint {
    Continue,
    Abort(AbortReason),
}

/// Advisory backpressure for walks that materialize their results.
///
/// The governor compares RSS growth since a baseline sample against a budget. It is checked
/// every `checkpoint_every` entries, which is also where an optional deadline is enforced.
#[derive(Clone)]
pub struct MemoryGovernor {
    probe: Arc<dyn MemoryProbe>,
    budget_mb: f64,
    checkpoint_every: usize,
    deadline: Option<Instant>,
}

impl fmt::Debug for MemoryGovernor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryGovernor")
            .field("budget_mb", &self.budget_mb)
            .field("checkpoint_every", &self.checkpoint_every)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl MemoryGovernor {
    pub fn new(budget_mb: f64) -> Self {
        Self::with_probe(budget_mb, Arc::new(ProcessMemoryProbe))
    }

    pub fn with_probe(budget_mb: f64, probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            probe,
            budget_mb,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            deadline: None,
        }
    }

    #[must_use]
    pub fn checkpoint_every(mut self, entries: usize) -> Self {
        self.checkpoint_every = entries.max(1);
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn budget_mb(&self) -> f64 {
        self.budget_mb
    }

    /// Samples the current RSS; use the result as the baseline for later checkpoints.
    pub fn sample(&self) -> Option<f64> {
        self.probe.resident_mb()
    }

    /// Whether `processed` materialized entries land on a checkpoint.
    pub fn is_due(&self, processed: usize) -> bool {
        processed > 0 && processed % self.checkpoint_every == 0
    }

    /// RSS growth since `baseline_mb`, never negative. Zero when either side is unknown.
    pub fn delta_mb(&self, baseline_mb: Option<f64>) -> f64 {
        match (baseline_mb, self.sample()) {
            (Some(baseline), Some(current)) => (current - baseline).max(0.0),
            _ => 0.0,
        }
    }

    pub fn checkpoint(&self, baseline_mb: Option<f64>) -> Checkpoint {
        if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return Checkpoint::Abort(AbortReason::Deadline);
        }

        let Some(baseline) = baseline_mb else {
            return Checkpoint::Continue;
        };
        let Some(current) = self.sample() else {
            return Checkpoint::Continue;
        };
        let used_mb = current - baseline;
        if used_mb > self.budget_mb {
            return Checkpoint::Abort(AbortReason::MemoryBudget {
                used_mb,
                budget_mb: self.budget_mb,
            });
        }
        Checkpoint::Continue
    }
}
