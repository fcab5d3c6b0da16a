use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::governor::DEFAULT_CHECKPOINT_EVERY;
use crate::session::DEFAULT_SESSION_IDLE_TTL;

pub const DEFAULT_SCAN_MEMORY_MB: f64 = 50.0;
pub const DEFAULT_METADATA_MEMORY_MB: f64 = 25.0;
pub const DEFAULT_STREAM_MEMORY_MB: f64 = 10.0;

/// Tunables for one [`crate::Lister`].
///
/// `Default` keeps everything in memory (no cache directory); [`EngineConfig::from_env`] is what
/// the binaries use.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scan_memory_mb: f64,
    pub metadata_memory_mb: f64,
    pub stream_memory_mb: f64,
    pub checkpoint_every: usize,
    pub scan_timeout: Option<Duration>,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub stream_idle_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_memory_mb: DEFAULT_SCAN_MEMORY_MB,
            metadata_memory_mb: DEFAULT_METADATA_MEMORY_MB,
            stream_memory_mb: DEFAULT_STREAM_MEMORY_MB,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            scan_timeout: None,
            cache_dir: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            stream_idle_ttl: DEFAULT_SESSION_IDLE_TTL,
        }
    }
}

impl EngineConfig {
    /// Reads `DIRSCOPE_*` variables. Malformed or out-of-range values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let defaults = Self::default();

        let cache_dir = if vars.flag("DIRSCOPE_DISABLE_DISK_CACHE") {
            None
        } else {
            vars.path("DIRSCOPE_CACHE_DIR").or_else(default_cache_dir)
        };

        Self {
            scan_memory_mb: vars
                .positive_f64("DIRSCOPE_SCAN_MEMORY_MB")
                .unwrap_or(defaults.scan_memory_mb),
            metadata_memory_mb: vars
                .positive_f64("DIRSCOPE_METADATA_MEMORY_MB")
                .unwrap_or(defaults.metadata_memory_mb),
            stream_memory_mb: vars
                .positive_f64("DIRSCOPE_STREAM_MEMORY_MB")
                .unwrap_or(defaults.stream_memory_mb),
            checkpoint_every: defaults.checkpoint_every,
            scan_timeout: vars
                .parse::<u64>("DIRSCOPE_SCAN_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            cache_dir,
            cache_ttl: vars
                .parse::<u64>("DIRSCOPE_CACHE_TTL_SECS")
                .map_or(defaults.cache_ttl, Duration::from_secs),
            stream_idle_ttl: vars
                .parse::<u64>("DIRSCOPE_STREAM_IDLE_TTL_SECS")
                .map_or(defaults.stream_idle_ttl, Duration::from_secs),
        }
    }
}

pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("dirscope").join("listings"))
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn value(&self, key: &str) -> Option<String> {
        let raw = (self.0)(key)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_string())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.value(key)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring {key}={raw}: not a valid value");
                None
            }
        }
    }

    fn positive_f64(&self, key: &str) -> Option<f64> {
        let value = self.parse::<f64>(key)?;
        if value.is_finite() && value > 0.0 {
            return Some(value);
        }
        log::warn!("Ignoring {key}={value}: must be a positive number");
        None
    }

    fn flag(&self, key: &str) -> bool {
        self.value(key).is_some_and(|value| {
            matches!(
                value.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        self.value(key).map(PathBuf::from)
    }
}
