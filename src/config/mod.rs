//! Process-wide configuration for batch pacing and connection pooling.
//!
//! Options are read from a flat TOML document whose keys match the engine's
//! startup options (`graphFetchBatchMemoryHardLimitBytes`, `poolMaxSize`, ...).
//! Missing keys fall back to the defaults below.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default hard memory ceiling for one graph-fetch batch (100 MiB).
pub const DEFAULT_HARD_MEMORY_LIMIT_BYTES: i64 = 100 * 1024 * 1024;
/// Default share of the hard limit the controller aims for.
pub const DEFAULT_SOFT_LIMIT_PERCENT: i64 = 50;
/// Batch size used when adaptive batching is disabled.
pub const DEFAULT_BATCH_SIZE: i64 = 1000;
/// Default upper bound on physical connections per pool.
pub const DEFAULT_POOL_MAX_SIZE: u32 = 100;
/// Default number of idle connections kept per pool.
pub const DEFAULT_POOL_MIN_IDLE: u32 = 0;
/// Default housekeeping period of the underlying pool implementation.
pub const DEFAULT_HOUSEKEEPING_INTERVAL_MS: u64 = 30_000;

/// Memory budget and policy for graph-fetch batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizeConfig {
    /// Hard memory ceiling for a single batch, in bytes.
    pub hard_memory_limit_bytes: i64,
    /// Percentage of the hard limit targeted by the controller, in `(0, 100]`.
    pub soft_limit_percent: i64,
    /// Fixed batch size used when adaptive batching is off.
    pub default_batch_size: i64,
    /// Whether the adaptive controller paces batches.
    pub adaptive_enabled: bool,
}

impl Default for BatchSizeConfig {
    fn default() -> Self {
        Self {
            hard_memory_limit_bytes: DEFAULT_HARD_MEMORY_LIMIT_BYTES,
            soft_limit_percent: DEFAULT_SOFT_LIMIT_PERCENT,
            default_batch_size: DEFAULT_BATCH_SIZE,
            adaptive_enabled: false,
        }
    }
}

impl BatchSizeConfig {
    /// Adaptive configuration with the given hard limit and soft percentage.
    pub fn adaptive(hard_memory_limit_bytes: i64, soft_limit_percent: i64) -> Self {
        Self {
            hard_memory_limit_bytes,
            soft_limit_percent,
            adaptive_enabled: true,
            ..Self::default()
        }
    }

    /// Memory budget the controller targets: `hard * percent / 100`.
    pub fn soft_limit_bytes(&self) -> i64 {
        self.hard_memory_limit_bytes
            .saturating_mul(self.soft_limit_percent)
            / 100
    }

    /// Rejects values outside the documented ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hard_memory_limit_bytes < 0 {
            return Err(ConfigError::invalid(
                "graphFetchBatchMemoryHardLimitBytes",
                format!("must not be negative, got {}", self.hard_memory_limit_bytes),
            ));
        }
        if !(1..=100).contains(&self.soft_limit_percent) {
            return Err(ConfigError::invalid(
                "graphFetchSoftMemoryLimitPercentage",
                format!("must be within (0, 100], got {}", self.soft_limit_percent),
            ));
        }
        if self.default_batch_size <= 0 {
            return Err(ConfigError::invalid(
                "graphFetchDefaultBatchSize",
                format!("must be positive, got {}", self.default_batch_size),
            ));
        }
        Ok(())
    }
}

/// Settings shared by every physical pool the registry builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum physical connections per pool.
    pub max_size: u32,
    /// Idle connections the pool keeps warm.
    pub min_idle: u32,
    /// Housekeeping period of the pool implementation (global, not per key).
    pub housekeeping_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_POOL_MAX_SIZE,
            min_idle: DEFAULT_POOL_MIN_IDLE,
            housekeeping_interval: Duration::from_millis(DEFAULT_HOUSEKEEPING_INTERVAL_MS),
        }
    }
}

impl PoolConfig {
    /// Rejects empty pools and idle floors above the pool size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::invalid("poolMaxSize", "must be positive"));
        }
        if self.min_idle > self.max_size {
            return Err(ConfigError::invalid(
                "poolMinIdle",
                format!(
                    "must not exceed poolMaxSize ({} > {})",
                    self.min_idle, self.max_size
                ),
            ));
        }
        Ok(())
    }
}

/// Fully resolved startup configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Graph-fetch batching policy.
    pub batching: BatchSizeConfig,
    /// Connection pool sizing.
    pub pool: PoolConfig,
}

impl RuntimeConfig {
    /// Loads configuration from `path`. A missing or absent file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let raw = match path {
            Some(path) if path.exists() => read_file(path)?,
            _ => RawConfig::default(),
        };
        convert(&raw)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        convert(&raw)
    }

    /// Renders the effective configuration with every key spelled out.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        let raw = RawConfig {
            graph_fetch_batch_memory_hard_limit_bytes: Some(self.batching.hard_memory_limit_bytes),
            graph_fetch_soft_memory_limit_percentage: Some(self.batching.soft_limit_percent),
            use_adaptive_graph_fetch_batching: Some(self.batching.adaptive_enabled),
            graph_fetch_default_batch_size: Some(self.batching.default_batch_size),
            pool_max_size: Some(self.pool.max_size),
            pool_min_idle: Some(self.pool.min_idle),
            pool_housekeeping_interval_millis: Some(
                u64::try_from(self.pool.housekeeping_interval.as_millis()).unwrap_or(u64::MAX),
            ),
        };
        toml::to_string_pretty(&raw).map_err(|source| ConfigError::Serialize { source })
    }

    /// Validates both sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.batching.validate()?;
        self.pool.validate()
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn convert(raw: &RawConfig) -> Result<RuntimeConfig, ConfigError> {
    let batch_defaults = BatchSizeConfig::default();
    let pool_defaults = PoolConfig::default();
    let config = RuntimeConfig {
        batching: BatchSizeConfig {
            hard_memory_limit_bytes: raw
                .graph_fetch_batch_memory_hard_limit_bytes
                .unwrap_or(batch_defaults.hard_memory_limit_bytes),
            soft_limit_percent: raw
                .graph_fetch_soft_memory_limit_percentage
                .unwrap_or(batch_defaults.soft_limit_percent),
            default_batch_size: raw
                .graph_fetch_default_batch_size
                .unwrap_or(batch_defaults.default_batch_size),
            adaptive_enabled: raw
                .use_adaptive_graph_fetch_batching
                .unwrap_or(batch_defaults.adaptive_enabled),
        },
        pool: PoolConfig {
            max_size: raw.pool_max_size.unwrap_or(pool_defaults.max_size),
            min_idle: raw.pool_min_idle.unwrap_or(pool_defaults.min_idle),
            housekeeping_interval: raw
                .pool_housekeeping_interval_millis
                .map(Duration::from_millis)
                .unwrap_or(pool_defaults.housekeeping_interval),
        },
    };
    config.validate()?;
    Ok(config)
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawConfig {
    graph_fetch_batch_memory_hard_limit_bytes: Option<i64>,
    graph_fetch_soft_memory_limit_percentage: Option<i64>,
    use_adaptive_graph_fetch_batching: Option<bool>,
    graph_fetch_default_batch_size: Option<i64>,
    pool_max_size: Option<u32>,
    pool_min_idle: Option<u32>,
    pool_housekeeping_interval_millis: Option<u64>,
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Parser failure.
        source: toml::de::Error,
    },
    /// Inline configuration text is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Syntax(#[from] toml::de::Error),
    /// The effective configuration could not be rendered.
    #[error("failed to serialize config: {source}")]
    Serialize {
        /// Serializer failure.
        source: toml::ser::Error,
    },
    /// A value is outside its accepted range.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Option name as spelled in the configuration file.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}
