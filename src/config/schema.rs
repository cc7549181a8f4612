//! Configuration schema definitions for shardwise.
//!
//! # Schema Overview
//!
//! ```text
//! Config (root)
//! ├── ShardingConfig   - Platform, time budget, shard caps, default times
//! └── HistoryConfig    - Where previous JUnit results live
//! ```
//!
//! Numeric limits keep the command-line convention of `-1` meaning "no
//! limit". They are converted into [`TimeBudget`] and [`ShardLimit`] values
//! before any arithmetic happens.
//!
//! [`TimeBudget`]: crate::shard::TimeBudget
//! [`ShardLimit`]: crate::shard::ShardLimit

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::history::Platform;
use crate::shard::{EstimateConfig, ShardError};

/// Raw value meaning "no limit" for time budgets and shard counts.
pub const UNBOUNDED: i64 = -1;

/// Root configuration structure.
///
/// # TOML Structure
///
/// ```toml
/// [sharding]
/// platform = "android"
/// shard_time_secs = 600
/// max_shards = 50
///
/// [history]
/// junit_paths = ["results/JUnitReport.xml"]
/// ```
///
/// # Example
///
/// ```
/// use shardwise::config::Config;
///
/// let config: Config = toml::from_str(r#"
///     [sharding]
///     platform = "ios"
///     max_shards = 4
/// "#).unwrap();
/// assert_eq!(config.sharding.max_shards, 4);
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Sharding settings.
    #[serde(default)]
    pub sharding: ShardingConfig,

    /// Previous-run results used for duration estimates (optional).
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Sharding settings.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `platform` | `android` |
/// | `shard_time_secs` | -1 (no time budget) |
/// | `max_shards` | 1 |
/// | `forced_shards` | -1 (not forced) |
/// | `disable_sharding` | false |
/// | `default_test_time_secs` | 120.0 |
/// | `ignored_test_time_secs` | 0.0 |
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShardingConfig {
    /// Selects the identity-key format used for history lookups.
    #[serde(default)]
    pub platform: Platform,

    /// Target wall-clock seconds per shard, or -1 for no target.
    ///
    /// When set, the shard count is estimated from the total expected test
    /// time. Must not be 0 or below -1.
    #[serde(default = "default_unbounded")]
    pub shard_time_secs: i64,

    /// Upper bound on the number of shards, or -1 for unlimited.
    #[serde(default = "default_max_shards")]
    pub max_shards: i64,

    /// Exact number of shards to create, or -1 to derive it.
    ///
    /// Overrides both `max_shards` and `shard_time_secs`.
    #[serde(default = "default_unbounded")]
    pub forced_shards: i64,

    /// Put every test into a single shard.
    #[serde(default)]
    pub disable_sharding: bool,

    /// Estimate for tests with no recorded duration.
    #[serde(default = "default_test_time")]
    pub default_test_time_secs: f64,

    /// Estimate for tests marked ignored.
    #[serde(default)]
    pub ignored_test_time_secs: f64,
}

impl Default for ShardingConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            shard_time_secs: UNBOUNDED,
            max_shards: default_max_shards(),
            forced_shards: UNBOUNDED,
            disable_sharding: false,
            default_test_time_secs: default_test_time(),
            ignored_test_time_secs: 0.0,
        }
    }
}

impl ShardingConfig {
    /// The per-test estimate settings.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InvalidTestTime`] for a negative or non-finite
    /// default or ignored test time.
    pub fn estimate(&self) -> Result<EstimateConfig, ShardError> {
        EstimateConfig::new(self.default_test_time_secs, self.ignored_test_time_secs)
    }
}

fn default_unbounded() -> i64 {
    UNBOUNDED
}

fn default_max_shards() -> i64 {
    1
}

fn default_test_time() -> f64 {
    120.0
}

/// Locations of previous-run JUnit reports.
///
/// Reports are merged in order, so a later file overrides an earlier one
/// for the same test. Missing files are skipped with a warning.
///
/// # Example
///
/// ```toml
/// [history]
/// junit_paths = ["results/previous.xml", "results/latest.xml"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub junit_paths: Vec<PathBuf>,
}
