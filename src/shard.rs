//! Time-balanced test sharding.
//!
//! This module turns a list of tests plus a [`DurationIndex`] into shards
//! whose expected run times are as even as possible.
//!
//! # Operations
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`estimate_shard_count`] | Shards needed to stay under a per-shard time budget |
//! | [`build_shards`] | Longest-first greedy assignment into least-loaded shards |
//! | [`Sharder::plan`] | Full pipeline driven by a [`ShardingConfig`] |
//!
//! # Example
//!
//! ```
//! use shardwise::config::ShardingConfig;
//! use shardwise::discovery::TestDescriptor;
//! use shardwise::duration::DurationIndex;
//! use shardwise::history::Platform;
//! use shardwise::shard::Sharder;
//!
//! let index = DurationIndex::from_entries(
//!     Platform::Android,
//!     [("class Foo#a".to_string(), 30.0), ("class Foo#b".to_string(), 10.0)],
//! );
//! let tests = vec![TestDescriptor::new("class Foo#a"), TestDescriptor::new("class Foo#b")];
//!
//! let config = ShardingConfig { max_shards: 2, ..Default::default() };
//! let plan = Sharder::new(&config, &index).plan(&tests)?;
//! assert_eq!(plan.shards.len(), 2);
//! # Ok::<(), shardwise::shard::ShardError>(())
//! ```

pub mod builder;
pub mod estimate;

pub use builder::{ShardPlan, build_shards, build_shards_with_estimate};
pub use estimate::estimate_shard_count;

use serde::Serialize;

use crate::config::{ShardingConfig, UNBOUNDED};
use crate::discovery::TestDescriptor;
use crate::duration::DurationIndex;
use crate::history::Platform;

/// Fatal configuration or invariant violations.
///
/// None of these are retried; the caller is expected to fix its
/// configuration and run again.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShardError {
    /// The per-shard time budget is 0 or below -1.
    #[error("Invalid shard time {0}: use a positive number of seconds, or -1 for no limit")]
    InvalidTimeBudget(i64),

    /// The shard cap is below -1.
    #[error("Invalid max shard count {0}: use a positive number, or -1 for unlimited")]
    InvalidMaxShards(i64),

    /// The forced shard count is 0 or below -1.
    #[error("Invalid forced shard count {0}: use a positive number, or -1 to derive it")]
    InvalidForcedShards(i64),

    /// A configured per-test time is negative or not a finite number.
    #[error("Invalid {setting} {value}: use a finite number of seconds, 0 or more")]
    InvalidTestTime { setting: &'static str, value: f64 },

    /// The time-based estimate collapsed to zero shards.
    #[error("Estimated shard count {count} is invalid (max shards: {max_shards})")]
    InvalidShardCount { count: usize, max_shards: ShardLimit },

    /// No shard could be created for the given tests and limits.
    #[error(
        "Unable to create shards: max shards {max_shards}, forced shards {forced}, \
         time-budget estimate {estimated}, {test_count} tests ({positive_count} with a positive time estimate), \
         resolved shard count {resolved}. Check the {platform} shard settings \
         and that the test list is not empty"
    )]
    NoShards {
        max_shards: ShardLimit,
        forced: CountDisplay,
        estimated: CountDisplay,
        test_count: usize,
        positive_count: usize,
        resolved: usize,
        platform: Platform,
    },
}

/// Per-shard time target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBudget {
    /// No time target; the estimator defers to the caller.
    Unbounded,
    /// Target seconds per shard.
    Seconds(u64),
}

impl TimeBudget {
    /// Converts a raw value where -1 means "unbounded".
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InvalidTimeBudget`] for 0 or anything below -1.
    pub fn from_secs(raw: i64) -> Result<Self, ShardError> {
        match raw {
            UNBOUNDED => Ok(TimeBudget::Unbounded),
            n if n > 0 => Ok(TimeBudget::Seconds(n as u64)),
            n => Err(ShardError::InvalidTimeBudget(n)),
        }
    }
}

/// Upper bound on the number of shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardLimit {
    Unlimited,
    AtMost(usize),
}

impl ShardLimit {
    /// Converts a raw value where -1 means "unlimited".
    ///
    /// A cap of 0 is accepted here and rejected once it resolves to zero
    /// shards, so the error can carry the full context.
    pub fn from_raw(raw: i64) -> Result<Self, ShardError> {
        match raw {
            UNBOUNDED => Ok(ShardLimit::Unlimited),
            n if n >= 0 => Ok(ShardLimit::AtMost(n as usize)),
            n => Err(ShardError::InvalidMaxShards(n)),
        }
    }

    /// Caps `count` at this limit.
    pub fn clamp(&self, count: usize) -> usize {
        match self {
            ShardLimit::Unlimited => count,
            ShardLimit::AtMost(cap) => count.min(*cap),
        }
    }
}

impl std::fmt::Display for ShardLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShardLimit::Unlimited => f.write_str("unlimited"),
            ShardLimit::AtMost(cap) => write!(f, "{}", cap),
        }
    }
}

/// Formats an optional shard count for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountDisplay(pub Option<usize>);

impl std::fmt::Display for CountDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(count) => write!(f, "{}", count),
            None => f.write_str("not set"),
        }
    }
}

/// Converts a raw forced shard count where -1 means "not forced".
///
/// # Errors
///
/// Returns [`ShardError::InvalidForcedShards`] for 0 or anything below -1.
pub fn forced_shard_count(raw: i64) -> Result<Option<usize>, ShardError> {
    match raw {
        UNBOUNDED => Ok(None),
        n if n > 0 => Ok(Some(n as usize)),
        n => Err(ShardError::InvalidForcedShards(n)),
    }
}

/// Per-test time estimates for tests without usable history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateConfig {
    /// Seconds assumed for a test with no recorded duration.
    pub default_test_time: f64,

    /// Seconds assumed for a test marked ignored.
    pub ignored_test_time: f64,
}

impl EstimateConfig {
    /// Creates estimate settings, rejecting negative or non-finite times.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InvalidTestTime`] naming the offending setting.
    pub fn new(default_test_time: f64, ignored_test_time: f64) -> Result<Self, ShardError> {
        check_test_time("default test time", default_test_time)?;
        check_test_time("ignored test time", ignored_test_time)?;

        Ok(Self {
            default_test_time,
            ignored_test_time,
        })
    }
}

fn check_test_time(setting: &'static str, value: f64) -> Result<(), ShardError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ShardError::InvalidTestTime { setting, value })
    }
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            default_test_time: 120.0,
            ignored_test_time: 0.0,
        }
    }
}

/// Where a test's time estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateSource {
    Ignored,
    History,
    Default,
}

impl EstimateConfig {
    /// Resolves the expected run time of `test` in seconds.
    ///
    /// Ignored tests use the ignored-test time regardless of history.
    pub fn resolve(&self, test: &TestDescriptor, index: &DurationIndex) -> (f64, EstimateSource) {
        if test.ignored {
            return (self.ignored_test_time, EstimateSource::Ignored);
        }

        match index.get(&test.identifier) {
            Some(time) => (time, EstimateSource::History),
            None => (self.default_test_time, EstimateSource::Default),
        }
    }
}

/// A test placed into a shard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestMethod {
    /// Identity key of the test.
    pub name: String,

    /// Expected run time in seconds.
    #[serde(rename = "time")]
    pub estimated_time: f64,
}

impl TestMethod {
    pub fn new(name: impl Into<String>, estimated_time: f64) -> Self {
        Self {
            name: name.into(),
            estimated_time,
        }
    }
}

/// A group of tests that run sequentially on one worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestShard {
    /// Sum of the members' estimated times.
    #[serde(rename = "time")]
    pub accumulated_time: f64,

    /// Tests in the order they were assigned.
    #[serde(rename = "tests")]
    pub members: Vec<TestMethod>,
}

impl TestShard {
    /// Adds a test and its time to the shard.
    pub fn push(&mut self, method: TestMethod) {
        self.accumulated_time += method.estimated_time;
        self.members.push(method);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Accumulated time rounded to the nearest second.
    pub fn rounded_time(&self) -> u64 {
        self.accumulated_time.round() as u64
    }
}

/// Runs the sharding operations against raw configuration values.
///
/// `Sharder` converts the `-1`-style settings of a [`ShardingConfig`] into
/// typed limits and forwards to [`estimate_shard_count`] and
/// [`build_shards`].
pub struct Sharder<'a> {
    config: &'a ShardingConfig,
    index: &'a DurationIndex,
}

impl<'a> Sharder<'a> {
    pub fn new(config: &'a ShardingConfig, index: &'a DurationIndex) -> Self {
        Self { config, index }
    }

    /// Number of shards needed to keep each under `shard_time_secs`.
    ///
    /// Returns `Ok(None)` when no time budget is configured.
    pub fn estimate_shard_count(&self, tests: &[TestDescriptor]) -> Result<Option<usize>, ShardError> {
        let budget = TimeBudget::from_secs(self.config.shard_time_secs)?;
        let max_shards = ShardLimit::from_raw(self.config.max_shards)?;

        estimate_shard_count(tests, self.index, budget, max_shards, &self.config.estimate()?)
    }

    /// Assigns tests using `max_shards` and `forced_shards` only.
    pub fn build_shards(&self, tests: &[TestDescriptor]) -> Result<ShardPlan, ShardError> {
        let forced = forced_shard_count(self.config.forced_shards)?;
        let max_shards = ShardLimit::from_raw(self.config.max_shards)?;

        build_shards(tests, self.index, max_shards, forced, &self.config.estimate()?)
    }

    /// Full pipeline.
    ///
    /// With sharding disabled every test lands in a single shard. Otherwise
    /// an explicit `forced_shards` wins, then the time-budget estimate, then
    /// `max_shards`.
    pub fn plan(&self, tests: &[TestDescriptor]) -> Result<ShardPlan, ShardError> {
        let max_shards = ShardLimit::from_raw(self.config.max_shards)?;
        let estimate = self.config.estimate()?;

        if self.config.disable_sharding {
            return build_shards(tests, self.index, max_shards, Some(1), &estimate);
        }

        match forced_shard_count(self.config.forced_shards)? {
            Some(count) => build_shards(tests, self.index, max_shards, Some(count), &estimate),
            None => {
                let estimated = self.estimate_shard_count(tests)?;
                build_shards_with_estimate(tests, self.index, max_shards, estimated, &estimate)
            }
        }
    }
}
