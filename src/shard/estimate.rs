//! Shard count estimation from a per-shard time budget.

use super::{EstimateConfig, ShardError, ShardLimit, TimeBudget};
use crate::discovery::TestDescriptor;
use crate::duration::DurationIndex;

/// Estimates how many shards keep each one under `budget`.
///
/// Returns `Ok(None)` for [`TimeBudget::Unbounded`] without looking at the
/// tests; the caller then falls back to its own shard cap. Otherwise the
/// total expected time is divided by the budget, rounded up, and capped at
/// `max_shards`.
///
/// # Errors
///
/// - [`ShardError::InvalidTimeBudget`] for a zero-second budget.
/// - [`ShardError::InvalidShardCount`] if the capped count is zero.
///
/// # Example
///
/// ```
/// use shardwise::discovery::TestDescriptor;
/// use shardwise::duration::DurationIndex;
/// use shardwise::shard::{EstimateConfig, ShardLimit, TimeBudget, estimate_shard_count};
///
/// // No history: every test is assumed to take 120s.
/// let tests: Vec<_> = (0..10).map(|i| TestDescriptor::new(format!("t{}", i))).collect();
/// let count = estimate_shard_count(
///     &tests,
///     &DurationIndex::default(),
///     TimeBudget::Seconds(600),
///     ShardLimit::Unlimited,
///     &EstimateConfig::default(),
/// )?;
/// assert_eq!(count, Some(2));
/// # Ok::<(), shardwise::shard::ShardError>(())
/// ```
pub fn estimate_shard_count(
    tests: &[TestDescriptor],
    index: &DurationIndex,
    budget: TimeBudget,
    max_shards: ShardLimit,
    estimate: &EstimateConfig,
) -> Result<Option<usize>, ShardError> {
    let budget = match budget {
        TimeBudget::Unbounded => return Ok(None),
        TimeBudget::Seconds(0) => return Err(ShardError::InvalidTimeBudget(0)),
        TimeBudget::Seconds(secs) => secs as f64,
    };

    let total_time: f64 = tests
        .iter()
        .map(|test| estimate.resolve(test, index).0)
        .sum();

    let count = if total_time <= budget {
        1
    } else {
        (total_time / budget).ceil() as usize
    };

    let capped = max_shards.clamp(count);
    tracing::debug!(
        "Estimated {:.0}s of tests for a {:.0}s budget: {} shards ({} after cap {})",
        total_time,
        budget,
        count,
        capped,
        max_shards
    );

    if capped == 0 {
        return Err(ShardError::InvalidShardCount {
            count: capped,
            max_shards,
        });
    }

    Ok(Some(capped))
}
