//! Longest-processing-time-first shard assignment.
//!
//! Tests are sorted by expected time, longest first, and each one goes into
//! whichever shard currently has the least accumulated time. The shards are
//! kept in a min-heap keyed on that time, so each placement is `O(log n)`.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::Serialize;

use super::{CountDisplay, EstimateConfig, EstimateSource, ShardError, ShardLimit, TestMethod, TestShard};
use crate::discovery::TestDescriptor;
use crate::duration::DurationIndex;
use crate::report::{self, CacheStats};

/// The result of a sharding run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShardPlan {
    /// Shards ordered by accumulated time, lightest first.
    pub shards: Vec<TestShard>,

    /// How many estimates came from history.
    pub cache: CacheStats,
}

impl ShardPlan {
    /// Sum of all shard times.
    pub fn total_time(&self) -> f64 {
        self.shards.iter().map(|s| s.accumulated_time).sum()
    }

    /// Time of the slowest shard, i.e. the expected wall-clock time.
    pub fn max_time(&self) -> f64 {
        self.shards
            .iter()
            .map(|s| s.accumulated_time)
            .fold(0.0, f64::max)
    }

    pub fn test_count(&self) -> usize {
        self.shards.iter().map(TestShard::len).sum()
    }
}

/// Heap entry: a shard's load and its position in the shard list.
#[derive(Debug, Clone, Copy)]
struct Load {
    time: f64,
    index: usize,
}

impl PartialEq for Load {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Load {}

impl PartialOrd for Load {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Load {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Assigns every test to a shard.
///
/// `forced_shards`, when set, replaces `max_shards` as the cap. The number of
/// shards never exceeds the number of tests with a positive time estimate;
/// if every estimate is zero (e.g. all tests ignored) a single shard is still
/// created for them.
///
/// The cache-hit rate and per-shard times are logged at `info` level.
///
/// # Errors
///
/// - [`ShardError::InvalidForcedShards`] for a forced count of zero, checked
///   before any other work.
/// - [`ShardError::NoShards`] when the resolved shard count is zero, for
///   instance for an empty test list or a zero cap.
///
/// # Example
///
/// ```
/// use shardwise::discovery::TestDescriptor;
/// use shardwise::duration::DurationIndex;
/// use shardwise::history::Platform;
/// use shardwise::shard::{EstimateConfig, ShardLimit, build_shards};
///
/// let index = DurationIndex::from_entries(
///     Platform::Android,
///     [("a", 100.0), ("b", 80.0), ("c", 60.0), ("d", 40.0), ("e", 20.0)]
///         .map(|(k, v)| (k.to_string(), v)),
/// );
/// let tests: Vec<_> = ["a", "b", "c", "d", "e"].map(TestDescriptor::new).into();
///
/// let plan = build_shards(&tests, &index, ShardLimit::AtMost(2), None, &EstimateConfig::default())?;
/// assert_eq!(plan.shards.len(), 2);
/// assert_eq!(plan.max_time(), 160.0);
/// # Ok::<(), shardwise::shard::ShardError>(())
/// ```
pub fn build_shards(
    tests: &[TestDescriptor],
    index: &DurationIndex,
    max_shards: ShardLimit,
    forced_shards: Option<usize>,
    estimate: &EstimateConfig,
) -> Result<ShardPlan, ShardError> {
    if forced_shards == Some(0) {
        return Err(ShardError::InvalidForcedShards(0));
    }

    assign(tests, index, max_shards, forced_shards, None, estimate)
}

/// Assigns every test using a shard count derived from a time budget.
///
/// `estimated_shards` comes from [`estimate_shard_count`] and replaces
/// `max_shards` as the cap when set. It is reported separately from a forced
/// count when no shard can be created.
///
/// [`estimate_shard_count`]: super::estimate_shard_count
pub fn build_shards_with_estimate(
    tests: &[TestDescriptor],
    index: &DurationIndex,
    max_shards: ShardLimit,
    estimated_shards: Option<usize>,
    estimate: &EstimateConfig,
) -> Result<ShardPlan, ShardError> {
    assign(tests, index, max_shards, None, estimated_shards, estimate)
}

fn assign(
    tests: &[TestDescriptor],
    index: &DurationIndex,
    max_shards: ShardLimit,
    forced_shards: Option<usize>,
    estimated_shards: Option<usize>,
    estimate: &EstimateConfig,
) -> Result<ShardPlan, ShardError> {
    let cap = match forced_shards.or(estimated_shards) {
        Some(count) => ShardLimit::AtMost(count),
        None => max_shards,
    };

    let mut cache_misses = 0;
    let mut methods: Vec<TestMethod> = tests
        .iter()
        .map(|test| {
            let (time, source) = estimate.resolve(test, index);
            if source == EstimateSource::Default {
                cache_misses += 1;
            }
            TestMethod::new(test.identifier.as_str(), time)
        })
        .collect();

    // Stable, so equal times keep their input order.
    methods.sort_by(|a, b| b.estimated_time.total_cmp(&a.estimated_time));

    let positive_count = match methods.iter().filter(|m| m.estimated_time > 0.0).count() {
        0 if !methods.is_empty() => 1,
        count => count,
    };

    let shard_count = match cap {
        ShardLimit::AtMost(limit) if limit <= positive_count => limit,
        _ => positive_count,
    };

    if shard_count == 0 {
        return Err(ShardError::NoShards {
            max_shards,
            forced: CountDisplay(forced_shards),
            estimated: CountDisplay(estimated_shards),
            test_count: tests.len(),
            positive_count,
            resolved: shard_count,
            platform: index.platform(),
        });
    }

    let mut shards = vec![TestShard::default(); shard_count];
    let mut loads: BinaryHeap<Reverse<Load>> = (0..shard_count)
        .map(|index| Reverse(Load { time: 0.0, index }))
        .collect();

    for method in methods {
        // The heap always holds shard_count >= 1 entries.
        if let Some(mut lightest) = loads.peek_mut() {
            let shard = &mut shards[lightest.0.index];
            shard.push(method);
            lightest.0.time = shard.accumulated_time;
        }
    }

    shards.sort_by(|a, b| a.accumulated_time.total_cmp(&b.accumulated_time));

    let plan = ShardPlan {
        shards,
        cache: CacheStats {
            total: tests.len(),
            misses: cache_misses,
        },
    };

    report::log_plan(&plan);

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Platform;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn index(entries: &[(&str, f64)]) -> DurationIndex {
        DurationIndex::from_entries(
            Platform::Android,
            entries.iter().map(|(k, v)| (k.to_string(), *v)),
        )
    }

    fn tests(names: &[&str]) -> Vec<TestDescriptor> {
        names.iter().map(|n| TestDescriptor::new(*n)).collect()
    }

    fn build(
        tests: &[TestDescriptor],
        index: &DurationIndex,
        max_shards: ShardLimit,
        forced: Option<usize>,
    ) -> Result<ShardPlan, ShardError> {
        build_shards(tests, index, max_shards, forced, &EstimateConfig::default())
    }

    fn shard_names(shard: &TestShard) -> Vec<&str> {
        shard.members.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_longest_first_two_shards() {
        let index = index(&[("a", 100.0), ("b", 80.0), ("c", 60.0), ("d", 40.0), ("e", 20.0)]);
        let plan = build(
            &tests(&["e", "d", "c", "b", "a"]),
            &index,
            ShardLimit::AtMost(2),
            None,
        )
        .unwrap();

        assert_eq!(plan.shards.len(), 2);
        assert_eq!(plan.shards[0].accumulated_time, 140.0);
        assert_eq!(plan.shards[1].accumulated_time, 160.0);
        assert_eq!(shard_names(&plan.shards[0]), vec!["b", "c"]);
        assert_eq!(shard_names(&plan.shards[1]), vec!["a", "d", "e"]);
        assert_eq!(plan.max_time(), 160.0);
    }

    #[test]
    fn test_members_in_assignment_order() {
        let index = index(&[("short", 1.0), ("long", 50.0), ("mid", 10.0)]);
        let plan = build(&tests(&["short", "long", "mid"]), &index, ShardLimit::AtMost(1), None)
            .unwrap();

        assert_eq!(shard_names(&plan.shards[0]), vec!["long", "mid", "short"]);
        assert_eq!(plan.shards[0].accumulated_time, 61.0);
    }

    #[test]
    fn test_shard_count_limited_by_positive_tests() {
        let index = index(&[("a", 5.0), ("b", 5.0), ("c", 0.0)]);
        let plan = build(&tests(&["a", "b", "c"]), &index, ShardLimit::Unlimited, None).unwrap();

        assert_eq!(plan.shards.len(), 2);
        assert_eq!(plan.test_count(), 3);
    }

    #[test]
    fn test_unlimited_uses_one_shard_per_test() {
        let plan = build(
            &tests(&["a", "b", "c", "d"]),
            &DurationIndex::default(),
            ShardLimit::Unlimited,
            None,
        )
        .unwrap();

        assert_eq!(plan.shards.len(), 4);
        assert!(plan.shards.iter().all(|s| s.len() == 1));
    }

    #[test]
    fn test_all_ignored_makes_one_shard() {
        let index = index(&[("a", 30.0), ("b", 20.0)]);
        let ignored: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| TestDescriptor::new(*n).set_ignored())
            .collect();

        let plan = build(&ignored, &index, ShardLimit::AtMost(10), None).unwrap();

        assert_eq!(plan.shards.len(), 1);
        assert_eq!(plan.shards[0].len(), 3);
        assert_eq!(plan.shards[0].accumulated_time, 0.0);
        assert!(plan.shards[0].members.iter().all(|m| m.estimated_time == 0.0));
    }

    #[test]
    fn test_forced_count_replaces_cap() {
        let plan = build(
            &tests(&["a", "b", "c", "d", "e", "f"]),
            &DurationIndex::default(),
            ShardLimit::AtMost(1),
            Some(3),
        )
        .unwrap();

        assert_eq!(plan.shards.len(), 3);
        assert!(plan.shards.iter().all(|s| s.len() == 2));
    }

    #[test]
    fn test_forced_zero_rejected() {
        let result = build(&tests(&["a"]), &DurationIndex::default(), ShardLimit::Unlimited, Some(0));
        assert_eq!(result, Err(ShardError::InvalidForcedShards(0)));
    }

    #[test]
    fn test_empty_tests_is_fatal() {
        let result = build(&[], &DurationIndex::default(), ShardLimit::AtMost(4), None);

        match result {
            Err(ShardError::NoShards {
                test_count,
                positive_count,
                resolved,
                platform,
                ..
            }) => {
                assert_eq!(test_count, 0);
                assert_eq!(positive_count, 0);
                assert_eq!(resolved, 0);
                assert_eq!(platform, Platform::Android);
            }
            other => panic!("expected NoShards, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_cap_is_fatal() {
        let result = build(&tests(&["a", "b"]), &DurationIndex::default(), ShardLimit::AtMost(0), None);
        assert!(matches!(result, Err(ShardError::NoShards { resolved: 0, .. })));
    }

    #[test]
    fn test_estimate_caps_like_forced() {
        let index = index(&[("a", 50.0), ("b", 40.0), ("c", 30.0), ("d", 20.0)]);
        let plan = build_shards_with_estimate(
            &tests(&["a", "b", "c", "d"]),
            &index,
            ShardLimit::Unlimited,
            Some(2),
            &EstimateConfig::default(),
        )
        .unwrap();

        assert_eq!(plan.shards.len(), 2);
        assert_eq!(plan.max_time(), 70.0);
    }

    #[test]
    fn test_estimate_reported_apart_from_forced() {
        let err = build_shards_with_estimate(
            &[],
            &DurationIndex::default(),
            ShardLimit::Unlimited,
            Some(3),
            &EstimateConfig::default(),
        )
        .unwrap_err();

        match &err {
            ShardError::NoShards {
                forced, estimated, ..
            } => {
                assert_eq!(*forced, CountDisplay(None));
                assert_eq!(*estimated, CountDisplay(Some(3)));
            }
            other => panic!("expected NoShards, got {:?}", other),
        }
        let message = err.to_string();
        assert!(message.contains("forced shards not set"));
        assert!(message.contains("time-budget estimate 3"));
    }

    #[test]
    fn test_cache_stats_all_hits() {
        let index = index(&[("a", 1.0), ("b", 2.0)]);
        let plan = build(&tests(&["a", "b"]), &index, ShardLimit::AtMost(2), None).unwrap();

        assert_eq!(plan.cache, CacheStats { total: 2, misses: 0 });
        assert_eq!(plan.cache.hit_percent(), 100);
    }

    #[test]
    fn test_cache_stats_no_hits() {
        let plan = build(&tests(&["a", "b"]), &DurationIndex::default(), ShardLimit::AtMost(2), None)
            .unwrap();

        assert_eq!(plan.cache, CacheStats { total: 2, misses: 2 });
        assert_eq!(plan.cache.hit_percent(), 0);
    }

    #[test]
    fn test_ignored_tests_are_not_misses() {
        let all = vec![
            TestDescriptor::new("known"),
            TestDescriptor::new("unknown"),
            TestDescriptor::new("skipped").set_ignored(),
        ];
        let plan = build(&all, &index(&[("known", 3.0)]), ShardLimit::AtMost(2), None).unwrap();

        assert_eq!(plan.cache.misses, 1);
    }

    #[test]
    fn test_custom_ignored_time() {
        let config = EstimateConfig {
            default_test_time: 120.0,
            ignored_test_time: 5.0,
        };
        let all = vec![TestDescriptor::new("a").set_ignored()];
        let plan =
            build_shards(&all, &DurationIndex::default(), ShardLimit::Unlimited, None, &config)
                .unwrap();

        assert_eq!(plan.shards[0].accumulated_time, 5.0);
    }

    #[test]
    fn test_random_inputs_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let count = rng.gen_range(1..60);
            let mut entries = Vec::new();
            let mut all = Vec::new();

            for i in 0..count {
                let name = format!("class Gen#test{}", i);
                if rng.gen_bool(0.7) {
                    entries.push((name.clone(), rng.gen_range(0.0..300.0)));
                }
                let mut test = TestDescriptor::new(name);
                if rng.gen_bool(0.1) {
                    test = test.set_ignored();
                }
                all.push(test);
            }

            let index = DurationIndex::from_entries(Platform::Android, entries);
            let max_shards = if rng.gen_bool(0.2) {
                ShardLimit::Unlimited
            } else {
                ShardLimit::AtMost(rng.gen_range(1..20))
            };

            let plan = build(&all, &index, max_shards, None).unwrap();

            // Every test placed exactly once.
            let placed: Vec<_> = plan
                .shards
                .iter()
                .flat_map(|s| s.members.iter().map(|m| m.name.as_str()))
                .collect();
            assert_eq!(placed.len(), all.len());
            let unique: HashSet<_> = placed.iter().collect();
            assert_eq!(unique.len(), all.len());

            // Shard times match their members and the resolved estimates.
            let estimate = EstimateConfig::default();
            let expected_total: f64 = all.iter().map(|t| estimate.resolve(t, &index).0).sum();
            assert!((plan.total_time() - expected_total).abs() < 1e-6);
            for shard in &plan.shards {
                let sum: f64 = shard.members.iter().map(|m| m.estimated_time).sum();
                assert!((shard.accumulated_time - sum).abs() < 1e-6);
            }

            assert!(!plan.shards.is_empty());
            if let ShardLimit::AtMost(cap) = max_shards {
                assert!(plan.shards.len() <= cap);
            }

            // Ordered lightest first.
            assert!(
                plan.shards
                    .windows(2)
                    .all(|w| w[0].accumulated_time <= w[1].accumulated_time)
            );
        }
    }
}
