//! Lookup of previously observed test durations.
//!
//! A [`DurationIndex`] maps a platform identity key (see
//! [`Platform::identity_key`]) to the last elapsed time recorded for that
//! test. It is built once per run and only read afterward.

use std::collections::HashMap;

use crate::history::{HistoricalResults, Platform};

/// Identity key to last observed duration in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationIndex {
    platform: Platform,
    durations: HashMap<String, f64>,
}

impl DurationIndex {
    /// Builds the index from previous results.
    ///
    /// Empty records and records without a non-negative time are skipped.
    /// When the same key appears more than once, the last record wins.
    ///
    /// # Example
    ///
    /// ```
    /// use shardwise::duration::DurationIndex;
    /// use shardwise::history::{HistoricalResults, Platform};
    ///
    /// let results = HistoricalResults::parse_junit(r#"
    ///     <testsuite>
    ///       <testcase classname="FooTest" name="testA" time="4.0"/>
    ///     </testsuite>
    /// "#)?;
    ///
    /// let index = DurationIndex::build(&results, Platform::Android);
    /// assert_eq!(index.get("class FooTest#testA"), Some(4.0));
    /// # Ok::<(), shardwise::history::HistoryError>(())
    /// ```
    pub fn build(results: &HistoricalResults, platform: Platform) -> Self {
        let mut durations = HashMap::new();
        let mut skipped = 0usize;

        for case in results.cases() {
            match case.time {
                Some(time) if !case.is_empty() && time >= 0.0 => {
                    let key = platform.identity_key(&case.class_name, &case.method_name);
                    durations.insert(key, time);
                }
                _ => skipped += 1,
            }
        }

        tracing::debug!(
            "Built {} duration index: {} entries, {} records skipped",
            platform,
            durations.len(),
            skipped
        );

        Self {
            platform,
            durations,
        }
    }

    /// Creates an index from precomputed `(key, seconds)` pairs.
    pub fn from_entries(
        platform: Platform,
        entries: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        Self {
            platform,
            durations: entries.into_iter().collect(),
        }
    }

    /// The platform whose key format this index uses.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Returns the recorded duration for `key`, if any.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.durations.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.durations.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }
}
