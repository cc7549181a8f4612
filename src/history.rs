//! Historical test results.
//!
//! Prior-run durations come from JUnit XML reports. This module parses those
//! reports into a [`HistoricalResults`] value that [`DurationIndex`] turns
//! into a lookup table.
//!
//! # Format
//!
//! Both a `<testsuites>` root and a bare `<testsuite>` root are accepted:
//!
//! ```xml
//! <testsuites>
//!   <testsuite name="app" tests="2">
//!     <testcase classname="com.example.FooTest" name="testA" time="12.5"/>
//!     <testcase classname="com.example.FooTest" name="testB" time="3.0">
//!       <failure message="boom"/>
//!     </testcase>
//!   </testsuite>
//! </testsuites>
//! ```
//!
//! Only `classname`, `name` and `time` are read. A `time` that is missing or
//! does not parse as a number leaves the record without a duration.
//!
//! [`DurationIndex`]: crate::duration::DurationIndex

pub mod platform;

pub use platform::Platform;

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors produced while parsing a results document.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The document is not well-formed JUnit XML.
    #[error("Failed to parse JUnit XML: {0}")]
    Parse(#[from] quick_xml::de::DeError),
}

/// A single `<testcase>` from a previous run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseRecord {
    /// The `classname` attribute.
    pub class_name: String,

    /// The `name` attribute.
    pub method_name: String,

    /// Elapsed seconds, if the report recorded a usable value.
    pub time: Option<f64>,
}

impl CaseRecord {
    /// Creates a record without a recorded time.
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            time: None,
        }
    }

    /// Sets the recorded elapsed time in seconds.
    pub fn with_time(mut self, seconds: f64) -> Self {
        self.time = Some(seconds);
        self
    }

    /// A record is empty when it carries neither a class nor a method name.
    pub fn is_empty(&self) -> bool {
        self.class_name.trim().is_empty() && self.method_name.trim().is_empty()
    }
}

/// A `<testsuite>` and the cases it contains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteRecord {
    pub name: Option<String>,
    pub cases: Vec<CaseRecord>,
}

/// All suites from one or more previous runs, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalResults {
    pub suites: Vec<SuiteRecord>,
}

impl HistoricalResults {
    /// Parses a JUnit XML document.
    ///
    /// # Example
    ///
    /// ```
    /// use shardwise::history::HistoricalResults;
    ///
    /// let results = HistoricalResults::parse_junit(r#"
    ///     <testsuite name="app">
    ///       <testcase classname="FooTest" name="testA" time="1.5"/>
    ///     </testsuite>
    /// "#)?;
    /// assert_eq!(results.cases().count(), 1);
    /// # Ok::<(), shardwise::history::HistoryError>(())
    /// ```
    pub fn parse_junit(xml: &str) -> Result<Self, HistoryError> {
        let raw: RawReport = quick_xml::de::from_str(xml)?;

        let mut suites: Vec<SuiteRecord> = raw.suites.into_iter().map(SuiteRecord::from).collect();

        // Bare <testsuite> root: its cases land directly on the report.
        if !raw.cases.is_empty() {
            suites.push(SuiteRecord {
                name: raw.name,
                cases: raw.cases.into_iter().map(CaseRecord::from).collect(),
            });
        }

        Ok(Self { suites })
    }

    /// Appends the suites of `other`; its records win on repeated keys.
    pub fn merge(&mut self, other: HistoricalResults) {
        self.suites.extend(other.suites);
    }

    /// Iterates over every case in every suite, in order.
    pub fn cases(&self) -> impl Iterator<Item = &CaseRecord> {
        self.suites.iter().flat_map(|s| s.cases.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.cases().next().is_none()
    }
}

/// Loads one JUnit report from disk.
///
/// A missing or unparseable file yields empty results with a warning: a
/// first run has no history, and a broken report should only cost accuracy.
pub async fn load_junit_file(path: &Path) -> HistoricalResults {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        tracing::warn!("No previous results at {}, using default test times", path.display());
        return HistoricalResults::default();
    }

    match tokio::fs::read_to_string(path).await {
        Ok(contents) => match HistoricalResults::parse_junit(&contents) {
            Ok(results) => {
                tracing::debug!(
                    "Loaded {} test cases from {}",
                    results.cases().count(),
                    path.display()
                );
                results
            }
            Err(e) => {
                tracing::warn!("Ignoring results at {}: {}", path.display(), e);
                HistoricalResults::default()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read results at {}: {}", path.display(), e);
            HistoricalResults::default()
        }
    }
}

/// Loads several JUnit reports concurrently and merges them in the given
/// order, so later files take precedence.
pub async fn load_junit_files(paths: &[PathBuf]) -> HistoricalResults {
    let loaded =
        futures::future::join_all(paths.iter().map(|p| load_junit_file(p.as_path()))).await;

    let mut merged = HistoricalResults::default();
    for results in loaded {
        merged.merge(results);
    }

    merged
}

#[derive(Debug, Deserialize)]
struct RawReport {
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "testsuite", default)]
    suites: Vec<RawSuite>,
    #[serde(rename = "testcase", default)]
    cases: Vec<RawCase>,
}

#[derive(Debug, Deserialize)]
struct RawSuite {
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "testcase", default)]
    cases: Vec<RawCase>,
}

#[derive(Debug, Deserialize)]
struct RawCase {
    #[serde(rename = "@classname", default)]
    classname: Option<String>,
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "@time", default)]
    time: Option<String>,
}

impl From<RawSuite> for SuiteRecord {
    fn from(raw: RawSuite) -> Self {
        Self {
            name: raw.name,
            cases: raw.cases.into_iter().map(CaseRecord::from).collect(),
        }
    }
}

impl From<RawCase> for CaseRecord {
    fn from(raw: RawCase) -> Self {
        Self {
            class_name: raw.classname.unwrap_or_default(),
            method_name: raw.name.unwrap_or_default(),
            time: raw.time.as_deref().and_then(|t| t.trim().parse::<f64>().ok()),
        }
    }
}
