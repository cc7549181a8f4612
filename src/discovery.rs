//! Test list input.
//!
//! The tests to shard arrive as a list of identifiers in the platform's
//! identity-key format, each optionally marked ignored. Two file formats are
//! accepted:
//!
//! | Format | Example |
//! |--------|---------|
//! | JSON | `[{"identifier": "class Foo#testA", "ignored": true}]` |
//! | Text | one identifier per line; blank lines and `#` comments skipped |

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A test to be placed into a shard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestDescriptor {
    /// Identity key of the test, e.g. `class com.example.FooTest#testA`.
    pub identifier: String,

    /// Ignored tests are still placed but cost the ignored-test time.
    #[serde(default)]
    pub ignored: bool,
}

impl TestDescriptor {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ignored: false,
        }
    }

    /// Marks the test as ignored.
    pub fn set_ignored(mut self) -> Self {
        self.ignored = true;
        self
    }
}

/// Parses a test list from a string.
///
/// Input whose first non-whitespace character is `[` is read as JSON, anything
/// else as plain text.
///
/// # Example
///
/// ```
/// use shardwise::discovery::parse_test_list;
///
/// let tests = parse_test_list("class Foo#testA\n# comment\n\nclass Foo#testB\n")?;
/// assert_eq!(tests.len(), 2);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn parse_test_list(content: &str) -> Result<Vec<TestDescriptor>> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content).context("Failed to parse JSON test list");
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(TestDescriptor::new)
        .collect())
}

/// Loads a test list from a file.
pub async fn load_test_list(path: &Path) -> Result<Vec<TestDescriptor>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read test list: {}", path.display()))?;

    let tests = parse_test_list(&content)
        .with_context(|| format!("Failed to parse test list: {}", path.display()))?;

    tracing::debug!("Loaded {} tests from {}", tests.len(), path.display());
    Ok(tests)
}
