//! Platform-specific test identity keys.
//!
//! Historical durations are looked up by an identity key that must match,
//! byte for byte, the identifiers the test list uses for the same test.
//! Android and iOS runners name tests differently, so each platform has its
//! own key format.
//!
//! # Supported Formats
//!
//! | Platform | JUnit classname | JUnit name | Identity key |
//! |----------|-----------------|------------|--------------|
//! | android | `com.example.FooTest` | `testBar` | `class com.example.FooTest#testBar` |
//! | ios | `FooTests` | `testBar()` | `FooTests/testBar` |

use serde::{Deserialize, Serialize};

/// Selects how identity keys are derived from JUnit attributes.
///
/// # Example
///
/// ```toml
/// [sharding]
/// platform = "ios"
/// ```
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Instrumentation tests: `class {classname}#{name}`
    #[default]
    Android,

    /// XCTest: `{classname}/{name}` with any trailing `(...)` removed from
    /// the method name.
    Ios,
}

impl Platform {
    /// Builds the identity key for a test case.
    ///
    /// The execution-reporting side must use this same function when it
    /// records new results, otherwise later lookups miss silently.
    ///
    /// # Example
    ///
    /// ```
    /// use shardwise::history::Platform;
    ///
    /// assert_eq!(
    ///     Platform::Android.identity_key("com.example.LoginTest", "testLogin"),
    ///     "class com.example.LoginTest#testLogin"
    /// );
    /// assert_eq!(
    ///     Platform::Ios.identity_key("LoginTests", "testLogin()"),
    ///     "LoginTests/testLogin"
    /// );
    /// ```
    pub fn identity_key(&self, class_name: &str, method_name: &str) -> String {
        match self {
            Platform::Android => format!("class {}#{}", class_name, method_name),
            Platform::Ios => format!("{}/{}", class_name, strip_parameter_suffix(method_name)),
        }
    }

    /// Human-readable platform name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Android => "Android",
            Platform::Ios => "iOS",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(format!("unknown platform '{}', expected android or ios", other)),
        }
    }
}

/// Removes a trailing parenthesized suffix, e.g. `testFoo()` -> `testFoo`.
///
/// Only the group closed by the final `)` is removed. An unbalanced name is
/// returned unchanged.
fn strip_parameter_suffix(method_name: &str) -> &str {
    if !method_name.ends_with(')') {
        return method_name;
    }

    let mut depth = 0usize;
    for (idx, ch) in method_name.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    return &method_name[..idx];
                }
            }
            _ => {}
        }
    }

    method_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_android_key() {
        assert_eq!(
            Platform::Android.identity_key("com.example.FooTest", "testBar"),
            "class com.example.FooTest#testBar"
        );
    }

    #[test]
    fn test_ios_key_strips_empty_parens() {
        assert_eq!(
            Platform::Ios.identity_key("FooTests", "testBar()"),
            "FooTests/testBar"
        );
    }

    #[test]
    fn test_ios_key_strips_parameter_list() {
        assert_eq!(
            Platform::Ios.identity_key("FooTests", "testBar(value:)"),
            "FooTests/testBar"
        );
    }

    #[test]
    fn test_ios_key_keeps_inner_parens() {
        assert_eq!(
            Platform::Ios.identity_key("Foo", "test(a)Bar()"),
            "Foo/test(a)Bar"
        );
        assert_eq!(
            Platform::Ios.identity_key("Foo", "testBar(f(x))"),
            "Foo/testBar"
        );
    }

    #[test]
    fn test_ios_key_unbalanced_suffix_unchanged() {
        assert_eq!(Platform::Ios.identity_key("Foo", "testBar)"), "Foo/testBar)");
    }

    #[test]
    fn test_ios_key_without_suffix() {
        assert_eq!(
            Platform::Ios.identity_key("FooTests", "testBar"),
            "FooTests/testBar"
        );
    }

    #[test]
    fn test_android_key_keeps_parens() {
        assert_eq!(
            Platform::Android.identity_key("Foo", "bar()"),
            "class Foo#bar()"
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!("android".parse::<Platform>().unwrap(), Platform::Android);
        assert_eq!("iOS".parse::<Platform>().unwrap(), Platform::Ios);
        assert!("windows".parse::<Platform>().is_err());
    }

    #[test]
    fn test_deserialize_platform() {
        #[derive(Deserialize)]
        struct TestConfig {
            platform: Platform,
        }

        let android: TestConfig = toml::from_str(r#"platform = "android""#).unwrap();
        assert_eq!(android.platform, Platform::Android);

        let ios: TestConfig = toml::from_str(r#"platform = "ios""#).unwrap();
        assert_eq!(ios.platform, Platform::Ios);
    }
}
