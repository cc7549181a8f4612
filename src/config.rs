//! Configuration loading and schema definitions for shardwise.
//!
//! Configuration is read from a TOML file (by default `shardwise.toml`).
//! Every field has a default, so an empty file is a valid configuration.

pub mod schema;

pub use schema::*;

use std::path::Path;

use anyhow::{Context, Result};

/// Loads configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not match the schema.
///
/// # Example
///
/// ```no_run
/// use shardwise::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Path::new("shardwise.toml"))?;
/// println!("Max shards: {}", config.sharding.max_shards);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Loads configuration from a TOML string.
///
/// # Example
///
/// ```
/// use shardwise::config::load_config_str;
///
/// let config = load_config_str(r#"
///     [sharding]
///     shard_time_secs = 600
/// "#)?;
///
/// assert_eq!(config.sharding.shard_time_secs, 600);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;

    Ok(config)
}
