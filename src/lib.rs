//! shardwise: time-balanced test sharding.
//!
//! This crate splits a test list into shards whose expected run times are as
//! even as possible, using durations recorded in previous JUnit reports.
//!
//! # Architecture
//!
//! The main components are:
//!
//! - **History**: Parse previous JUnit results and derive platform identity keys
//! - **Duration index**: Last observed time per identity key
//! - **Shard**: Shard count estimation and longest-first greedy assignment
//! - **Report**: Cache-hit and per-shard time summaries
//!
//! # Example
//!
//! ```no_run
//! use shardwise::config::load_config;
//! use shardwise::discovery::load_test_list;
//! use shardwise::duration::DurationIndex;
//! use shardwise::history::load_junit_files;
//! use shardwise::shard::Sharder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config(std::path::Path::new("shardwise.toml"))?;
//!     let tests = load_test_list(std::path::Path::new("tests.txt")).await?;
//!     let history = load_junit_files(&config.history.junit_paths).await;
//!
//!     let index = DurationIndex::build(&history, config.sharding.platform);
//!     let plan = Sharder::new(&config.sharding, &index).plan(&tests)?;
//!     println!("{} shards", plan.shards.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod discovery;
pub mod duration;
pub mod history;
pub mod report;
pub mod shard;

// Re-export commonly used types
pub use config::{Config, load_config};
pub use discovery::TestDescriptor;
pub use duration::DurationIndex;
pub use history::{HistoricalResults, Platform};
pub use shard::{ShardError, ShardPlan, Sharder, TestMethod, TestShard};
