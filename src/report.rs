//! Shard plan reporting.
//!
//! Every plan produces a two-line summary:
//!
//! ```text
//!   Smart shard cache hit: 80% (8 / 10)
//!   Shard times: 140s, 160s
//! ```
//!
//! [`log_plan`] emits it through `tracing`; [`print_summary`] writes a
//! styled version to the console.

use serde::Serialize;

use crate::shard::ShardPlan;

/// How many time estimates came from previous results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of tests considered.
    pub total: usize,

    /// Tests that fell back to the default time.
    pub misses: usize,
}

impl CacheStats {
    pub fn hits(&self) -> usize {
        self.total.saturating_sub(self.misses)
    }

    /// Hit rate as a whole percentage; 0 when there were no tests.
    pub fn hit_percent(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        ((self.hits() as f64 / self.total as f64) * 100.0).round() as usize
    }
}

/// The cache-hit line of the summary.
pub fn cache_hit_line(stats: &CacheStats) -> String {
    format!(
        "Smart shard cache hit: {}% ({} / {})",
        stats.hit_percent(),
        stats.hits(),
        stats.total
    )
}

/// The shard-times line of the summary, in shard order.
pub fn shard_times_line(plan: &ShardPlan) -> String {
    let times: Vec<String> = plan
        .shards
        .iter()
        .map(|s| format!("{}s", s.rounded_time()))
        .collect();

    format!("Shard times: {}", times.join(", "))
}

/// Logs the summary at `info` level.
pub fn log_plan(plan: &ShardPlan) {
    tracing::info!("{}", cache_hit_line(&plan.cache));
    tracing::info!("{}", shard_times_line(plan));
}

/// Prints the summary to stdout.
pub fn print_summary(plan: &ShardPlan) {
    let stats = &plan.cache;
    let percent = stats.hit_percent();
    let styled_percent = match percent {
        100 => console::style(format!("{}%", percent)).green(),
        0 => console::style(format!("{}%", percent)).red(),
        _ => console::style(format!("{}%", percent)).yellow(),
    };

    println!();
    println!(
        "  Smart shard cache hit: {} ({} / {})",
        styled_percent,
        stats.hits(),
        stats.total
    );
    println!("  {}", shard_times_line(plan));
    println!(
        "  {} shards, {} tests, expected wall time {}s",
        console::style(plan.shards.len()).bold(),
        plan.test_count(),
        plan.max_time().round() as u64
    );
}
