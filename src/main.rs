//! shardwise CLI - time-balanced test sharding.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use shardwise::config::{self, Config};
use shardwise::discovery::{TestDescriptor, load_test_list};
use shardwise::duration::DurationIndex;
use shardwise::history::{Platform, load_junit_files};
use shardwise::report;
use shardwise::shard::Sharder;

#[derive(Parser)]
#[command(name = "shardwise")]
#[command(about = "Time-balanced test sharding", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "shardwise.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign tests to shards
    Plan {
        /// Test list (JSON array or one identifier per line)
        #[arg(short, long)]
        tests: PathBuf,

        /// Previous JUnit results; overrides [history] in the config
        #[arg(long)]
        history: Vec<PathBuf>,

        /// Write the shard plan as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Estimate the shard count from the time budget only
    Count {
        /// Test list (JSON array or one identifier per line)
        #[arg(short, long)]
        tests: PathBuf,

        /// Previous JUnit results; overrides [history] in the config
        #[arg(long)]
        history: Vec<PathBuf>,
    },

    /// Print the identity key used for duration lookups
    Key {
        /// Platform (android, ios)
        #[arg(short, long)]
        platform: Platform,

        /// JUnit classname
        #[arg(long)]
        class: String,

        /// JUnit test name
        #[arg(long)]
        method: String,
    },

    /// Validate configuration file
    Validate,

    /// Initialize a new configuration file
    Init {
        /// Platform (android, ios)
        #[arg(short, long, default_value = "android")]
        platform: Platform,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the plan.
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Plan {
            tests,
            history,
            output,
            format,
        } => plan_shards(&cli.config, &tests, history, output, &format).await,
        Commands::Count { tests, history } => count_shards(&cli.config, &tests, history).await,
        Commands::Key {
            platform,
            class,
            method,
        } => {
            println!("{}", platform.identity_key(&class, &method));
            Ok(())
        }
        Commands::Validate => validate_config(&cli.config),
        Commands::Init { platform } => init_config(platform),
    }
}

/// Loads the config, falling back to defaults when the file is absent.
fn load_config_or_default(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        warn!(
            "No config at {}, using default settings",
            config_path.display()
        );
        return Ok(Config::default());
    }

    let config = config::load_config(config_path)?;
    info!("Loaded configuration from {}", config_path.display());
    Ok(config)
}

/// Loads the test list and the duration index concurrently.
async fn load_inputs(
    config: &Config,
    tests_path: &Path,
    history_override: Vec<PathBuf>,
) -> Result<(Vec<TestDescriptor>, DurationIndex)> {
    let history_paths = if history_override.is_empty() {
        config.history.junit_paths.clone()
    } else {
        history_override
    };

    let (tests, history) = tokio::join!(
        load_test_list(tests_path),
        load_junit_files(&history_paths)
    );
    let tests = tests?;

    let index = DurationIndex::build(&history, config.sharding.platform);
    info!(
        "{} tests, {} recorded durations ({})",
        tests.len(),
        index.len(),
        config.sharding.platform
    );

    Ok((tests, index))
}

async fn plan_shards(
    config_path: &Path,
    tests_path: &Path,
    history: Vec<PathBuf>,
    output: Option<PathBuf>,
    format: &str,
) -> Result<()> {
    let config = load_config_or_default(config_path)?;
    let (tests, index) = load_inputs(&config, tests_path, history).await?;

    let plan = Sharder::new(&config.sharding, &index).plan(&tests)?;

    let json = serde_json::to_string_pretty(&plan)?;
    if let Some(path) = &output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write shard plan: {}", path.display()))?;
        info!("Shard plan written to: {}", path.display());
    }

    match format {
        "json" => println!("{}", json),
        _ => {
            for (i, shard) in plan.shards.iter().enumerate() {
                println!(
                    "Shard {} ({} tests, {}s):",
                    i + 1,
                    shard.len(),
                    shard.rounded_time()
                );
                for method in &shard.members {
                    println!("  {}", method.name);
                }
            }
            report::print_summary(&plan);
        }
    }

    Ok(())
}

async fn count_shards(config_path: &Path, tests_path: &Path, history: Vec<PathBuf>) -> Result<()> {
    let config = load_config_or_default(config_path)?;
    let (tests, index) = load_inputs(&config, tests_path, history).await?;

    match Sharder::new(&config.sharding, &index).estimate_shard_count(&tests)? {
        Some(count) => println!("{}", count),
        None => println!("unbounded"),
    }

    Ok(())
}

fn validate_config(config_path: &Path) -> Result<()> {
    match config::load_config(config_path) {
        Ok(config) => {
            let sharding = &config.sharding;

            // Reject invalid limits and test times up front.
            shardwise::shard::TimeBudget::from_secs(sharding.shard_time_secs)?;
            shardwise::shard::ShardLimit::from_raw(sharding.max_shards)?;
            shardwise::shard::forced_shard_count(sharding.forced_shards)?;
            sharding.estimate()?;

            println!("Configuration is valid!");
            println!();
            println!("Settings:");
            println!("  Platform: {}", sharding.platform);
            println!("  Shard time: {}s", sharding.shard_time_secs);
            println!("  Max shards: {}", sharding.max_shards);
            println!("  Forced shards: {}", sharding.forced_shards);
            println!("  Sharding disabled: {}", sharding.disable_sharding);
            println!("  Default test time: {}s", sharding.default_test_time_secs);
            println!("  Ignored test time: {}s", sharding.ignored_test_time_secs);
            println!("  History files: {}", config.history.junit_paths.len());

            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_config(platform: Platform) -> Result<()> {
    let results_file = match platform {
        Platform::Android => "results/JUnitReport.xml",
        Platform::Ios => "results/ios_junit.xml",
    };

    let config = format!(
        r#"# shardwise configuration file

[sharding]
platform = "{}"
# Target seconds per shard, -1 for no target
shard_time_secs = -1
# Upper bound on shards, -1 for unlimited
max_shards = 1
# Exact shard count, -1 to derive it
forced_shards = -1
disable_sharding = false
default_test_time_secs = 120.0
ignored_test_time_secs = 0.0

[history]
junit_paths = ["{}"]
"#,
        platform.to_string().to_lowercase(),
        results_file
    );

    let path = PathBuf::from("shardwise.toml");
    if path.exists() {
        eprintln!("shardwise.toml already exists. Remove it first or edit manually.");
        std::process::exit(1);
    }

    std::fs::write(&path, config)?;
    println!("Created shardwise.toml");
    println!();
    println!("Edit the configuration as needed, then run:");
    println!("  shardwise plan --tests tests.txt");

    Ok(())
}
