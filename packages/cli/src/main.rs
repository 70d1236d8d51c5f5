#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line tool for the disaster feed.
//!
//! Lists the configured sources, runs one-off refreshes, assesses hazard
//! risk at a point and watches the scheduled refresh loop.

mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use disaster_feed_aggregator::scheduler::DEFAULT_LIST_INTERVAL;
use disaster_feed_aggregator::{Aggregator, RefreshScheduler};
use disaster_feed_disaster_models::DisasterCategory;
use disaster_feed_risk::RiskEngine;
use disaster_feed_risk::scorer::DEFAULT_SEED;
use disaster_feed_source::FetchOptions;
use disaster_feed_source::registry;
use disaster_feed_source::retry::RetryPolicy;
use disaster_feed_source::source_def::SourceDefinition;
use disaster_feed_source_models::SourceConfig;

#[derive(Parser)]
#[command(name = "disaster_feed", about = "Disaster feed aggregation tool")]
struct Cli {
    /// Directory of source TOML files to use instead of the built-in set
    #[arg(long, global = true, env = "DISASTER_FEED_SOURCES_DIR")]
    sources_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all configured data sources
    Sources,
    /// Fetch every source once and print the merged result
    Refresh {
        /// Comma-separated categories to fetch (e.g. "flood,cyclone")
        #[arg(long, value_delimiter = ',', value_parser = parse_category)]
        category: Vec<DisasterCategory>,
        /// Per-source timeout in seconds
        #[arg(long, default_value = "10")]
        timeout_secs: u64,
        #[command(flatten)]
        fetch: FetchArgs,
        /// Print records and reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assess hazard risk at a point
    Assess {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Seed for deterministic scoring
        #[arg(long, default_value_t = DEFAULT_SEED, conflicts_with = "random")]
        seed: u64,
        /// Use non-deterministic scoring
        #[arg(long)]
        random: bool,
        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the refresh loop and print each published snapshot
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value_t = DEFAULT_LIST_INTERVAL.as_secs())]
        interval_secs: u64,
        /// Stop after this many published snapshots
        #[arg(long)]
        cycles: Option<u64>,
        #[command(flatten)]
        fetch: FetchArgs,
    },
}

#[derive(Args)]
struct FetchArgs {
    /// Maximum number of records to read per source
    #[arg(long)]
    limit: Option<u64>,
    /// Retries for transient HTTP failures per request
    #[arg(long, default_value_t = RetryPolicy::default().max_retries)]
    retries: u32,
}

impl FetchArgs {
    fn options(&self) -> FetchOptions {
        FetchOptions {
            limit: self.limit,
            retry: RetryPolicy::with_retries(self.retries),
            ..FetchOptions::default()
        }
    }
}

fn parse_category(value: &str) -> Result<DisasterCategory, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("unknown category '{value}'"))
}

fn load_sources(dir: Option<&Path>) -> Result<Vec<SourceDefinition>, Box<dyn std::error::Error>> {
    Ok(match dir {
        Some(dir) => registry::load_sources_dir(dir)?,
        None => registry::all_sources(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sources => {
            let sources: Vec<SourceConfig> = load_sources(cli.sources_dir.as_deref())?
                .iter()
                .map(SourceDefinition::config)
                .collect();
            print!("{}", render::sources(&sources));
        }
        Commands::Refresh {
            category,
            timeout_secs,
            fetch,
            json,
        } => {
            let mut aggregator = Aggregator::from_definitions(load_sources(
                cli.sources_dir.as_deref(),
            )?)
            .with_timeout(Duration::from_secs(timeout_secs.max(1)))
            .with_options(fetch.options());
            if !category.is_empty() {
                aggregator = aggregator.only(&category);
            }
            log::info!("Refreshing {} source(s)...", aggregator.sources().len());

            let aggregation = aggregator.aggregate().await;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "records": aggregation.records,
                        "sources": aggregation.sources,
                    }))?
                );
            } else {
                print!("{}", render::records(&aggregation.records));
                println!();
                print!("{}", render::reports(&aggregation.sources));
            }

            if aggregation.all_failed() {
                return Err("every source failed".into());
            }
        }
        Commands::Assess {
            lat,
            lng,
            seed,
            random,
            json,
        } => {
            let engine = if random {
                RiskEngine::random()
            } else {
                RiskEngine::seeded(seed)
            };
            let assessment = engine.assess(lat, lng)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
            } else {
                print!("{}", render::assessment(&assessment));
            }
        }
        Commands::Watch {
            interval_secs,
            cycles,
            fetch,
        } => {
            let aggregator = Aggregator::from_definitions(load_sources(cli.sources_dir.as_deref())?)
                .with_options(fetch.options());
            let handle = RefreshScheduler::new(Arc::new(aggregator))
                .start(Duration::from_secs(interval_secs.max(1)));
            let mut updates = handle.subscribe();
            let mut seen = 0;

            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = updates.borrow_and_update().clone();
                        println!("{}", render::snapshot_line(&snapshot));
                        seen += 1;
                        if cycles.is_some_and(|n| seen >= n) {
                            break;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        log::info!("Interrupted");
                        break;
                    }
                }
            }

            handle.stop().await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_accepts_category_list() {
        let cli = Cli::try_parse_from([
            "disaster_feed",
            "refresh",
            "--category",
            "flood, CYCLONE",
            "--limit",
            "20",
            "--retries",
            "0",
        ])
        .unwrap();
        let Commands::Refresh {
            category, fetch, ..
        } = cli.command
        else {
            panic!("expected refresh");
        };
        assert_eq!(
            category,
            vec![DisasterCategory::Flood, DisasterCategory::Cyclone]
        );

        let options = fetch.options();
        assert_eq!(options.limit, Some(20));
        assert_eq!(options.retry, RetryPolicy::none());
    }

    #[test]
    fn refresh_rejects_unknown_category() {
        assert!(Cli::try_parse_from(["disaster_feed", "refresh", "--category", "volcano"]).is_err());
    }

    #[test]
    fn assess_takes_negative_coordinates_and_rejects_seed_with_random() {
        let cli =
            Cli::try_parse_from(["disaster_feed", "assess", "--lat", "-12.5", "--lng", "130.8"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Assess { lat, seed: DEFAULT_SEED, random: false, .. } if (lat + 12.5).abs() < 1e-9
        ));

        assert!(
            Cli::try_parse_from([
                "disaster_feed",
                "assess",
                "--lat",
                "22",
                "--lng",
                "89",
                "--seed",
                "7",
                "--random",
            ])
            .is_err()
        );
    }

    #[test]
    fn fetch_defaults_keep_retry_policy() {
        let cli = Cli::try_parse_from(["disaster_feed", "watch", "--cycles", "2"]).unwrap();
        let Commands::Watch {
            interval_secs,
            cycles,
            fetch,
        } = cli.command
        else {
            panic!("expected watch");
        };
        assert_eq!(interval_secs, DEFAULT_LIST_INTERVAL.as_secs());
        assert_eq!(cycles, Some(2));
        assert_eq!(fetch.options().retry, RetryPolicy::default());
        assert_eq!(fetch.options().limit, None);
    }
}
