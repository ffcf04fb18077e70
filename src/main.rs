//! Currency Arb - Arbitrage Cycle Scanner
//!
//! Run with: cargo run -- demo

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use currency_arb::brain::{find_opportunities_concurrent, BellmanFord, CycleExtraction, ProfitFilter};
use currency_arb::cartographer::{
    entry_count, enumerate_currencies, load_rate_table, ArbitrageGraph, RateTable, SnapshotStore,
};
use currency_arb::config::Config;
use currency_arb::currencies::sample_rates;
use currency_arb::monitor::{shutdown_channel, Monitor};

#[derive(Parser)]
#[command(name = "currency-arb", version, about = "Find currency arbitrage cycles in exchange-rate tables")]
struct Cli {
    /// TOML config file (defaults to environment / .env)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan one rate table file (JSON, or TOML by extension)
    Scan {
        #[arg(long)]
        rates: PathBuf,

        /// Minimum profit fraction (0.1 = 10%)
        #[arg(long)]
        min_profit: Option<f64>,

        /// Use the dedicated negative-cycle search per source
        #[arg(long)]
        strict: bool,

        /// Keep every report, including rotations of the same cycle
        #[arg(long)]
        all: bool,

        /// Print opportunities as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan the built-in sample market
    Demo {
        #[arg(long)]
        min_profit: Option<f64>,
    },

    /// Store a rate table in the snapshot cache
    Import {
        #[arg(long)]
        rates: PathBuf,
    },

    /// Watch the snapshot cache until Ctrl-C
    Monitor,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 💱 CURRENCY ARB - Bellman-Ford Cycle Scanner").cyan().bold()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    Ok(config)
}

/// One detection pass, printed
async fn scan(config: &Config, table: RateTable, json: bool) -> Result<()> {
    if !json {
        println!(
            "{}",
            style(format!(
                "Building graph from {} currencies / {} rates...",
                enumerate_currencies(&table).len(),
                entry_count(&table)
            ))
            .blue()
        );
    }

    let start = Instant::now();
    let graph = ArbitrageGraph::build(&table);
    let build_time = start.elapsed();

    let start = Instant::now();
    let found = if config.concurrent_sources {
        find_opportunities_concurrent(Arc::new(graph.clone()), config.cycle_extraction, config.min_profit).await?
    } else {
        BellmanFord::new(&graph)
            .with_extraction(config.cycle_extraction)
            .find_opportunities(config.min_profit)
    };
    let algo_time = start.elapsed();

    let filter = ProfitFilter::new(config.min_profit)
        .with_dedup(config.dedup_opportunities)
        .with_max_reported(config.max_reported);
    let opportunities = filter.filter(&found);

    if json {
        println!("{}", serde_json::to_string_pretty(&opportunities)?);
        return Ok(());
    }

    println!(
        "{} Graph built in {:?}: {} nodes, {} edges ({} rates skipped)",
        style("✓").green(),
        build_time,
        graph.node_count(),
        graph.edge_count(),
        graph.skipped_rates()
    );
    println!(
        "{} Bellman-Ford from {} sources in {:?}: {} reports, {} after filtering",
        style("✓").green(),
        graph.node_count(),
        algo_time,
        found.len(),
        opportunities.len()
    );

    filter.print_summary(&opportunities);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("currency_arb=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Scan {
            rates,
            min_profit,
            strict,
            all,
            json,
        } => {
            if let Some(min_profit) = min_profit {
                config.min_profit = min_profit;
            }
            if strict {
                config.cycle_extraction = CycleExtraction::NegativeCycleSearch;
            }
            if all {
                config.dedup_opportunities = false;
            }
            config.validate()?;

            if !json {
                print_banner();
            }
            let table = load_rate_table(&rates)?;
            scan(&config, table, json).await?;
        }

        Command::Demo { min_profit } => {
            if let Some(min_profit) = min_profit {
                config.min_profit = min_profit;
            }
            config.validate()?;

            print_banner();
            scan(&config, sample_rates(), false).await?;
        }

        Command::Import { rates } => {
            config.validate()?;

            let table = load_rate_table(&rates)?;
            let store = SnapshotStore::new(&config.snapshot_path, config.snapshot_max_age_secs)?;
            store.save(&table)?;
            println!(
                "{} Stored {} currencies in {}",
                style("✓").green(),
                enumerate_currencies(&table).len(),
                store.path().display()
            );
        }

        Command::Monitor => {
            if let Err(e) = config.validate() {
                error!("Configuration validation failed: {}", e);
                error!("Please check your .env file");
                return Err(e);
            }

            print_banner();
            config.print_summary();
            println!();

            let (handle, shutdown) = shutdown_channel();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    handle.trigger();
                }
            });

            info!("Press Ctrl-C to exit");

            let mut store = SnapshotStore::new(&config.snapshot_path, config.snapshot_max_age_secs)?;
            let monitor = Monitor::new(config.clone());
            let stats = monitor.run(&mut store, shutdown).await;

            if config.cleanup_on_exit {
                if let Err(e) = store.cleanup() {
                    error!("Error during cleanup: {}", e);
                }
            }

            let stats = stats?;
            println!();
            println!("Summary:");
            println!("  • Iterations: {}", stats.iterations);
            println!("  • Scans completed: {}", stats.scans);
            println!("  • Scans timed out: {}", stats.timeouts);
            println!("  • Polls without data: {}", stats.empty_polls);
            println!("  • Source errors: {}", stats.source_errors);
            println!("  • Opportunities reported: {}", stats.opportunities);
        }
    }

    Ok(())
}
