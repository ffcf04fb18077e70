//! Diagnostic tool - Check configuration and snapshot status
//!
//! Run with: cargo run --bin diagnose

use std::env;

use currency_arb::cartographer::{ArbitrageGraph, SnapshotStore};
use currency_arb::config::Config;

fn main() {
    println!("🔍 CURRENCY ARB DIAGNOSTIC CHECK\n");

    // Load .env
    dotenvy::dotenv().ok();

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    let checks = [
        ("MIN_PROFIT", "0.1", "Minimum profit fraction"),
        ("CYCLE_EXTRACTION", "walk", "walk or strict"),
        ("DEDUP_OPPORTUNITIES", "true", "Collapse rotations?"),
        ("CONCURRENT_SOURCES", "false", "Fan out source runs?"),
        ("MAX_REPORTED", "10", "Rows per report"),
        ("ANALYSIS_COOLDOWN_SECS", "5", "Seconds between analyses"),
        ("SCAN_TIMEOUT_SECS", "30", "Seconds before a scan is abandoned"),
        ("SNAPSHOT_PATH", "market_data.json", "Snapshot cache file"),
        ("SNAPSHOT_MAX_AGE_SECS", "300", "Snapshot freshness window"),
        ("CLEANUP_ON_EXIT", "true", "Delete snapshot on exit?"),
    ];

    for (key, default, desc) in checks {
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        let is_default = env::var(key).is_err();
        let marker = if is_default { "(default)" } else { "(from .env)" };
        println!("  {}: {} {}", key, value, marker);
        println!("    └─ {}\n", desc);
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("❌ Configuration does not parse: {}", e);
            return;
        }
    };

    match config.validate() {
        Ok(()) => println!("✅ Configuration is valid\n"),
        Err(e) => println!("❌ Configuration is invalid: {}\n", e),
    }

    println!("═══════════════════════════════════════════════════");
    println!("                    SNAPSHOT                        ");
    println!("═══════════════════════════════════════════════════\n");

    let store = match SnapshotStore::new(&config.snapshot_path, config.snapshot_max_age_secs) {
        Ok(store) => store,
        Err(e) => {
            println!("  ❌ {}\n", e);
            return;
        }
    };
    match store.read() {
        Ok(None) => println!("  ⚠️  No snapshot at {}", store.path().display()),
        Ok(Some(snapshot)) => {
            let now = chrono::Utc::now();
            let age = snapshot.age(now).num_seconds();
            let fresh = snapshot.is_fresh(now, store.max_age());
            let graph = ArbitrageGraph::build(&snapshot.data);
            println!("  Path: {}", store.path().display());
            println!("  Age: {}s {}", age, if fresh { "✅ fresh" } else { "⚠️  stale" });
            println!(
                "  Graph: {} currencies, {} edges, {} rates skipped",
                graph.node_count(),
                graph.edge_count(),
                graph.skipped_rates()
            );
        }
        Err(e) => println!("  ❌ Snapshot unreadable: {}", e),
    }

    println!();
}
