//! Phase 1: The Cartographer (Rate Ingest)
//!
//! Rate tables in, log-space graphs out. Where the rates come from is
//! someone else's problem; this phase only reads them from disk.

mod graph;
mod rates;
mod snapshot;

pub use graph::{build, ArbitrageGraph};
pub use rates::{
    entry_count, enumerate_currencies, load_rate_table, parse_json, parse_toml, Currency,
    RateTable,
};
pub use snapshot::{max_age_from_secs, MarketSnapshot, SnapshotStore};
