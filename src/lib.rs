//! Currency arbitrage detection
//!
//! Phase 1 (`cartographer`) turns a rate table into a log-space graph.
//! Phase 2 (`brain`) runs Bellman-Ford from every currency, reports the
//! cycles whose compounded rate clears the threshold, and collapses repeats.
//! `monitor` wraps both in a polling loop over a snapshot file.

pub mod brain;
pub mod cartographer;
pub mod config;
pub mod currencies;
pub mod monitor;

pub use brain::{find_opportunities, BellmanFord, CycleExtraction, Opportunity, ProfitFilter};
pub use cartographer::{build, ArbitrageGraph, Currency, RateTable};
pub use config::Config;
