//! Phase 2: The Brain
//!
//! Responsible for:
//! - Finding negative cycles (arbitrage opportunities) using Bellman-Ford
//! - Collapsing repeated reports and ordering by profit

mod bellman_ford;
mod filter;

pub use bellman_ford::{
    find_opportunities, find_opportunities_concurrent, BellmanFord, CycleExtraction, Opportunity,
    ShortestPaths,
};
pub use filter::{dedup, ProfitFilter};
