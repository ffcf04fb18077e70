//! Profit Filter
//!
//! Step 2.2: The Filter
//!
//! The all-sources search reports each cycle once per source that reaches
//! it. This is where those rotations collapse into one canonical entry,
//! ordered best first.

use console::style;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::Opportunity;
use crate::currencies::display_name;

/// Threshold, dedup and ordering for detected opportunities
#[derive(Debug, Clone)]
pub struct ProfitFilter {
    /// Minimum profit fraction (strictly greater than)
    min_profit: f64,

    /// Collapse rotations of the same cycle
    dedup: bool,

    /// Rows shown by `print_summary`
    max_reported: usize,
}

impl ProfitFilter {
    pub fn new(min_profit: f64) -> Self {
        Self {
            min_profit,
            dedup: true,
            max_reported: 10,
        }
    }

    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_max_reported(mut self, max_reported: usize) -> Self {
        self.max_reported = max_reported;
        self
    }

    pub fn min_profit(&self) -> f64 {
        self.min_profit
    }

    /// Threshold, canonicalize, dedup (if enabled), best first
    pub fn filter(&self, opportunities: &[Opportunity]) -> Vec<Opportunity> {
        let above: Vec<Opportunity> = opportunities
            .iter()
            .filter(|o| o.profit > self.min_profit)
            .cloned()
            .collect();

        let below = opportunities.len() - above.len();
        if below > 0 {
            debug!(
                "Filtered out {} opportunities at or below {:.2}%",
                below,
                self.min_profit * 100.0
            );
        }

        let mut kept = if self.dedup {
            dedup(&above)
        } else {
            above.iter().map(Opportunity::canonical).collect()
        };

        kept.sort_by(|a, b| {
            b.profit
                .partial_cmp(&a.profit)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cycle.cmp(&b.cycle))
        });

        if self.dedup && kept.len() < above.len() {
            info!(
                "Collapsed {} reports into {} unique cycles",
                above.len(),
                kept.len()
            );
        }

        kept
    }

    /// Print the top opportunities
    pub fn print_summary(&self, opportunities: &[Opportunity]) {
        if opportunities.is_empty() {
            warn!("No opportunities above {:.2}%", self.min_profit * 100.0);
            return;
        }

        println!();
        println!("{}", style("═══ ARBITRAGE OPPORTUNITIES ═══").yellow().bold());
        println!();
        println!("Minimum profit threshold: {:.2}%", self.min_profit * 100.0);
        println!("Found {} opportunities", opportunities.len());
        println!();

        let to_show = opportunities.len().min(self.max_reported);
        for (i, opportunity) in opportunities.iter().take(to_show).enumerate() {
            let path = opportunity
                .cycle
                .iter()
                .map(|c| display_name(c))
                .collect::<Vec<_>>()
                .join(" → ");

            println!(
                "  {}. {} | {} hops | {}",
                i + 1,
                style(format!("{:+.3}%", opportunity.profit_percentage())).green().bold(),
                opportunity.hop_count(),
                style(path).cyan()
            );
        }

        if opportunities.len() > to_show {
            println!("  ... and {} more", opportunities.len() - to_show);
        }
        println!();
    }
}

impl Default for ProfitFilter {
    fn default() -> Self {
        Self::new(0.1) // 10% minimum profit
    }
}

/// Canonicalize and keep the first report of each cycle, in input order.
pub fn dedup(opportunities: &[Opportunity]) -> Vec<Opportunity> {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut unique = Vec::new();

    for opportunity in opportunities {
        let canonical = opportunity.canonical();
        if seen.insert(canonical.cycle.clone()) {
            unique.push(canonical);
        }
    }

    unique
}
