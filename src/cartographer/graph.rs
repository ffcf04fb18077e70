//! Graph Construction - Log-Space Edition
//!
//! Step 1.2: The Map Maker
//!
//! Turns a rate table into a dense N×N matrix of `-ln(rate)` weights.
//! A cycle whose rates multiply to more than 1 becomes a cycle whose
//! weights sum to less than 0, which Bellman-Ford can find.

use petgraph::graph::DiGraph;
use std::collections::HashMap;
use tracing::{debug, info};

use super::rates::{enumerate_currencies, Currency, RateTable};

/// The arbitrage graph
#[derive(Debug, Clone)]
pub struct ArbitrageGraph {
    currencies: Vec<Currency>,
    currency_to_index: HashMap<Currency, usize>,
    /// `weights[i][j] = -ln(rate)`, `f64::INFINITY` when there is no edge
    weights: Vec<Vec<f64>>,
    /// Raw rates for the same edges, used to compound profit
    rates: Vec<Vec<Option<f64>>>,
    edge_count: usize,
    skipped_rates: usize,
}

impl ArbitrageGraph {
    pub fn build(table: &RateTable) -> Self {
        let currencies = enumerate_currencies(table);
        let n = currencies.len();

        let currency_to_index: HashMap<Currency, usize> = currencies
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        let mut weights = vec![vec![f64::INFINITY; n]; n];
        let mut rates = vec![vec![None; n]; n];
        let mut edge_count = 0;
        let mut skipped_rates = 0;

        for (source, targets) in table {
            let i = currency_to_index[source];
            for (target, &rate) in targets {
                let j = currency_to_index[target];

                // Non-positive rates mean "no conversion"; non-finite ones
                // have no usable log weight either.
                if rate <= 0.0 || !rate.is_finite() {
                    skipped_rates += 1;
                    continue;
                }

                weights[i][j] = -rate.ln();
                rates[i][j] = Some(rate);
                edge_count += 1;
            }
        }

        if skipped_rates > 0 {
            debug!("Skipped {} non-positive or non-finite rates", skipped_rates);
        }

        info!("Graph built: {} Nodes, {} Edges", n, edge_count);

        Self {
            currencies,
            currency_to_index,
            weights,
            rates,
            edge_count,
            skipped_rates,
        }
    }

    pub fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    pub fn currency(&self, index: usize) -> Option<&Currency> {
        self.currencies.get(index)
    }

    pub fn index_of(&self, currency: &str) -> Option<usize> {
        self.currency_to_index.get(currency).copied()
    }

    pub fn node_count(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Rates dropped during construction
    pub fn skipped_rates(&self) -> usize {
        self.skipped_rates
    }

    /// Log-space weight of `from -> to` (`INFINITY` when absent)
    pub fn weight(&self, from: usize, to: usize) -> f64 {
        self.weights[from][to]
    }

    /// Raw conversion rate of `from -> to`
    pub fn rate(&self, from: usize, to: usize) -> Option<f64> {
        self.rates[from][to]
    }

    /// All present edges as `(from, to, weight)`, row-major.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.weights.iter().enumerate().flat_map(|(u, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, w)| w.is_finite())
                .map(move |(v, &w)| (u, v, w))
        })
    }

    /// Product of the raw rates along `path`. A path whose last element is
    /// not its first is closed by wrapping back to the start. Returns `None`
    /// if any hop has no edge.
    pub fn compound_rate(&self, path: &[usize]) -> Option<f64> {
        if path.len() < 2 {
            return None;
        }

        let mut product = 1.0;
        for pair in path.windows(2) {
            product *= self.rate(pair[0], pair[1])?;
        }

        let (first, last) = (path[0], path[path.len() - 1]);
        if first != last {
            product *= self.rate(last, first)?;
        }

        Some(product)
    }

    /// Same graph as a petgraph adjacency list. Node index `i` is currency `i`.
    pub fn to_digraph(&self) -> DiGraph<Currency, f64> {
        let mut graph = DiGraph::with_capacity(self.node_count(), self.edge_count);

        for currency in &self.currencies {
            graph.add_node(currency.clone());
        }

        let nodes: Vec<_> = graph.node_indices().collect();
        for (u, v, w) in self.edges() {
            graph.add_edge(nodes[u], nodes[v], w);
        }

        graph
    }
}

/// Build the log-space graph for a rate table
pub fn build(table: &RateTable) -> ArbitrageGraph {
    ArbitrageGraph::build(table)
}
