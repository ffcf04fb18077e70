//! All-Sources Bellman-Ford
//!
//! Step 2.1: The Pathfinder
//!
//! Runs Bellman-Ford from every vertex of the log-space graph. A single
//! source only sees the negative cycles it can reach with relaxed
//! distances, so every vertex gets its own run.
//!
//! The same cycle is usually reported once per source that reaches it,
//! as a rotation of the same currency sequence. Nothing here removes
//! those repeats; see `ProfitFilter` for that.

use petgraph::algo::find_negative_cycle;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cartographer::{ArbitrageGraph, Currency};

/// A profitable currency cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Closed path: the first currency is repeated at the end
    pub cycle: Vec<Currency>,
    /// Compounded rate minus one (0.1 = 10%)
    pub profit: f64,
}

impl Opportunity {
    pub fn profit_percentage(&self) -> f64 {
        self.profit * 100.0
    }

    pub fn hop_count(&self) -> usize {
        self.cycle.len().saturating_sub(1)
    }

    /// The cycle without the closing repeat
    pub fn currencies(&self) -> &[Currency] {
        match self.cycle.split_last() {
            Some((last, rest)) if rest.first() == Some(last) => rest,
            _ => &self.cycle,
        }
    }

    /// Rotated so the lexicographically smallest currency leads. Two
    /// reports of the same cycle from different sources canonicalize equal.
    pub fn canonical(&self) -> Opportunity {
        let open = self.currencies();
        let Some(start) = open
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
        else {
            return self.clone();
        };

        let mut cycle: Vec<Currency> = open[start..].iter().chain(&open[..start]).cloned().collect();
        if let Some(first) = cycle.first().cloned() {
            cycle.push(first);
        }

        Opportunity {
            cycle,
            profit: self.profit,
        }
    }

    pub fn format_path(&self) -> String {
        self.cycle.join(" → ")
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:+.3}%)", self.format_path(), self.profit_percentage())
    }
}

/// How a cycle is recovered once a source run proves one exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleExtraction {
    /// Walk predecessor links back from every edge that still relaxes
    /// after N-1 passes. May report several cycles per source.
    #[default]
    PredecessorWalk,

    /// One dedicated negative-cycle search per source (petgraph).
    /// Always returns a cycle of the predecessor graph, at most one per source.
    NegativeCycleSearch,
}

impl fmt::Display for CycleExtraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleExtraction::PredecessorWalk => f.pad("walk"),
            CycleExtraction::NegativeCycleSearch => f.pad("strict"),
        }
    }
}

impl FromStr for CycleExtraction {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "walk" | "predecessor_walk" => Ok(CycleExtraction::PredecessorWalk),
            "strict" | "negative_cycle_search" => Ok(CycleExtraction::NegativeCycleSearch),
            other => Err(eyre::eyre!(
                "Unknown cycle extraction '{}' (expected 'walk' or 'strict')",
                other
            )),
        }
    }
}

/// Distances and predecessors after the N-1 relaxation passes
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    pub distance: Vec<f64>,
    pub predecessor: Vec<Option<usize>>,
}

/// Bellman-Ford over a borrowed graph
pub struct BellmanFord<'a> {
    graph: &'a ArbitrageGraph,
    extraction: CycleExtraction,
    digraph: Option<DiGraph<Currency, f64>>,
}

impl<'a> BellmanFord<'a> {
    pub fn new(graph: &'a ArbitrageGraph) -> Self {
        Self {
            graph,
            extraction: CycleExtraction::PredecessorWalk,
            digraph: None,
        }
    }

    pub fn with_extraction(mut self, extraction: CycleExtraction) -> Self {
        self.extraction = extraction;
        self.digraph = match extraction {
            CycleExtraction::NegativeCycleSearch => Some(self.graph.to_digraph()),
            CycleExtraction::PredecessorWalk => None,
        };
        self
    }

    /// Run from every source in ascending index order and concatenate.
    pub fn find_opportunities(&self, min_profit: f64) -> Vec<Opportunity> {
        let mut opportunities = Vec::new();

        for source in 0..self.graph.node_count() {
            opportunities.extend(self.run_from(source, min_profit));
        }

        info!(
            "Found {} opportunities above {:.2}% across {} source runs ({})",
            opportunities.len(),
            min_profit * 100.0,
            self.graph.node_count(),
            self.extraction
        );

        opportunities
    }

    /// One independent source run
    pub fn run_from(&self, source: usize, min_profit: f64) -> Vec<Opportunity> {
        if source >= self.graph.node_count() {
            return Vec::new();
        }

        let raw_cycles = match self.extraction {
            CycleExtraction::PredecessorWalk => self.walk_cycles(source),
            CycleExtraction::NegativeCycleSearch => self.search_cycle(source).into_iter().collect(),
        };

        let opportunities: Vec<Opportunity> = raw_cycles
            .iter()
            .filter_map(|cycle| self.evaluate(cycle, min_profit))
            .collect();

        debug!(
            "Source {} ({}): {} raw cycles, {} above threshold",
            source,
            self.graph.currencies()[source],
            raw_cycles.len(),
            opportunities.len()
        );

        opportunities
    }

    /// N-1 full passes over every edge, relaxing in row-major order
    pub fn relax_from(&self, source: usize) -> ShortestPaths {
        let n = self.graph.node_count();
        let mut distance = vec![f64::INFINITY; n];
        let mut predecessor = vec![None; n];
        distance[source] = 0.0;

        for _ in 1..n {
            for (u, v, w) in self.graph.edges() {
                if distance[u] + w < distance[v] {
                    distance[v] = distance[u] + w;
                    predecessor[v] = Some(u);
                }
            }
        }

        ShortestPaths {
            distance,
            predecessor,
        }
    }

    /// Every edge that still relaxes yields one predecessor walk.
    fn walk_cycles(&self, source: usize) -> Vec<Vec<usize>> {
        let paths = self.relax_from(source);
        let mut cycles = Vec::new();

        for (u, v, w) in self.graph.edges() {
            if paths.distance[u] + w < paths.distance[v] {
                if let Some(cycle) = walk_predecessors(&paths.predecessor, v) {
                    cycles.push(cycle);
                }
            }
        }

        cycles
    }

    fn search_cycle(&self, source: usize) -> Option<Vec<usize>> {
        let digraph = self.digraph.as_ref()?;
        find_negative_cycle(digraph, NodeIndex::new(source))
            .map(|nodes| nodes.into_iter().map(|node| node.index()).collect())
    }

    /// Turn a raw index cycle into an opportunity if it clears `min_profit`
    fn evaluate(&self, cycle: &[usize], min_profit: f64) -> Option<Opportunity> {
        let distinct: HashSet<usize> = cycle.iter().copied().collect();
        if distinct.len() < 2 {
            return None;
        }

        let profit = self.graph.compound_rate(cycle)? - 1.0;
        if profit <= min_profit {
            return None;
        }

        let mut names: Vec<Currency> = cycle
            .iter()
            .map(|&i| self.graph.currencies()[i].clone())
            .collect();
        if cycle.first() != cycle.last() {
            names.push(names[0].clone());
        }

        Some(Opportunity {
            cycle: names,
            profit,
        })
    }
}

/// Follow predecessors back from `start` until some node repeats. The nodes
/// from the repeated one onward form the cycle; reversed, they are in trade
/// order. `None` if the chain runs out before repeating.
fn walk_predecessors(predecessor: &[Option<usize>], start: usize) -> Option<Vec<usize>> {
    let mut walked = Vec::new();
    let mut position = vec![None; predecessor.len()];
    let mut current = start;

    loop {
        if let Some(first_visit) = position[current] {
            let mut cycle = walked.split_off(first_visit);
            cycle.reverse();
            return Some(cycle);
        }

        position[current] = Some(walked.len());
        walked.push(current);
        current = predecessor[current]?;
    }
}

/// All-sources detection with the default extraction
pub fn find_opportunities(graph: &ArbitrageGraph, min_profit: f64) -> Vec<Opportunity> {
    BellmanFord::new(graph).find_opportunities(min_profit)
}

/// Same result as `BellmanFord::find_opportunities`, with each source run
/// on the blocking pool. Runs are merged in ascending source order.
pub async fn find_opportunities_concurrent(
    graph: Arc<ArbitrageGraph>,
    extraction: CycleExtraction,
    min_profit: f64,
) -> eyre::Result<Vec<Opportunity>> {
    let runs = (0..graph.node_count()).map(|source| {
        let graph = Arc::clone(&graph);
        tokio::task::spawn_blocking(move || {
            BellmanFord::new(&graph)
                .with_extraction(extraction)
                .run_from(source, min_profit)
        })
    });

    let mut opportunities = Vec::new();
    for run in futures::future::join_all(runs).await {
        opportunities.extend(run?);
    }

    Ok(opportunities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartographer::{build, parse_json};

    const EPS: f64 = 1e-9;

    fn detect(json: &str, min_profit: f64) -> Vec<Opportunity> {
        find_opportunities(&build(&parse_json(json).unwrap()), min_profit)
    }

    const TWO_CYCLE: &str = r#"{"A": {"B": 2.0}, "B": {"A": 0.6}}"#;
    const THREE_CYCLE: &str = r#"{"A": {"B": 1.5}, "B": {"C": 1.5}, "C": {"A": 0.5}}"#;
    const DENSE: &str = r#"{
        "A": {"B": 1.5, "C": 2.2, "D": 3.0},
        "B": {"A": 0.7, "C": 1.4, "D": 2.8},
        "C": {"A": 0.45, "B": 0.7, "D": 1.9},
        "D": {"A": 0.33, "B": 0.35, "C": 0.53}
    }"#;

    #[test]
    fn test_empty_table_has_no_opportunities() {
        for min_profit in [0.0, 0.1, 10.0] {
            assert!(detect("{}", min_profit).is_empty());
        }
    }

    #[test]
    fn test_single_pair_has_no_cycle() {
        for min_profit in [0.0, 0.1] {
            assert!(detect(r#"{"A": {"B": 2.0}}"#, min_profit).is_empty());
        }
    }

    #[test]
    fn test_profitable_two_cycle() {
        let found = detect(TWO_CYCLE, 0.1);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].cycle, vec!["A", "B", "A"]);
        assert!((found[0].profit - 0.2).abs() < EPS);
        assert_eq!(found[0].hop_count(), 2);
    }

    #[test]
    fn test_unprofitable_two_cycle() {
        assert!(detect(r#"{"A": {"B": 2.0}, "B": {"A": 0.4}}"#, 0.0).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        // 2.0 * 0.75 = 1.5 exactly
        let table = r#"{"A": {"B": 2.0}, "B": {"A": 0.75}}"#;

        assert!(detect(table, 0.5).is_empty());
        assert_eq!(detect(table, 0.5 - 1e-9).len(), 1);
    }

    #[test]
    fn test_three_cycle_reported_once_per_source() {
        let found = detect(THREE_CYCLE, 0.1);

        // Every vertex lies on the cycle, so every source run reports it
        assert_eq!(found.len(), 3);
        for opportunity in &found {
            assert_eq!(opportunity.hop_count(), 3);
            assert_eq!(opportunity.cycle.first(), opportunity.cycle.last());
            assert!((opportunity.profit - 0.125).abs() < EPS);
            assert_eq!(opportunity.canonical().cycle, vec!["A", "B", "C", "A"]);
        }
    }

    #[test]
    fn test_monotone_in_threshold() {
        let graph = build(&parse_json(DENSE).unwrap());
        let thresholds = [0.0, 0.01, 0.05, 0.1, 0.2, 0.3, 0.5];

        for pair in thresholds.windows(2) {
            let lower = find_opportunities(&graph, pair[0]);
            let higher = find_opportunities(&graph, pair[1]);
            assert!(higher.len() <= lower.len());
            for opportunity in &higher {
                assert!(lower.contains(opportunity));
            }
        }
    }

    #[test]
    fn test_non_positive_rate_never_completes_a_cycle() {
        // The only way back to A is through a zero or negative rate
        let table = r#"{"A": {"B": 3.0}, "B": {"C": 3.0, "A": 0.0}, "C": {"A": -5.0}}"#;

        assert!(detect(table, 0.0).is_empty());
    }

    #[test]
    fn test_unit_rate_alone_is_not_profitable() {
        assert!(detect(r#"{"A": {"B": 1.0}, "B": {"A": 1.0}}"#, 0.0).is_empty());

        // ...but it can carry a profitable cycle
        let found = detect(r#"{"A": {"B": 1.0}, "B": {"C": 1.0}, "C": {"A": 1.2}}"#, 0.0);
        assert!(!found.is_empty());
        assert!(found.iter().all(|o| (o.profit - 0.2).abs() < EPS));
    }

    #[test]
    fn test_zero_threshold_reports_small_profits() {
        let found = detect(r#"{"A": {"B": 2.0}, "B": {"A": 0.5005}}"#, 0.0);

        assert_eq!(found.len(), 1);
        assert!((found[0].profit - 0.001).abs() < EPS);
    }

    #[test]
    fn test_reported_profit_matches_table_rates() {
        let table = parse_json(DENSE).unwrap();
        let found = find_opportunities(&build(&table), 0.0);

        assert!(!found.is_empty());
        for opportunity in &found {
            let product: f64 = opportunity
                .cycle
                .windows(2)
                .map(|hop| table[&hop[0]][&hop[1]])
                .product();
            assert!((product - 1.0 - opportunity.profit).abs() < EPS);
            assert!(opportunity.profit > 0.0);
            assert!(opportunity.currencies().len() >= 2);
        }
    }

    #[test]
    fn test_profitable_self_loop_is_degenerate() {
        assert!(detect(r#"{"A": {"A": 1.5}}"#, 0.0).is_empty());
    }

    #[test]
    fn test_results_grouped_by_source() {
        let graph = build(&parse_json(THREE_CYCLE).unwrap());
        let detector = BellmanFord::new(&graph);

        let mut expected = Vec::new();
        for source in 0..graph.node_count() {
            expected.extend(detector.run_from(source, 0.1));
        }
        assert_eq!(detector.find_opportunities(0.1), expected);
        assert!(detector.run_from(99, 0.1).is_empty());
    }

    #[test]
    fn test_sources_run_in_input_order() {
        let found = detect(r#"{"zeta": {"alpha": 2.0}, "alpha": {"zeta": 0.6}}"#, 0.1);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].cycle, vec!["zeta", "alpha", "zeta"]);
    }

    #[test]
    fn test_walk_drops_tail_before_cycle() {
        // Walking back from 0 reaches 1, then loops 1 <-> 2
        let predecessor = vec![Some(1), Some(2), Some(1), None];
        assert_eq!(walk_predecessors(&predecessor, 0), Some(vec![2, 1]));

        let chain = vec![None, Some(0), Some(1)];
        assert_eq!(walk_predecessors(&chain, 2), None);
    }

    #[test]
    fn test_relaxation_distances() {
        let graph = build(&parse_json(r#"{"A": {"B": 2.0}, "B": {"C": 4.0}}"#).unwrap());
        let paths = BellmanFord::new(&graph).relax_from(0);

        assert_eq!(paths.distance[0], 0.0);
        assert!((paths.distance[2] + 8.0_f64.ln()).abs() < EPS);
        assert_eq!(paths.predecessor, vec![None, Some(0), Some(1)]);
    }

    #[test]
    fn test_strict_extraction_finds_same_cycles() {
        let graph = build(&parse_json(THREE_CYCLE).unwrap());
        let strict = BellmanFord::new(&graph)
            .with_extraction(CycleExtraction::NegativeCycleSearch)
            .find_opportunities(0.1);

        assert!(!strict.is_empty());
        assert!(strict.len() <= graph.node_count());
        for opportunity in &strict {
            assert!((opportunity.profit - 0.125).abs() < EPS);
            assert_eq!(opportunity.canonical().cycle, vec!["A", "B", "C", "A"]);
        }

        let none = BellmanFord::new(&build(&parse_json(r#"{"A": {"B": 2.0}, "B": {"A": 0.4}}"#).unwrap()))
            .with_extraction(CycleExtraction::NegativeCycleSearch)
            .find_opportunities(0.0);
        assert!(none.is_empty());
    }

    #[test]
    fn test_concurrent_matches_sequential() {
        let graph = Arc::new(build(&parse_json(DENSE).unwrap()));
        let sequential = find_opportunities(&graph, 0.0);

        let concurrent = tokio_test::block_on(find_opportunities_concurrent(
            Arc::clone(&graph),
            CycleExtraction::PredecessorWalk,
            0.0,
        ))
        .unwrap();

        assert_eq!(concurrent, sequential);
    }

    #[test]
    fn test_canonical_rotation() {
        let opportunity = Opportunity {
            cycle: vec!["C".into(), "A".into(), "B".into(), "C".into()],
            profit: 0.125,
        };

        assert_eq!(opportunity.currencies(), &["C", "A", "B"]);
        assert_eq!(opportunity.canonical().cycle, vec!["A", "B", "C", "A"]);
        assert_eq!(opportunity.format_path(), "C → A → B → C");
        assert_eq!(opportunity.to_string(), "C → A → B → C (+12.500%)");
    }

    #[test]
    fn test_extraction_parse() {
        assert_eq!("walk".parse::<CycleExtraction>().unwrap(), CycleExtraction::PredecessorWalk);
        assert_eq!("STRICT".parse::<CycleExtraction>().unwrap(), CycleExtraction::NegativeCycleSearch);
        assert!("dfs".parse::<CycleExtraction>().is_err());
    }
}
