//! Continuous Monitor
//!
//! Polls a rate source, scans each table, reports what clears the filter,
//! then waits out the cooldown. Stops when the shutdown token fires; the
//! token is checked once per iteration and also cuts the cooldown short.

use eyre::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::brain::{find_opportunities_concurrent, BellmanFord, Opportunity, ProfitFilter};
use crate::cartographer::{ArbitrageGraph, RateTable, SnapshotStore};
use crate::config::Config;

// ============================================
// RATE SOURCES
// ============================================

/// Where the monitor gets its rate tables from
pub trait RateSource: Send {
    /// The current table, or `None` when no usable data is available
    fn latest(&mut self) -> Result<Option<RateTable>>;
}

impl RateSource for SnapshotStore {
    fn latest(&mut self) -> Result<Option<RateTable>> {
        self.load()
    }
}

/// Always returns the same table
#[derive(Debug, Clone)]
pub struct StaticRates(pub RateTable);

impl RateSource for StaticRates {
    fn latest(&mut self) -> Result<Option<RateTable>> {
        Ok(Some(self.0.clone()))
    }
}

// ============================================
// CANCELLATION
// ============================================

/// Cancellation token handed to the monitor loop
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Fires the matching `Shutdown`
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

pub fn shutdown_channel() -> (ShutdownHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, Shutdown { rx })
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        // No receivers left means nobody is listening; nothing to do
        let _ = self.tx.send(true);
    }
}

impl Shutdown {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. A dropped handle counts as cancellation.
    pub async fn cancelled(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

// ============================================
// MONITOR
// ============================================

/// Result of one scan. A timeout is not an empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed(Vec<Opportunity>),
    TimedOut,
}

/// Counters for a finished monitor run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub iterations: u64,
    pub scans: u64,
    pub timeouts: u64,
    pub empty_polls: u64,
    pub source_errors: u64,
    pub opportunities: u64,
}

pub struct Monitor {
    config: Config,
    filter: ProfitFilter,
}

impl Monitor {
    pub fn new(config: Config) -> Self {
        let filter = ProfitFilter::new(config.min_profit)
            .with_dedup(config.dedup_opportunities)
            .with_max_reported(config.max_reported);

        Self { config, filter }
    }

    pub fn filter(&self) -> &ProfitFilter {
        &self.filter
    }

    /// Build and scan one table off the async threads, bounded by the
    /// configured timeout. Returned opportunities are already filtered.
    pub async fn scan_once(&self, table: RateTable) -> Result<ScanOutcome> {
        let timeout = Duration::from_secs(self.config.scan_timeout_secs);
        let extraction = self.config.cycle_extraction;
        let min_profit = self.config.min_profit;
        let concurrent = self.config.concurrent_sources;

        let scan = async move {
            let graph = Arc::new(tokio::task::spawn_blocking(move || ArbitrageGraph::build(&table)).await?);

            if concurrent {
                find_opportunities_concurrent(graph, extraction, min_profit).await
            } else {
                let found = tokio::task::spawn_blocking(move || {
                    BellmanFord::new(&graph)
                        .with_extraction(extraction)
                        .find_opportunities(min_profit)
                })
                .await?;
                Ok(found)
            }
        };

        match bounded(timeout, scan).await? {
            Some(found) => Ok(ScanOutcome::Completed(self.filter.filter(&found))),
            None => Ok(ScanOutcome::TimedOut),
        }
    }

    /// Poll until `shutdown` fires
    pub async fn run<S: RateSource>(&self, source: &mut S, mut shutdown: Shutdown) -> Result<MonitorStats> {
        let cooldown = Duration::from_secs(self.config.analysis_cooldown_secs);
        let mut stats = MonitorStats::default();

        info!(
            "Monitor started (cooldown {}s, threshold {:.2}%)",
            self.config.analysis_cooldown_secs,
            self.config.min_profit * 100.0
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Exit command received");
                break;
            }
            stats.iterations += 1;

            match source.latest() {
                Ok(Some(table)) => match self.scan_once(table).await? {
                    ScanOutcome::Completed(found) => {
                        stats.scans += 1;
                        stats.opportunities += found.len() as u64;
                        for opportunity in &found {
                            info!("💰 {}", opportunity);
                        }
                        if found.is_empty() {
                            debug!("Iteration {}: nothing above threshold", stats.iterations);
                        }
                    }
                    ScanOutcome::TimedOut => {
                        stats.timeouts += 1;
                        warn!(
                            "Scan exceeded {}s - no result for this iteration",
                            self.config.scan_timeout_secs
                        );
                    }
                },
                Ok(None) => {
                    stats.empty_polls += 1;
                    warn!("No market data available");
                }
                Err(e) => {
                    stats.source_errors += 1;
                    error!("Error loading market data: {}", e);
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Exit command received");
                    break;
                }
                _ = tokio::time::sleep(cooldown) => {}
            }
        }

        info!(
            "Monitor stopped after {} iterations ({} scans, {} opportunities)",
            stats.iterations, stats.scans, stats.opportunities
        );

        Ok(stats)
    }
}

/// `None` when `scan` does not finish within `timeout`
async fn bounded<F>(timeout: Duration, scan: F) -> Result<Option<Vec<Opportunity>>>
where
    F: Future<Output = Result<Vec<Opportunity>>>,
{
    match tokio::time::timeout(timeout, scan).await {
        Ok(found) => found.map(Some),
        Err(_) => Ok(None),
    }
}
