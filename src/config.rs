//! Configuration for the arbitrage scanner
//!
//! Values come from environment variables (and a `.env` file), or from a
//! TOML file with the same field names.

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::brain::CycleExtraction;
use crate::cartographer::max_age_from_secs;

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ========== Detection ==========
    /// Minimum profit fraction to report (0.1 = 10%)
    pub min_profit: f64,

    /// How cycles are recovered after relaxation
    pub cycle_extraction: CycleExtraction,

    /// Collapse rotations of the same cycle before reporting
    pub dedup_opportunities: bool,

    /// Fan source runs out over the blocking pool
    pub concurrent_sources: bool,

    /// Rows shown per report
    pub max_reported: usize,

    // ========== Monitor ==========
    /// Seconds between market analyses
    pub analysis_cooldown_secs: u64,

    /// A scan taking longer than this yields no result
    pub scan_timeout_secs: u64,

    // ========== Snapshot Cache ==========
    /// Where the acquisition layer drops rate snapshots
    pub snapshot_path: String,

    /// Snapshots older than this are ignored
    pub snapshot_max_age_secs: u64,

    /// Remove the snapshot file when the monitor exits
    pub cleanup_on_exit: bool,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            min_profit: env_parse("MIN_PROFIT", defaults.min_profit)?,
            cycle_extraction: match env::var("CYCLE_EXTRACTION") {
                Ok(value) => CycleExtraction::from_str(&value)?,
                Err(_) => defaults.cycle_extraction,
            },
            dedup_opportunities: env_parse("DEDUP_OPPORTUNITIES", defaults.dedup_opportunities)?,
            concurrent_sources: env_parse("CONCURRENT_SOURCES", defaults.concurrent_sources)?,
            max_reported: env_parse("MAX_REPORTED", defaults.max_reported)?,
            analysis_cooldown_secs: env_parse(
                "ANALYSIS_COOLDOWN_SECS",
                defaults.analysis_cooldown_secs,
            )?,
            scan_timeout_secs: env_parse("SCAN_TIMEOUT_SECS", defaults.scan_timeout_secs)?,
            snapshot_path: env::var("SNAPSHOT_PATH").unwrap_or(defaults.snapshot_path),
            snapshot_max_age_secs: env_parse(
                "SNAPSHOT_MAX_AGE_SECS",
                defaults.snapshot_max_age_secs,
            )?,
            cleanup_on_exit: env_parse("CLEANUP_ON_EXIT", defaults.cleanup_on_exit)?,
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.min_profit.is_finite() || self.min_profit < 0.0 {
            return Err(eyre::eyre!(
                "MIN_PROFIT must be a non-negative fraction (currently {})",
                self.min_profit
            ));
        }
        if self.analysis_cooldown_secs == 0 {
            return Err(eyre::eyre!("ANALYSIS_COOLDOWN_SECS must be at least 1"));
        }
        if self.scan_timeout_secs == 0 {
            return Err(eyre::eyre!("SCAN_TIMEOUT_SECS must be at least 1"));
        }
        if self.snapshot_max_age_secs == 0 {
            return Err(eyre::eyre!("SNAPSHOT_MAX_AGE_SECS must be at least 1"));
        }
        if max_age_from_secs(self.snapshot_max_age_secs).is_err() {
            return Err(eyre::eyre!(
                "SNAPSHOT_MAX_AGE_SECS is too large (currently {})",
                self.snapshot_max_age_secs
            ));
        }
        if self.max_reported == 0 {
            return Err(eyre::eyre!("MAX_REPORTED must be at least 1"));
        }
        if self.snapshot_path.trim().is_empty() {
            return Err(eyre::eyre!("SNAPSHOT_PATH must not be empty"));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              CURRENCY ARB - CONFIGURATION                  ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ DETECTION                                                  ║");
        println!("║ • Min Profit:      {:<38.2}% ║", self.min_profit * 100.0);
        println!("║ • Extraction:      {:^40} ║", self.cycle_extraction);
        println!("║ • Dedup:           {:^40} ║",
            if self.dedup_opportunities { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("║ • Concurrent:      {:^40} ║",
            if self.concurrent_sources { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ MONITOR                                                    ║");
        println!("║ • Cooldown:        {:>38}s ║", self.analysis_cooldown_secs);
        println!("║ • Scan Timeout:    {:>38}s ║", self.scan_timeout_secs);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ SNAPSHOT                                                   ║");
        println!("║ • Path:            {:^40} ║", self.snapshot_path);
        println!("║ • Max Age:         {:>38}s ║", self.snapshot_max_age_secs);
        println!("║ • Cleanup on Exit: {:^40} ║",
            if self.cleanup_on_exit { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_profit: 0.1,
            cycle_extraction: CycleExtraction::PredecessorWalk,
            dedup_opportunities: true,
            concurrent_sources: false,
            max_reported: 10,
            analysis_cooldown_secs: 5,
            scan_timeout_secs: 30,
            snapshot_path: "market_data.json".to_string(),
            snapshot_max_age_secs: 300,
            cleanup_on_exit: true,
        }
    }
}

/// Parse an env var, falling back to `default` when unset
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| eyre::eyre!("Invalid {}='{}': {}", key, value, e)),
        Err(_) => Ok(default),
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.min_profit, 0.1);
        assert_eq!(config.analysis_cooldown_secs, 5);
        assert_eq!(config.snapshot_max_age_secs, 300);
        assert_eq!(config.cycle_extraction, CycleExtraction::PredecessorWalk);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let negative = Config { min_profit: -0.1, ..Config::default() };
        assert!(negative.validate().is_err());

        let nan = Config { min_profit: f64::NAN, ..Config::default() };
        assert!(nan.validate().is_err());

        let no_cooldown = Config { analysis_cooldown_secs: 0, ..Config::default() };
        assert!(no_cooldown.validate().is_err());

        let no_timeout = Config { scan_timeout_secs: 0, ..Config::default() };
        assert!(no_timeout.validate().is_err());

        let huge_max_age = Config { snapshot_max_age_secs: 10u64.pow(17), ..Config::default() };
        assert!(huge_max_age.validate().is_err());

        let wrapping_max_age = Config { snapshot_max_age_secs: u64::MAX, ..Config::default() };
        assert!(wrapping_max_age.validate().is_err());

        let zero_threshold = Config { min_profit: 0.0, ..Config::default() };
        assert!(zero_threshold.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            min_profit: 0.05,
            cycle_extraction: CycleExtraction::NegativeCycleSearch,
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "min_profit = 0.02\ncycle_extraction = \"negative_cycle_search\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.min_profit, 0.02);
        assert_eq!(config.cycle_extraction, CycleExtraction::NegativeCycleSearch);
        assert_eq!(config.snapshot_path, "market_data.json");
    }

    #[test]
    fn test_env_parse_fallback_and_errors() {
        assert_eq!(env_parse("CURRENCY_ARB_TEST_UNSET_KEY", 7u64).unwrap(), 7);

        env::set_var("CURRENCY_ARB_TEST_BAD_KEY", "seven");
        assert!(env_parse("CURRENCY_ARB_TEST_BAD_KEY", 7u64).is_err());
        env::remove_var("CURRENCY_ARB_TEST_BAD_KEY");
    }
}
