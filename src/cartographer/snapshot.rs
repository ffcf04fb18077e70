//! Market Snapshot Cache
//!
//! Rate tables produced by the (external) acquisition layer are dropped into
//! a timestamped JSON file. Readers ignore snapshots older than `max_age`.

use chrono::{DateTime, Duration, Utc};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::rates::RateTable;

/// A rate table plus the moment it was captured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub timestamp: DateTime<Utc>,
    pub data: RateTable,
}

impl MarketSnapshot {
    pub fn new(data: RateTable) -> Self {
        Self {
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) < max_age
    }
}

/// Freshness window for `secs`, rejecting values chrono cannot represent
pub fn max_age_from_secs(secs: u64) -> Result<Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| eyre!("Snapshot max age of {}s is out of range", secs))
}

/// File-backed snapshot cache
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    max_age: Duration,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P, max_age_secs: u64) -> Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            max_age: max_age_from_secs(max_age_secs)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Write `data` with the current timestamp
    pub fn save(&self, data: &RateTable) -> Result<()> {
        self.write(&MarketSnapshot::new(data.clone()))
    }

    pub fn write(&self, snapshot: &MarketSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string(snapshot)?;
        fs::write(&self.path, json)?;

        info!("Market data saved to {}", self.path.display());
        Ok(())
    }

    /// Read the snapshot regardless of age. `None` if there is no file.
    pub fn read(&self) -> Result<Option<MarketSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let snapshot = serde_json::from_str(&content)
            .map_err(|e| eyre!("Malformed snapshot {}: {}", self.path.display(), e))?;

        Ok(Some(snapshot))
    }

    /// The cached rate table, if present and fresh
    pub fn load(&self) -> Result<Option<RateTable>> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Result<Option<RateTable>> {
        let Some(snapshot) = self.read()? else {
            return Ok(None);
        };

        if !snapshot.is_fresh(now, self.max_age) {
            debug!(
                "Snapshot {} is stale ({}s old)",
                self.path.display(),
                snapshot.age(now).num_seconds()
            );
            return Ok(None);
        }

        Ok(Some(snapshot.data))
    }

    /// Remove the cache file if it exists
    pub fn cleanup(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!("Removed snapshot {}", self.path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartographer::rates::parse_json;

    fn sample() -> RateTable {
        parse_json(r#"{"A": {"B": 2.0}, "B": {"A": 0.6}}"#).unwrap()
    }

    #[test]
    fn test_save_then_load_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("market_data.json"), 300).unwrap();

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nothing.json"), 300).unwrap();

        assert_eq!(store.load().unwrap(), None);
        store.cleanup().unwrap();
    }

    #[test]
    fn test_stale_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("market_data.json"), 300).unwrap();

        let mut snapshot = MarketSnapshot::new(sample());
        snapshot.timestamp = Utc::now() - Duration::seconds(301);
        store.write(&snapshot).unwrap();

        assert_eq!(store.load().unwrap(), None);
        // Still readable when age does not matter
        assert_eq!(store.read().unwrap().map(|s| s.data), Some(sample()));
    }

    #[test]
    fn test_freshness_window() {
        let snapshot = MarketSnapshot::new(sample());
        let max_age = Duration::seconds(300);

        assert!(snapshot.is_fresh(snapshot.timestamp + Duration::seconds(299), max_age));
        assert!(!snapshot.is_fresh(snapshot.timestamp + Duration::seconds(300), max_age));
    }

    #[test]
    fn test_max_age_out_of_range_is_an_error() {
        assert_eq!(max_age_from_secs(300).unwrap(), Duration::seconds(300));
        assert!(max_age_from_secs(10u64.pow(17)).is_err());
        assert!(max_age_from_secs(u64::MAX).is_err());

        assert!(SnapshotStore::new("market_data.json", 10u64.pow(17)).is_err());
        assert!(SnapshotStore::new("market_data.json", 1 << 63).is_err());
    }

    #[test]
    fn test_malformed_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("market_data.json");
        fs::write(&path, r#"{"timestamp": "yesterday", "data": []}"#).unwrap();

        let store = SnapshotStore::new(&path, 300).unwrap();
        assert!(store.load().is_err());
    }

    #[test]
    fn test_cleanup_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested/market_data.json"), 300).unwrap();

        store.save(&sample()).unwrap();
        assert!(store.path().exists());

        store.cleanup().unwrap();
        assert!(!store.path().exists());
    }
}
