//! Rate Tables
//!
//! Step 1.1: The Ledger
//!
//! A rate table maps a source currency to the currencies it converts into,
//! with the number of destination units one source unit buys.

use eyre::{eyre, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Opaque currency label (e.g. "divine", "exalted")
pub type Currency = String;

/// source -> (target -> rate). Missing entries mean "no direct conversion".
/// Both levels keep the order the entries were read in.
pub type RateTable = IndexMap<Currency, IndexMap<Currency, f64>>;

/// All currencies in the table, in first-seen order: each source, then
/// each of its targets, skipping anything already listed.
pub fn enumerate_currencies(table: &RateTable) -> Vec<Currency> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut currencies = Vec::new();

    for (source, targets) in table {
        if seen.insert(source.as_str()) {
            currencies.push(source.clone());
        }
        for target in targets.keys() {
            if seen.insert(target.as_str()) {
                currencies.push(target.clone());
            }
        }
    }

    currencies
}

/// Number of (source, target) entries, usable or not
pub fn entry_count(table: &RateTable) -> usize {
    table.values().map(|targets| targets.len()).sum()
}

/// Parse a rate table from JSON
pub fn parse_json(content: &str) -> Result<RateTable> {
    serde_json::from_str(content).map_err(|e| eyre!("Rate table is not a mapping of mappings: {}", e))
}

/// Parse a rate table from TOML (one `[source]` table per currency)
pub fn parse_toml(content: &str) -> Result<RateTable> {
    toml::from_str(content).map_err(|e| eyre!("Rate table is not a mapping of mappings: {}", e))
}

/// Load a rate table from disk. `.toml` files are read as TOML, everything
/// else as JSON.
pub fn load_rate_table<P: AsRef<Path>>(path: P) -> Result<RateTable> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| eyre!("Failed to read rate table {}: {}", path.display(), e))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => parse_toml(&content),
        _ => parse_json(&content),
    }
}
