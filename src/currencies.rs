//! Currency definitions
//!
//! Path of Exile 2 currency ids as they appear in rate tables, with their
//! in-game names. The detector treats currencies as opaque labels; this
//! registry only feeds display and the built-in sample table.

use indexmap::IndexMap;

use crate::cartographer::RateTable;

/// A currency we know how to name
#[derive(Debug, Clone, Copy)]
pub struct CurrencyInfo {
    pub id: &'static str,
    pub name: &'static str,
}

pub fn known_currencies() -> Vec<CurrencyInfo> {
    vec![
        CurrencyInfo { id: "divine", name: "Divine Orb" },
        CurrencyInfo { id: "exalted", name: "Exalted Orb" },
        CurrencyInfo { id: "chaos", name: "Chaos Orb" },
        CurrencyInfo { id: "regal", name: "Regal Orb" },
        CurrencyInfo { id: "alch", name: "Orb of Alchemy" },
        CurrencyInfo { id: "vaal", name: "Vaal Orb" },
        CurrencyInfo { id: "annul", name: "Orb of Annulment" },
        CurrencyInfo { id: "chance", name: "Orb of Chance" },
        CurrencyInfo { id: "aug", name: "Orb of Augmentation" },
        CurrencyInfo { id: "transmute", name: "Orb of Transmutation" },
        CurrencyInfo { id: "artificers", name: "Artificer's Orb" },
    ]
}

pub fn get_currency(id: &str) -> Option<CurrencyInfo> {
    known_currencies().into_iter().find(|c| c.id == id)
}

/// In-game name for known ids, the id itself otherwise
pub fn display_name(id: &str) -> String {
    get_currency(id)
        .map(|c| c.name.to_string())
        .unwrap_or_else(|| id.to_string())
}

/// A small market with a couple of profitable loops through chaos
pub fn sample_rates() -> RateTable {
    let entries: [(&str, &[(&str, f64)]); 5] = [
        ("divine", &[("exalted", 380.0), ("chaos", 28.0)]),
        ("exalted", &[("divine", 0.0025), ("chaos", 0.075), ("regal", 0.5)]),
        ("chaos", &[("divine", 0.04), ("exalted", 13.0)]),
        ("regal", &[("exalted", 1.9), ("alch", 3.0)]),
        ("alch", &[("regal", 0.3)]),
    ];

    entries
        .iter()
        .map(|(source, targets)| {
            let targets: IndexMap<String, f64> = targets
                .iter()
                .map(|(target, rate)| (target.to_string(), *rate))
                .collect();
            (source.to_string(), targets)
        })
        .collect()
}
