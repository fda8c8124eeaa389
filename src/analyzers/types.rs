//! Data types flowing through the join and aggregation stages.

use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// A single row of the retail store registrations table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRecord {
    pub entity_name: String,
    pub trade_name: String,
    pub county: String,
    /// `None` when the cell is empty or not numeric.
    pub square_footage: Option<f64>,
    /// Every other source column, keyed by header.
    pub extra: BTreeMap<String, String>,
}

impl StoreRecord {
    pub fn new(entity_name: &str, county: &str, square_footage: Option<f64>) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            trade_name: entity_name.to_string(),
            county: county.to_string(),
            square_footage,
            extra: BTreeMap::new(),
        }
    }
}

/// County name to FIPS code, at most one code per name.
#[derive(Debug, Clone, Default)]
pub struct CountyFipsMap {
    codes: HashMap<String, u32>,
}

impl CountyFipsMap {
    /// Builds the map keeping the first code seen for each county name.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut codes = HashMap::new();
        for (name, code) in pairs {
            let name = name.into();
            match codes.get(&name) {
                Some(&existing) if existing != code => {
                    warn!(county = %name, kept = existing, dropped = code, "Conflicting FIPS codes for county");
                }
                Some(_) => {}
                None => {
                    codes.insert(name, code);
                }
            }
        }
        Self { codes }
    }

    pub fn get(&self, county: &str) -> Option<u32> {
        self.codes.get(county).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// A store row with its county FIPS code attached by the join.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedStore {
    pub store: StoreRecord,
    pub fips: Option<u32>,
}

/// Mean square footage of one county.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyAggregate {
    pub county: String,
    pub fips: u32,
    pub mean_footage: f64,
    /// Records that contributed to the mean.
    pub stores: usize,
}

/// Store count and total square footage of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityAggregate {
    pub entity_name: String,
    pub count: usize,
    pub total_footage: f64,
    /// `total_footage` with thousands separators and no decimals.
    pub footage_label: String,
}
