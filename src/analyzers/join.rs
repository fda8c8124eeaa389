//! Left outer join of store records against the county FIPS map.

use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::analyzers::types::{CountyFipsMap, EnrichedStore, StoreRecord};

/// Attaches a FIPS code to every store by exact county-name match.
///
/// Every input row is kept, in input order. Counties missing from `fips`
/// (including spellings that differ only in case or whitespace) get `None`.
#[tracing::instrument(skip_all, fields(stores = stores.len(), counties = fips.len()))]
pub fn left_join(stores: Vec<StoreRecord>, fips: &CountyFipsMap) -> Vec<EnrichedStore> {
    let mut unmatched = BTreeSet::new();

    let enriched: Vec<EnrichedStore> = stores
        .into_iter()
        .map(|store| {
            let code = fips.get(&store.county);
            if code.is_none() {
                unmatched.insert(store.county.clone());
            }
            EnrichedStore { store, fips: code }
        })
        .collect();

    let unmatched_rows = enriched.iter().filter(|e| e.fips.is_none()).count();
    if unmatched_rows > 0 {
        warn!(
            unmatched_rows,
            unmatched_counties = unmatched.len(),
            "Stores without a FIPS code"
        );
        debug!(counties = ?unmatched, "Unmatched county names");
    }
    info!(rows = enriched.len(), "Join complete");

    enriched
}
