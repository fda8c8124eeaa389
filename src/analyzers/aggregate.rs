use crate::analyzers::types::{CountyAggregate, EnrichedStore, EntityAggregate};
use crate::analyzers::utility::{format_thousands, mean};
use std::collections::BTreeMap;
use tracing::debug;

/// Number of entities shown on each ranked bar chart.
pub const TOP_ENTITIES: usize = 20;

/// Mean square footage per county, sorted descending by mean.
///
/// Records with footage exactly zero (or unset) are unknown sizes, not
/// zero-sized stores, and are left out of the mean. A county whose records
/// are all unknown does not appear at all. Rows without a FIPS code have no
/// map region and are left out as well.
pub fn aggregate_by_county(rows: &[EnrichedStore]) -> Vec<CountyAggregate> {
    let mut groups: BTreeMap<(&str, u32), Vec<f64>> = BTreeMap::new();
    let mut skipped_no_fips = 0usize;

    for row in rows {
        let footage = match row.store.square_footage {
            Some(f) if f != 0.0 && f.is_finite() => f,
            _ => continue,
        };
        let Some(fips) = row.fips else {
            skipped_no_fips += 1;
            continue;
        };
        groups
            .entry((row.store.county.as_str(), fips))
            .or_default()
            .push(footage);
    }

    if skipped_no_fips > 0 {
        debug!(skipped_no_fips, "Sized stores left out of county aggregate");
    }

    let mut counties: Vec<CountyAggregate> = groups
        .into_iter()
        .map(|((county, fips), footages)| CountyAggregate {
            county: county.to_string(),
            fips,
            mean_footage: mean(&footages),
            stores: footages.len(),
        })
        .collect();

    counties.sort_by(|a, b| {
        b.mean_footage
            .total_cmp(&a.mean_footage)
            .then_with(|| a.county.cmp(&b.county))
            .then_with(|| a.fips.cmp(&b.fips))
    });
    counties
}

/// Store count and total footage per entity, sorted ascending by count.
///
/// No rows are filtered; unset footage adds nothing to the total.
pub fn aggregate_by_entity(rows: &[EnrichedStore]) -> Vec<EntityAggregate> {
    let mut groups: BTreeMap<&str, (usize, f64)> = BTreeMap::new();

    for row in rows {
        let entry = groups.entry(row.store.entity_name.as_str()).or_default();
        entry.0 += 1;
        if let Some(f) = row.store.square_footage.filter(|f| f.is_finite()) {
            entry.1 += f;
        }
    }

    let mut entities: Vec<EntityAggregate> = groups
        .into_iter()
        .map(|(name, (count, total))| EntityAggregate {
            entity_name: name.to_string(),
            count,
            total_footage: total,
            footage_label: format_thousands(total),
        })
        .collect();

    entities.sort_by(|a, b| {
        a.count
            .cmp(&b.count)
            .then_with(|| a.entity_name.cmp(&b.entity_name))
    });
    entities
}

/// The `n` entities with the most stores, ascending (largest last).
pub fn top_by_count(entities: &[EntityAggregate], n: usize) -> Vec<EntityAggregate> {
    let mut sorted = entities.to_vec();
    sorted.sort_by(|a, b| {
        a.count
            .cmp(&b.count)
            .then_with(|| a.entity_name.cmp(&b.entity_name))
    });
    tail(sorted, n)
}

/// The `n` entities with the largest total footage, ascending (largest last).
pub fn top_by_footage(entities: &[EntityAggregate], n: usize) -> Vec<EntityAggregate> {
    let mut sorted = entities.to_vec();
    sorted.sort_by(|a, b| {
        a.total_footage
            .total_cmp(&b.total_footage)
            .then_with(|| a.entity_name.cmp(&b.entity_name))
    });
    tail(sorted, n)
}

fn tail<T>(mut rows: Vec<T>, n: usize) -> Vec<T> {
    let start = rows.len().saturating_sub(n);
    rows.split_off(start)
}
