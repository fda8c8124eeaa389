//! Join, aggregation and binning of the store and FIPS tables.
//!
//! Store rows are enriched with a county FIPS code, reduced into a per-county
//! and a per-entity summary, and the county means are classified into
//! equal-width bins for the map legend.

pub mod aggregate;
pub mod binning;
pub mod join;
pub mod types;
pub mod utility;
