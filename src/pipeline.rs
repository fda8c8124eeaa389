//! One end-to-end report run.
//!
//! Stages run strictly in order: load, join, aggregate, bin, render,
//! assemble. Any failure aborts the run before the report is written.

use tracing::{info, warn};

use crate::analyzers::aggregate::{aggregate_by_county, aggregate_by_entity};
use crate::analyzers::binning::{BinSet, LEGEND_ENDPOINTS};
use crate::analyzers::join::left_join;
use crate::analyzers::types::{CountyFipsMap, StoreRecord};
use crate::charts::geometry::{CountyShape, load_counties, region};
use crate::charts::{Style, render_county_bars, render_entity_bars, render_map};
use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::fetch::HttpClient;
use crate::output::prepare_pages_dir;
use crate::parser::{load_fips, load_stores};
use crate::report::{AssembledReport, assemble};

/// Everything the run needs from the outside world.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub stores: Vec<StoreRecord>,
    pub fips: CountyFipsMap,
    pub counties: Vec<CountyShape>,
}

/// Fetches the three sources named in `config`, one after another.
///
/// The first failure stops the load; later sources are not requested.
#[tracing::instrument(skip_all)]
pub async fn load_inputs<C: HttpClient>(client: &C, config: &ReportConfig) -> Result<Inputs> {
    let stores = load_stores(client, &config.sources.stores).await?;
    let fips = load_fips(client, &config.sources.fips).await?;
    let counties = load_counties(
        client,
        &config.map.geometry,
        config.map.fips_property.as_deref(),
    )
    .await?;
    Ok(Inputs {
        stores,
        fips,
        counties,
    })
}

/// Runs the whole pipeline and returns the written report.
#[tracing::instrument(skip_all, fields(report = %config.report_name))]
pub async fn run<C: HttpClient>(client: &C, config: &ReportConfig) -> Result<AssembledReport> {
    // Resolve the style first so a bad theme fails before any download.
    let style = Style::resolve(&config.viz)?;
    let inputs = load_inputs(client, config).await?;
    build_report(inputs, config, &style)
}

/// Join, aggregate, render and assemble already-loaded inputs.
#[tracing::instrument(skip_all, fields(stores = inputs.stores.len()))]
pub fn build_report(inputs: Inputs, config: &ReportConfig, style: &Style) -> Result<AssembledReport> {
    let pages_dir = &config.output.pages_dir;
    let cleared = prepare_pages_dir(pages_dir)?;
    if cleared > 0 {
        info!(cleared, dir = %pages_dir.display(), "Cleared stale pages");
    }

    let enriched = left_join(inputs.stores, &inputs.fips);
    let counties = aggregate_by_county(&enriched);
    let entities = aggregate_by_entity(&enriched);
    info!(
        counties = counties.len(),
        entities = entities.len(),
        "Aggregation complete"
    );

    let shapes = region(&inputs.counties, config.map.state_fips);
    if shapes.is_empty() {
        warn!(state_fips = config.map.state_fips, "No county geometry for mapped state");
    }

    let means: Vec<f64> = counties.iter().map(|c| c.mean_footage).collect();
    let bins = BinSet::equal_width(&means, LEGEND_ENDPOINTS)
        .ok_or_else(|| ReportError::render("fig_01.svg", "no county values to bin"))?;

    let pages = vec![
        render_map(pages_dir, &counties, &shapes, &bins, style)?,
        render_county_bars(pages_dir, &counties, style)?,
        render_entity_bars(pages_dir, &entities, style)?,
    ];

    assemble(&pages, &config.report_name, &config.report_path())
}
