//! County outlines for the choropleth, read from a GeoJSON FeatureCollection.

use geojson::{GeoJson, Value};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::{ReportError, Result};
use crate::fetch::{HttpClient, fetch_source};

/// Exterior rings of one county, as `(lon, lat)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyShape {
    pub fips: u32,
    pub rings: Vec<Vec<(f64, f64)>>,
}

impl CountyShape {
    /// State FIPS code of a five-digit county code.
    pub fn state_fips(&self) -> u32 {
        self.fips / 1000
    }
}

/// Fetches and parses county shapes.
pub async fn load_counties<C: HttpClient>(
    client: &C,
    locator: &str,
    fips_property: Option<&str>,
) -> Result<Vec<CountyShape>> {
    let bytes = fetch_source(client, locator).await?;
    let shapes = parse_counties(locator, &bytes, fips_property)?;
    info!(source = %locator, counties = shapes.len(), "County geometry loaded");
    Ok(shapes)
}

/// Decodes county shapes from GeoJSON bytes.
///
/// The FIPS code comes from `fips_property` when given, otherwise from the
/// feature id. Features without a code or without polygon geometry are skipped.
pub fn parse_counties(
    locator: &str,
    bytes: &[u8],
    fips_property: Option<&str>,
) -> Result<Vec<CountyShape>> {
    let geojson = GeoJson::from_reader(bytes)
        .map_err(|e| ReportError::source_unavailable(locator, format!("invalid GeoJSON: {e}")))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(ReportError::source_unavailable(
                locator,
                "GeoJSON must be a FeatureCollection",
            ));
        }
    };

    let mut shapes = Vec::new();
    let mut skipped = 0usize;

    for feature in collection.features {
        let code = match fips_property {
            Some(key) => feature.property(key).and_then(json_fips),
            None => feature.id.as_ref().and_then(|id| match id {
                geojson::feature::Id::String(s) => parse_fips(s),
                geojson::feature::Id::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            }),
        };
        let Some(fips) = code else {
            skipped += 1;
            continue;
        };

        let rings = match feature.geometry.map(|g| g.value) {
            Some(Value::Polygon(polygon)) => exterior(&polygon).into_iter().collect(),
            Some(Value::MultiPolygon(polygons)) => {
                polygons.iter().filter_map(|p| exterior(p)).collect()
            }
            _ => Vec::new(),
        };
        if rings.is_empty() {
            skipped += 1;
            continue;
        }

        shapes.push(CountyShape { fips, rings });
    }

    if skipped > 0 {
        debug!(skipped, "Features without FIPS code or polygon geometry");
    }
    Ok(shapes)
}

/// Shapes belonging to one state.
pub fn region(shapes: &[CountyShape], state_fips: u32) -> Vec<CountyShape> {
    shapes
        .iter()
        .filter(|s| s.state_fips() == state_fips)
        .cloned()
        .collect()
}

/// `(min_lon, max_lon, min_lat, max_lat)` over every ring point.
pub fn bounds(shapes: &[CountyShape]) -> Option<(f64, f64, f64, f64)> {
    shapes
        .iter()
        .flat_map(|s| s.rings.iter().flatten())
        .fold(None, |acc, &(x, y)| match acc {
            None => Some((x, x, y, y)),
            Some((x0, x1, y0, y1)) => Some((x0.min(x), x1.max(x), y0.min(y), y1.max(y))),
        })
}

fn exterior(polygon: &[Vec<Vec<f64>>]) -> Option<Vec<(f64, f64)>> {
    let ring: Vec<(f64, f64)> = polygon
        .first()?
        .iter()
        .filter_map(|pos| match pos.as_slice() {
            [x, y, ..] => Some((*x, *y)),
            _ => None,
        })
        .collect();
    (ring.len() >= 3).then_some(ring)
}

fn json_fips(value: &JsonValue) -> Option<u32> {
    match value {
        JsonValue::String(s) => parse_fips(s),
        JsonValue::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    }
}

fn parse_fips(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}
