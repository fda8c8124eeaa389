//! Choropleth of mean square footage per county.

use plotters::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::geometry::{CountyShape, bounds};
use super::{DrawResult, PAGE_SIZE, Page, Style, render_page, tick_font, title_font};
use crate::analyzers::binning::BinSet;
use crate::analyzers::types::CountyAggregate;
use crate::error::{ReportError, Result};
use crate::output::{RenderedPage, page_file_name};

pub const MAP_ORDINAL: u32 = 1;
pub const MAP_TITLE: &str = "Average Retail Square Footage By County Map";

/// Vertical space taken by the caption, in pixels.
const CAPTION_HEIGHT: u32 = 40;
const NO_DATA_LABEL: &str = "No data";

type Ring = Vec<(f64, f64)>;

/// Renders the county map page.
///
/// `shapes` must already be restricted to the mapped state. Counties are
/// filled by the bin of their mean footage; shapes without a county row get
/// the theme's neutral fill.
///
/// # Errors
///
/// `Render` when there is no county data or no geometry to draw.
#[tracing::instrument(skip_all, fields(counties = counties.len(), shapes = shapes.len()))]
pub fn render_map(
    pages_dir: &Path,
    counties: &[CountyAggregate],
    shapes: &[CountyShape],
    bins: &BinSet,
    style: &Style,
) -> Result<RenderedPage> {
    let page = page_file_name(MAP_ORDINAL);
    if counties.is_empty() {
        return Err(ReportError::render(&page, "no county data"));
    }
    let Some((lon0, lon1, lat0, lat1)) = bounds(shapes) else {
        return Err(ReportError::render(&page, "no county geometry in the mapped region"));
    };

    let scale = ((lat0 + lat1) / 2.0).to_radians().cos();
    let projected: Vec<(u32, Vec<Ring>)> = shapes
        .iter()
        .map(|s| {
            let rings = s
                .rings
                .iter()
                .map(|ring| ring.iter().map(|&(lon, lat)| (lon * scale, lat)).collect())
                .collect();
            (s.fips, rings)
        })
        .collect();

    let plot_area = (
        PAGE_SIZE.0.saturating_sub(style.margin.left + style.margin.right) as f64,
        PAGE_SIZE.1
            .saturating_sub(style.margin.top + style.margin.bottom + CAPTION_HEIGHT) as f64,
    );
    let (x_range, y_range) = fit_aspect((lon0 * scale, lon1 * scale), (lat0, lat1), plot_area);

    let values: HashMap<u32, f64> = counties.iter().map(|c| (c.fips, c.mean_footage)).collect();
    let unmapped = counties
        .iter()
        .filter(|c| !shapes.iter().any(|s| s.fips == c.fips))
        .count();
    if unmapped > 0 {
        debug!(unmapped, "Counties with data but no shape in region");
    }

    let rendered = render_page(pages_dir, MAP_ORDINAL, |root| {
        draw_map(root, &projected, &values, bins, style, x_range, y_range)
    })?;
    info!(path = %rendered.path.display(), bins = bins.bin_count(), "Map page rendered");
    Ok(rendered)
}

fn draw_map(
    root: &Page<'_>,
    projected: &[(u32, Vec<Ring>)],
    values: &HashMap<u32, f64>,
    bins: &BinSet,
    style: &Style,
    x_range: (f64, f64),
    y_range: (f64, f64),
) -> DrawResult {
    root.fill(&style.theme.background)?;

    let mut chart = ChartBuilder::on(root)
        .caption(MAP_TITLE, title_font(style))
        .margin_top(style.margin.top)
        .margin_bottom(style.margin.bottom)
        .margin_left(style.margin.left)
        .margin_right(style.margin.right)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    let colors = style.sample(bins.bin_count());
    let fill_for = |fips: u32| {
        values
            .get(&fips)
            .map(|v| colors[bins.classify(*v)])
            .unwrap_or(style.theme.missing)
    };

    chart.draw_series(projected.iter().flat_map(|(fips, rings)| {
        let color = fill_for(*fips);
        rings
            .iter()
            .map(move |ring| Polygon::new(ring.clone(), color.filled()))
    }))?;

    chart.draw_series(projected.iter().flat_map(|(_, rings)| {
        rings.iter().map(|ring| {
            let mut closed = ring.clone();
            if let Some(first) = ring.first() {
                closed.push(*first);
            }
            PathElement::new(closed, style.theme.outline.stroke_width(1))
        })
    }))?;

    for (label, color) in bins.legend_labels().into_iter().zip(colors.iter().copied()) {
        chart
            .draw_series(std::iter::empty::<Polygon<(f64, f64)>>())?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled()));
    }
    if projected.iter().any(|(fips, _)| !values.contains_key(fips)) {
        let missing = style.theme.missing;
        chart
            .draw_series(std::iter::empty::<Polygon<(f64, f64)>>())?
            .label(NO_DATA_LABEL)
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], missing.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(style.theme.background.mix(0.85))
        .border_style(style.theme.axis)
        .label_font(tick_font(style))
        .draw()?;

    Ok(())
}

/// Pads the data ranges so one unit spans the same pixels on both axes.
fn fit_aspect(
    x: (f64, f64),
    y: (f64, f64),
    area: (f64, f64),
) -> ((f64, f64), (f64, f64)) {
    let pad = |(lo, hi): (f64, f64)| {
        let span = hi - lo;
        let margin = if span > 0.0 { span * 0.02 } else { 0.5 };
        (lo - margin, hi + margin)
    };
    let (x0, x1) = pad(x);
    let (y0, y1) = pad(y);
    let (w, h) = (x1 - x0, y1 - y0);
    if area.0 <= 0.0 || area.1 <= 0.0 {
        return ((x0, x1), (y0, y1));
    }

    let area_ratio = area.0 / area.1;
    if w / h < area_ratio {
        let grow = (h * area_ratio - w) / 2.0;
        ((x0 - grow, x1 + grow), (y0, y1))
    } else {
        let grow = (w / area_ratio - h) / 2.0;
        ((x0, x1), (y0 - grow, y1 + grow))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::binning::LEGEND_ENDPOINTS;
    use crate::charts::geometry::{parse_counties, region, tests::COUNTIES};
    use crate::config::{Margin, VizConfig};

    fn style() -> Style {
        Style::resolve(&VizConfig {
            template: "plotly_white".to_string(),
            colours: "Blues".to_string(),
            margin: Margin {
                top: 40,
                bottom: 20,
                left: 20,
                right: 20,
            },
        })
        .unwrap()
    }

    fn county(name: &str, fips: u32, mean: f64) -> CountyAggregate {
        CountyAggregate {
            county: name.to_string(),
            fips,
            mean_footage: mean,
            stores: 1,
        }
    }

    fn ny_shapes() -> Vec<CountyShape> {
        region(&parse_counties("counties.json", COUNTIES.as_bytes(), None).unwrap(), 36)
    }

    #[test]
    fn test_render_map_writes_page_01() {
        let dir = tempfile::tempdir().unwrap();
        let counties = vec![county("Albany", 36001, 300.0), county("Bronx", 36005, 150.0)];
        let bins = BinSet::equal_width(&[300.0, 150.0], LEGEND_ENDPOINTS).unwrap();

        let page = render_map(dir.path(), &counties, &ny_shapes(), &bins, &style()).unwrap();
        assert_eq!(page.ordinal, MAP_ORDINAL);
        assert_eq!(page.path, dir.path().join("fig_01.svg"));

        let svg = std::fs::read_to_string(&page.path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains(MAP_TITLE));
    }

    #[test]
    fn test_render_map_single_county_degenerate_bins() {
        let dir = tempfile::tempdir().unwrap();
        let counties = vec![county("Albany", 36001, 500.0)];
        let bins = BinSet::equal_width(&[500.0], LEGEND_ENDPOINTS).unwrap();

        let page = render_map(dir.path(), &counties, &ny_shapes(), &bins, &style()).unwrap();
        let svg = std::fs::read_to_string(&page.path).unwrap();
        assert!(svg.contains(NO_DATA_LABEL));
    }

    #[test]
    fn test_render_map_empty_data_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let bins = BinSet::equal_width(&[1.0], LEGEND_ENDPOINTS).unwrap();
        let err = render_map(dir.path(), &[], &ny_shapes(), &bins, &style()).unwrap_err();
        assert!(matches!(err, ReportError::Render { .. }));
        assert!(!dir.path().join("fig_01.svg").exists());
    }

    #[test]
    fn test_render_map_without_geometry_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let counties = vec![county("Albany", 36001, 300.0)];
        let bins = BinSet::equal_width(&[300.0], LEGEND_ENDPOINTS).unwrap();
        assert!(matches!(
            render_map(dir.path(), &counties, &[], &bins, &style()),
            Err(ReportError::Render { .. })
        ));
    }

    #[test]
    fn test_fit_aspect_matches_area_ratio() {
        let (x, y) = fit_aspect((0.0, 1.0), (0.0, 4.0), (800.0, 400.0));
        let ratio = (x.1 - x.0) / (y.1 - y.0);
        assert!((ratio - 2.0).abs() < 1e-9);
        assert!(x.0 < 0.0 && x.1 > 1.0);
    }

    #[test]
    fn test_fit_aspect_degenerate_range() {
        let (x, y) = fit_aspect((5.0, 5.0), (1.0, 1.0), (100.0, 100.0));
        assert!(x.1 > x.0);
        assert!(y.1 > y.0);
    }
}
