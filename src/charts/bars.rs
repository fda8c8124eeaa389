//! Ranked horizontal bar chart pages.

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use tracing::info;

use super::{DrawResult, Page, Style, render_page, subtitle_font, tick_font, title_font};
use crate::analyzers::aggregate::{TOP_ENTITIES, top_by_count, top_by_footage};
use crate::analyzers::types::{CountyAggregate, EntityAggregate};
use crate::analyzers::utility::format_thousands;
use crate::error::{ReportError, Result};
use crate::output::{RenderedPage, page_file_name};

pub const COUNTY_BARS_ORDINAL: u32 = 2;
pub const ENTITY_BARS_ORDINAL: u32 = 3;

pub const COUNTY_BARS_TITLE: &str = "Average Retail Square Footage By County";
pub const ENTITY_COUNT_TITLE: &str = "Store Count By Entity";
pub const ENTITY_FOOTAGE_TITLE: &str = "Total Store Square Footage By Entity";

const MAX_LABEL_AREA: u32 = 320;

/// One bar: category label, length, and the text printed at its end.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub text: String,
}

/// Renders mean footage per county, largest at the top.
#[tracing::instrument(skip_all, fields(counties = counties.len()))]
pub fn render_county_bars(
    pages_dir: &Path,
    counties: &[CountyAggregate],
    style: &Style,
) -> Result<RenderedPage> {
    if counties.is_empty() {
        return Err(ReportError::render(
            &page_file_name(COUNTY_BARS_ORDINAL),
            "no county data",
        ));
    }

    let bars: Vec<Bar> = counties
        .iter()
        .rev()
        .map(|c| Bar {
            label: c.county.clone(),
            value: c.mean_footage,
            text: format_thousands(c.mean_footage),
        })
        .collect();

    let rendered = render_page(pages_dir, COUNTY_BARS_ORDINAL, |root| {
        root.fill(&style.theme.background)?;
        let area = root.margin(
            style.margin.top,
            style.margin.bottom,
            style.margin.left,
            style.margin.right,
        );
        draw_hbars(&area, COUNTY_BARS_TITLE, &bars, style, true)
    })?;
    info!(path = %rendered.path.display(), "County bar page rendered");
    Ok(rendered)
}

/// Renders the two-row entity page: top entities by store count, then by
/// total footage.
#[tracing::instrument(skip_all, fields(entities = entities.len()))]
pub fn render_entity_bars(
    pages_dir: &Path,
    entities: &[EntityAggregate],
    style: &Style,
) -> Result<RenderedPage> {
    if entities.is_empty() {
        return Err(ReportError::render(
            &page_file_name(ENTITY_BARS_ORDINAL),
            "no entity data",
        ));
    }

    let by_count: Vec<Bar> = top_by_count(entities, TOP_ENTITIES)
        .into_iter()
        .map(|e| Bar {
            value: e.count as f64,
            text: e.count.to_string(),
            label: e.entity_name,
        })
        .collect();
    let by_footage: Vec<Bar> = top_by_footage(entities, TOP_ENTITIES)
        .into_iter()
        .map(|e| Bar {
            value: e.total_footage,
            text: e.footage_label,
            label: e.entity_name,
        })
        .collect();

    let rendered = render_page(pages_dir, ENTITY_BARS_ORDINAL, |root| {
        root.fill(&style.theme.background)?;
        let area = root.margin(
            style.margin.top,
            style.margin.bottom,
            style.margin.left,
            style.margin.right,
        );
        let rows = area.split_evenly((2, 1));
        draw_hbars(&rows[0], ENTITY_COUNT_TITLE, &by_count, style, false)?;
        draw_hbars(&rows[1], ENTITY_FOOTAGE_TITLE, &by_footage, style, false)
    })?;
    info!(path = %rendered.path.display(), "Entity bar page rendered");
    Ok(rendered)
}

/// Draws a horizontal bar chart; `bars[0]` is the bottom bar.
fn draw_hbars(area: &Page<'_>, title: &str, bars: &[Bar], style: &Style, page_title: bool) -> DrawResult {
    let max = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
    let x_max = if max > 0.0 { max * 1.15 } else { 1.0 };
    let longest = bars.iter().map(|b| b.label.chars().count()).max().unwrap_or(0) as u32;
    let label_area = (longest * 5 + 12).min(MAX_LABEL_AREA);
    let caption = if page_title {
        title_font(style)
    } else {
        subtitle_font(style)
    };

    let mut chart = ChartBuilder::on(area)
        .caption(title, caption)
        .margin(8)
        .x_label_area_size(24)
        .y_label_area_size(label_area)
        .build_cartesian_2d(0f64..x_max, (0..bars.len() as i32).into_segmented())?;

    chart.plotting_area().fill(&style.theme.plot_background)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .light_line_style(style.theme.plot_background)
        .bold_line_style(style.theme.grid)
        .axis_style(style.theme.axis)
        .label_style(tick_font(style))
        .y_labels(bars.len())
        .y_label_formatter(&|v| segment_label(bars, v))
        .x_label_formatter(&|v| format_thousands(*v))
        .draw()?;

    let fill = style.primary();
    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        let i = i as i32;
        let mut rect = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(i)),
                (bar.value, SegmentValue::Exact(i + 1)),
            ],
            fill.filled(),
        );
        rect.set_margin(2, 2, 0, 0);
        rect
    }))?;

    let text_style = tick_font(style).pos(Pos::new(HPos::Left, VPos::Center));
    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        Text::new(
            format!(" {}", bar.text),
            (bar.value, SegmentValue::CenterOf(i as i32)),
            text_style.clone(),
        )
    }))?;

    Ok(())
}

fn segment_label(bars: &[Bar], value: &SegmentValue<i32>) -> String {
    match value {
        SegmentValue::CenterOf(i) => usize::try_from(*i)
            .ok()
            .and_then(|i| bars.get(i))
            .map(|b| b.label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    }
}
