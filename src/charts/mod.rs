//! Chart pages of the report.
//!
//! Every chart is drawn with plotters onto an SVG page of [`PAGE_SIZE`] and
//! written to the pages directory under its ordinal. Drawing never touches
//! shared state: the resolved [`Style`] is passed into each call.

pub mod bars;
pub mod geometry;
pub mod map;
pub mod style;

pub use bars::{render_county_bars, render_entity_bars};
pub use map::render_map;
pub use style::Style;

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::path::Path;

use crate::error::{ReportError, Result};
use crate::output::{RenderedPage, page_file_name, write_page};

/// Page size in SVG pixels.
pub const PAGE_SIZE: (u32, u32) = (1000, 750);

const FONT_FAMILY: &str = "sans-serif";
const TITLE_FONT_SIZE: f64 = 20.0;
const SUBTITLE_FONT_SIZE: f64 = 14.0;
const TICK_FONT_SIZE: f64 = 8.0;

pub(crate) type Page<'a> = DrawingArea<SVGBackend<'a>, Shift>;
pub(crate) type DrawResult = std::result::Result<(), DrawingAreaErrorKind<std::io::Error>>;

/// Draws one page and writes it to `pages_dir` as `fig_NN.svg`.
pub(crate) fn render_page<F>(pages_dir: &Path, ordinal: u32, draw: F) -> Result<RenderedPage>
where
    F: FnOnce(&Page<'_>) -> DrawResult,
{
    let name = page_file_name(ordinal);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, PAGE_SIZE).into_drawing_area();
        draw(&root).map_err(|e| ReportError::render(&name, e))?;
        root.present().map_err(|e| ReportError::render(&name, e))?;
    }
    write_page(pages_dir, ordinal, &svg)
}

fn title_font(style: &Style) -> TextStyle<'static> {
    (FONT_FAMILY, TITLE_FONT_SIZE)
        .into_font()
        .color(&style.theme.text)
}

fn subtitle_font(style: &Style) -> TextStyle<'static> {
    (FONT_FAMILY, SUBTITLE_FONT_SIZE)
        .into_font()
        .color(&style.theme.text)
}

fn tick_font(style: &Style) -> TextStyle<'static> {
    (FONT_FAMILY, TICK_FONT_SIZE)
        .into_font()
        .color(&style.theme.text)
}
