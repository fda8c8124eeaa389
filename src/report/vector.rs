//! Redraws `SVGBackend` output as native PDF drawing operations.
//!
//! plotters writes a flat document where every element sits directly under
//! the root and carries its style as presentation attributes, so only the
//! shapes it emits need translating. Text is set in the builtin Helvetica
//! faces and needs no font files on the host.

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    Color, IndirectFontRef, Line, PdfLayerReference, Point, Polygon, Pt, Rgb, TextMatrix,
    calculate_points_for_circle,
};
use roxmltree::{Document, Node};
use thiserror::Error;
use tracing::debug;

/// PDF points per SVG user unit (96 dpi).
pub(crate) const PT_PER_PX: f32 = 0.75;

/// Helvetica advance widths for `' '..='~'`, in thousandths of an em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const DEFAULT_WIDTH: u16 = 556;

#[derive(Debug, Error)]
pub enum SvgError {
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element is <{0}>, not <svg>")]
    NotSvg(String),
    #[error("missing or invalid page size")]
    MissingSize,
}

/// Faces used for `<text>` elements.
pub(crate) struct Fonts {
    pub regular: IndirectFontRef,
    pub bold: IndirectFontRef,
}

/// One parsed page, sized in SVG user units.
pub(crate) struct SvgPage<'a> {
    doc: Document<'a>,
    width: f32,
    height: f32,
}

impl<'a> SvgPage<'a> {
    pub fn parse(content: &'a str) -> Result<Self, SvgError> {
        let doc = Document::parse(content)?;
        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(SvgError::NotSvg(root.tag_name().name().to_string()));
        }
        let (width, height) = page_size(root).ok_or(SvgError::MissingSize)?;
        Ok(Self { doc, width, height })
    }

    /// Page size in points.
    pub fn size(&self) -> (Pt, Pt) {
        (Pt(self.width * PT_PER_PX), Pt(self.height * PT_PER_PX))
    }

    /// Draws every supported element in document order and returns how many
    /// were drawn. Elements with missing geometry or no visible paint are skipped.
    pub fn draw(&self, layer: &PdfLayerReference, fonts: &Fonts) -> usize {
        let canvas = Canvas {
            layer,
            height: self.height,
        };
        let mut drawn = 0;
        for node in self.doc.root_element().descendants().skip(1) {
            if !node.is_element() {
                continue;
            }
            let name = node.tag_name().name();
            let outcome = match name {
                "rect" => canvas.rect(node),
                "line" => canvas.line(node),
                "polyline" => canvas.polyline(node),
                "polygon" => canvas.polygon(node),
                "circle" => canvas.circle(node),
                "text" => canvas.text(node, fonts),
                _ => {
                    debug!(element = name, "Skipping unsupported SVG element");
                    None
                }
            };
            if outcome.is_some() {
                drawn += 1;
            }
        }
        drawn
    }
}

fn page_size(root: Node) -> Option<(f32, f32)> {
    let from_attrs = number(root, "width").zip(number(root, "height"));
    let from_view_box = || {
        let parts: Vec<f32> = root
            .attribute("viewBox")?
            .split([' ', ','])
            .filter(|s| !s.is_empty())
            .map(str::parse::<f32>)
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [_, _, w, h] => Some((*w, *h)),
            _ => None,
        }
    };
    from_attrs
        .or_else(from_view_box)
        .filter(|(w, h)| w.is_finite() && h.is_finite() && *w > 0.0 && *h > 0.0)
}

struct Canvas<'l> {
    layer: &'l PdfLayerReference,
    height: f32,
}

impl Canvas<'_> {
    /// SVG user space has its origin top left; PDF bottom left.
    fn point(&self, x: f32, y: f32) -> Point {
        Point {
            x: Pt(x * PT_PER_PX),
            y: Pt((self.height - y) * PT_PER_PX),
        }
    }

    fn rect(&self, node: Node) -> Option<()> {
        let x = number(node, "x")?;
        let y = number(node, "y")?;
        let w = number(node, "width")?;
        let h = number(node, "height")?;
        let ring = vec![
            (self.point(x, y), false),
            (self.point(x + w, y), false),
            (self.point(x + w, y + h), false),
            (self.point(x, y + h), false),
        ];
        self.shape(node, ring)
    }

    fn line(&self, node: Node) -> Option<()> {
        let from = (number(node, "x1")?, number(node, "y1")?);
        let to = (number(node, "x2")?, number(node, "y2")?);
        self.stroke(node, &[from, to])
    }

    fn polyline(&self, node: Node) -> Option<()> {
        self.stroke(node, &points(node)?)
    }

    fn polygon(&self, node: Node) -> Option<()> {
        let ring = points(node)?
            .into_iter()
            .map(|(x, y)| (self.point(x, y), false))
            .collect();
        self.shape(node, ring)
    }

    fn circle(&self, node: Node) -> Option<()> {
        let centre = self.point(number(node, "cx")?, number(node, "cy")?);
        let radius = number(node, "r")?;
        let ring = calculate_points_for_circle(Pt(radius * PT_PER_PX), centre.x, centre.y);
        self.shape(node, ring)
    }

    fn text(&self, node: Node, fonts: &Fonts) -> Option<()> {
        // plotters wraps the label in newlines
        let content = node.text()?.trim();
        if content.is_empty() {
            return None;
        }
        let x = number(node, "x")?;
        let y = number(node, "y")?;
        let size = number(node, "font-size")?;
        let color = paint(node, "fill")?;
        let font = match node.attribute("font-weight") {
            Some("bold") => &fonts.bold,
            _ => &fonts.regular,
        };

        let width = text_width(content, size);
        let along = match node.attribute("text-anchor") {
            Some("middle") => -width / 2.0,
            Some("end") => -width,
            _ => 0.0,
        };
        let down = node.attribute("dy").map_or(0.0, |dy| em_offset(dy) * size);
        let angle = node.attribute("transform").and_then(rotation).unwrap_or(0.0);

        // Offsets follow the rotated text axes; the rotation centre is (x, y).
        let (sin, cos) = angle.to_radians().sin_cos();
        let origin = self.point(x + along * cos - down * sin, y + along * sin + down * cos);

        self.layer.set_fill_color(color);
        self.layer.begin_text_section();
        self.layer.set_font(font, size * PT_PER_PX);
        self.layer
            .set_text_matrix(TextMatrix::TranslateRotate(origin.x, origin.y, -angle));
        self.layer.write_text(content, font);
        self.layer.end_text_section();
        Some(())
    }

    fn stroke(&self, node: Node, path: &[(f32, f32)]) -> Option<()> {
        if path.len() < 2 {
            return None;
        }
        let color = paint(node, "stroke")?;
        self.layer.set_outline_color(color);
        self.layer.set_outline_thickness(stroke_width(node));
        self.layer.add_line(Line {
            points: path.iter().map(|&(x, y)| (self.point(x, y), false)).collect(),
            is_closed: false,
        });
        Some(())
    }

    fn shape(&self, node: Node, ring: Vec<(Point, bool)>) -> Option<()> {
        if ring.len() < 3 {
            return None;
        }
        let fill = paint(node, "fill");
        let outline = paint(node, "stroke");
        let mode = match (&fill, &outline) {
            (Some(_), Some(_)) => PaintMode::FillStroke,
            (Some(_), None) => PaintMode::Fill,
            (None, Some(_)) => PaintMode::Stroke,
            (None, None) => return None,
        };
        if let Some(color) = fill {
            self.layer.set_fill_color(color);
        }
        if let Some(color) = outline {
            self.layer.set_outline_color(color);
            self.layer.set_outline_thickness(stroke_width(node));
        }
        self.layer.add_polygon(Polygon {
            rings: vec![ring],
            mode,
            winding_order: WindingOrder::NonZero,
        });
        Some(())
    }
}

fn number(node: Node, name: &str) -> Option<f32> {
    node.attribute(name)?
        .trim()
        .parse()
        .ok()
        .filter(|v: &f32| v.is_finite())
}

fn stroke_width(node: Node) -> f32 {
    number(node, "stroke-width").unwrap_or(1.0) * PT_PER_PX
}

/// Parses `"x,y x,y ..."`.
fn points(node: Node) -> Option<Vec<(f32, f32)>> {
    node.attribute("points")?
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',')?;
            Some((x.parse::<f32>().ok()?, y.parse::<f32>().ok()?))
        })
        .collect()
}

/// Resolves a paint attribute, flattening `opacity` against a white page.
/// `none`, unknown colours and fully transparent paint yield `None`.
fn paint(node: Node, name: &str) -> Option<Color> {
    let (r, g, b) = hex_rgb(node.attribute(name)?)?;
    let alpha = number(node, "opacity").unwrap_or(1.0).clamp(0.0, 1.0);
    if alpha == 0.0 {
        return None;
    }
    let blend = |c: u8| f32::from(c) / 255.0 * alpha + (1.0 - alpha);
    Some(Color::Rgb(Rgb::new(blend(r), blend(g), blend(b), None)))
}

fn hex_rgb(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |at: usize| u8::from_str_radix(hex.get(at..at + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// The angle of `rotate(a, cx, cy)` in degrees, clockwise on screen.
fn rotation(transform: &str) -> Option<f32> {
    let args = transform.trim().strip_prefix("rotate(")?;
    args.split([',', ' ', ')'])
        .find(|s| !s.is_empty())?
        .parse()
        .ok()
}

/// A `dy` length in ems. An ex is taken as half an em.
fn em_offset(dy: &str) -> f32 {
    let dy = dy.trim();
    if let Some(v) = dy.strip_suffix("em") {
        v.parse().unwrap_or(0.0)
    } else if let Some(v) = dy.strip_suffix("ex") {
        v.parse::<f32>().map_or(0.0, |v| v / 2.0)
    } else {
        0.0
    }
}

/// Approximate rendered width of `text` in the units of `size`.
fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let width = (c as u32)
                .checked_sub(' ' as u32)
                .and_then(|i| HELVETICA_WIDTHS.get(i as usize))
                .copied()
                .unwrap_or(DEFAULT_WIDTH);
            u32::from(width)
        })
        .sum();
    units as f32 * size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reads_size_from_attributes() {
        let page = SvgPage::parse(r#"<svg width="1000" height="750" xmlns="http://www.w3.org/2000/svg"/>"#)
            .unwrap();
        let (w, h) = page.size();
        assert_eq!((w.0, h.0), (750.0, 562.5));
    }

    #[test]
    fn test_parse_falls_back_to_view_box() {
        let page = SvgPage::parse(r#"<svg viewBox="0 0 400 200"/>"#).unwrap();
        assert_eq!(page.size().0.0, 300.0);
    }

    #[test]
    fn test_parse_rejects_other_documents() {
        assert!(matches!(SvgPage::parse("this is not svg"), Err(SvgError::Xml(_))));
        assert!(matches!(SvgPage::parse("<html/>"), Err(SvgError::NotSvg(_))));
        assert!(matches!(
            SvgPage::parse(r#"<svg width="0" height="10"/>"#),
            Err(SvgError::MissingSize)
        ));
    }

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("#08306B"), Some((8, 48, 107)));
        assert_eq!(hex_rgb("none"), None);
        assert_eq!(hex_rgb("#fff"), None);
    }

    #[test]
    fn test_paint_flattens_opacity_onto_white() {
        let doc = Document::parse(r##"<rect fill="#000000" opacity="0.25" stroke="none"/>"##).unwrap();
        let node = doc.root_element();
        match paint(node, "fill") {
            Some(Color::Rgb(rgb)) => {
                assert!((rgb.r - 0.75).abs() < 1e-6);
                assert!((rgb.b - 0.75).abs() < 1e-6);
            }
            other => panic!("expected rgb, got {other:?}"),
        }
        assert!(paint(node, "stroke").is_none());
    }

    #[test]
    fn test_transparent_paint_is_skipped() {
        let doc = Document::parse(r##"<rect fill="#000000" opacity="0"/>"##).unwrap();
        assert!(paint(doc.root_element(), "fill").is_none());
    }

    #[test]
    fn test_points_parse_plotters_format() {
        let doc = Document::parse(r#"<polyline points="1,2 3.5,4 "/>"#).unwrap();
        assert_eq!(points(doc.root_element()), Some(vec![(1.0, 2.0), (3.5, 4.0)]));

        let doc = Document::parse(r#"<polyline points="1,2 3"/>"#).unwrap();
        assert_eq!(points(doc.root_element()), None);
    }

    #[test]
    fn test_rotation_and_baseline_offsets() {
        assert_eq!(rotation("rotate(270, 40, 300)"), Some(270.0));
        assert_eq!(rotation("translate(1, 2)"), None);
        assert_eq!(em_offset("0.76em"), 0.76);
        assert_eq!(em_offset("-0.5ex"), -0.25);
        assert_eq!(em_offset("3px"), 0.0);
    }

    #[test]
    fn test_text_width_uses_helvetica_metrics() {
        // 0 = 556, space = 278, l = 222
        assert!((text_width("0 l", 1000.0) - 1056.0).abs() < 1e-3);
        assert!((text_width("é", 10.0) - 5.56).abs() < 1e-4);
    }
}
