//! Themes and palettes resolved from the `viz` configuration block.
//!
//! A [`Style`] is built once per run and handed to every render call.

use plotters::style::RGBColor;

use crate::config::{Margin, VizConfig};
use crate::error::{ReportError, Result};

/// Background, text and line colors of a chart template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub background: RGBColor,
    pub plot_background: RGBColor,
    pub text: RGBColor,
    pub grid: RGBColor,
    pub axis: RGBColor,
    /// Fill for map regions without data.
    pub missing: RGBColor,
    /// Region outline color on the map.
    pub outline: RGBColor,
}

const WHITE: RGBColor = RGBColor(255, 255, 255);
const PLOTLY_TEXT: RGBColor = RGBColor(42, 63, 95);

const THEMES: &[Theme] = &[
    Theme {
        name: "plotly",
        background: WHITE,
        plot_background: RGBColor(229, 236, 246),
        text: PLOTLY_TEXT,
        grid: WHITE,
        axis: WHITE,
        missing: RGBColor(220, 220, 220),
        outline: WHITE,
    },
    Theme {
        name: "plotly_white",
        background: WHITE,
        plot_background: WHITE,
        text: PLOTLY_TEXT,
        grid: RGBColor(235, 240, 248),
        axis: RGBColor(235, 240, 248),
        missing: RGBColor(220, 220, 220),
        outline: WHITE,
    },
    Theme {
        name: "plotly_dark",
        background: RGBColor(17, 17, 17),
        plot_background: RGBColor(17, 17, 17),
        text: RGBColor(242, 245, 250),
        grid: RGBColor(40, 52, 66),
        axis: RGBColor(40, 52, 66),
        missing: RGBColor(60, 60, 60),
        outline: RGBColor(17, 17, 17),
    },
    Theme {
        name: "simple_white",
        background: WHITE,
        plot_background: WHITE,
        text: RGBColor(0, 0, 0),
        grid: WHITE,
        axis: RGBColor(0, 0, 0),
        missing: RGBColor(220, 220, 220),
        outline: WHITE,
    },
    Theme {
        name: "ggplot2",
        background: WHITE,
        plot_background: RGBColor(235, 235, 235),
        text: RGBColor(0, 0, 0),
        grid: WHITE,
        axis: RGBColor(235, 235, 235),
        missing: RGBColor(200, 200, 200),
        outline: WHITE,
    },
    Theme {
        name: "seaborn",
        background: WHITE,
        plot_background: RGBColor(234, 234, 242),
        text: RGBColor(36, 36, 36),
        grid: WHITE,
        axis: RGBColor(234, 234, 242),
        missing: RGBColor(200, 200, 200),
        outline: WHITE,
    },
    Theme {
        name: "none",
        background: WHITE,
        plot_background: WHITE,
        text: RGBColor(0, 0, 0),
        grid: RGBColor(238, 238, 238),
        axis: RGBColor(68, 68, 68),
        missing: RGBColor(220, 220, 220),
        outline: WHITE,
    },
];

/// Sequential palettes, light to dark.
const PALETTES: &[(&str, &[RGBColor])] = &[
    (
        "Blues",
        &[
            RGBColor(0xf7, 0xfb, 0xff),
            RGBColor(0xde, 0xeb, 0xf7),
            RGBColor(0xc6, 0xdb, 0xef),
            RGBColor(0x9e, 0xca, 0xe1),
            RGBColor(0x6b, 0xae, 0xd6),
            RGBColor(0x42, 0x92, 0xc6),
            RGBColor(0x21, 0x71, 0xb5),
            RGBColor(0x08, 0x51, 0x9c),
            RGBColor(0x08, 0x30, 0x6b),
        ],
    ),
    (
        "Greens",
        &[
            RGBColor(0xf7, 0xfc, 0xf5),
            RGBColor(0xe5, 0xf5, 0xe0),
            RGBColor(0xc7, 0xe9, 0xc0),
            RGBColor(0xa1, 0xd9, 0x9b),
            RGBColor(0x74, 0xc4, 0x76),
            RGBColor(0x41, 0xab, 0x5d),
            RGBColor(0x23, 0x8b, 0x45),
            RGBColor(0x00, 0x6d, 0x2c),
            RGBColor(0x00, 0x44, 0x1b),
        ],
    ),
    (
        "Greys",
        &[
            RGBColor(0xff, 0xff, 0xff),
            RGBColor(0xf0, 0xf0, 0xf0),
            RGBColor(0xd9, 0xd9, 0xd9),
            RGBColor(0xbd, 0xbd, 0xbd),
            RGBColor(0x96, 0x96, 0x96),
            RGBColor(0x73, 0x73, 0x73),
            RGBColor(0x52, 0x52, 0x52),
            RGBColor(0x25, 0x25, 0x25),
            RGBColor(0x00, 0x00, 0x00),
        ],
    ),
    (
        "Oranges",
        &[
            RGBColor(0xff, 0xf5, 0xeb),
            RGBColor(0xfe, 0xe6, 0xce),
            RGBColor(0xfd, 0xd0, 0xa2),
            RGBColor(0xfd, 0xae, 0x6b),
            RGBColor(0xfd, 0x8d, 0x3c),
            RGBColor(0xf1, 0x69, 0x13),
            RGBColor(0xd9, 0x48, 0x01),
            RGBColor(0xa6, 0x36, 0x03),
            RGBColor(0x7f, 0x27, 0x04),
        ],
    ),
    (
        "Purples",
        &[
            RGBColor(0xfc, 0xfb, 0xfd),
            RGBColor(0xef, 0xed, 0xf5),
            RGBColor(0xda, 0xda, 0xeb),
            RGBColor(0xbc, 0xbd, 0xdc),
            RGBColor(0x9e, 0x9a, 0xc8),
            RGBColor(0x80, 0x7d, 0xba),
            RGBColor(0x6a, 0x51, 0xa3),
            RGBColor(0x54, 0x27, 0x8f),
            RGBColor(0x3f, 0x00, 0x7d),
        ],
    ),
    (
        "Reds",
        &[
            RGBColor(0xff, 0xf5, 0xf0),
            RGBColor(0xfe, 0xe0, 0xd2),
            RGBColor(0xfc, 0xbb, 0xa1),
            RGBColor(0xfc, 0x92, 0x72),
            RGBColor(0xfb, 0x6a, 0x4a),
            RGBColor(0xef, 0x3b, 0x2c),
            RGBColor(0xcb, 0x18, 0x1d),
            RGBColor(0xa5, 0x0f, 0x15),
            RGBColor(0x67, 0x00, 0x0d),
        ],
    ),
    (
        "Viridis",
        &[
            RGBColor(0x44, 0x01, 0x54),
            RGBColor(0x48, 0x28, 0x78),
            RGBColor(0x3e, 0x49, 0x89),
            RGBColor(0x31, 0x68, 0x8e),
            RGBColor(0x26, 0x82, 0x8e),
            RGBColor(0x1f, 0x9e, 0x89),
            RGBColor(0x35, 0xb7, 0x79),
            RGBColor(0x6e, 0xce, 0x58),
            RGBColor(0xb5, 0xde, 0x2b),
            RGBColor(0xfd, 0xe7, 0x25),
        ],
    ),
    (
        "Plasma",
        &[
            RGBColor(0x0d, 0x08, 0x87),
            RGBColor(0x46, 0x03, 0x9f),
            RGBColor(0x72, 0x01, 0xa8),
            RGBColor(0x9c, 0x17, 0x9e),
            RGBColor(0xbd, 0x37, 0x86),
            RGBColor(0xd8, 0x57, 0x6b),
            RGBColor(0xed, 0x79, 0x53),
            RGBColor(0xfb, 0x9f, 0x3a),
            RGBColor(0xfd, 0xca, 0x26),
            RGBColor(0xf0, 0xf9, 0x21),
        ],
    ),
];

pub fn theme(name: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.name == name)
}

pub fn palette(name: &str) -> Option<&'static [RGBColor]> {
    PALETTES
        .iter()
        .find(|(palette, _)| *palette == name)
        .map(|(_, colors)| *colors)
}

/// Resolved visual settings for one report run.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub theme: Theme,
    /// Palette reversed, darkest first.
    pub colorway: Vec<RGBColor>,
    pub margin: Margin,
}

impl Style {
    /// Looks up the template and palette named in `viz`.
    ///
    /// # Errors
    ///
    /// `Render` when either name is not a known template or palette.
    pub fn resolve(viz: &VizConfig) -> Result<Self> {
        let theme = *theme(&viz.template).ok_or_else(|| {
            ReportError::render("style", format!("unknown template '{}'", viz.template))
        })?;
        let colors = palette(&viz.colours).ok_or_else(|| {
            ReportError::render("style", format!("unknown colour palette '{}'", viz.colours))
        })?;

        Ok(Self {
            theme,
            colorway: colors.iter().rev().copied().collect(),
            margin: viz.margin,
        })
    }

    /// Primary series color.
    pub fn primary(&self) -> RGBColor {
        self.colorway[0]
    }

    /// `n` colors spread evenly across the colorway, in colorway order.
    pub fn sample(&self, n: usize) -> Vec<RGBColor> {
        let last = self.colorway.len() - 1;
        match n {
            0 => Vec::new(),
            1 => vec![self.colorway[last / 2]],
            _ => (0..n)
                .map(|i| self.colorway[(i * last + (n - 1) / 2) / (n - 1)])
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viz(template: &str, colours: &str) -> VizConfig {
        VizConfig {
            template: template.to_string(),
            colours: colours.to_string(),
            margin: Margin {
                top: 40,
                bottom: 20,
                left: 20,
                right: 20,
            },
        }
    }

    #[test]
    fn test_resolve_reverses_palette() {
        let style = Style::resolve(&viz("plotly_white", "Blues")).unwrap();
        assert_eq!(style.theme.name, "plotly_white");
        assert_eq!(style.primary(), RGBColor(0x08, 0x30, 0x6b));
        assert_eq!(*style.colorway.last().unwrap(), RGBColor(0xf7, 0xfb, 0xff));
    }

    #[test]
    fn test_unknown_template_is_render_error() {
        let err = Style::resolve(&viz("solarized", "Blues")).unwrap_err();
        assert!(matches!(err, ReportError::Render { .. }));
        assert!(err.to_string().contains("solarized"));
    }

    #[test]
    fn test_unknown_palette_is_render_error() {
        let err = Style::resolve(&viz("plotly", "Rainbow")).unwrap_err();
        assert!(matches!(err, ReportError::Render { .. }));
    }

    #[test]
    fn test_sample_spans_colorway() {
        let style = Style::resolve(&viz("plotly", "Blues")).unwrap();
        let three = style.sample(3);
        assert_eq!(three.len(), 3);
        assert_eq!(three[0], style.colorway[0]);
        assert_eq!(three[1], style.colorway[4]);
        assert_eq!(three[2], style.colorway[8]);
        assert_eq!(style.sample(1).len(), 1);
        assert!(style.sample(0).is_empty());
    }

    #[test]
    fn test_every_palette_and_theme_resolves() {
        for (name, colors) in PALETTES {
            assert!(colors.len() >= 2, "{name}");
            for t in THEMES {
                assert!(Style::resolve(&viz(t.name, name)).is_ok());
            }
        }
    }
}
