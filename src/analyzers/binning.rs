//! Equal-width classification of per-county values for the choropleth legend.

/// Endpoints used for the map legend: four endpoints, three bins.
pub const LEGEND_ENDPOINTS: usize = 4;

/// Legend values at or above this magnitude are shown in exponent format.
const EXPONENT_THRESHOLD: f64 = 10_000.0;

/// Ordered bin endpoints spanning `[min, max]` with equal width.
///
/// A degenerate range (every value equal) holds a single bin whose two
/// endpoints are the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct BinSet {
    endpoints: Vec<f64>,
}

impl BinSet {
    /// Computes `endpoints` equally spaced values from `min` to `max` inclusive.
    ///
    /// Non-finite values are ignored. Returns `None` when no finite value is left.
    pub fn equal_width(values: &[f64], endpoints: usize) -> Option<Self> {
        let (min, max) = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;

        if min == max {
            return Some(Self {
                endpoints: vec![min, max],
            });
        }

        let n = endpoints.max(2);
        let step = (max - min) / (n - 1) as f64;
        let endpoints = (0..n)
            .map(|i| if i == n - 1 { max } else { min + step * i as f64 })
            .collect();
        Some(Self { endpoints })
    }

    pub fn endpoints(&self) -> &[f64] {
        &self.endpoints
    }

    pub fn bin_count(&self) -> usize {
        self.endpoints.len() - 1
    }

    pub fn is_degenerate(&self) -> bool {
        self.bin_count() == 1 && self.endpoints[0] == self.endpoints[1]
    }

    /// Bin index of `value`: `[e_i, e_i+1)`, with the last bin closed.
    ///
    /// Values outside the range land in the first or last bin.
    pub fn classify(&self, value: f64) -> usize {
        let inner = &self.endpoints[1..self.endpoints.len() - 1];
        inner
            .iter()
            .position(|&edge| value < edge)
            .unwrap_or(self.bin_count() - 1)
    }

    /// One label per bin, rounded to whole numbers.
    pub fn legend_labels(&self) -> Vec<String> {
        if self.is_degenerate() {
            return vec![legend_value(self.endpoints[0])];
        }
        self.endpoints
            .windows(2)
            .map(|w| format!("{} - {}", legend_value(w[0]), legend_value(w[1])))
            .collect()
    }
}

fn legend_value(value: f64) -> String {
    let rounded = value.round();
    if rounded.abs() >= EXPONENT_THRESHOLD {
        format!("{:.1e}", rounded)
    } else {
        format!("{:.0}", rounded)
    }
}
