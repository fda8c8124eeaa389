//! Report configuration loaded from a JSON document.
//!
//! ```json
//! {
//!   "report_name": "retail_report.pdf",
//!   "viz": {
//!     "template": "plotly_white",
//!     "colours": "Blues",
//!     "margin": { "t": 40, "b": 20, "l": 20, "r": 20 }
//!   }
//! }
//! ```
//!
//! `report_name` and the whole `viz` block are required. `sources`, `map`,
//! `output` and `fetch` fall back to the New York State defaults below.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{ReportError, Result};

const RETAIL_STORES_URL: &str =
    "https://data.ny.gov/api/views/9a8c-vfzj/rows.csv?accessType=DOWNLOAD&sorting=true";
const COUNTY_FIPS_URL: &str =
    "https://data.ny.gov/api/views/79vr-2kdi/rows.csv?accessType=DOWNLOAD&sorting=true";
const COUNTY_GEOMETRY_URL: &str =
    "https://raw.githubusercontent.com/plotly/datasets/master/geojson-counties-fips.json";
const NEW_YORK_STATE_FIPS: u32 = 36;

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    pub report_name: String,
    pub viz: VizConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VizConfig {
    /// Visual theme id, e.g. `plotly_white`.
    pub template: String,
    /// Sequential palette name, e.g. `Blues`.
    pub colours: String,
    pub margin: Margin,
}

/// Page margin box in pixels.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Margin {
    #[serde(alias = "t")]
    pub top: u32,
    #[serde(alias = "b")]
    pub bottom: u32,
    #[serde(alias = "l")]
    pub left: u32,
    #[serde(alias = "r")]
    pub right: u32,
}

/// Locators (URL or path) of the two tabular sources.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    pub stores: String,
    pub fips: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            stores: RETAIL_STORES_URL.to_string(),
            fips: COUNTY_FIPS_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// GeoJSON FeatureCollection of county shapes.
    pub geometry: String,
    /// State whose counties are drawn on the choropleth.
    pub state_fips: u32,
    /// Feature property holding the county FIPS code; the feature id is used when unset.
    pub fips_property: Option<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            geometry: COUNTY_GEOMETRY_URL.to_string(),
            state_fips: NEW_YORK_STATE_FIPS,
            fips_property: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    /// Working directory for the per-page artifacts.
    pub pages_dir: PathBuf,
    /// Directory the final report is written into.
    pub report_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pages_dir: PathBuf::from("output"),
            report_dir: PathBuf::from("report"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl ReportConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: ReportConfig = serde_json::from_str(content)
            .map_err(|e| ReportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.report_name.trim().is_empty() {
            return Err(ReportError::Config("report_name is empty".to_string()));
        }
        if Path::new(&self.report_name).file_name().and_then(|n| n.to_str())
            != Some(self.report_name.as_str())
        {
            return Err(ReportError::Config(format!(
                "report_name must be a plain file name, got '{}'",
                self.report_name
            )));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ReportError::Config("fetch.timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }

    /// Destination of the assembled report.
    pub fn report_path(&self) -> PathBuf {
        self.output.report_dir.join(&self.report_name)
    }
}
