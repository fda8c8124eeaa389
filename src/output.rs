//! Persistence of rendered chart pages.
//!
//! Each page is one SVG file named `fig_NN.svg` after its ordinal, so the
//! assembly order can be recovered from the pages directory alone.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{ReportError, Result};

const PAGE_PREFIX: &str = "fig_";
const PAGE_EXTENSION: &str = "svg";

/// One rendered chart page and its position in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub ordinal: u32,
    pub path: PathBuf,
}

/// File name of the page at `ordinal`, e.g. `fig_03.svg`.
pub fn page_file_name(ordinal: u32) -> String {
    format!("{PAGE_PREFIX}{ordinal:02}.{PAGE_EXTENSION}")
}

/// Inverse of [`page_file_name`]; `None` for files this pipeline does not own.
pub fn parse_page_ordinal(file_name: &str) -> Option<u32> {
    let stem = file_name
        .strip_prefix(PAGE_PREFIX)?
        .strip_suffix(PAGE_EXTENSION)?
        .strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Creates the pages directory and clears stale pages left by a previous run.
pub fn prepare_pages_dir(dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir).map_err(|e| {
        ReportError::render("pages directory", format!("{}: {e}", dir.display()))
    })?;
    Ok(clear_stale_pages(dir))
}

/// Deletes every page file in `dir`, returning how many were removed.
///
/// Failures are logged and skipped; other files are left alone.
pub fn clear_stale_pages(dir: &Path) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot list pages directory");
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if parse_page_ordinal(name).is_none() {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!(file = name, "Removed stale page");
                removed += 1;
            }
            Err(e) => warn!(file = name, error = %e, "Error while deleting stale page"),
        }
    }

    if removed > 0 {
        info!(removed, dir = %dir.display(), "Cleared stale pages");
    }
    removed
}

/// Writes one SVG page into `dir` under its ordinal name.
pub fn write_page(dir: &Path, ordinal: u32, svg: &str) -> Result<RenderedPage> {
    let name = page_file_name(ordinal);
    let path = dir.join(&name);
    fs::write(&path, svg).map_err(|e| ReportError::render(&name, e))?;
    debug!(path = %path.display(), bytes = svg.len(), "Page written");
    Ok(RenderedPage { ordinal, path })
}

/// Lists the page files in `dir`, sorted by ordinal.
pub fn discover_pages(dir: &Path) -> Result<Vec<RenderedPage>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        ReportError::Assembly(format!("cannot read pages directory {}: {e}", dir.display()))
    })?;

    let mut pages = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReportError::Assembly(e.to_string()))?;
        let name = entry.file_name();
        let Some(ordinal) = name.to_str().and_then(parse_page_ordinal) else {
            continue;
        };
        if entry.path().is_file() {
            pages.push(RenderedPage {
                ordinal,
                path: entry.path(),
            });
        }
    }

    pages.sort_by_key(|p| p.ordinal);
    Ok(pages)
}
