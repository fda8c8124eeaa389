//! Error taxonomy shared by every pipeline stage.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("source unavailable: {locator}: {reason}")]
    SourceUnavailable { locator: String, reason: String },

    #[error("schema mismatch in {locator}: missing column(s) {}", .missing.join(", "))]
    SchemaMismatch {
        locator: String,
        missing: Vec<String>,
    },

    #[error("render error on {page}: {reason}")]
    Render { page: String, reason: String },

    #[error("assembly error: {0}")]
    Assembly(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ReportError {
    pub(crate) fn source_unavailable(locator: &str, reason: impl ToString) -> Self {
        ReportError::SourceUnavailable {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn render(page: &str, reason: impl ToString) -> Self {
        ReportError::Render {
            page: page.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Name of the pipeline stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            ReportError::SourceUnavailable { .. } | ReportError::SchemaMismatch { .. } => "load",
            ReportError::Render { .. } => "render",
            ReportError::Assembly(_) => "assemble",
            ReportError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
