//! Raw byte access to dataset locators: HTTP(S) URLs or local paths.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::{ReportError, Result};
use tracing::debug;

/// Fetches `url` with a single GET; non-success statuses are errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let parsed = url
        .parse::<reqwest::Url>()
        .map_err(|e| ReportError::source_unavailable(url, format!("invalid URL: {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await.map_err(|e| {
        if e.is_timeout() {
            ReportError::source_unavailable(url, "request timed out")
        } else {
            ReportError::source_unavailable(url, e)
        }
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(ReportError::source_unavailable(
            url,
            format!("HTTP status {status}"),
        ));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| ReportError::source_unavailable(url, e))?;
    Ok(bytes.to_vec())
}

/// Loads a locator from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(client), fields(source = %locator))]
pub async fn fetch_source<C: HttpClient>(client: &C, locator: &str) -> Result<Vec<u8>> {
    let bytes = if locator.starts_with("http") {
        fetch_bytes(client, locator).await?
    } else {
        std::fs::read(locator).map_err(|e| ReportError::source_unavailable(locator, e))?
    };
    debug!(bytes = bytes.len(), "Source bytes received");
    Ok(bytes)
}
