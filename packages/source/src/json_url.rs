//! Plain JSON fetchers: HTTP endpoints and local files.
//!
//! Both return either a bare array of records or an object holding the
//! array at a `.`-separated `records_path` (e.g. `"data.items"` or
//! `"features"`).

use std::path::Path;

use crate::parsing::lookup;
use crate::retry::send_json;
use crate::{FetchOptions, RawRecord, SourceError};

/// Fetches records from a JSON endpoint.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails or the records array
/// cannot be located.
pub async fn fetch_json_url(
    url: &str,
    records_path: Option<&str>,
    options: &FetchOptions,
) -> Result<Vec<RawRecord>, SourceError> {
    let body = send_json(|| options.client.get(url), &options.retry).await?;
    let records = extract_records(&body, records_path, options.limit)?;
    log::info!("Downloaded {} records from {url}", records.len());
    Ok(records)
}

/// Reads records from a local JSON file.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or parsed, or the
/// records array cannot be located.
pub async fn load_json_file(
    path: &Path,
    records_path: Option<&str>,
    options: &FetchOptions,
) -> Result<Vec<RawRecord>, SourceError> {
    let text = tokio::fs::read_to_string(path).await?;
    let body: serde_json::Value = serde_json::from_str(&text)?;
    extract_records(&body, records_path, options.limit)
}

/// Locates the records array in a response body.
///
/// # Errors
///
/// Returns [`SourceError::Normalization`] if the body (or the value at
/// `records_path`) is not an array.
pub fn extract_records(
    body: &serde_json::Value,
    records_path: Option<&str>,
    limit: Option<u64>,
) -> Result<Vec<RawRecord>, SourceError> {
    let target = match records_path {
        Some(path) => lookup(body, path).ok_or_else(|| SourceError::Normalization {
            message: format!("No value at records path '{path}'"),
        })?,
        None => body,
    };

    let array = target
        .as_array()
        .ok_or_else(|| SourceError::Normalization {
            message: format!(
                "Expected an array of records{}",
                records_path.map_or_else(String::new, |p| format!(" at '{p}'"))
            ),
        })?;

    let take = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
    Ok(array.iter().take(take).cloned().map(RawRecord::new).collect())
}
