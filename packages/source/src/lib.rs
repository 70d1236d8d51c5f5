#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Disaster source adapters and normalization logic.
//!
//! Each disaster category is backed by a source implementing the
//! [`DisasterSource`] trait. The shipped implementation is the
//! config-driven [`source_def::SourceDefinition`], which reads a raw
//! collection and maps it onto the canonical
//! [`NormalizedDisaster`] shape through a per-source field-alias table.

pub mod firestore;
pub mod json_url;
pub mod parsing;
pub mod registry;
pub mod retry;
pub mod source_def;

use std::time::Duration;

use async_trait::async_trait;
use disaster_feed_disaster_models::DisasterCategory;
use disaster_feed_source_models::NormalizedDisaster;

use crate::retry::RetryPolicy;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source definition could not be parsed.
    #[error("Invalid source definition: {0}")]
    Toml(#[from] toml::de::Error),

    /// Data normalization error.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },

    /// The source did not answer within the allotted time.
    #[error("Source timed out after {0:?}")]
    Timeout(Duration),

    /// The fetch task panicked.
    #[error("Source task panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },
}

/// Configuration shared by every fetch in one refresh cycle.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// HTTP client reused across sources.
    pub client: reqwest::Client,
    /// Maximum number of raw records to read per source.
    pub limit: Option<u64>,
    /// Retry behaviour for transient HTTP failures.
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            limit: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// A raw record as read from a store, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Store-assigned document id, when the store has one.
    pub document_id: Option<String>,
    /// The record body as plain JSON.
    pub data: serde_json::Value,
}

impl RawRecord {
    /// Wraps a JSON value that carries no store-assigned id.
    #[must_use]
    pub const fn new(data: serde_json::Value) -> Self {
        Self {
            document_id: None,
            data,
        }
    }
}

/// Result of one adapter fetch: records on success, an empty list plus
/// the error on failure.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Id of the source that ran.
    pub source_id: String,
    /// Category every record was assigned.
    pub category: DisasterCategory,
    /// Number of raw records read from the store.
    pub fetched: usize,
    /// Normalized records (empty when `error` is set).
    pub records: Vec<NormalizedDisaster>,
    /// Why the fetch failed, if it did.
    pub error: Option<SourceError>,
}

impl FetchOutcome {
    /// Builds the outcome for a source that failed before producing records.
    #[must_use]
    pub const fn failed(source_id: String, category: DisasterCategory, error: SourceError) -> Self {
        Self {
            source_id,
            category,
            fetched: 0,
            records: Vec::new(),
            error: Some(error),
        }
    }
}

/// Trait that all disaster sources must implement.
///
/// Each source knows how to read its raw collection and normalize it into
/// the canonical [`NormalizedDisaster`] format.
#[async_trait]
pub trait DisasterSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g. `"earthquakes"`).
    fn id(&self) -> &str;

    /// Returns the category every record from this source is assigned.
    fn category(&self) -> DisasterCategory;

    /// Reads the raw records from the backing store.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the store cannot be reached or its
    /// response cannot be decoded.
    async fn fetch_raw(&self, options: &FetchOptions) -> Result<Vec<RawRecord>, SourceError>;

    /// Maps raw records onto the canonical shape.
    fn normalize(&self, records: &[RawRecord]) -> Vec<NormalizedDisaster>;

    /// Fetches and normalizes, never failing: errors are carried in the
    /// returned [`FetchOutcome`] alongside an empty record list.
    async fn fetch(&self, options: &FetchOptions) -> FetchOutcome {
        match self.fetch_raw(options).await {
            Ok(raw) => {
                let records = self.normalize(&raw);
                log::debug!(
                    "{}: fetched {} raw records, normalized {}",
                    self.id(),
                    raw.len(),
                    records.len()
                );
                FetchOutcome {
                    source_id: self.id().to_string(),
                    category: self.category(),
                    fetched: raw.len(),
                    records,
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("{}: fetch failed: {e}", self.id());
                FetchOutcome::failed(self.id().to_string(), self.category(), e)
            }
        }
    }
}
