//! The published result of one refresh cycle.

use chrono::{DateTime, Utc};
use disaster_feed_disaster_models::DisasterCategory;
use disaster_feed_source_models::DisasterRecord;
use serde::Serialize;

/// Per-source diagnostics for one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    /// Id of the source.
    pub source_id: String,
    /// Category the source feeds.
    pub category: DisasterCategory,
    /// Raw records read from the store.
    pub fetched: usize,
    /// Records that passed the visibility filter.
    pub kept: usize,
    /// Records dropped as not visible.
    pub hidden: usize,
    /// Records dropped for lacking coordinates.
    pub missing_coordinates: usize,
    /// Why the source failed, if it did.
    pub error: Option<String>,
    /// Wall time spent on the source.
    pub elapsed_ms: u64,
}

impl SourceReport {
    /// Returns `true` if the source produced a result this cycle.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// The complete, filtered result of one refresh.
///
/// Snapshots are immutable once published; a new cycle replaces the whole
/// value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Refresh cycle that produced the records (`0` before the first one).
    pub cycle: u64,
    /// When the records were aggregated.
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Consumer-facing records.
    pub records: Vec<DisasterRecord>,
    /// Diagnostics from the most recent attempt.
    pub sources: Vec<SourceReport>,
    /// Set when the most recent attempt failed and these records are older.
    pub stale: bool,
}

impl Snapshot {
    /// Returns `true` before the first successful refresh.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.refreshed_at.is_none()
    }
}
