//! Visibility filter.
//!
//! Only records that are both visible and located make it to consumers.
//! Everything else is counted so the drop is observable.

use disaster_feed_source_models::{DisasterRecord, NormalizedDisaster, Rejection};

/// Records that passed the filter plus counts of what was dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Visible records with coordinates.
    pub records: Vec<DisasterRecord>,
    /// Records dropped because they were not visible.
    pub hidden: usize,
    /// Records dropped because they had no usable coordinates.
    pub missing_coordinates: usize,
}

/// Keeps the records that are visible and have coordinates.
#[must_use]
pub fn filter(records: impl IntoIterator<Item = NormalizedDisaster>) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for record in records {
        match DisasterRecord::try_from(record) {
            Ok(record) => outcome.records.push(record),
            Err(Rejection::Hidden) => outcome.hidden += 1,
            Err(Rejection::MissingCoordinates) => outcome.missing_coordinates += 1,
        }
    }

    outcome
}
