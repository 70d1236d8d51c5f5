#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geospatial hazard assessment.
//!
//! A point is classified into hazard-prone regions by fixed bounding
//! boxes, each hazard is scored from a range that depends on region
//! membership, and the scores are combined into an overall band with
//! matching safety guidance. This is a rule-based estimate, not a
//! prediction.

pub mod engine;
pub mod guidance;
pub mod regions;
pub mod scorer;

pub use engine::RiskEngine;
pub use scorer::{HazardScorer, RandomScorer, SeededScorer};

/// Errors returned by the risk engine.
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    /// The query point is missing, non-finite or out of range.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// What was wrong with the query.
        message: String,
    },
}
