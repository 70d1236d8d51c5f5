#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Disaster feed aggregation.
//!
//! The [`aggregator::Aggregator`] fans out to every configured source,
//! [`visibility::filter`] keeps what consumers may see, and the
//! [`scheduler::RefreshScheduler`] repeats the cycle on an interval and
//! publishes each result as an immutable [`snapshot::Snapshot`].

pub mod aggregator;
pub mod scheduler;
pub mod snapshot;
pub mod visibility;

pub use aggregator::{Aggregation, Aggregator, Refresh};
pub use scheduler::{RefreshScheduler, SchedulerHandle};
pub use snapshot::{Snapshot, SourceReport};
