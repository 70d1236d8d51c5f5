//! Concurrent fan-out over every configured source.
//!
//! Each source runs in its own task under a timeout, so a slow, failing or
//! panicking source costs its own records and nothing else.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use disaster_feed_disaster_models::DisasterCategory;
use disaster_feed_source::source_def::SourceDefinition;
use disaster_feed_source::{DisasterSource, FetchOptions, FetchOutcome, SourceError};
use disaster_feed_source_models::DisasterRecord;

use crate::snapshot::SourceReport;
use crate::visibility;

/// Default upper bound on a single source fetch.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Merged result of one fan-out.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Filtered records from every source that succeeded.
    pub records: Vec<DisasterRecord>,
    /// One report per configured source.
    pub sources: Vec<SourceReport>,
}

impl Aggregation {
    /// Returns `true` if sources were configured and every one failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(|s| !s.succeeded())
    }
}

/// Something that can produce a fresh [`Aggregation`].
#[async_trait]
pub trait Refresh: Send + Sync {
    /// Runs one full aggregation.
    async fn refresh(&self) -> Aggregation;
}

/// Fans out to all sources concurrently and merges their records.
pub struct Aggregator {
    sources: Vec<Arc<dyn DisasterSource>>,
    timeout: Duration,
    options: FetchOptions,
}

impl Aggregator {
    /// Creates an aggregator over the given sources.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn DisasterSource>>) -> Self {
        Self {
            sources,
            timeout: DEFAULT_SOURCE_TIMEOUT,
            options: FetchOptions::default(),
        }
    }

    /// Creates an aggregator over config-driven source definitions.
    #[must_use]
    pub fn from_definitions(definitions: Vec<SourceDefinition>) -> Self {
        Self::new(
            definitions
                .into_iter()
                .map(|d| Arc::new(d) as Arc<dyn DisasterSource>)
                .collect(),
        )
    }

    /// Sets the per-source timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the fetch options shared by every source.
    #[must_use]
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Keeps only the sources of the given categories.
    #[must_use]
    pub fn only(mut self, categories: &[DisasterCategory]) -> Self {
        self.sources.retain(|s| categories.contains(&s.category()));
        self
    }

    /// Returns the configured sources.
    #[must_use]
    pub fn sources(&self) -> &[Arc<dyn DisasterSource>] {
        &self.sources
    }

    /// Fetches every source concurrently, applies the visibility filter and
    /// merges the results.
    ///
    /// Never fails: a source that errors, times out or panics contributes
    /// zero records and is reported in [`Aggregation::sources`].
    pub async fn aggregate(&self) -> Aggregation {
        let started = Instant::now();

        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let id = source.id().to_string();
                let category = source.category();
                let handle = tokio::spawn(fetch_with_timeout(
                    Arc::clone(source),
                    self.options.clone(),
                    self.timeout,
                ));
                (id, category, handle)
            })
            .collect();

        let outcomes = futures::future::join_all(handles.into_iter().map(
            |(id, category, handle)| async move {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        let message = join_error_message(e);
                        log::error!("{id}: fetch task failed: {message}");
                        let error = SourceError::Panicked { message };
                        (FetchOutcome::failed(id, category, error), Duration::ZERO)
                    }
                }
            },
        ))
        .await;

        let mut aggregation = Aggregation::default();
        for (outcome, elapsed) in outcomes {
            let filtered = visibility::filter(outcome.records);
            if filtered.missing_coordinates > 0 {
                log::debug!(
                    "{}: dropped {} records without coordinates",
                    outcome.source_id,
                    filtered.missing_coordinates
                );
            }
            aggregation.sources.push(SourceReport {
                source_id: outcome.source_id,
                category: outcome.category,
                fetched: outcome.fetched,
                kept: filtered.records.len(),
                hidden: filtered.hidden,
                missing_coordinates: filtered.missing_coordinates,
                error: outcome.error.map(|e| e.to_string()),
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            });
            aggregation.records.extend(filtered.records);
        }

        let failed = aggregation.sources.iter().filter(|s| !s.succeeded()).count();
        log::info!(
            "Aggregated {} records from {} sources ({failed} failed) in {:.1}s",
            aggregation.records.len(),
            aggregation.sources.len(),
            started.elapsed().as_secs_f64()
        );

        aggregation
    }
}

#[async_trait]
impl Refresh for Aggregator {
    async fn refresh(&self) -> Aggregation {
        self.aggregate().await
    }
}

async fn fetch_with_timeout(
    source: Arc<dyn DisasterSource>,
    options: FetchOptions,
    timeout: Duration,
) -> (FetchOutcome, Duration) {
    let started = Instant::now();
    let outcome = match tokio::time::timeout(timeout, source.fetch(&options)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            log::warn!("{}: no response within {timeout:?}", source.id());
            FetchOutcome::failed(
                source.id().to_string(),
                source.category(),
                SourceError::Timeout(timeout),
            )
        }
    };
    (outcome, started.elapsed())
}

/// Extracts a readable message from a failed task.
pub(crate) fn join_error_message(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use disaster_feed_disaster_models::DisasterCategory;

    use super::*;
    use crate::test_support::{Behavior, ScriptedSource, located};

    fn seven_sources(fire: Behavior) -> Vec<Arc<dyn DisasterSource>> {
        DisasterCategory::all()
            .iter()
            .map(|&category| {
                let behavior = if category == DisasterCategory::Fire {
                    fire.clone()
                } else {
                    Behavior::Records(vec![
                        located(&format!("{category}-1"), category, true),
                        located(&format!("{category}-2"), category, false),
                    ])
                };
                Arc::new(ScriptedSource::new(category, behavior)) as Arc<dyn DisasterSource>
            })
            .collect()
    }

    async fn assert_fire_isolated(fire: Behavior, expected_error: &str) {
        let aggregator =
            Aggregator::new(seven_sources(fire)).with_timeout(Duration::from_millis(200));
        let aggregation = aggregator.aggregate().await;

        assert_eq!(aggregation.records.len(), 6);
        assert!(
            aggregation
                .records
                .iter()
                .all(|r| r.category != DisasterCategory::Fire)
        );
        let fire = aggregation
            .sources
            .iter()
            .find(|s| s.category == DisasterCategory::Fire)
            .unwrap();
        assert!(
            fire.error.as_deref().unwrap().contains(expected_error),
            "unexpected error: {:?}",
            fire.error
        );
        assert!(!aggregation.all_failed());
    }

    #[tokio::test]
    async fn failing_source_does_not_affect_others() {
        assert_fire_isolated(Behavior::Fail, "unavailable").await;
    }

    #[tokio::test]
    async fn hanging_source_times_out() {
        assert_fire_isolated(Behavior::Hang, "timed out").await;
    }

    #[tokio::test]
    async fn panicking_source_is_isolated() {
        assert_fire_isolated(Behavior::Panic, "panicked").await;
    }

    #[tokio::test]
    async fn emitted_records_are_visible_and_located() {
        let source = ScriptedSource::new(
            DisasterCategory::Flood,
            Behavior::Records(vec![
                located("a", DisasterCategory::Flood, true),
                located("b", DisasterCategory::Flood, false),
                crate::test_support::unlocated("c", DisasterCategory::Flood),
            ]),
        );
        let aggregation = Aggregator::new(vec![Arc::new(source)]).aggregate().await;

        assert_eq!(aggregation.records.len(), 1);
        assert!(aggregation.records.iter().all(|r| r.visible));
        let report = &aggregation.sources[0];
        assert_eq!(report.fetched, 3);
        assert_eq!(report.kept, 1);
        assert_eq!(report.hidden, 1);
        assert_eq!(report.missing_coordinates, 1);
    }

    #[tokio::test]
    async fn all_failed_only_when_every_source_fails() {
        let sources: Vec<Arc<dyn DisasterSource>> = vec![
            Arc::new(ScriptedSource::new(DisasterCategory::Fire, Behavior::Fail)),
            Arc::new(ScriptedSource::new(DisasterCategory::Flood, Behavior::Fail)),
        ];
        assert!(Aggregator::new(sources).aggregate().await.all_failed());
        assert!(!Aggregator::new(Vec::new()).aggregate().await.all_failed());
    }

    #[tokio::test]
    async fn only_filters_sources_by_category() {
        let aggregator =
            Aggregator::new(seven_sources(Behavior::Fail)).only(&[DisasterCategory::Cyclone]);
        assert_eq!(aggregator.sources().len(), 1);
        let aggregation = aggregator.aggregate().await;
        assert_eq!(aggregation.records.len(), 1);
        assert_eq!(aggregation.records[0].category, DisasterCategory::Cyclone);
    }

    #[tokio::test]
    async fn fetch_options_reach_every_source() {
        use disaster_feed_source::source_def::{FetcherConfig, FieldMapping};

        let path = std::env::temp_dir().join("disaster_feed_aggregator_limit.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "a", "latitude": 23.7, "longitude": 90.4, "isVisible": true},
                {"id": "b", "latitude": 23.8, "longitude": 90.4, "isVisible": true},
                {"id": "c", "latitude": 23.9, "longitude": 90.4, "isVisible": true}
            ]"#,
        )
        .unwrap();
        let definition = SourceDefinition {
            id: "floods_local".to_string(),
            name: "Local floods".to_string(),
            category: DisasterCategory::Flood,
            fetcher: FetcherConfig::File {
                path,
                records_path: None,
            },
            fields: FieldMapping::default(),
        };

        let aggregation = Aggregator::from_definitions(vec![definition])
            .with_options(FetchOptions {
                limit: Some(2),
                ..FetchOptions::default()
            })
            .aggregate()
            .await;

        assert_eq!(aggregation.records.len(), 2);
        assert_eq!(aggregation.sources[0].fetched, 2);
    }
}
