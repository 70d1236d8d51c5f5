//! Periodic refresh and atomic snapshot publication.
//!
//! A single background task refreshes on a fixed interval. Each cycle's
//! result is published as a whole through a [`tokio::sync::watch`] channel
//! of `Arc<Snapshot>`, so readers always hold one complete snapshot.
//! Exactly one refresh runs at a time; a manual refresh requested while one
//! is in flight waits for it and returns its snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::aggregator::{Aggregation, Refresh, join_error_message};
use crate::snapshot::Snapshot;

/// Refresh interval for list views.
pub const DEFAULT_LIST_INTERVAL: Duration = Duration::from_secs(300);

/// Refresh interval for the live map.
pub const DEFAULT_MAP_INTERVAL: Duration = Duration::from_secs(30);

const MIN_INTERVAL: Duration = Duration::from_millis(10);

struct Shared {
    refresher: Arc<dyn Refresh>,
    gate: Arc<Mutex<()>>,
    snapshot: watch::Sender<Arc<Snapshot>>,
}

impl Shared {
    /// Runs a cycle, or waits for the one in flight.
    ///
    /// The cycle owns the gate and publishes from its own task, so a caller
    /// that stops waiting neither releases the gate early nor loses the
    /// result.
    async fn refresh(self: &Arc<Self>) -> Arc<Snapshot> {
        let Ok(guard) = Arc::clone(&self.gate).try_lock_owned() else {
            log::debug!("Refresh already in flight, waiting for it");
            let _guard = self.gate.lock().await;
            return self.snapshot.borrow().clone();
        };

        let shared = Arc::clone(self);
        let cycle = tokio::spawn(async move {
            let snapshot = shared.run_cycle().await;
            drop(guard);
            snapshot
        });

        match cycle.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("Refresh task failed: {}", join_error_message(e));
                self.snapshot.borrow().clone()
            }
        }
    }

    async fn run_cycle(&self) -> Arc<Snapshot> {
        let refresher = Arc::clone(&self.refresher);
        match tokio::spawn(async move { refresher.refresh().await }).await {
            Ok(aggregation) => self.publish(aggregation),
            Err(e) => {
                log::error!(
                    "Refresh cycle failed, keeping previous snapshot: {}",
                    join_error_message(e)
                );
                self.snapshot.borrow().clone()
            }
        }
    }

    fn publish(&self, aggregation: Aggregation) -> Arc<Snapshot> {
        let previous = self.snapshot.borrow().clone();

        let next = if aggregation.all_failed() {
            log::warn!(
                "All {} sources failed, keeping snapshot from cycle {}",
                aggregation.sources.len(),
                previous.cycle
            );
            Snapshot {
                cycle: previous.cycle,
                refreshed_at: previous.refreshed_at,
                records: previous.records.clone(),
                sources: aggregation.sources,
                stale: true,
            }
        } else {
            Snapshot {
                cycle: previous.cycle + 1,
                refreshed_at: Some(Utc::now()),
                records: aggregation.records,
                sources: aggregation.sources,
                stale: false,
            }
        };

        let next = Arc::new(next);
        self.snapshot.send_replace(Arc::clone(&next));
        log::info!(
            "Published snapshot cycle {} with {} records{}",
            next.cycle,
            next.records.len(),
            if next.stale { " (stale)" } else { "" }
        );
        next
    }
}

/// Owns the published snapshot and runs refresh cycles.
///
/// Cheap to clone; clones share the same snapshot and refresh gate.
#[derive(Clone)]
pub struct RefreshScheduler {
    shared: Arc<Shared>,
}

impl RefreshScheduler {
    /// Creates a scheduler with an empty snapshot. Nothing is fetched until
    /// [`Self::start`] or [`Self::refresh_now`] is called.
    #[must_use]
    pub fn new(refresher: Arc<dyn Refresh>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));
        Self {
            shared: Arc::new(Shared {
                refresher,
                gate: Arc::new(Mutex::new(())),
                snapshot,
            }),
        }
    }

    /// Returns the currently published snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.shared.snapshot.borrow().clone()
    }

    /// Subscribes to snapshot publications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.shared.snapshot.subscribe()
    }

    /// Refreshes immediately and returns the published snapshot.
    ///
    /// If a refresh is already in flight this waits for it instead of
    /// starting another one.
    pub async fn refresh_now(&self) -> Arc<Snapshot> {
        self.shared.refresh().await
    }

    /// Starts the background loop: one refresh right away, then one every
    /// `interval`.
    #[must_use]
    pub fn start(&self, interval: Duration) -> SchedulerHandle {
        let period = interval.max(MIN_INTERVAL);
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let shared = Arc::clone(&self.shared);

        let task = tokio::spawn(async move {
            log::info!("Refresh scheduler started (interval {period:?})");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        shared.refresh().await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
                if *shutdown_rx.borrow() {
                    break;
                }
            }

            log::info!("Refresh scheduler stopped");
        });

        SchedulerHandle {
            scheduler: self.clone(),
            shutdown,
            task: Some(task),
        }
    }
}

/// Handle to a running refresh loop.
///
/// Dropping the handle signals the loop to stop after any in-flight
/// refresh; [`Self::stop`] additionally waits for it.
pub struct SchedulerHandle {
    scheduler: RefreshScheduler,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Returns the scheduler driven by this loop.
    #[must_use]
    pub const fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Returns the currently published snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.scheduler.current()
    }

    /// Subscribes to snapshot publications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.scheduler.subscribe()
    }

    /// Refreshes immediately; see [`RefreshScheduler::refresh_now`].
    pub async fn refresh_now(&self) -> Arc<Snapshot> {
        self.scheduler.refresh_now().await
    }

    /// Stops the loop. An in-flight refresh finishes and publishes first.
    pub async fn stop(mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            log::error!("Refresh scheduler task failed: {}", join_error_message(e));
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
