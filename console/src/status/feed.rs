//! Status feed: the backend-authoritative parameter snapshot

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use plant_api::StatusSnapshot;
use tracing::debug;

use crate::events::log::EventLog;
use crate::http::plant::PlantApi;

/// Receives every snapshot the feed applies, in apply order
pub trait SnapshotObserver: Send + Sync {
    fn observe_snapshot(&self, snapshot: &StatusSnapshot);
}

/// Result of one status poll
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The snapshot replaced the current one
    Applied(Arc<StatusSnapshot>),
    /// A newer poll had already been applied; this result was dropped
    Stale,
    /// The fetch failed; the previous snapshot is untouched
    Failed,
    /// The feed was torn down while the request was in flight
    Discarded,
}

struct FeedState {
    snapshot: Arc<StatusSnapshot>,
    applied_ticket: u64,
    updated_at: Option<DateTime<Utc>>,
}

/// Holds the latest full status snapshot.
///
/// Snapshots are swapped whole; readers see either the old or the new one.
/// Polls may overlap, so each poll takes a ticket when it starts and a result
/// older than the last applied one is dropped.
pub struct StatusFeed {
    state: RwLock<FeedState>,
    observers: RwLock<Vec<Arc<dyn SnapshotObserver>>>,
    issued: AtomicU64,
    failures: AtomicU32,
    torn_down: AtomicBool,
}

impl StatusFeed {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(FeedState {
                snapshot: Arc::new(StatusSnapshot::new()),
                applied_ticket: 0,
                updated_at: None,
            }),
            observers: RwLock::new(Vec::new()),
            issued: AtomicU64::new(0),
            failures: AtomicU32::new(0),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Register an observer for applied snapshots
    pub fn add_observer(&self, observer: Arc<dyn SnapshotObserver>) {
        let mut observers = self.observers.write().unwrap_or_else(|e| e.into_inner());
        observers.push(observer);
    }

    /// The current snapshot (empty until the first successful poll)
    pub fn latest(&self) -> Arc<StatusSnapshot> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.snapshot.clone()
    }

    /// When the current snapshot was applied
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.updated_at
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Stop accepting poll results. In-flight polls finish but are ignored.
    pub fn tear_down(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Fetch the status once and apply it
    pub async fn poll(&self, api: &dyn PlantApi, events: &EventLog) -> PollOutcome {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let result = api.fetch_status().await;

        if self.is_torn_down() {
            debug!("Discarding status poll {} after teardown", ticket);
            return PollOutcome::Discarded;
        }

        match result {
            Ok(snapshot) => {
                self.failures.store(0, Ordering::SeqCst);
                self.apply(ticket, snapshot)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                events.error(format!(
                    "Failed to fetch bioreactor status: {}",
                    e.operator_detail()
                ));
                PollOutcome::Failed
            }
        }
    }

    fn apply(&self, ticket: u64, snapshot: StatusSnapshot) -> PollOutcome {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if ticket < state.applied_ticket {
            debug!(
                "Dropping stale status poll {} (applied {})",
                ticket, state.applied_ticket
            );
            return PollOutcome::Stale;
        }

        let snapshot = Arc::new(snapshot);
        state.snapshot = snapshot.clone();
        state.applied_ticket = ticket;
        state.updated_at = Some(Utc::now());

        // Still under the state lock so observers see snapshots in apply order
        let observers = self.observers.read().unwrap_or_else(|e| e.into_inner());
        for observer in observers.iter() {
            observer.observe_snapshot(&snapshot);
        }

        PollOutcome::Applied(snapshot)
    }
}

impl Default for StatusFeed {
    fn default() -> Self {
        Self::new()
    }
}
