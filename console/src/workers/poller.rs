//! Status polling worker

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::events::log::EventLog;
use crate::http::plant::PlantApi;
use crate::status::backoff::{BackoffStrategy, FixedInterval};
use crate::status::feed::{PollOutcome, StatusFeed};

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay before the first poll
    pub initial_delay: Duration,

    /// Delay between poll starts
    pub backoff: Arc<dyn BackoffStrategy>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            backoff: Arc::new(FixedInterval::default()),
        }
    }
}

/// Run the poller worker.
///
/// Each tick starts a poll without waiting for the previous one, so slow
/// requests may overlap; the feed drops results older than the last applied
/// snapshot. On shutdown the feed is torn down and in-flight polls are left
/// to finish unobserved.
pub async fn run<S, F>(
    options: &Options,
    feed: Arc<StatusFeed>,
    api: Arc<dyn PlantApi>,
    events: Arc<EventLog>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Status poller starting...");

    tokio::select! {
        _ = &mut shutdown_signal => {
            feed.tear_down();
            info!("Status poller shutting down...");
            return;
        }
        _ = sleep_fn(options.initial_delay) => {}
    }

    loop {
        let poll_feed = feed.clone();
        let poll_api = api.clone();
        let poll_events = events.clone();
        tokio::spawn(async move {
            match poll_feed.poll(poll_api.as_ref(), &poll_events).await {
                PollOutcome::Applied(snapshot) => {
                    debug!("Status snapshot applied ({} parameters)", snapshot.len())
                }
                outcome => debug!("Status poll finished: {:?}", outcome),
            }
        });

        let delay = options.backoff.next_delay(feed.consecutive_failures());

        tokio::select! {
            _ = &mut shutdown_signal => {
                feed.tear_down();
                info!("Status poller shutting down...");
                return;
            }
            _ = sleep_fn(delay) => {}
        }
    }
}
