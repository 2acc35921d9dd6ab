//! Terminal echo of the event log

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::events::echo::render_entry;
use crate::events::log::EventLog;

/// Print every appended event log entry until shutdown
pub async fn run(
    events: Arc<EventLog>,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    let mut entries = events.subscribe();
    info!("Event echo starting...");

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Event echo shutting down...");
                return;
            }
            received = entries.recv() => match received {
                Ok(entry) => println!("{}", render_entry(&entry)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event echo fell behind, skipped {} entries", skipped);
                }
                Err(RecvError::Closed) => return,
            }
        }
    }
}
