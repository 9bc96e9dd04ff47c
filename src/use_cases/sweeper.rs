use crate::domain::ports::Clock;
use crate::use_cases::bus::{MATCH_TIMEOUTS_CHANNEL, PartitionBus};
use crate::use_cases::engine::MatchingEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error};

// Periodically purge expired tickets and announce each one on the timeout
// channel. Sweep frequency only bounds memory growth; the relay's own timer
// drives the user-visible timeout.
pub async fn run_sweeper(
    engine: Arc<Mutex<MatchingEngine>>,
    bus: PartitionBus,
    clock: Arc<dyn Clock>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so a fresh server does not
    // sweep an empty queue at startup.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let (timeouts, queue_len, pool_len) = {
            let mut engine = engine.lock().await;
            let timeouts = engine.sweep(clock.now_ms());
            (timeouts, engine.queue_len(), engine.pool_len())
        };

        if !timeouts.is_empty() {
            debug!(
                swept = timeouts.len(),
                queue_len, pool_len, "expired tickets swept"
            );
        }

        for timeout in timeouts {
            if let Err(e) = bus.publish(MATCH_TIMEOUTS_CHANNEL, &timeout).await {
                error!(error = ?e, user_id = %timeout.user_id, "failed to publish timeout event");
            }
        }
    }
}
