use crate::domain::descriptor::MatchDescriptor;
use crate::domain::entry::{MatchStatus, RequestEntry};
use crate::domain::ports::Clock;
use crate::domain::queue::RequestQueue;
use crate::interface_adapters::protocol::{
    MatchMessage, MatchTimeoutMessage, MessageAction, QueueMessage,
};
use crate::use_cases::bus::{MATCHES_CHANNEL, PartitionBus};
use crate::use_cases::status_pool::StatusPool;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// Outcome of one consumed bus message, reported for logging and tests.
#[derive(Debug)]
pub enum EngineOutcome {
    // A compatible partner was waiting; publish the returned match event.
    Paired(MatchMessage),
    // No partner yet; the requester is now waiting in the queue.
    Queued,
    // The user already has a live ticket; the event was dropped.
    DuplicateDropped,
    // A pending ticket was cancelled.
    Cancelled,
    // Defined no-op: cancel for a missing or already-matched user, or an
    // unparseable partition key.
    Ignored,
}

// The matchmaking state machine. One instance per process, guarded by a
// single lock so that "find a compatible partner and remove it" is
// indivisible across partition consumers.
#[derive(Debug, Default)]
pub struct MatchingEngine {
    queue: RequestQueue,
    pool: StatusPool,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self {
            queue: RequestQueue::new(),
            pool: StatusPool::new(),
        }
    }

    // Process one REQUEST_MATCH / CANCEL_MATCH event from a request
    // partition. Synchronous by design: nothing here may yield, or two
    // concurrent requests could both observe the same waiting ticket.
    pub fn handle_message(
        &mut self,
        partition: &str,
        message: &QueueMessage,
        now_ms: u64,
        default_timeout_ms: u64,
    ) -> EngineOutcome {
        let Some(descriptor) = MatchDescriptor::parse_partition_key(partition) else {
            warn!(partition, "message on unknown partition dropped");
            return EngineOutcome::Ignored;
        };
        match message.action {
            MessageAction::RequestMatch => {
                self.handle_request(descriptor, message, now_ms, default_timeout_ms)
            }
            MessageAction::CancelMatch => self.handle_cancel(&message.user_id),
        }
    }

    fn handle_request(
        &mut self,
        descriptor: MatchDescriptor,
        message: &QueueMessage,
        now_ms: u64,
        default_timeout_ms: u64,
    ) -> EngineOutcome {
        let user_id = &message.user_id;
        if let Some(existing) = self.pool.poll_for_match(user_id) {
            if existing.is_live(now_ms) {
                debug!(user_id, "duplicate match request dropped");
                return EngineOutcome::DuplicateDropped;
            }
        }

        let expiry_time = message
            .expiry_time
            .unwrap_or(message.timestamp + default_timeout_ms);

        // Atomic test-and-remove: the partner ticket leaves the queue in the
        // same step that selects it, so it can never be paired twice.
        let partner = self.queue.retrieve(|entry| {
            entry.status == MatchStatus::Pending
                && entry.user_id != *user_id
                && !entry.is_expired(now_ms)
                && entry.descriptor.is_compatible_with(&descriptor)
        });

        match partner {
            Some(mut partner) => {
                // The earlier request's descriptor is the first operand, so
                // its concrete values win resolution ties.
                let resolved = partner.descriptor.resolve_with(&descriptor);
                let room_id = Uuid::new_v4().to_string();

                let mut requester = RequestEntry::pending(
                    user_id.clone(),
                    descriptor,
                    message.timestamp,
                    expiry_time,
                );
                requester.mark_matched(partner.user_id.clone(), resolved, room_id.clone());
                partner.mark_matched(user_id.clone(), resolved, room_id.clone());

                let event = MatchMessage {
                    user_id_1: partner.user_id.clone(),
                    user_id_2: user_id.clone(),
                    matched_topic: resolved.partition_key(),
                    matched_room: room_id,
                };

                info!(
                    user_id_1 = %event.user_id_1,
                    user_id_2 = %event.user_id_2,
                    matched_topic = %event.matched_topic,
                    "match found"
                );
                self.pool.insert(partner);
                self.pool.insert(requester);
                EngineOutcome::Paired(event)
            }
            None => {
                let entry = RequestEntry::pending(
                    user_id.clone(),
                    descriptor,
                    message.timestamp,
                    expiry_time,
                );
                self.queue.enqueue(entry.clone());
                self.pool.insert(entry);
                EngineOutcome::Queued
            }
        }
    }

    fn handle_cancel(&mut self, user_id: &str) -> EngineOutcome {
        let Some(entry) = self.pool.get_mut(user_id) else {
            debug!(user_id, "cancel for unknown user ignored");
            return EngineOutcome::Ignored;
        };
        if entry.status == MatchStatus::Matched {
            // A completed pairing is never unwound by a late cancel.
            debug!(user_id, "cancel after match ignored");
            return EngineOutcome::Ignored;
        }
        entry.mark_cancelled();
        self.queue.retrieve(|queued| queued.user_id == user_id);
        info!(user_id, "match request cancelled");
        EngineOutcome::Cancelled
    }

    // Drop expired tickets from the queue and return one timeout event per
    // swept PENDING ticket. Terminal pool entries that were never consumed
    // are purged once they pass their expiry as well, bounding pool growth.
    pub fn sweep(&mut self, now_ms: u64) -> Vec<MatchTimeoutMessage> {
        let removed = self.queue.clean(|entry| !entry.is_expired(now_ms));
        let mut timeouts = Vec::new();
        for entry in removed {
            // Only touch the pool when it still holds this exact ticket; the
            // user may have re-queued already, and that newer ticket must not
            // be disturbed by sweeping the stale one.
            let is_current = self
                .pool
                .poll_for_match(&entry.user_id)
                .is_some_and(|current| {
                    current.status == MatchStatus::Pending
                        && current.create_time == entry.create_time
                });
            if !is_current {
                continue;
            }
            self.pool.remove(&entry.user_id);
            timeouts.push(MatchTimeoutMessage {
                user_id: entry.user_id,
                timestamp: now_ms,
            });
        }

        self.pool
            .retain(|entry| entry.status == MatchStatus::Pending || !entry.is_expired(now_ms));
        timeouts
    }

    pub fn poll_for_match(&self, user_id: &str) -> Option<&RequestEntry> {
        self.pool.poll_for_match(user_id)
    }

    pub fn remove_from_pool(&mut self, user_id: &str) {
        self.pool.remove(user_id);
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }
}

// Consume one request partition until its channel closes. A malformed or
// failing message is logged and skipped; it never stops the loop.
pub async fn run_partition_consumer(
    partition: String,
    mut rx: mpsc::Receiver<String>,
    engine: Arc<Mutex<MatchingEngine>>,
    bus: PartitionBus,
    clock: Arc<dyn Clock>,
    default_timeout_ms: u64,
) {
    while let Some(payload) = rx.recv().await {
        let message: QueueMessage = match serde_json::from_str(&payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(partition = %partition, error = %e, "invalid bus payload skipped");
                continue;
            }
        };

        let outcome = {
            let mut engine = engine.lock().await;
            engine.handle_message(&partition, &message, clock.now_ms(), default_timeout_ms)
        };

        if let EngineOutcome::Paired(event) = outcome {
            // The pairing is already committed to the pool; a publish failure
            // here is logged so operators can see relay clients going stale.
            if let Err(e) = bus.publish(MATCHES_CHANNEL, &event).await {
                error!(error = ?e, "failed to publish match event");
            }
        }
    }
    debug!(partition = %partition, "partition channel closed; consumer exiting");
}
