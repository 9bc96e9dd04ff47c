use crate::domain::ports::{Clock, DedupStore, RoomService};
use crate::interface_adapters::protocol::{
    MatchFoundDto, MatchMessage, MatchRequestDto, MatchTimeoutMessage, MessageAction, QueueMessage,
};
use crate::use_cases::bus::{BusError, PartitionBus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

// Outcomes pushed to a session's connection task.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    MatchFound(MatchFoundDto),
    TimedOut,
    // Terminal failure after pairing, e.g. the room service refused the room.
    Failed { message: String },
}

#[derive(Debug)]
pub enum RelayError {
    // The user already has an outstanding request somewhere.
    AlreadyQueued,
    // Cancel arrived on a connection with no live request.
    NoActiveRequest,
    // The dedup store could not be reached; the request was not submitted.
    Store(String),
    // Publish failed; the request was not submitted and may be retried.
    Bus(BusError),
}

// The request recorded against a connection.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub user_id: String,
    pub partition: String,
    pub timestamp: u64,
}

struct UserSlot {
    connection_id: String,
    events: mpsc::Sender<SessionEvent>,
}

// Bidirectional connection ⇄ user mapping. Every insert and removal touches
// both directions in the same critical section, keeping the two maps
// consistent and enforcing at most one binding per connection and per user.
#[derive(Default)]
pub struct SessionBindings {
    by_connection: HashMap<String, SessionRequest>,
    by_user: HashMap<String, UserSlot>,
}

impl SessionBindings {
    fn insert(
        &mut self,
        connection_id: &str,
        request: SessionRequest,
        events: mpsc::Sender<SessionEvent>,
    ) -> bool {
        if self.by_connection.contains_key(connection_id)
            || self.by_user.contains_key(&request.user_id)
        {
            return false;
        }
        self.by_user.insert(
            request.user_id.clone(),
            UserSlot {
                connection_id: connection_id.to_string(),
                events,
            },
        );
        self.by_connection.insert(connection_id.to_string(), request);
        true
    }

    fn remove_by_connection(
        &mut self,
        connection_id: &str,
    ) -> Option<(SessionRequest, mpsc::Sender<SessionEvent>)> {
        let request = self.by_connection.remove(connection_id)?;
        let slot = self.by_user.remove(&request.user_id);
        let events = slot.map(|s| s.events)?;
        Some((request, events))
    }

    fn remove_by_user(
        &mut self,
        user_id: &str,
    ) -> Option<(SessionRequest, mpsc::Sender<SessionEvent>)> {
        let slot = self.by_user.remove(user_id)?;
        let request = self.by_connection.remove(&slot.connection_id)?;
        Some((request, slot.events))
    }

    fn len(&self) -> usize {
        self.by_connection.len()
    }
}

// Positive acknowledgment for a submitted request.
#[derive(Debug, Clone)]
pub struct MatchRequestAck {
    pub message: String,
    pub expiry: u64,
}

// Maps live client connections to outstanding requests and delivers match and
// timeout outcomes back to the originating connection. Talks to the engine
// only over the bus; the shared dedup store is the authoritative guard
// against a user queueing twice.
pub struct SessionRelay {
    bus: PartitionBus,
    dedup: Arc<dyn DedupStore>,
    rooms: Arc<dyn RoomService>,
    clock: Arc<dyn Clock>,
    request_timeout: Duration,
    // The dedup key outlives the request by this margin so the key never
    // expires before the ticket it guards.
    dedup_ttl_margin: Duration,
    bindings: Mutex<SessionBindings>,
}

impl SessionRelay {
    pub fn new(
        bus: PartitionBus,
        dedup: Arc<dyn DedupStore>,
        rooms: Arc<dyn RoomService>,
        clock: Arc<dyn Clock>,
        request_timeout: Duration,
        dedup_ttl_margin: Duration,
    ) -> Self {
        Self {
            bus,
            dedup,
            rooms,
            clock,
            request_timeout,
            dedup_ttl_margin,
            bindings: Mutex::new(SessionBindings::default()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    // Submit a match request on behalf of a connection. On success the
    // returned expiry lets the client render a countdown.
    pub async fn add_match_request(
        &self,
        connection_id: &str,
        request: &MatchRequestDto,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<MatchRequestAck, RelayError> {
        // Local fast-path; the dedup store below remains authoritative.
        {
            let bindings = self.bindings.lock().await;
            if bindings.by_connection.contains_key(connection_id)
                || bindings.by_user.contains_key(&request.user_id)
            {
                return Err(RelayError::AlreadyQueued);
            }
        }

        let ttl = self.request_timeout + self.dedup_ttl_margin;
        let acquired = self
            .dedup
            .acquire(&request.user_id, ttl)
            .await
            .map_err(RelayError::Store)?;
        if !acquired {
            return Err(RelayError::AlreadyQueued);
        }

        let now = self.clock.now_ms();
        let expiry = now + self.request_timeout.as_millis() as u64;
        let partition = request.descriptor().partition_key();
        let message = QueueMessage {
            action: MessageAction::RequestMatch,
            user_id: request.user_id.clone(),
            timestamp: now,
            expiry_time: Some(expiry),
        };

        if let Err(e) = self.bus.publish(&partition, &message).await {
            // Not submitted: free the key so the client can retry at once.
            self.release_dedup(&request.user_id).await;
            return Err(RelayError::Bus(e));
        }

        let session_request = SessionRequest {
            user_id: request.user_id.clone(),
            partition,
            timestamp: now,
        };
        let inserted = {
            let mut bindings = self.bindings.lock().await;
            bindings.insert(connection_id, session_request, events)
        };
        if !inserted {
            // Lost a race for the same user or connection; the request on the
            // bus will be dropped by the engine as a duplicate.
            self.release_dedup(&request.user_id).await;
            return Err(RelayError::AlreadyQueued);
        }

        info!(
            user_id = %request.user_id,
            connection_id,
            expiry,
            "match request submitted"
        );
        Ok(MatchRequestAck {
            message: format!("Match Request received for {} at {}", request.user_id, now),
            expiry,
        })
    }

    // Cancel the request bound to this connection.
    pub async fn cancel_match_request(
        &self,
        connection_id: &str,
    ) -> Result<String, RelayError> {
        let (request, events) = {
            let mut bindings = self.bindings.lock().await;
            bindings
                .remove_by_connection(connection_id)
                .ok_or(RelayError::NoActiveRequest)?
        };

        let message = QueueMessage {
            action: MessageAction::CancelMatch,
            user_id: request.user_id.clone(),
            timestamp: request.timestamp,
            expiry_time: None,
        };
        if let Err(e) = self.bus.publish(&request.partition, &message).await {
            // Cancel was not delivered; restore the binding so the client can
            // retry instead of leaking a phantom ticket.
            let mut bindings = self.bindings.lock().await;
            bindings.insert(connection_id, request, events);
            return Err(RelayError::Bus(e));
        }

        self.release_dedup(&request.user_id).await;
        info!(user_id = %request.user_id, connection_id, "match request cancelled");
        Ok(format!(
            "Match Request cancelled for {} at {}",
            request.user_id, request.timestamp
        ))
    }

    // A dropped connection with a live request behaves exactly like an
    // explicit cancel, so no phantom ticket keeps waiting in the engine.
    pub async fn handle_disconnect(&self, connection_id: &str) {
        let removed = {
            let mut bindings = self.bindings.lock().await;
            bindings.remove_by_connection(connection_id)
        };
        let Some((request, _events)) = removed else {
            return;
        };

        let message = QueueMessage {
            action: MessageAction::CancelMatch,
            user_id: request.user_id.clone(),
            timestamp: request.timestamp,
            expiry_time: None,
        };
        if let Err(e) = self.bus.publish(&request.partition, &message).await {
            // Best effort only; the engine sweeper will expire the ticket.
            warn!(error = ?e, user_id = %request.user_id, "cancel on disconnect not delivered");
        }
        self.release_dedup(&request.user_id).await;
        info!(user_id = %request.user_id, connection_id, "disconnected while queued");
    }

    // Connection-local timeout. Returns true if a live binding was released,
    // in which case the caller notifies the client. The queue ticket itself
    // is left to the engine sweeper.
    pub async fn expire_connection(&self, connection_id: &str) -> bool {
        let removed = {
            let mut bindings = self.bindings.lock().await;
            bindings.remove_by_connection(connection_id)
        };
        let Some((request, _events)) = removed else {
            return false;
        };
        self.release_dedup(&request.user_id).await;
        info!(user_id = %request.user_id, connection_id, "match request timed out");
        true
    }

    // Inbound `matches` message: create the collaboration room once, then
    // notify whichever of the two users still has a live binding. Users that
    // already disconnected are silently skipped.
    pub async fn handle_match_event(&self, event: &MatchMessage) {
        let outcome = match self.create_room(event).await {
            Ok(()) => SessionEvent::MatchFound(MatchFoundDto {
                matched_with_user_id: String::new(),
                matched_topic: event.matched_topic.clone(),
                matched_room: event.matched_room.clone(),
            }),
            Err(e) => {
                error!(
                    room_id = %event.matched_room,
                    error = %e,
                    "room creation failed; surfacing generic error"
                );
                SessionEvent::Failed {
                    message: "Failed to set up the collaboration room".to_string(),
                }
            }
        };

        for (user_id, peer_id) in [
            (&event.user_id_1, &event.user_id_2),
            (&event.user_id_2, &event.user_id_1),
        ] {
            let removed = {
                let mut bindings = self.bindings.lock().await;
                bindings.remove_by_user(user_id)
            };
            let Some((_request, events)) = removed else {
                debug!(user_id, "match outcome for unbound user skipped");
                continue;
            };
            self.release_dedup(user_id).await;

            let personalized = match &outcome {
                SessionEvent::MatchFound(found) => SessionEvent::MatchFound(MatchFoundDto {
                    matched_with_user_id: peer_id.clone(),
                    ..found.clone()
                }),
                other => other.clone(),
            };
            if events.send(personalized).await.is_err() {
                debug!(user_id, "session task gone before outcome delivery");
            }
        }
    }

    // Inbound `match-timeouts` message: same cleanup as a match, but the
    // client learns no partner was found.
    pub async fn handle_timeout_event(&self, event: &MatchTimeoutMessage) {
        let removed = {
            let mut bindings = self.bindings.lock().await;
            bindings.remove_by_user(&event.user_id)
        };
        let Some((_request, events)) = removed else {
            return;
        };
        self.release_dedup(&event.user_id).await;
        if events.send(SessionEvent::TimedOut).await.is_err() {
            debug!(user_id = %event.user_id, "session task gone before timeout delivery");
        }
    }

    pub async fn binding_count(&self) -> usize {
        self.bindings.lock().await.len()
    }

    async fn create_room(&self, event: &MatchMessage) -> Result<(), String> {
        let (difficulty, topic) = event
            .matched_topic
            .split_once('-')
            .ok_or_else(|| format!("malformed matched topic {}", event.matched_topic))?;
        self.rooms
            .create_room(
                &event.matched_room,
                topic,
                difficulty,
                &event.user_id_1,
                &event.user_id_2,
            )
            .await
            .map(|_| ())
    }

    async fn release_dedup(&self, user_id: &str) {
        if let Err(e) = self.dedup.release(user_id).await {
            warn!(user_id, error = %e, "failed to release dedup key");
        }
    }
}

// Consume the `matches` channel until it closes.
pub async fn run_matches_consumer(relay: Arc<SessionRelay>, mut rx: mpsc::Receiver<String>) {
    while let Some(payload) = rx.recv().await {
        match serde_json::from_str::<MatchMessage>(&payload) {
            Ok(event) => relay.handle_match_event(&event).await,
            Err(e) => warn!(error = %e, "invalid match payload skipped"),
        }
    }
    debug!("matches channel closed; consumer exiting");
}

// Consume the `match-timeouts` channel until it closes.
pub async fn run_timeouts_consumer(relay: Arc<SessionRelay>, mut rx: mpsc::Receiver<String>) {
    while let Some(payload) = rx.recv().await {
        match serde_json::from_str::<MatchTimeoutMessage>(&payload) {
            Ok(event) => relay.handle_timeout_event(&event).await,
            Err(e) => warn!(error = %e, "invalid timeout payload skipped"),
        }
    }
    debug!("match-timeouts channel closed; consumer exiting");
}
