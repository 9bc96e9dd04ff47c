use crate::domain::ports::Clock;
use crate::use_cases::bus::PartitionBus;
use crate::use_cases::engine::MatchingEngine;
use crate::use_cases::relay::SessionRelay;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

// Shared application state for the HTTP handlers and the WebSocket sessions.
pub struct AppState {
    pub engine: Arc<Mutex<MatchingEngine>>,
    pub relay: Arc<SessionRelay>,
    pub bus: PartitionBus,
    pub clock: Arc<dyn Clock>,
    pub request_timeout: Duration,
}
