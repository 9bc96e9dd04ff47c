use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Port for retrieving the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

// Wall-clock implementation used outside of tests.
#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

// Port for the shared TTL store that enforces at most one outstanding request
// per user across relay instances. `acquire` must have create-only-if-absent
// semantics; its result is the authoritative answer to "is this user already
// queued", independent of any instance's local state.
#[async_trait]
pub trait DedupStore: Send + Sync {
    async fn acquire(&self, user_id: &str, ttl: Duration) -> Result<bool, String>;
    async fn release(&self, user_id: &str) -> Result<(), String>;
}

// Handle returned by the collaborative-room service after room creation.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub room_id: String,
}

// Port for the collaborative-room service called once a pairing is known.
// The matchmaking core never retries this call.
#[async_trait]
pub trait RoomService: Send + Sync {
    async fn create_room(
        &self,
        room_id: &str,
        topic: &str,
        difficulty: &str,
        user_id_1: &str,
        user_id_2: &str,
    ) -> Result<RoomHandle, String>;
}
