use crate::domain::ports::DedupStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// Single-process implementation of the shared TTL store. Keys expire lazily
// on access, mirroring the set-if-absent + TTL contract of an external store
// so one can be substituted without touching the relay.
#[derive(Default)]
pub struct InMemoryTtlStore {
    keys: Mutex<HashMap<String, Instant>>,
}

impl InMemoryTtlStore {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl DedupStore for InMemoryTtlStore {
    async fn acquire(&self, user_id: &str, ttl: Duration) -> Result<bool, String> {
        let mut keys = self.keys.lock().await;
        let now = Instant::now();
        if let Some(expires_at) = keys.get(user_id) {
            if *expires_at > now {
                return Ok(false);
            }
        }
        keys.insert(user_id.to_string(), now + ttl);
        Ok(true)
    }

    async fn release(&self, user_id: &str) -> Result<(), String> {
        let mut keys = self.keys.lock().await;
        keys.remove(user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn when_a_key_is_held_then_a_second_acquire_fails() {
        let store = InMemoryTtlStore::new();
        assert!(store.acquire("alice", Duration::from_secs(30)).await.unwrap());
        assert!(!store.acquire("alice", Duration::from_secs(30)).await.unwrap());
    }

    #[tokio::test]
    async fn when_a_key_is_released_then_it_can_be_acquired_again() {
        let store = InMemoryTtlStore::new();
        assert!(store.acquire("alice", Duration::from_secs(30)).await.unwrap());
        store.release("alice").await.unwrap();
        assert!(store.acquire("alice", Duration::from_secs(30)).await.unwrap());
    }

    #[tokio::test]
    async fn when_the_ttl_elapses_then_the_key_frees_itself() {
        let store = InMemoryTtlStore::new();
        assert!(store.acquire("alice", Duration::from_millis(10)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.acquire("alice", Duration::from_secs(30)).await.unwrap());
    }
}
