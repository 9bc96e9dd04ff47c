use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// Channel names shared with the relay consumers.
pub const MATCHES_CHANNEL: &str = "matches";
pub const MATCH_TIMEOUTS_CHANNEL: &str = "match-timeouts";

#[derive(Debug)]
pub enum BusError {
    Serialization(serde_json::Error),
    // The partition's consumer is gone; the message was not delivered.
    PartitionClosed { partition: String },
}

struct Partition {
    tx: mpsc::Sender<String>,
    // Claimed exactly once; holding the receiver here until then gives each
    // partition single-consumer-group semantics and buffers messages
    // published before the consumer attaches.
    rx: Option<mpsc::Receiver<String>>,
}

// In-process partitioned message bus. Producers publish JSON payloads to
// named partitions; each partition is owned by at most one consumer. Publish
// failures are surfaced to the caller so a user-initiated action is never
// silently dropped.
#[derive(Clone)]
pub struct PartitionBus {
    partitions: Arc<Mutex<HashMap<String, Partition>>>,
    capacity: usize,
}

impl PartitionBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            partitions: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    fn sender(&self, partition: &str) -> mpsc::Sender<String> {
        let mut partitions = self
            .partitions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = partitions.get(partition) {
            return existing.tx.clone();
        }
        let (tx, rx) = mpsc::channel(self.capacity);
        partitions.insert(
            partition.to_string(),
            Partition {
                tx: tx.clone(),
                rx: Some(rx),
            },
        );
        tx
    }

    // Serialize and deliver one payload to the partition's consumer.
    pub async fn publish<T: Serialize>(&self, partition: &str, payload: &T) -> Result<(), BusError> {
        let body = serde_json::to_string(payload).map_err(BusError::Serialization)?;
        let tx = self.sender(partition);
        tx.send(body).await.map_err(|_| BusError::PartitionClosed {
            partition: partition.to_string(),
        })
    }

    // Claim the partition's consumer side. Returns `None` if it was already
    // claimed; one consumer per partition is the invariant the engine's
    // private queue depends on.
    pub fn take_consumer(&self, partition: &str) -> Option<mpsc::Receiver<String>> {
        let mut partitions = self
            .partitions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = partitions.get_mut(partition) {
            return existing.rx.take();
        }
        let (tx, rx) = mpsc::channel(self.capacity);
        partitions.insert(partition.to_string(), Partition { tx, rx: None });
        Some(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Ping {
        value: u32,
    }

    #[tokio::test]
    async fn when_publishing_before_the_consumer_attaches_then_messages_are_buffered() {
        let bus = PartitionBus::new(8);
        bus.publish("easy-math", &Ping { value: 1 })
            .await
            .expect("publish should succeed");

        let mut rx = bus
            .take_consumer("easy-math")
            .expect("first claim should succeed");
        let payload = rx.recv().await.expect("buffered message expected");
        let parsed: Ping = serde_json::from_str(&payload).expect("payload should parse");
        assert_eq!(parsed, Ping { value: 1 });
    }

    #[tokio::test]
    async fn when_a_partition_consumer_is_claimed_twice_then_second_claim_fails() {
        let bus = PartitionBus::new(8);
        assert!(bus.take_consumer("matches").is_some());
        assert!(bus.take_consumer("matches").is_none());
    }

    #[tokio::test]
    async fn when_the_consumer_is_dropped_then_publish_reports_the_failure() {
        let bus = PartitionBus::new(8);
        let rx = bus.take_consumer("easy-math").expect("claim should succeed");
        drop(rx);

        let result = bus.publish("easy-math", &Ping { value: 2 }).await;
        assert!(matches!(
            result,
            Err(BusError::PartitionClosed { partition }) if partition == "easy-math"
        ));
    }

    #[tokio::test]
    async fn when_partitions_differ_then_traffic_does_not_cross() {
        let bus = PartitionBus::new(8);
        let mut math = bus.take_consumer("easy-math").expect("claim");
        let mut graph = bus.take_consumer("hard-graph").expect("claim");

        bus.publish("easy-math", &Ping { value: 1 }).await.expect("publish");
        bus.publish("hard-graph", &Ping { value: 2 }).await.expect("publish");

        let math_payload = math.recv().await.expect("math message");
        let graph_payload = graph.recv().await.expect("graph message");
        assert!(math_payload.contains("1"));
        assert!(graph_payload.contains("2"));
    }
}
