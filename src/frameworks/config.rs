use std::{env, time::Duration};

// Runtime/server constants and env-backed settings.

pub const BUS_CHANNEL_CAPACITY: usize = 256;
pub const EVENT_CHANNEL_CAPACITY: usize = 8;
pub const MAX_INVALID_JSON: u32 = 10;

pub fn http_port() -> u16 {
    env::var("MATCHING_SERVER_PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3004)
}

// How long a request waits for a partner before it times out.
pub fn request_timeout() -> Duration {
    let millis = env::var("REQUEST_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(30_000);
    Duration::from_millis(millis)
}

// How often expired tickets are purged from the queue. Bounds memory growth
// only; user-visible latency comes from the per-session timer.
pub fn sweep_interval() -> Duration {
    let millis = env::var("SWEEP_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(5_000);
    Duration::from_millis(millis)
}

// The dedup key must outlive the request so it cannot race its own expiry.
pub fn dedup_ttl_margin() -> Duration {
    let millis = env::var("DEDUP_TTL_MARGIN_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1_000);
    Duration::from_millis(millis)
}

pub fn collab_service_url() -> String {
    env::var("COLLAB_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:3005".to_string())
}

pub fn collab_create_timeout() -> Duration {
    let millis = env::var("COLLAB_CREATE_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1_500);
    Duration::from_millis(millis)
}
