// Framework bootstrap for the matching server runtime.

use crate::domain::descriptor::MatchDescriptor;
use crate::domain::ports::{Clock, SystemClock};
use crate::frameworks::config;
use crate::frameworks::dedup::InMemoryTtlStore;
use crate::interface_adapters::clients::collab::CollabClient;
use crate::interface_adapters::routes;
use crate::interface_adapters::state::AppState;
use crate::use_cases::bus::{MATCH_TIMEOUTS_CHANNEL, MATCHES_CHANNEL, PartitionBus};
use crate::use_cases::engine::{MatchingEngine, run_partition_consumer};
use crate::use_cases::relay::{SessionRelay, run_matches_consumer, run_timeouts_consumer};
use crate::use_cases::sweeper::run_sweeper;
use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

fn init_runtime() {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state()?;

    let app = routes::app(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking.
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling.
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Result<Arc<AppState>> {
    let request_timeout = config::request_timeout();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let bus = PartitionBus::new(config::BUS_CHANNEL_CAPACITY);

    // One engine instance per process; every request partition funnels into
    // it through its own consumer task.
    let engine = Arc::new(Mutex::new(MatchingEngine::new()));
    for partition in MatchDescriptor::all_partition_keys() {
        let Some(rx) = bus.take_consumer(&partition) else {
            // Unreachable with a fresh bus; keep startup honest anyway.
            return Err(std::io::Error::other(format!(
                "partition {partition} already consumed"
            )));
        };
        tokio::spawn(run_partition_consumer(
            partition,
            rx,
            engine.clone(),
            bus.clone(),
            clock.clone(),
            request_timeout.as_millis() as u64,
        ));
    }

    tokio::spawn(run_sweeper(
        engine.clone(),
        bus.clone(),
        clock.clone(),
        config::sweep_interval(),
    ));

    let collab_url = config::collab_service_url();
    let collab_client = CollabClient::new(collab_url.clone(), config::collab_create_timeout())
        .map_err(|e| std::io::Error::other(format!("failed to initialize collab client: {e}")))?;
    tracing::debug!(collab_url = %collab_url, "collab client configured");

    let relay = Arc::new(SessionRelay::new(
        bus.clone(),
        Arc::new(InMemoryTtlStore::new()),
        Arc::new(collab_client),
        clock.clone(),
        request_timeout,
        config::dedup_ttl_margin(),
    ));

    for (channel, is_matches) in [(MATCHES_CHANNEL, true), (MATCH_TIMEOUTS_CHANNEL, false)] {
        let Some(rx) = bus.take_consumer(channel) else {
            return Err(std::io::Error::other(format!(
                "channel {channel} already consumed"
            )));
        };
        if is_matches {
            tokio::spawn(run_matches_consumer(relay.clone(), rx));
        } else {
            tokio::spawn(run_timeouts_consumer(relay.clone(), rx));
        }
    }

    Ok(Arc::new(AppState {
        engine,
        relay,
        bus,
        clock,
        request_timeout,
    }))
}
