use crate::interface_adapters::handlers::matching::{cancel_match, check_match, submit_match};
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

// Build the router exposing both front-ends: the polling HTTP API and the
// WebSocket session API.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/match", post(submit_match))
        .route("/cancel-match", post(cancel_match))
        .route("/check-match", get(check_match))
        .route("/ws", get(ws_handler))
        .with_state(state)
}
