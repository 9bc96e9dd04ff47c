use crate::domain::entry::MatchStatus;
use crate::interface_adapters::protocol::{
    MatchRequestDto, MatchResponse, MessageAction, NoMatchResponse, QueueMessage, RequestEntryDto,
};
use crate::interface_adapters::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

// Submit a match request over the bus. Fire-and-forget: the caller learns the
// outcome by polling /check-match.
pub async fn submit_match(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MatchRequestDto>,
) -> Result<Json<MatchResponse>, (StatusCode, Json<MatchResponse>)> {
    if request.user_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(MatchResponse {
                message: "Failed to submit match request".to_string(),
                error: Some("userId is required".to_string()),
            }),
        ));
    }

    let now = state.clock.now_ms();
    let expiry = now + state.request_timeout.as_millis() as u64;
    let message = QueueMessage {
        action: MessageAction::RequestMatch,
        user_id: request.user_id.clone(),
        timestamp: now,
        expiry_time: Some(expiry),
    };
    let partition = request.descriptor().partition_key();

    if let Err(e) = state.bus.publish(&partition, &message).await {
        warn!(error = ?e, user_id = %request.user_id, "match request publish failed");
        return Err((
            StatusCode::BAD_GATEWAY,
            Json(MatchResponse {
                message: "Failed to submit match request".to_string(),
                error: Some("matching is temporarily unavailable, please retry".to_string()),
            }),
        ));
    }

    Ok(Json(MatchResponse {
        message: format!(
            "Sent match request for {} on time: {}",
            request.user_id, now
        ),
        error: None,
    }))
}

// Publish a cancellation for the user's outstanding request.
pub async fn cancel_match(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MatchRequestDto>,
) -> Result<Json<MatchResponse>, (StatusCode, Json<MatchResponse>)> {
    let message = QueueMessage {
        action: MessageAction::CancelMatch,
        user_id: request.user_id.clone(),
        timestamp: request.timestamp,
        expiry_time: None,
    };
    let partition = request.descriptor().partition_key();

    if let Err(e) = state.bus.publish(&partition, &message).await {
        warn!(error = ?e, user_id = %request.user_id, "cancel request publish failed");
        return Err((
            StatusCode::BAD_GATEWAY,
            Json(MatchResponse {
                message: "Failed to submit cancellation".to_string(),
                error: Some("matching is temporarily unavailable, please retry".to_string()),
            }),
        ));
    }

    Ok(Json(MatchResponse {
        message: format!(
            "Sent match cancellation request for {} on time: {}",
            request.user_id, request.timestamp
        ),
        error: None,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckMatchQuery {
    pub user_id: String,
}

// Poll the status pool. Terminal entries are consumed by the poll: they are
// returned with 200 and removed; pending entries come back as 202.
pub async fn check_match(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckMatchQuery>,
) -> Response {
    let mut engine = state.engine.lock().await;
    let Some(entry) = engine.poll_for_match(&query.user_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(NoMatchResponse {
                status: "NONE",
                message: "No match requests found for this user.".to_string(),
            }),
        )
            .into_response();
    };

    let dto = RequestEntryDto::from(entry);
    match entry.status {
        MatchStatus::Matched | MatchStatus::Cancelled => {
            engine.remove_from_pool(&query.user_id);
            (StatusCode::OK, Json(dto)).into_response()
        }
        MatchStatus::Pending => (StatusCode::ACCEPTED, Json(dto)).into_response(),
    }
}
