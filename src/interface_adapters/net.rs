use crate::frameworks::config;
use crate::interface_adapters::protocol::{
    AckDto, ClientMessage, MatchErrorDto, ServerMessage,
};
use crate::interface_adapters::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::use_cases::relay::{RelayError, SessionEvent};

#[derive(Debug)]
enum NetError {
    // Categorizes send failures for logs; callers only branch on Err itself.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // Connection id used for binding ownership and log correlation.
    let connection_id = Uuid::new_v4().to_string();
    info!(connection_id = %connection_id, "session connected");

    let (events_tx, mut events_rx) = mpsc::channel::<SessionEvent>(config::EVENT_CHANNEL_CAPACITY);
    // Armed after a successful request; fires the local timeout contract.
    let mut deadline: Option<Instant> = None;
    let mut invalid_json: u32 = 0;

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue, // ping/pong/binary are ignored
                    Some(Err(e)) => {
                        debug!(connection_id = %connection_id, error = %e, "socket read failed");
                        break;
                    }
                };

                let parsed: ClientMessage = match serde_json::from_str(text.as_str()) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        invalid_json += 1;
                        debug!(connection_id = %connection_id, error = %e, "invalid client message");
                        let ack = ServerMessage::MatchRequestAck(AckDto {
                            message: "Failed to process message".to_string(),
                            expiry: None,
                            error: Some("invalid message".to_string()),
                        });
                        if send_message(&mut socket, &ack).await.is_err() {
                            break;
                        }
                        if invalid_json >= config::MAX_INVALID_JSON {
                            warn!(connection_id = %connection_id, "too many invalid messages; closing");
                            break;
                        }
                        continue;
                    }
                };

                match parsed {
                    ClientMessage::MatchRequest(request) => {
                        let outcome = state
                            .relay
                            .add_match_request(&connection_id, &request, events_tx.clone())
                            .await;
                        let ack = match outcome {
                            Ok(ack) => {
                                deadline =
                                    Some(Instant::now() + state.relay.request_timeout());
                                AckDto {
                                    message: ack.message,
                                    expiry: Some(ack.expiry),
                                    error: None,
                                }
                            }
                            Err(e) => AckDto {
                                message: "Failed to match".to_string(),
                                expiry: None,
                                error: Some(request_error_text(&e)),
                            },
                        };
                        if send_message(&mut socket, &ServerMessage::MatchRequestAck(ack))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    ClientMessage::CancelRequest => {
                        let outcome = state.relay.cancel_match_request(&connection_id).await;
                        let ack = match outcome {
                            Ok(message) => {
                                deadline = None;
                                AckDto {
                                    message,
                                    expiry: None,
                                    error: None,
                                }
                            }
                            Err(e) => AckDto {
                                message: "Failed to cancel match".to_string(),
                                expiry: None,
                                error: Some(cancel_error_text(&e)),
                            },
                        };
                        if send_message(&mut socket, &ServerMessage::MatchRequestAck(ack))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            event = events_rx.recv() => {
                // The sender half lives in this task, so the channel can only
                // yield pushed outcomes here.
                let Some(event) = event else { continue };
                deadline = None;
                let message = match event {
                    SessionEvent::MatchFound(found) => ServerMessage::MatchFound(found),
                    SessionEvent::TimedOut => ServerMessage::NoMatchFound,
                    SessionEvent::Failed { message } => {
                        ServerMessage::MatchError(MatchErrorDto { message })
                    }
                };
                if send_message(&mut socket, &message).await.is_err() {
                    break;
                }
            }
            _ = sleep_until_deadline(&deadline) => {
                deadline = None;
                // The engine sweeper owns the queue side; here we only close
                // out this connection's view of the request.
                if state.relay.expire_connection(&connection_id).await
                    && send_message(&mut socket, &ServerMessage::NoMatchFound)
                        .await
                        .is_err()
                {
                    break;
                }
            }
        }
    }

    // A drop with a live request behaves like an explicit cancel.
    state.relay.handle_disconnect(&connection_id).await;
    info!(connection_id = %connection_id, "session closed");
}

// Resolves when the deadline passes; never resolves while no deadline is set.
async fn sleep_until_deadline(deadline: &Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(*at).await,
        None => std::future::pending().await,
    }
}

async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), NetError> {
    let text = serde_json::to_string(message).map_err(NetError::Serialization)?;
    socket
        .send(Message::Text(text.into()))
        .await
        .map_err(NetError::Ws)
}

fn request_error_text(error: &RelayError) -> String {
    match error {
        RelayError::AlreadyQueued => "You are already in the match queue".to_string(),
        RelayError::Store(_) | RelayError::Bus(_) => {
            "matching is temporarily unavailable, please retry".to_string()
        }
        RelayError::NoActiveRequest => "No existing match request found for the user".to_string(),
    }
}

fn cancel_error_text(error: &RelayError) -> String {
    match error {
        RelayError::NoActiveRequest => "No existing match request found for the user".to_string(),
        RelayError::AlreadyQueued => "You are already in the match queue".to_string(),
        RelayError::Store(_) | RelayError::Bus(_) => {
            "matching is temporarily unavailable, please retry".to_string()
        }
    }
}
