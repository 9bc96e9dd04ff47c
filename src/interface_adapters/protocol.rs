// Wire DTOs for the message bus, the polling HTTP API and the WebSocket
// session API. All JSON fields are camelCase to stay compatible with the
// other services consuming these channels.

use crate::domain::descriptor::{Difficulty, MatchDescriptor, Topic};
use crate::domain::entry::{MatchStatus, RequestEntry};
use serde::{Deserialize, Serialize};

// ---- Message bus payloads ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageAction {
    RequestMatch,
    CancelMatch,
}

/// Payload carried on the per-descriptor request partitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub action: MessageAction,
    pub user_id: String,
    // Epoch milliseconds.
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<u64>,
}

/// Payload published on the `matches` channel, once per successful pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMessage {
    pub user_id_1: String,
    pub user_id_2: String,
    // Resolved "{difficulty}-{topic}" key.
    pub matched_topic: String,
    pub matched_room: String,
}

/// Payload published on the `match-timeouts` channel for each swept ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchTimeoutMessage {
    pub user_id: String,
    pub timestamp: u64,
}

// ---- Polling HTTP API ----

/// Request body shared by the match and cancel endpoints. Unknown difficulty
/// or topic values fail deserialization before anything reaches the bus.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequestDto {
    pub user_id: String,
    pub topic: Topic,
    pub difficulty: Difficulty,
    pub timestamp: u64,
}

impl MatchRequestDto {
    pub fn descriptor(&self) -> MatchDescriptor {
        MatchDescriptor::new(self.difficulty, self.topic)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Snapshot of a ticket returned to polling clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEntryDto {
    pub user_id: String,
    pub status: MatchStatus,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_with_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_room: Option<String>,
    pub create_time: u64,
    pub expiry_time: u64,
}

impl From<&RequestEntry> for RequestEntryDto {
    fn from(entry: &RequestEntry) -> Self {
        Self {
            user_id: entry.user_id.clone(),
            status: entry.status,
            topic: entry.descriptor.partition_key(),
            matched_with_user_id: entry.matched_with_user_id.clone(),
            matched_topic: entry.matched_descriptor.map(|d| d.partition_key()),
            matched_room: entry.matched_room.clone(),
            create_time: entry.create_time,
            expiry_time: entry.expiry_time,
        }
    }
}

/// 404 body for polls that find no live ticket.
#[derive(Debug, Serialize)]
pub struct NoMatchResponse {
    pub status: &'static str,
    pub message: String,
}

// ---- WebSocket session API ----

/// Messages the client sends to the relay over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    // Start a new match request on this connection.
    MatchRequest(MatchRequestDto),
    // Cancel the outstanding request; no payload beyond the connection.
    CancelRequest,
}

/// Messages the relay pushes to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    // Synchronous acknowledgment for matchRequest / cancelRequest.
    MatchRequestAck(AckDto),
    // A partner was found; the room is ready to join.
    MatchFound(MatchFoundDto),
    // The request timed out without a compatible partner.
    NoMatchFound,
    // Terminal failure after a pairing, e.g. room creation was refused.
    MatchError(MatchErrorDto),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckDto {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFoundDto {
    pub matched_with_user_id: String,
    pub matched_topic: String,
    pub matched_room: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchErrorDto {
    pub message: String,
}
