use crate::domain::ports::{RoomHandle, RoomService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest<'a> {
    room_id: &'a str,
    topic: &'a str,
    difficulty: &'a str,
    user_id_1: &'a str,
    user_id_2: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomResponse {
    room_id: String,
}

// Thin reqwest client for the collaborative-room service. One attempt per
// pairing; retries are not this service's responsibility.
#[derive(Clone)]
pub struct CollabClient {
    http: reqwest::Client,
    base_url: String,
}

impl CollabClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl RoomService for CollabClient {
    async fn create_room(
        &self,
        room_id: &str,
        topic: &str,
        difficulty: &str,
        user_id_1: &str,
        user_id_2: &str,
    ) -> Result<RoomHandle, String> {
        let url = format!("{}/room", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&CreateRoomRequest {
                room_id,
                topic,
                difficulty,
                user_id_1,
                user_id_2,
            })
            .send()
            .await
            .map_err(|e| format!("collab service unreachable: {e}"))?;

        if !response.status().is_success() {
            return Err(format!(
                "collab service returned status {}",
                response.status()
            ));
        }

        let body = response
            .json::<CreateRoomResponse>()
            .await
            .map_err(|e| format!("invalid collab service response: {e}"))?;
        Ok(RoomHandle {
            room_id: body.room_id,
        })
    }
}
