use crate::domain::descriptor::MatchDescriptor;
use serde::Serialize;

// Current state of one user's match request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Pending,
    Matched,
    Cancelled,
}

// One waiting user's ticket. The status pool holds the authoritative copy;
// queue membership only exists while the ticket is PENDING.
#[derive(Debug, Clone)]
pub struct RequestEntry {
    pub user_id: String,
    pub descriptor: MatchDescriptor,
    pub status: MatchStatus,
    pub matched_with_user_id: Option<String>,
    pub matched_descriptor: Option<MatchDescriptor>,
    pub matched_room: Option<String>,
    // Epoch milliseconds.
    pub create_time: u64,
    pub expiry_time: u64,
}

impl RequestEntry {
    pub fn pending(
        user_id: String,
        descriptor: MatchDescriptor,
        create_time: u64,
        expiry_time: u64,
    ) -> Self {
        Self {
            user_id,
            descriptor,
            status: MatchStatus::Pending,
            matched_with_user_id: None,
            matched_descriptor: None,
            matched_room: None,
            create_time,
            expiry_time,
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expiry_time <= now_ms
    }

    // Live entries block a new request for the same user: anything pending or
    // already matched, as long as the ticket has not expired.
    pub fn is_live(&self, now_ms: u64) -> bool {
        matches!(self.status, MatchStatus::Pending | MatchStatus::Matched)
            && !self.is_expired(now_ms)
    }

    pub fn mark_matched(
        &mut self,
        peer_user_id: String,
        resolved: MatchDescriptor,
        room_id: String,
    ) {
        self.status = MatchStatus::Matched;
        self.matched_with_user_id = Some(peer_user_id);
        self.matched_descriptor = Some(resolved);
        self.matched_room = Some(room_id);
    }

    pub fn mark_cancelled(&mut self) {
        self.status = MatchStatus::Cancelled;
        self.matched_with_user_id = None;
        self.matched_descriptor = None;
        self.matched_room = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::{Difficulty, Topic};

    fn entry(expiry: u64) -> RequestEntry {
        RequestEntry::pending(
            "user-1".to_string(),
            MatchDescriptor::new(Difficulty::Easy, Topic::Math),
            0,
            expiry,
        )
    }

    #[test]
    fn when_expiry_has_passed_then_entry_is_not_live() {
        let ticket = entry(30_000);
        assert!(ticket.is_live(29_999));
        assert!(!ticket.is_live(30_000));
        assert!(!ticket.is_live(30_001));
    }

    #[test]
    fn when_cancelled_then_entry_is_not_live_even_before_expiry() {
        let mut ticket = entry(30_000);
        ticket.mark_cancelled();
        assert!(!ticket.is_live(0));
    }

    #[test]
    fn when_matched_then_entry_stays_live_until_expiry() {
        let mut ticket = entry(30_000);
        ticket.mark_matched(
            "user-2".to_string(),
            MatchDescriptor::new(Difficulty::Easy, Topic::Math),
            "room-1".to_string(),
        );
        assert!(ticket.is_live(10_000));
        assert_eq!(ticket.status, MatchStatus::Matched);
        assert_eq!(ticket.matched_with_user_id.as_deref(), Some("user-2"));
    }
}
