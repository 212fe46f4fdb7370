// models/chatmodel.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "message_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Offer,
    System,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "offer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Viewed,
    Accepted,
    Declined,
    Cancelled,
}

impl OfferStatus {
    pub fn to_str(&self) -> &str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Viewed => "viewed",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Declined => "declined",
            OfferStatus::Cancelled => "cancelled",
        }
    }

    /// The sender may withdraw an offer until the recipient has answered.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OfferStatus::Pending | OfferStatus::Viewed)
    }
}

/// One chat per unordered participant pair and order (both-null order counts
/// as the same chat). Creation is idempotent on that tuple.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Chat {
    pub id: Uuid,
    pub participant_one_id: Uuid,
    pub participant_two_id: Uuid,
    pub order_id: Option<Uuid>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Chat {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant_one_id == user_id || self.participant_two_id == user_id
    }

    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.participant_one_id == user_id {
            self.participant_two_id
        } else {
            self.participant_one_id
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub message_type: MessageType,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub message_id: Option<Uuid>,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub order_id: Uuid,
    pub budget: i64,
    pub deadline: NaiveDate,
    pub content_description: Option<String>,
    pub conditions: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub video_count: Option<i32>,
    pub status: OfferStatus,
    pub viewed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_participant_flips_sides() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let chat = Chat {
            id: Uuid::new_v4(),
            participant_one_id: a,
            participant_two_id: b,
            order_id: None,
            last_message_at: None,
            created_at: None,
        };
        assert_eq!(chat.other_participant(a), b);
        assert_eq!(chat.other_participant(b), a);
        assert!(chat.is_participant(a));
        assert!(!chat.is_participant(Uuid::new_v4()));
    }

    #[test]
    fn offer_cancellable_only_before_response() {
        assert!(OfferStatus::Pending.is_cancellable());
        assert!(OfferStatus::Viewed.is_cancellable());
        assert!(!OfferStatus::Accepted.is_cancellable());
        assert!(!OfferStatus::Declined.is_cancellable());
        assert!(!OfferStatus::Cancelled.is_cancellable());
    }
}
