// dtos/chatdtos.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::chatmodel::{Message, MessageType, Offer, OfferStatus};
use crate::models::usermodel::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatDto {
    pub participant_id: Uuid,
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ParticipantBrief {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize)]
pub struct LastMessage {
    pub content: String,
    pub message_type: MessageType,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ChatListItem {
    pub id: Uuid,
    pub participant: ParticipantBrief,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
    pub order_id: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateChatResponse {
    pub id: Uuid,
    pub participant: ParticipantBrief,
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub data: Vec<Message>,
    pub has_more: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageDto {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
    pub message_type: Option<MessageType>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendOfferDto {
    pub order_id: Uuid,
    #[validate(range(min = 1))]
    pub budget: i64,
    pub deadline: NaiveDate,
    #[validate(length(max = 5000))]
    pub content_description: Option<String>,
    #[validate(length(max = 5000))]
    pub conditions: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub video_count: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct OfferBrief {
    pub id: Uuid,
    pub order_title: Option<String>,
    pub budget: i64,
    pub deadline: NaiveDate,
    pub content_description: Option<String>,
    pub conditions: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub video_count: Option<i32>,
    pub status: OfferStatus,
}

#[derive(Debug, Serialize)]
pub struct OfferMessageResponse {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub offer: OfferBrief,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct OfferListQuery {
    pub status: Option<OfferStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl OfferListQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }
}

#[derive(Debug, Serialize)]
pub struct OfferOrderBrief {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct OfferParticipant {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OfferListItem {
    pub id: Uuid,
    pub order: OfferOrderBrief,
    pub sender: OfferParticipant,
    pub recipient: OfferParticipant,
    pub budget: i64,
    pub deadline: NaiveDate,
    pub conditions: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub video_count: Option<i32>,
    pub content_description: Option<String>,
    pub status: OfferStatus,
    pub viewed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if total > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        PaginationMeta {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OfferListResponse {
    pub data: Vec<OfferListItem>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferAction {
    Accept,
    Decline,
}

#[derive(Debug, Deserialize)]
pub struct RespondOfferDto {
    pub action: OfferAction,
}

#[derive(Debug, Serialize)]
pub struct RespondOfferResponse {
    pub offer_id: Uuid,
    pub status: OfferStatus,
    pub deal_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OfferViewResponse {
    pub id: Uuid,
    pub status: OfferStatus,
    pub viewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct OfferCancelResponse {
    pub id: Uuid,
    pub status: OfferStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl OfferBrief {
    pub fn from_offer(offer: &Offer, order_title: Option<String>) -> Self {
        OfferBrief {
            id: offer.id,
            order_title,
            budget: offer.budget,
            deadline: offer.deadline,
            content_description: offer.content_description.clone(),
            conditions: offer.conditions.clone(),
            start_date: offer.start_date,
            end_date: offer.end_date,
            video_count: offer.video_count,
            status: offer.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_meta_rounds_pages_up() {
        assert_eq!(PaginationMeta::new(1, 20, 0).total_pages, 0);
        assert_eq!(PaginationMeta::new(1, 20, 1).total_pages, 1);
        assert_eq!(PaginationMeta::new(1, 20, 20).total_pages, 1);
        assert_eq!(PaginationMeta::new(1, 20, 21).total_pages, 2);
        assert_eq!(PaginationMeta::new(2, 10, 95).total_pages, 10);
    }

    #[test]
    fn offer_list_query_normalizes_page_params() {
        let query = OfferListQuery {
            status: None,
            page: None,
            per_page: None,
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), 20);

        let query = OfferListQuery {
            status: None,
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), 100);

        let query = OfferListQuery {
            status: Some(OfferStatus::Pending),
            page: Some(3),
            per_page: Some(5),
        };
        assert_eq!(query.page(), 3);
        assert_eq!(query.per_page(), 5);
    }

    #[test]
    fn offer_action_parses_snake_case_only() {
        let dto: RespondOfferDto = serde_json::from_str(r#"{"action":"accept"}"#).unwrap();
        assert_eq!(dto.action, OfferAction::Accept);
        let dto: RespondOfferDto = serde_json::from_str(r#"{"action":"decline"}"#).unwrap();
        assert_eq!(dto.action, OfferAction::Decline);
        assert!(serde_json::from_str::<RespondOfferDto>(r#"{"action":"reject"}"#).is_err());
    }
}
