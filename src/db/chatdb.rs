// db/chatdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodel::*;

const OFFER_COLUMNS: &str = r#"id, chat_id, message_id, sender_id, recipient_id, order_id, budget,
       deadline, content_description, conditions, start_date, end_date,
       video_count, status, viewed_at, cancelled_at, created_at"#;

/// Commercial terms captured when an advertiser sends an offer.
#[derive(Debug, Clone)]
pub struct NewOffer {
    pub order_id: Uuid,
    pub budget: i64,
    pub deadline: chrono::NaiveDate,
    pub content_description: Option<String>,
    pub conditions: Option<String>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub video_count: Option<i32>,
}

#[async_trait]
pub trait ChatExt {
    /// Idempotent on (unordered participant pair, order_id); a null order_id
    /// matches only chats that also have a null order_id.
    async fn create_or_get_chat(
        &self,
        user_one_id: Uuid,
        user_two_id: Uuid,
        order_id: Option<Uuid>,
    ) -> Result<Chat, Error>;

    async fn get_chat_by_id(&self, chat_id: Uuid) -> Result<Option<Chat>, Error>;

    async fn get_user_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, Error>;

    async fn send_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        message_type: MessageType,
        content: String,
    ) -> Result<Message, Error>;

    /// Newest-first page of the durable log, keyed by creation timestamp.
    /// Fetches one row past `limit` so the caller can detect `has_more`.
    async fn get_chat_messages(
        &self,
        chat_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, Error>;

    /// Marks messages sent *to* `user_id` as read. read_at is set once and
    /// never overwritten. Returns the affected message ids.
    async fn mark_messages_as_read(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, Error>;

    async fn get_unread_count(&self, chat_id: Uuid, user_id: Uuid) -> Result<i64, Error>;

    async fn get_last_message(&self, chat_id: Uuid) -> Result<Option<Message>, Error>;

    /// Inserts the offer-typed message and the offer row atomically and
    /// bumps the chat's last-activity timestamp.
    async fn create_offer(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        recipient_id: Uuid,
        terms: NewOffer,
    ) -> Result<(Message, Offer), Error>;

    async fn get_offer_in_chat(&self, offer_id: Uuid, chat_id: Uuid)
        -> Result<Option<Offer>, Error>;

    async fn get_offer_for_sender(
        &self,
        offer_id: Uuid,
        sender_id: Uuid,
    ) -> Result<Option<Offer>, Error>;

    async fn get_offer_for_recipient(
        &self,
        offer_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Option<Offer>, Error>;

    /// Newest-first page of the offers a user has sent, optionally filtered
    /// by status.
    async fn list_sent_offers(
        &self,
        sender_id: Uuid,
        status: Option<OfferStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, Error>;

    async fn count_sent_offers(
        &self,
        sender_id: Uuid,
        status: Option<OfferStatus>,
    ) -> Result<i64, Error>;

    async fn list_received_offers(
        &self,
        recipient_id: Uuid,
        status: Option<OfferStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, Error>;

    async fn count_received_offers(
        &self,
        recipient_id: Uuid,
        status: Option<OfferStatus>,
    ) -> Result<i64, Error>;

    /// pending -> declined, first-touch viewed_at. Guarded on status.
    async fn decline_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error>;

    /// pending|viewed -> cancelled. Guarded on status.
    async fn cancel_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error>;

    /// Sets viewed_at once and promotes pending -> viewed; a no-op beyond
    /// that, so repeat views are idempotent.
    async fn view_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn create_or_get_chat(
        &self,
        user_one_id: Uuid,
        user_two_id: Uuid,
        order_id: Option<Uuid>,
    ) -> Result<Chat, Error> {
        let existing = sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, participant_one_id, participant_two_id, order_id,
                   last_message_at, created_at
            FROM chats
            WHERE ((participant_one_id = $1 AND participant_two_id = $2)
                OR (participant_one_id = $2 AND participant_two_id = $1))
              AND order_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(user_one_id)
        .bind(user_two_id)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(chat) = existing {
            return Ok(chat);
        }

        sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (participant_one_id, participant_two_id, order_id)
            VALUES ($1, $2, $3)
            RETURNING id, participant_one_id, participant_two_id, order_id,
                      last_message_at, created_at
            "#,
        )
        .bind(user_one_id)
        .bind(user_two_id)
        .bind(order_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_chat_by_id(&self, chat_id: Uuid) -> Result<Option<Chat>, Error> {
        sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, participant_one_id, participant_two_id, order_id,
                   last_message_at, created_at
            FROM chats
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, Error> {
        sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, participant_one_id, participant_two_id, order_id,
                   last_message_at, created_at
            FROM chats
            WHERE participant_one_id = $1 OR participant_two_id = $1
            ORDER BY last_message_at DESC NULLS LAST, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn send_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        message_type: MessageType,
        content: String,
    ) -> Result<Message, Error> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (chat_id, sender_id, message_type, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, chat_id, sender_id, message_type, content, created_at, read_at
            "#,
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(message_type)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE chats
            SET last_message_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn get_chat_messages(
        &self,
        chat_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, chat_id, sender_id, message_type, content, created_at, read_at
            FROM messages
            WHERE chat_id = $1
              AND ($2::timestamptz IS NULL OR created_at < $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(chat_id)
        .bind(before)
        .bind(limit + 1)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_messages_as_read(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE messages
            SET read_at = NOW()
            WHERE chat_id = $1
              AND sender_id != $2
              AND read_at IS NULL
            RETURNING id
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_unread_count(&self, chat_id: Uuid, user_id: Uuid) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE chat_id = $1
              AND sender_id != $2
              AND read_at IS NULL
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_last_message(&self, chat_id: Uuid) -> Result<Option<Message>, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, chat_id, sender_id, message_type, content, created_at, read_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_offer(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        recipient_id: Uuid,
        terms: NewOffer,
    ) -> Result<(Message, Offer), Error> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (chat_id, sender_id, message_type, content)
            VALUES ($1, $2, 'offer', $3)
            RETURNING id, chat_id, sender_id, message_type, content, created_at, read_at
            "#,
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(format!("Offer: {} KZT", terms.budget))
        .fetch_one(&mut *tx)
        .await?;

        let offer = sqlx::query_as::<_, Offer>(&format!(
            r#"
            INSERT INTO offers
                (chat_id, message_id, sender_id, recipient_id, order_id, budget,
                 deadline, content_description, conditions, start_date, end_date,
                 video_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(chat_id)
        .bind(message.id)
        .bind(sender_id)
        .bind(recipient_id)
        .bind(terms.order_id)
        .bind(terms.budget)
        .bind(terms.deadline)
        .bind(&terms.content_description)
        .bind(&terms.conditions)
        .bind(terms.start_date)
        .bind(terms.end_date)
        .bind(terms.video_count)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE chats
            SET last_message_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((message, offer))
    }

    async fn get_offer_in_chat(
        &self,
        offer_id: Uuid,
        chat_id: Uuid,
    ) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(&format!(
            r#"
            SELECT {OFFER_COLUMNS}
            FROM offers
            WHERE id = $1 AND chat_id = $2
            "#
        ))
        .bind(offer_id)
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_offer_for_sender(
        &self,
        offer_id: Uuid,
        sender_id: Uuid,
    ) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(&format!(
            r#"
            SELECT {OFFER_COLUMNS}
            FROM offers
            WHERE id = $1 AND sender_id = $2
            "#
        ))
        .bind(offer_id)
        .bind(sender_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_offer_for_recipient(
        &self,
        offer_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(&format!(
            r#"
            SELECT {OFFER_COLUMNS}
            FROM offers
            WHERE id = $1 AND recipient_id = $2
            "#
        ))
        .bind(offer_id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_sent_offers(
        &self,
        sender_id: Uuid,
        status: Option<OfferStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, Error> {
        sqlx::query_as::<_, Offer>(&format!(
            r#"
            SELECT {OFFER_COLUMNS}
            FROM offers
            WHERE sender_id = $1
              AND ($2::offer_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(sender_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_sent_offers(
        &self,
        sender_id: Uuid,
        status: Option<OfferStatus>,
    ) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM offers
            WHERE sender_id = $1
              AND ($2::offer_status IS NULL OR status = $2)
            "#,
        )
        .bind(sender_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_received_offers(
        &self,
        recipient_id: Uuid,
        status: Option<OfferStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, Error> {
        sqlx::query_as::<_, Offer>(&format!(
            r#"
            SELECT {OFFER_COLUMNS}
            FROM offers
            WHERE recipient_id = $1
              AND ($2::offer_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(recipient_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_received_offers(
        &self,
        recipient_id: Uuid,
        status: Option<OfferStatus>,
    ) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM offers
            WHERE recipient_id = $1
              AND ($2::offer_status IS NULL OR status = $2)
            "#,
        )
        .bind(recipient_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn decline_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(&format!(
            r#"
            UPDATE offers
            SET status = 'declined', viewed_at = COALESCE(viewed_at, NOW())
            WHERE id = $1 AND status = 'pending'
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn cancel_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(&format!(
            r#"
            UPDATE offers
            SET status = 'cancelled', cancelled_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'viewed')
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn view_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(&format!(
            r#"
            UPDATE offers
            SET viewed_at = COALESCE(viewed_at, NOW()),
                status = CASE WHEN status = 'pending' THEN 'viewed'::offer_status ELSE status END
            WHERE id = $1
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await
    }
}
