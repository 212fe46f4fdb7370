// db/dealdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodel::Offer;
use crate::models::dealmodel::*;

const DEAL_COLUMNS: &str = r#"id, order_id, offer_id, creator_id, advertiser_id, budget, currency,
       deadline, conditions, start_date, end_date, video_count, status,
       escrow_amount, platform_fee, creator_payout, payment_method, paid_at,
       work_submitted_at, dispute_reason, created_at, updated_at"#;

/// Outcome of the transactional signing attempt. All checks run inside one
/// transaction with the deal row locked, so the both-signed evaluation can
/// never race another signer.
#[derive(Debug)]
pub enum SignOutcome {
    Signed(Deal),
    DealNotFound,
    NotSignable(DealStatus),
    NoPendingCode,
    AlreadySigned,
    CodeMismatch,
}

#[async_trait]
pub trait DealExt {
    /// Accepts the offer and creates its deal in one transaction. The offer
    /// update is guarded on `status = 'pending'`, so a concurrent duplicate
    /// accept observes `None` and exactly one deal ever exists per offer.
    async fn accept_offer_and_create_deal(
        &self,
        offer: &Offer,
        creator_id: Uuid,
        advertiser_id: Uuid,
    ) -> Result<Option<Deal>, Error>;

    async fn get_deal_for_user(&self, deal_id: Uuid, user_id: Uuid) -> Result<Option<Deal>, Error>;

    async fn list_deals_for_user(
        &self,
        user_id: Uuid,
        status: Option<DealStatus>,
    ) -> Result<Vec<Deal>, Error>;

    async fn get_signature(
        &self,
        deal_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<DealSignature>, Error>;

    async fn get_deal_signatures(&self, deal_id: Uuid) -> Result<Vec<DealSignature>, Error>;

    /// Stores a fresh one-time code for the party, overwriting any prior
    /// unused code. Refuses to touch a row that is already signed.
    async fn store_sign_code(
        &self,
        deal_id: Uuid,
        user_id: Uuid,
        code: &str,
    ) -> Result<Option<DealSignature>, Error>;

    async fn sign_deal(&self, deal_id: Uuid, user_id: Uuid, code: &str)
        -> Result<SignOutcome, Error>;

    async fn pay_deal(
        &self,
        deal_id: Uuid,
        advertiser_id: Uuid,
        payment_method: &str,
    ) -> Result<Option<Deal>, Error>;

    async fn submit_work(&self, deal_id: Uuid, creator_id: Uuid) -> Result<Option<Deal>, Error>;

    async fn confirm_work(
        &self,
        deal_id: Uuid,
        advertiser_id: Uuid,
        platform_fee: i64,
        creator_payout: i64,
    ) -> Result<Option<Deal>, Error>;

    async fn dispute_deal(
        &self,
        deal_id: Uuid,
        advertiser_id: Uuid,
        reason: &str,
    ) -> Result<Option<Deal>, Error>;

    /// Deals whose review window elapsed. Completed deals no longer match
    /// the status predicate, so re-polling is naturally idempotent.
    async fn find_deals_past_review_window(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Deal>, Error>;

    /// Same guarded completion as manual confirm, minus the caller check.
    async fn auto_complete_deal(
        &self,
        deal_id: Uuid,
        platform_fee: i64,
        creator_payout: i64,
    ) -> Result<Option<Deal>, Error>;

    async fn get_order_summary(&self, order_id: Uuid) -> Result<Option<OrderSummary>, Error>;

    async fn get_work_requirements(&self, deal_id: Uuid) -> Result<Vec<WorkRequirement>, Error>;

    async fn get_submitted_work(&self, deal_id: Uuid) -> Result<Vec<SubmittedWork>, Error>;
}

#[async_trait]
impl DealExt for DBClient {
    async fn accept_offer_and_create_deal(
        &self,
        offer: &Offer,
        creator_id: Uuid,
        advertiser_id: Uuid,
    ) -> Result<Option<Deal>, Error> {
        let mut tx = self.pool.begin().await?;

        let accepted = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE offers
            SET status = 'accepted', viewed_at = COALESCE(viewed_at, NOW())
            WHERE id = $1 AND status = 'pending'
            RETURNING id
            "#,
        )
        .bind(offer.id)
        .fetch_optional(&mut *tx)
        .await?;

        if accepted.is_none() {
            return Ok(None);
        }

        let deal = sqlx::query_as::<_, Deal>(&format!(
            r#"
            INSERT INTO deals
                (order_id, offer_id, creator_id, advertiser_id, budget, currency,
                 deadline, conditions, start_date, end_date, video_count)
            VALUES ($1, $2, $3, $4, $5, 'KZT', $6, $7, $8, $9, $10)
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(offer.order_id)
        .bind(offer.id)
        .bind(creator_id)
        .bind(advertiser_id)
        .bind(offer.budget)
        .bind(offer.deadline)
        .bind(&offer.conditions)
        .bind(offer.start_date)
        .bind(offer.end_date)
        .bind(offer.video_count)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(deal))
    }

    async fn get_deal_for_user(&self, deal_id: Uuid, user_id: Uuid) -> Result<Option<Deal>, Error> {
        sqlx::query_as::<_, Deal>(&format!(
            r#"
            SELECT {DEAL_COLUMNS}
            FROM deals
            WHERE id = $1 AND (creator_id = $2 OR advertiser_id = $2)
            "#
        ))
        .bind(deal_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_deals_for_user(
        &self,
        user_id: Uuid,
        status: Option<DealStatus>,
    ) -> Result<Vec<Deal>, Error> {
        sqlx::query_as::<_, Deal>(&format!(
            r#"
            SELECT {DEAL_COLUMNS}
            FROM deals
            WHERE (creator_id = $1 OR advertiser_id = $1)
              AND ($2::deal_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_signature(
        &self,
        deal_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<DealSignature>, Error> {
        sqlx::query_as::<_, DealSignature>(
            r#"
            SELECT id, deal_id, user_id, status, sms_code, sms_sent_at, signed_at
            FROM deal_signatures
            WHERE deal_id = $1 AND user_id = $2
            "#,
        )
        .bind(deal_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_deal_signatures(&self, deal_id: Uuid) -> Result<Vec<DealSignature>, Error> {
        sqlx::query_as::<_, DealSignature>(
            r#"
            SELECT id, deal_id, user_id, status, sms_code, sms_sent_at, signed_at
            FROM deal_signatures
            WHERE deal_id = $1
            "#,
        )
        .bind(deal_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn store_sign_code(
        &self,
        deal_id: Uuid,
        user_id: Uuid,
        code: &str,
    ) -> Result<Option<DealSignature>, Error> {
        sqlx::query_as::<_, DealSignature>(
            r#"
            INSERT INTO deal_signatures (deal_id, user_id, sms_code, sms_sent_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (deal_id, user_id) DO UPDATE
            SET sms_code = EXCLUDED.sms_code, sms_sent_at = EXCLUDED.sms_sent_at
            WHERE deal_signatures.status = 'pending'
            RETURNING id, deal_id, user_id, status, sms_code, sms_sent_at, signed_at
            "#,
        )
        .bind(deal_id)
        .bind(user_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn sign_deal(
        &self,
        deal_id: Uuid,
        user_id: Uuid,
        code: &str,
    ) -> Result<SignOutcome, Error> {
        let mut tx = self.pool.begin().await?;

        // Lock the deal row: the both-signed evaluation below must not race
        // the other party's concurrent sign.
        let deal = sqlx::query_as::<_, Deal>(&format!(
            r#"
            SELECT {DEAL_COLUMNS}
            FROM deals
            WHERE id = $1 AND (creator_id = $2 OR advertiser_id = $2)
            FOR UPDATE
            "#
        ))
        .bind(deal_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let deal = match deal {
            Some(deal) => deal,
            None => return Ok(SignOutcome::DealNotFound),
        };

        if !deal.status.is_signable() {
            return Ok(SignOutcome::NotSignable(deal.status));
        }

        let sig = sqlx::query_as::<_, DealSignature>(
            r#"
            SELECT id, deal_id, user_id, status, sms_code, sms_sent_at, signed_at
            FROM deal_signatures
            WHERE deal_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(deal_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let sig = match sig {
            Some(sig) => sig,
            None => return Ok(SignOutcome::NoPendingCode),
        };

        if sig.status == SignatureStatus::Signed {
            return Ok(SignOutcome::AlreadySigned);
        }

        // Exact string match, no normalization. A consumed code is NULL and
        // can never match again.
        match &sig.sms_code {
            None => return Ok(SignOutcome::NoPendingCode),
            Some(stored) if stored != code => return Ok(SignOutcome::CodeMismatch),
            Some(_) => {}
        }

        sqlx::query(
            r#"
            UPDATE deal_signatures
            SET status = 'signed', signed_at = NOW(), sms_code = NULL
            WHERE id = $1
            "#,
        )
        .bind(sig.id)
        .execute(&mut *tx)
        .await?;

        // Fresh read of the authoritative signature set, inside the same
        // transaction as the mutation above.
        let signed_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id
            FROM deal_signatures
            WHERE deal_id = $1 AND status = 'signed'
            "#,
        )
        .bind(deal_id)
        .fetch_all(&mut *tx)
        .await?;

        let both_signed = signed_ids.contains(&deal.creator_id)
            && signed_ids.contains(&deal.advertiser_id);
        let next_status = if both_signed {
            DealStatus::PendingPayment
        } else {
            DealStatus::ContractSigned
        };

        let updated = sqlx::query_as::<_, Deal>(&format!(
            r#"
            UPDATE deals
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(deal_id)
        .bind(next_status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SignOutcome::Signed(updated))
    }

    async fn pay_deal(
        &self,
        deal_id: Uuid,
        advertiser_id: Uuid,
        payment_method: &str,
    ) -> Result<Option<Deal>, Error> {
        sqlx::query_as::<_, Deal>(&format!(
            r#"
            UPDATE deals
            SET status = 'in_progress',
                escrow_amount = budget,
                payment_method = $3,
                paid_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND advertiser_id = $2 AND status = 'pending_payment'
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(deal_id)
        .bind(advertiser_id)
        .bind(payment_method)
        .fetch_optional(&self.pool)
        .await
    }

    async fn submit_work(&self, deal_id: Uuid, creator_id: Uuid) -> Result<Option<Deal>, Error> {
        sqlx::query_as::<_, Deal>(&format!(
            r#"
            UPDATE deals
            SET status = 'work_submitted',
                work_submitted_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND creator_id = $2 AND status = 'in_progress'
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(deal_id)
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn confirm_work(
        &self,
        deal_id: Uuid,
        advertiser_id: Uuid,
        platform_fee: i64,
        creator_payout: i64,
    ) -> Result<Option<Deal>, Error> {
        sqlx::query_as::<_, Deal>(&format!(
            r#"
            UPDATE deals
            SET status = 'completed',
                platform_fee = $3,
                creator_payout = $4,
                updated_at = NOW()
            WHERE id = $1 AND advertiser_id = $2 AND status = 'work_submitted'
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(deal_id)
        .bind(advertiser_id)
        .bind(platform_fee)
        .bind(creator_payout)
        .fetch_optional(&self.pool)
        .await
    }

    async fn dispute_deal(
        &self,
        deal_id: Uuid,
        advertiser_id: Uuid,
        reason: &str,
    ) -> Result<Option<Deal>, Error> {
        sqlx::query_as::<_, Deal>(&format!(
            r#"
            UPDATE deals
            SET status = 'disputed',
                dispute_reason = $3,
                updated_at = NOW()
            WHERE id = $1 AND advertiser_id = $2 AND status = 'work_submitted'
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(deal_id)
        .bind(advertiser_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_deals_past_review_window(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Deal>, Error> {
        sqlx::query_as::<_, Deal>(&format!(
            r#"
            SELECT {DEAL_COLUMNS}
            FROM deals
            WHERE status = 'work_submitted'
              AND work_submitted_at IS NOT NULL
              AND work_submitted_at <= $1
            ORDER BY work_submitted_at ASC
            "#
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    async fn auto_complete_deal(
        &self,
        deal_id: Uuid,
        platform_fee: i64,
        creator_payout: i64,
    ) -> Result<Option<Deal>, Error> {
        sqlx::query_as::<_, Deal>(&format!(
            r#"
            UPDATE deals
            SET status = 'completed',
                platform_fee = $2,
                creator_payout = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = 'work_submitted'
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(deal_id)
        .bind(platform_fee)
        .bind(creator_payout)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_order_summary(&self, order_id: Uuid) -> Result<Option<OrderSummary>, Error> {
        sqlx::query_as::<_, OrderSummary>(
            r#"
            SELECT id, title, description
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_work_requirements(&self, deal_id: Uuid) -> Result<Vec<WorkRequirement>, Error> {
        sqlx::query_as::<_, WorkRequirement>(
            r#"
            SELECT id, deal_id, label, is_completed, sort_order
            FROM work_requirements
            WHERE deal_id = $1
            ORDER BY sort_order
            "#,
        )
        .bind(deal_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_submitted_work(&self, deal_id: Uuid) -> Result<Vec<SubmittedWork>, Error> {
        sqlx::query_as::<_, SubmittedWork>(
            r#"
            SELECT id, deal_id, title, file_url, duration, format, uploaded_at
            FROM submitted_work
            WHERE deal_id = $1
            ORDER BY uploaded_at
            "#,
        )
        .bind(deal_id)
        .fetch_all(&self.pool)
        .await
    }
}
