// service/deal_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        dealdb::{DealExt, SignOutcome},
        userdb::UserExt,
    },
    dtos::dealdtos::*,
    models::{
        chatmodel::Offer,
        dealmodel::{compute_payout, Deal, DealStatus, SignatureStatus},
        usermodel::{User, UserRole},
    },
    service::{error::ServiceError, sms::SmsService},
    utils::code_generator::generate_sign_code,
};

/// Deal state machine and signature verifier. All transitions run as
/// status-guarded updates in the store, so a guard failure mutates nothing.
#[derive(Debug, Clone)]
pub struct DealService {
    db_client: Arc<DBClient>,
    sms_service: Arc<SmsService>,
    commission_percent: i64,
}

impl DealService {
    pub fn new(db_client: Arc<DBClient>, sms_service: Arc<SmsService>, commission_percent: i64) -> Self {
        Self {
            db_client,
            sms_service,
            commission_percent,
        }
    }

    pub fn commission_percent(&self) -> i64 {
        self.commission_percent
    }

    /// The single creation point for deals: an accepted offer. The offer
    /// accept and the deal insert commit together; a concurrent duplicate
    /// accept loses the status guard and gets `InvalidState`.
    pub async fn create_from_offer(
        &self,
        offer: &Offer,
        creator_id: Uuid,
        advertiser_id: Uuid,
    ) -> Result<Deal, ServiceError> {
        self.db_client
            .accept_offer_and_create_deal(offer, creator_id, advertiser_id)
            .await?
            .ok_or_else(|| ServiceError::invalid_state(offer.status.to_str(), "accept this offer"))
    }

    async fn get_deal_for(&self, deal_id: Uuid, user_id: Uuid) -> Result<Deal, ServiceError> {
        self.db_client
            .get_deal_for_user(deal_id, user_id)
            .await?
            .ok_or(ServiceError::NotFound("Deal"))
    }

    /// Issues a one-time signing code for the calling party and dispatches
    /// it over SMS. Dispatch failure is logged, not surfaced: the stored
    /// code stays valid so a flaky carrier cannot block signing forever.
    pub async fn request_sign(&self, deal_id: Uuid, user: &User) -> Result<RequestSignResponse, ServiceError> {
        let deal = self.get_deal_for(deal_id, user.id).await?;

        if !deal.status.is_signable() {
            return Err(ServiceError::invalid_state(deal.status.to_str(), "sign the contract"));
        }

        if let Some(sig) = self.db_client.get_signature(deal.id, user.id).await? {
            if sig.status == SignatureStatus::Signed {
                return Err(ServiceError::AlreadySigned);
            }
        }

        let code = generate_sign_code();
        let stored = self.db_client.store_sign_code(deal.id, user.id, &code).await?;
        if stored.is_none() {
            // Raced a concurrent sign: the row flipped to signed between the
            // check above and the guarded upsert.
            return Err(ServiceError::AlreadySigned);
        }

        let sent = self.sms_service.send_sign_code(&user.phone, &code).await;
        if !sent {
            tracing::warn!(deal_id = %deal.id, user_id = %user.id, "sign code SMS dispatch failed");
        }

        Ok(RequestSignResponse { deal_id: deal.id })
    }

    /// Consumes the one-time code and advances the contract phase. The
    /// both-signed evaluation happens inside the signing transaction.
    pub async fn sign(&self, deal_id: Uuid, user: &User, code: &str) -> Result<SignDealResponse, ServiceError> {
        match self.db_client.sign_deal(deal_id, user.id, code).await? {
            SignOutcome::Signed(deal) => Ok(SignDealResponse {
                deal_id: deal.id,
                signature_status: "signed",
                deal_status: deal.status,
            }),
            SignOutcome::DealNotFound => Err(ServiceError::NotFound("Deal")),
            SignOutcome::NotSignable(status) => {
                Err(ServiceError::invalid_state(status.to_str(), "sign the contract"))
            }
            SignOutcome::NoPendingCode => Err(ServiceError::NoPendingCode),
            SignOutcome::AlreadySigned => Err(ServiceError::AlreadySigned),
            SignOutcome::CodeMismatch => Err(ServiceError::CodeMismatch),
        }
    }

    /// Advertiser funds the escrow ledger. pending_payment -> in_progress.
    pub async fn pay(
        &self,
        deal_id: Uuid,
        user: &User,
        payment_method: &str,
    ) -> Result<PayDealResponse, ServiceError> {
        let deal = self.get_deal_for(deal_id, user.id).await?;

        if user.role != UserRole::Advertiser || deal.advertiser_id != user.id {
            return Err(ServiceError::Forbidden);
        }
        if !deal.status.can_transition_to(DealStatus::InProgress) {
            return Err(ServiceError::invalid_state(deal.status.to_str(), "pay"));
        }

        let updated = self
            .db_client
            .pay_deal(deal.id, user.id, payment_method)
            .await?
            .ok_or_else(|| ServiceError::invalid_state(deal.status.to_str(), "pay"))?;

        Ok(PayDealResponse {
            deal_id: updated.id,
            status: updated.status,
            escrow_amount: updated.escrow_amount,
            payment: PaymentInfo {
                amount: updated.budget,
                currency: updated.currency.clone(),
                method: payment_method.to_string(),
                paid_at: updated.paid_at,
            },
        })
    }

    /// Creator marks the work as delivered, starting the review window.
    pub async fn submit_work(&self, deal_id: Uuid, user: &User) -> Result<SubmitWorkResponse, ServiceError> {
        let deal = self.get_deal_for(deal_id, user.id).await?;

        if user.role != UserRole::Creator || deal.creator_id != user.id {
            return Err(ServiceError::Forbidden);
        }
        if !deal.status.can_transition_to(DealStatus::WorkSubmitted) {
            return Err(ServiceError::invalid_state(deal.status.to_str(), "submit work"));
        }

        let updated = self
            .db_client
            .submit_work(deal.id, user.id)
            .await?
            .ok_or_else(|| ServiceError::invalid_state(deal.status.to_str(), "submit work"))?;

        let submitted = self.db_client.get_submitted_work(updated.id).await?;

        Ok(SubmitWorkResponse {
            deal_id: updated.id,
            status: updated.status,
            work_submitted_at: updated.work_submitted_at,
            submitted_work: submitted.into_iter().map(Into::into).collect(),
        })
    }

    /// Advertiser accepts the delivered work; the commission split is
    /// computed and the deal completes.
    pub async fn confirm_work(&self, deal_id: Uuid, user: &User) -> Result<ConfirmWorkResponse, ServiceError> {
        let deal = self.get_deal_for(deal_id, user.id).await?;

        if user.role != UserRole::Advertiser || deal.advertiser_id != user.id {
            return Err(ServiceError::Forbidden);
        }
        if !deal.status.can_transition_to(DealStatus::Completed) {
            return Err(ServiceError::invalid_state(deal.status.to_str(), "confirm work"));
        }

        let (fee, payout) = compute_payout(deal.budget, self.commission_percent);
        let updated = self
            .db_client
            .confirm_work(deal.id, user.id, fee, payout)
            .await?
            .ok_or_else(|| ServiceError::invalid_state(deal.status.to_str(), "confirm work"))?;

        Ok(ConfirmWorkResponse {
            deal_id: updated.id,
            status: updated.status,
            payout: PayoutInfo {
                budget: updated.budget,
                platform_fee: updated.platform_fee,
                creator_payout: updated.creator_payout,
                currency: updated.currency.clone(),
            },
        })
    }

    /// Advertiser contests the delivered work; the deal parks in `disputed`
    /// for manual resolution.
    pub async fn dispute(
        &self,
        deal_id: Uuid,
        user: &User,
        reason: &str,
    ) -> Result<DisputeDealResponse, ServiceError> {
        let deal = self.get_deal_for(deal_id, user.id).await?;

        if user.role != UserRole::Advertiser || deal.advertiser_id != user.id {
            return Err(ServiceError::Forbidden);
        }
        if !deal.status.can_transition_to(DealStatus::Disputed) {
            return Err(ServiceError::invalid_state(deal.status.to_str(), "dispute work"));
        }

        let updated = self
            .db_client
            .dispute_deal(deal.id, user.id, reason)
            .await?
            .ok_or_else(|| ServiceError::invalid_state(deal.status.to_str(), "dispute work"))?;

        Ok(DisputeDealResponse {
            deal_id: updated.id,
            status: updated.status,
            reason: reason.to_string(),
        })
    }

    // Read-side composition, outside the state machine.

    async fn creator_brief(&self, creator_id: Uuid) -> Result<DealCreatorBrief, ServiceError> {
        let user = self.db_client.get_user(creator_id).await?;
        Ok(DealCreatorBrief {
            id: creator_id,
            name: user.as_ref().map(|u| u.name.clone()),
            avatar_url: user.and_then(|u| u.avatar_url),
        })
    }

    async fn advertiser_brief(&self, advertiser_id: Uuid) -> Result<DealAdvertiserBrief, ServiceError> {
        let user = self.db_client.get_user(advertiser_id).await?;
        Ok(DealAdvertiserBrief {
            id: advertiser_id,
            company_name: user.as_ref().and_then(|u| u.company_name.clone()),
            avatar_url: user.and_then(|u| u.avatar_url),
        })
    }

    async fn summarize(&self, deal: &Deal, with_description: bool) -> Result<DealListItem, ServiceError> {
        let order = self.db_client.get_order_summary(deal.order_id).await?;
        Ok(DealListItem {
            id: deal.id,
            order: DealOrderBrief {
                id: deal.order_id,
                title: order.as_ref().map(|o| o.title.clone()).unwrap_or_default(),
                content_description: if with_description {
                    order.and_then(|o| o.description)
                } else {
                    None
                },
            },
            creator: self.creator_brief(deal.creator_id).await?,
            advertiser: self.advertiser_brief(deal.advertiser_id).await?,
            budget: deal.budget,
            currency: deal.currency.clone(),
            deadline: deal.deadline,
            conditions: deal.conditions.clone(),
            start_date: deal.start_date,
            end_date: deal.end_date,
            video_count: deal.video_count,
            status: deal.status,
            created_at: deal.created_at,
        })
    }

    pub async fn list_deals(
        &self,
        user_id: Uuid,
        status: Option<DealStatus>,
    ) -> Result<Vec<DealListItem>, ServiceError> {
        let deals = self.db_client.list_deals_for_user(user_id, status).await?;
        let mut items = Vec::with_capacity(deals.len());
        for deal in &deals {
            items.push(self.summarize(deal, false).await?);
        }
        Ok(items)
    }

    pub async fn deal_detail(&self, deal_id: Uuid, user_id: Uuid) -> Result<DealDetail, ServiceError> {
        let deal = self.get_deal_for(deal_id, user_id).await?;

        let signatures = self.db_client.get_deal_signatures(deal.id).await?;
        let mut sig_items = Vec::with_capacity(signatures.len());
        for sig in signatures {
            let user = self.db_client.get_user(sig.user_id).await?;
            sig_items.push(SignatureItem {
                user_id: sig.user_id,
                name: user.as_ref().map(|u| u.name.clone()),
                role: user.map(|u| u.role),
                status: sig.status,
                signed_at: sig.signed_at,
            });
        }

        let requirements = self.db_client.get_work_requirements(deal.id).await?;
        let submitted = self.db_client.get_submitted_work(deal.id).await?;

        Ok(DealDetail {
            summary: self.summarize(&deal, true).await?,
            contract: ContractInfo { signatures: sig_items },
            work_requirements: requirements.into_iter().map(Into::into).collect(),
            submitted_work: submitted.into_iter().map(Into::into).collect(),
            escrow_amount: deal.escrow_amount,
            platform_fee: deal.platform_fee,
            creator_payout: deal.creator_payout,
            payment_status: payment_status(&deal),
            work_submitted_at: deal.work_submitted_at,
            dispute_reason: deal.dispute_reason.clone(),
        })
    }
}
