// service/offer_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        chatdb::{ChatExt, NewOffer},
        db::DBClient,
        dealdb::DealExt,
        userdb::UserExt,
    },
    dtos::chatdtos::*,
    models::{
        chatmodel::{Offer, OfferStatus},
        usermodel::{User, UserRole},
    },
    service::{deal_service::DealService, error::ServiceError},
};

/// Offer lifecycle: send, view, respond, cancel. Accepting an offer is the
/// bridge from chat into the deal lifecycle.
#[derive(Debug, Clone)]
pub struct OfferService {
    db_client: Arc<DBClient>,
    deal_service: Arc<DealService>,
}

impl OfferService {
    pub fn new(db_client: Arc<DBClient>, deal_service: Arc<DealService>) -> Self {
        Self {
            db_client,
            deal_service,
        }
    }

    /// Advertiser sends commercial terms into a chat. The offer-typed
    /// message and the offer row commit atomically.
    pub async fn send_offer(
        &self,
        chat_id: Uuid,
        user: &User,
        dto: SendOfferDto,
    ) -> Result<OfferMessageResponse, ServiceError> {
        if user.role != UserRole::Advertiser {
            return Err(ServiceError::Forbidden);
        }

        let chat = self
            .db_client
            .get_chat_by_id(chat_id)
            .await?
            .ok_or(ServiceError::NotFound("Chat"))?;
        if !chat.is_participant(user.id) {
            return Err(ServiceError::Forbidden);
        }

        let recipient_id = chat.other_participant(user.id);
        let order = self.db_client.get_order_summary(dto.order_id).await?;

        let (message, offer) = self
            .db_client
            .create_offer(
                chat.id,
                user.id,
                recipient_id,
                NewOffer {
                    order_id: dto.order_id,
                    budget: dto.budget,
                    deadline: dto.deadline,
                    content_description: dto.content_description,
                    conditions: dto.conditions,
                    start_date: dto.start_date,
                    end_date: dto.end_date,
                    video_count: dto.video_count,
                },
            )
            .await?;

        Ok(OfferMessageResponse {
            id: message.id,
            chat_id: chat.id,
            offer: OfferBrief::from_offer(&offer, order.map(|o| o.title)),
            created_at: message.created_at,
        })
    }

    /// Recipient accepts or declines a pending offer. Accept spawns exactly
    /// one deal: the underlying update is guarded on `status = 'pending'`,
    /// so a concurrent duplicate accept fails with `InvalidState`.
    pub async fn respond_to_offer(
        &self,
        chat_id: Uuid,
        offer_id: Uuid,
        user: &User,
        action: OfferAction,
    ) -> Result<RespondOfferResponse, ServiceError> {
        if user.role != UserRole::Creator {
            return Err(ServiceError::Forbidden);
        }

        let offer = self
            .db_client
            .get_offer_in_chat(offer_id, chat_id)
            .await?
            .ok_or(ServiceError::NotFound("Offer"))?;
        if offer.recipient_id != user.id {
            return Err(ServiceError::Forbidden);
        }
        if offer.status != OfferStatus::Pending {
            return Err(ServiceError::invalid_state(offer.status.to_str(), "respond to this offer"));
        }

        match action {
            OfferAction::Accept => {
                let deal = self
                    .deal_service
                    .create_from_offer(&offer, user.id, offer.sender_id)
                    .await?;
                Ok(RespondOfferResponse {
                    offer_id: offer.id,
                    status: OfferStatus::Accepted,
                    deal_id: Some(deal.id),
                })
            }
            OfferAction::Decline => {
                let declined = self
                    .db_client
                    .decline_offer(offer.id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::invalid_state(offer.status.to_str(), "respond to this offer")
                    })?;
                Ok(RespondOfferResponse {
                    offer_id: declined.id,
                    status: declined.status,
                    deal_id: None,
                })
            }
        }
    }

    /// Sender withdraws an offer that has not been answered yet.
    pub async fn cancel_offer(&self, offer_id: Uuid, user: &User) -> Result<OfferCancelResponse, ServiceError> {
        if user.role != UserRole::Advertiser {
            return Err(ServiceError::Forbidden);
        }

        let offer = self
            .db_client
            .get_offer_for_sender(offer_id, user.id)
            .await?
            .ok_or(ServiceError::NotFound("Offer"))?;
        if !offer.status.is_cancellable() {
            return Err(ServiceError::invalid_state(offer.status.to_str(), "cancel this offer"));
        }

        let cancelled = self
            .db_client
            .cancel_offer(offer.id)
            .await?
            .ok_or_else(|| ServiceError::invalid_state(offer.status.to_str(), "cancel this offer"))?;

        Ok(OfferCancelResponse {
            id: cancelled.id,
            status: cancelled.status,
            cancelled_at: cancelled.cancelled_at,
        })
    }

    /// Recipient marks an offer as seen. First view sets viewed_at and
    /// promotes pending -> viewed; repeats are no-ops.
    pub async fn view_offer(&self, offer_id: Uuid, user: &User) -> Result<OfferViewResponse, ServiceError> {
        if user.role != UserRole::Creator {
            return Err(ServiceError::Forbidden);
        }

        self.db_client
            .get_offer_for_recipient(offer_id, user.id)
            .await?
            .ok_or(ServiceError::NotFound("Offer"))?;

        // The offer can vanish between the ownership check and the update.
        let viewed = self
            .db_client
            .view_offer(offer_id)
            .await?
            .ok_or(ServiceError::NotFound("Offer"))?;

        Ok(OfferViewResponse {
            id: viewed.id,
            status: viewed.status,
            viewed_at: viewed.viewed_at,
        })
    }

    // Read-side composition for the offer lists.

    async fn participant(&self, user_id: Uuid) -> Result<OfferParticipant, ServiceError> {
        let user = self.db_client.get_user(user_id).await?;
        // Company name is an advertiser-profile attribute.
        let company_name = user
            .as_ref()
            .filter(|u| u.role == UserRole::Advertiser)
            .and_then(|u| u.company_name.clone());
        Ok(OfferParticipant {
            id: user_id,
            name: user.as_ref().map(|u| u.name.clone()),
            avatar_url: user.and_then(|u| u.avatar_url),
            company_name,
        })
    }

    async fn offer_item(&self, offer: &Offer) -> Result<OfferListItem, ServiceError> {
        let order = self.db_client.get_order_summary(offer.order_id).await?;
        Ok(OfferListItem {
            id: offer.id,
            order: OfferOrderBrief {
                id: offer.order_id,
                title: order.map(|o| o.title).unwrap_or_default(),
            },
            sender: self.participant(offer.sender_id).await?,
            recipient: self.participant(offer.recipient_id).await?,
            budget: offer.budget,
            deadline: offer.deadline,
            conditions: offer.conditions.clone(),
            start_date: offer.start_date,
            end_date: offer.end_date,
            video_count: offer.video_count,
            content_description: offer.content_description.clone(),
            status: offer.status,
            viewed_at: offer.viewed_at,
            created_at: offer.created_at,
        })
    }

    /// Advertiser's outbox, newest first, optional status filter.
    pub async fn list_sent_offers(
        &self,
        user: &User,
        query: &OfferListQuery,
    ) -> Result<OfferListResponse, ServiceError> {
        if user.role != UserRole::Advertiser {
            return Err(ServiceError::Forbidden);
        }

        let page = query.page();
        let per_page = query.per_page();

        let total = self.db_client.count_sent_offers(user.id, query.status).await?;
        let offers = self
            .db_client
            .list_sent_offers(user.id, query.status, per_page, (page - 1) * per_page)
            .await?;

        let mut data = Vec::with_capacity(offers.len());
        for offer in &offers {
            data.push(self.offer_item(offer).await?);
        }

        Ok(OfferListResponse {
            data,
            meta: PaginationMeta::new(page, per_page, total),
        })
    }

    /// Creator's inbox, newest first, optional status filter.
    pub async fn list_received_offers(
        &self,
        user: &User,
        query: &OfferListQuery,
    ) -> Result<OfferListResponse, ServiceError> {
        if user.role != UserRole::Creator {
            return Err(ServiceError::Forbidden);
        }

        let page = query.page();
        let per_page = query.per_page();

        let total = self
            .db_client
            .count_received_offers(user.id, query.status)
            .await?;
        let offers = self
            .db_client
            .list_received_offers(user.id, query.status, per_page, (page - 1) * per_page)
            .await?;

        let mut data = Vec::with_capacity(offers.len());
        for offer in &offers {
            data.push(self.offer_item(offer).await?);
        }

        Ok(OfferListResponse {
            data,
            meta: PaginationMeta::new(page, per_page, total),
        })
    }
}
