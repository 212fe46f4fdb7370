use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{chatdb::ChatExt, userdb::UserExt},
    dtos::{chatdtos::*, wsdtos::ServerEvent},
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddeware,
    models::{chatmodel::MessageType, usermodel::User},
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/chats", get(get_user_chats).post(create_chat))
        .route("/chats/:chat_id/messages", get(get_messages).post(send_message))
        .route("/chats/:chat_id/offer", post(send_offer))
        .route("/chats/:chat_id/offer/:offer_id/respond", post(respond_to_offer))
        .route("/offers/my/sent", get(my_sent_offers))
        .route("/offers/my/received", get(my_received_offers))
        .route("/offers/:offer_id/view", post(view_offer))
        .route("/offers/:offer_id/cancel", post(cancel_offer))
}

fn participant_brief(id: Uuid, user: Option<User>) -> ParticipantBrief {
    ParticipantBrief {
        id,
        name: user.as_ref().map(|u| u.name.clone()),
        avatar_url: user.as_ref().and_then(|u| u.avatar_url.clone()),
        role: user.map(|u| u.role),
    }
}

pub async fn create_chat(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateChatDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.participant_id == auth.user.id {
        return Err(HttpError::bad_request("Cannot open a chat with yourself"));
    }

    let other_user = app_state
        .db_client
        .get_user(body.participant_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    let chat = app_state
        .db_client
        .create_or_get_chat(auth.user.id, body.participant_id, body.order_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response = CreateChatResponse {
        id: chat.id,
        participant: participant_brief(other_user.id, Some(other_user)),
        order_id: chat.order_id,
    };

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn get_user_chats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let chats = app_state
        .db_client
        .get_user_chats(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let mut items = Vec::with_capacity(chats.len());

    for chat in chats {
        let other_id = chat.other_participant(auth.user.id);
        let other_user = app_state
            .db_client
            .get_user(other_id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        let last_message = app_state
            .db_client
            .get_last_message(chat.id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        let unread_count = app_state
            .db_client
            .get_unread_count(chat.id, auth.user.id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        items.push(ChatListItem {
            id: chat.id,
            participant: participant_brief(other_id, other_user),
            last_message: last_message.map(|m| LastMessage {
                content: m.content,
                message_type: m.message_type,
                created_at: m.created_at,
            }),
            unread_count,
            order_id: chat.order_id,
            updated_at: chat.last_message_at.or(chat.created_at),
        });
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": items
    })))
}

pub async fn get_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let chat = app_state
        .db_client
        .get_chat_by_id(chat_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Chat not found"))?;

    if !chat.is_participant(auth.user.id) {
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }

    let limit = query.limit.unwrap_or(50).clamp(1, 100);

    // The store returns one row past the limit so has_more is exact.
    let mut messages = app_state
        .db_client
        .get_chat_messages(chat_id, query.before, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let has_more = messages.len() as i64 > limit;
    messages.truncate(limit as usize);

    // Opening history marks incoming messages as read and notifies the
    // sender's live connections.
    let read_ids = app_state
        .db_client
        .mark_messages_as_read(chat_id, auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if !read_ids.is_empty() {
        let other_id = chat.other_participant(auth.user.id);
        app_state
            .ws_manager
            .send_to_user(
                other_id,
                ServerEvent::MessagesRead {
                    chat_id,
                    read_by: auth.user.id,
                    read_at: Utc::now(),
                },
            )
            .await;
    }

    // Newest-first from the store, oldest-first for the client.
    messages.reverse();

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": MessageListResponse {
            data: messages,
            has_more,
        }
    })))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(chat_id): Path<Uuid>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let chat = app_state
        .db_client
        .get_chat_by_id(chat_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Chat not found"))?;

    if !chat.is_participant(auth.user.id) {
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }

    let message_type = body.message_type.unwrap_or(MessageType::Text);
    if message_type == MessageType::Offer {
        return Err(HttpError::bad_request("Offers are sent via the offer endpoint"));
    }

    let message = app_state
        .db_client
        .send_message(chat_id, auth.user.id, message_type, body.content)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    // Live fan-out to the recipient, plus an echo to the sender's other
    // devices. The durable log above is the source of truth.
    let other_id = chat.other_participant(auth.user.id);
    app_state
        .ws_manager
        .send_to_user(other_id, ServerEvent::NewMessage(message.clone()))
        .await;
    app_state
        .ws_manager
        .send_to_user(auth.user.id, ServerEvent::NewMessage(message.clone()))
        .await;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": message
    })))
}

pub async fn send_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(chat_id): Path<Uuid>,
    Json(body): Json<SendOfferDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let response = app_state
        .offer_service
        .send_offer(chat_id, &auth.user, body)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn respond_to_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path((chat_id, offer_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<RespondOfferDto>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_state
        .offer_service
        .respond_to_offer(chat_id, offer_id, &auth.user, body.action)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn my_sent_offers(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<OfferListQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_state
        .offer_service
        .list_sent_offers(&auth.user, &query)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn my_received_offers(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<OfferListQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_state
        .offer_service
        .list_received_offers(&auth.user, &query)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn view_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_state
        .offer_service
        .view_offer(offer_id, &auth.user)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn cancel_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_state
        .offer_service
        .cancel_offer(offer_id, &auth.user)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}
