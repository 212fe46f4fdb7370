use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::dealdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn deals_handler() -> Router {
    Router::new()
        .route("/", get(list_deals))
        .route("/:deal_id", get(get_deal))
        .route("/:deal_id/request-sign", post(request_sign))
        .route("/:deal_id/sign", post(sign_deal))
        .route("/:deal_id/pay", post(pay_deal))
        .route("/:deal_id/submit-work", post(submit_work))
        .route("/:deal_id/confirm-work", post(confirm_work))
        .route("/:deal_id/dispute", post(dispute_deal))
}

pub async fn list_deals(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<DealFilterQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let deals = app_state
        .deal_service
        .list_deals(auth.user.id, query.status)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": deals
    })))
}

pub async fn get_deal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(deal_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let deal = app_state
        .deal_service
        .deal_detail(deal_id, auth.user.id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": deal
    })))
}

pub async fn request_sign(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(deal_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_state
        .deal_service
        .request_sign(deal_id, &auth.user)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Signing code sent via SMS",
        "data": response
    })))
}

pub async fn sign_deal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(deal_id): Path<Uuid>,
    Json(body): Json<SignDealDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let response = app_state
        .deal_service
        .sign(deal_id, &auth.user, &body.code)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn pay_deal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(deal_id): Path<Uuid>,
    Json(body): Json<PayDealDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let response = app_state
        .deal_service
        .pay(deal_id, &auth.user, &body.payment_method)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn submit_work(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(deal_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_state
        .deal_service
        .submit_work(deal_id, &auth.user)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn confirm_work(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(deal_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_state
        .deal_service
        .confirm_work(deal_id, &auth.user)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}

pub async fn dispute_deal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(deal_id): Path<Uuid>,
    Json(body): Json<DisputeDealDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let response = app_state
        .deal_service
        .dispute(deal_id, &auth.user, &body.reason)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": response
    })))
}
