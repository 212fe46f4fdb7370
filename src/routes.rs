// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{chat::chat_handler, deals::deals_handler, ws::ws_upgrade},
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest(
            "/deals",
            deals_handler().layer(middleware::from_fn(auth)),
        )
        .merge(chat_handler().layer(middleware::from_fn(auth)))
        .layer(TraceLayer::new_for_http());

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_upgrade))
        .nest("/api", api_route)
        .layer(Extension(app_state))
}
