use std::sync::Arc;

use axum::{
    extract::{
        ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query,
    },
    response::IntoResponse,
    Extension,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    db::{chatdb::ChatExt, userdb::UserExt},
    dtos::wsdtos::{ClientFrame, ServerEvent},
    models::{chatmodel::MessageType, usermodel::User},
    utils::token,
    AppState,
};

// Application close code for a missing or invalid token.
const CLOSE_UNAUTHORIZED: u16 = 4001;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// `GET /ws?token=...`. Auth happens after the upgrade so the client gets a
/// proper close frame instead of a failed handshake.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, query.token))
}

async fn handle_socket(mut socket: WebSocket, app_state: Arc<AppState>, token: Option<String>) {
    let user = match authenticate(&app_state, token).await {
        Some(user) => user,
        None => {
            let _ = socket
                .send(WsMessage::Close(Some(CloseFrame {
                    code: CLOSE_UNAUTHORIZED,
                    reason: "invalid token".into(),
                })))
                .await;
            return;
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let conn_id = app_state.ws_manager.connect(user.id, event_tx).await;
    tracing::debug!(user_id = %user.id, conn_id, "websocket connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Writer task: drains queued events onto the socket.
    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("failed to serialize server event: {}", e);
                    continue;
                }
            };
            if ws_sender.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Reader loop: one frame at a time until the client goes away.
    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            WsMessage::Text(text) => {
                let frame = match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::debug!(user_id = %user.id, "ignoring malformed frame: {}", e);
                        continue;
                    }
                };
                if let Err(e) = handle_frame(&app_state, &user, frame).await {
                    tracing::error!(user_id = %user.id, "websocket frame handling failed: {}", e);
                }
            }
            WsMessage::Close(_) => break,
            // Pings are answered by axum itself.
            _ => {}
        }
    }

    app_state.ws_manager.disconnect(user.id, conn_id).await;
    writer.abort();
    tracing::debug!(user_id = %user.id, conn_id, "websocket disconnected");
}

async fn authenticate(app_state: &AppState, token: Option<String>) -> Option<User> {
    let token = token?;
    let sub = token::decode_token(token, app_state.env.jwt_secret.as_bytes()).ok()?;
    let user_id = Uuid::parse_str(&sub).ok()?;
    app_state.db_client.get_user(user_id).await.ok().flatten()
}

async fn handle_frame(
    app_state: &AppState,
    user: &User,
    frame: ClientFrame,
) -> Result<(), sqlx::Error> {
    match frame {
        ClientFrame::SendMessage {
            chat_id,
            content,
            message_type,
        } => {
            let Some(chat) = app_state.db_client.get_chat_by_id(chat_id).await? else {
                return Ok(());
            };
            if !chat.is_participant(user.id) {
                return Ok(());
            }
            if content.is_empty() {
                return Ok(());
            }

            let message_type = match message_type {
                // Offers carry commercial terms and go through their own endpoint.
                Some(MessageType::Offer) | None => MessageType::Text,
                Some(other) => other,
            };

            let message = app_state
                .db_client
                .send_message(chat_id, user.id, message_type, content)
                .await?;

            let other_id = chat.other_participant(user.id);
            app_state
                .ws_manager
                .send_to_user(other_id, ServerEvent::NewMessage(message.clone()))
                .await;
            // Echo back so the sender's other devices stay in sync.
            app_state
                .ws_manager
                .send_to_user(user.id, ServerEvent::NewMessage(message))
                .await;
        }
        ClientFrame::Typing { chat_id } => {
            let Some(chat) = app_state.db_client.get_chat_by_id(chat_id).await? else {
                return Ok(());
            };
            if !chat.is_participant(user.id) {
                return Ok(());
            }

            // Ephemeral: relayed to the other side, never stored.
            let other_id = chat.other_participant(user.id);
            app_state
                .ws_manager
                .send_to_user(
                    other_id,
                    ServerEvent::Typing {
                        chat_id,
                        user_id: user.id,
                    },
                )
                .await;
        }
        ClientFrame::Read { chat_id } => {
            let Some(chat) = app_state.db_client.get_chat_by_id(chat_id).await? else {
                return Ok(());
            };
            if !chat.is_participant(user.id) {
                return Ok(());
            }

            let read_ids = app_state
                .db_client
                .mark_messages_as_read(chat_id, user.id)
                .await?;

            if !read_ids.is_empty() {
                let other_id = chat.other_participant(user.id);
                app_state
                    .ws_manager
                    .send_to_user(
                        other_id,
                        ServerEvent::MessagesRead {
                            chat_id,
                            read_by: user.id,
                            read_at: Utc::now(),
                        },
                    )
                    .await;
            }
        }
    }

    Ok(())
}
