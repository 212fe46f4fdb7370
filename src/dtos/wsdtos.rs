// dtos/wsdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::chatmodel::{Message, MessageType};

/// Inbound live-channel frames: `{"action": "...", "chat_id": ..., ...}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientFrame {
    SendMessage {
        chat_id: Uuid,
        content: String,
        #[serde(default)]
        message_type: Option<MessageType>,
    },
    Typing {
        chat_id: Uuid,
    },
    Read {
        chat_id: Uuid,
    },
}

/// Outbound live-channel frames: `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage(Message),
    Typing {
        chat_id: Uuid,
        user_id: Uuid,
    },
    MessagesRead {
        chat_id: Uuid,
        read_by: Uuid,
        read_at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_deserialize_by_action() {
        let chat_id = Uuid::new_v4();
        let frame: ClientFrame = serde_json::from_value(serde_json::json!({
            "action": "send_message",
            "chat_id": chat_id,
            "content": "hello",
        }))
        .unwrap();
        assert_eq!(
            frame,
            ClientFrame::SendMessage {
                chat_id,
                content: "hello".to_string(),
                message_type: None,
            }
        );

        let frame: ClientFrame = serde_json::from_value(serde_json::json!({
            "action": "typing",
            "chat_id": chat_id,
        }))
        .unwrap();
        assert_eq!(frame, ClientFrame::Typing { chat_id });

        let frame: ClientFrame = serde_json::from_value(serde_json::json!({
            "action": "read",
            "chat_id": chat_id,
        }))
        .unwrap();
        assert_eq!(frame, ClientFrame::Read { chat_id });
    }

    #[test]
    fn unknown_action_is_rejected() {
        let parsed: Result<ClientFrame, _> = serde_json::from_value(serde_json::json!({
            "action": "shout",
            "chat_id": Uuid::new_v4(),
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn server_events_serialize_with_event_and_data() {
        let event = ServerEvent::Typing {
            chat_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "typing");
        assert!(value["data"]["chat_id"].is_string());
        assert!(value["data"]["user_id"].is_string());
    }
}
