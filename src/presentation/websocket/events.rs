//! Gateway Frames
//!
//! JSON frames exchanged over the socket: `{"event", "data", "id"?}`.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::application::services::MessageDto;

pub const JOIN_USER: &str = "join_user";
pub const JOIN_CHAT: &str = "join_chat";
pub const LEAVE_CHAT: &str = "leave_chat";
pub const MESSAGE_SEND: &str = "message:send";

pub const MESSAGE_NEW: &str = "message:new";
pub const MESSAGE_UPDATED: &str = "message:updated";
pub const MESSAGE_DELETED: &str = "message:deleted";
pub const NOTIFICATION: &str = "notification";
pub const ACK: &str = "ack";
pub const ERROR: &str = "error";

/// Personal room of a user
pub fn user_room(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

/// Room of a chat
pub fn chat_room(chat_id: Uuid) -> String {
    format!("chat:{}", chat_id)
}

/// Frame sent by a client
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    pub id: Option<u64>,
}

/// Frame sent by the server
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServerFrame {
    pub event: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl ServerFrame {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
            id: None,
        }
    }

    pub fn ack(id: u64, data: Value) -> Self {
        Self {
            event: ACK.to_string(),
            data,
            id: Some(id),
        }
    }

    pub fn error(id: Option<u64>, message: &str, status: u16) -> Self {
        Self {
            event: ERROR.to_string(),
            data: json!({ "message": message, "status": status }),
            id,
        }
    }

    /// Encode as a websocket text message
    pub fn encode(&self) -> Result<Message, serde_json::Error> {
        let text = serde_json::to_string(self)?;
        Ok(Message::Text(text.into()))
    }
}

/// Data of `join_chat` and `leave_chat`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomPayload {
    pub chat_id: String,
}

/// Data of `message:send`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub chat_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub file_id: Option<String>,
}

/// Data of a `notification` frame
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload<'a> {
    pub chat_id: Uuid,
    pub message: &'a MessageDto,
}

/// Data of a `message:deleted` frame
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedPayload {
    pub id: Uuid,
    pub chat_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_client_frame_without_data_or_id() {
        let frame: ClientFrame = serde_json::from_str(r#"{"event":"join_user"}"#).unwrap();
        assert_eq!(frame.event, JOIN_USER);
        assert_eq!(frame.data, Value::Null);
        assert_eq!(frame.id, None);
    }

    #[test]
    fn test_send_payload_reads_camel_case() {
        let payload: SendMessagePayload = serde_json::from_value(json!({
            "chatId": "0190a0b0-0000-7000-8000-000000000000",
            "content": "hi",
            "type": "TEXT",
            "fileId": null
        }))
        .unwrap();
        assert_eq!(payload.content, "hi");
        assert_eq!(payload.message_type.as_deref(), Some("TEXT"));
        assert!(payload.file_id.is_none());
    }

    #[test]
    fn test_error_frame_shape() {
        let frame = ServerFrame::error(Some(7), "You are not a member of this chat", 403);
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "error",
                "data": {"message": "You are not a member of this chat", "status": 403},
                "id": 7
            })
        );
    }

    #[test]
    fn test_broadcast_frame_omits_id() {
        let value = serde_json::to_value(ServerFrame::new(MESSAGE_NEW, json!({}))).unwrap();
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_room_names() {
        let id = Uuid::nil();
        assert_eq!(user_room(id), "user:00000000-0000-0000-0000-000000000000");
        assert_eq!(chat_room(id), "chat:00000000-0000-0000-0000-000000000000");
    }
}
