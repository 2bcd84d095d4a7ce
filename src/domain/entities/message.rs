//! Message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Maximum message content length in characters
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Message type enum matching database VARCHAR constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
    Voice,
    Video,
}

impl MessageType {
    /// Strict parse for client input; unknown types are `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TEXT" => Some(Self::Text),
            "IMAGE" => Some(Self::Image),
            "FILE" => Some(Self::File),
            "VOICE" => Some(Self::Voice),
            "VIDEO" => Some(Self::Video),
            _ => None,
        }
    }

    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "IMAGE" => Self::Image,
            "FILE" => Self::File,
            "VOICE" => Self::Voice,
            "VIDEO" => Self::Video,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::File => "FILE",
            Self::Voice => "VOICE",
            Self::Video => "VIDEO",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message posted in a chat.
///
/// Maps to the `messages` table:
/// - id: UUID PRIMARY KEY
/// - chat_id: UUID NOT NULL REFERENCES chats(id) ON DELETE CASCADE
/// - user_id: UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// - content: TEXT NOT NULL
/// - message_type: VARCHAR(10) NOT NULL DEFAULT 'TEXT'
/// - file_id: UUID NULL REFERENCES files(id) ON DELETE SET NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,

    pub chat_id: Uuid,

    /// Author
    pub user_id: Uuid,

    pub content: String,

    pub message_type: MessageType,

    /// Attached file, if any
    pub file_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        chat_id: Uuid,
        user_id: Uuid,
        content: String,
        message_type: MessageType,
        file_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            chat_id,
            user_id,
            content,
            message_type,
            file_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn is_edited(&self) -> bool {
        self.updated_at > self.created_at
    }
}

/// Repository trait for Message data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find a message, scoped to the chat it must belong to.
    async fn find_in_chat(&self, chat_id: Uuid, id: Uuid) -> Result<Option<Message>, AppError>;

    /// Page through a chat oldest first.
    async fn list_by_chat(
        &self,
        chat_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, AppError>;

    /// The newest `limit` messages of a chat, returned oldest first.
    async fn latest_by_chat(&self, chat_id: Uuid, limit: i64) -> Result<Vec<Message>, AppError>;

    async fn last_in_chat(&self, chat_id: Uuid) -> Result<Option<Message>, AppError>;

    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Message>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("TEXT", MessageType::Text)]
    #[test_case("image", MessageType::Image)]
    #[test_case("FILE", MessageType::File)]
    #[test_case("Voice", MessageType::Voice)]
    #[test_case("VIDEO", MessageType::Video)]
    #[test_case("sticker", MessageType::Text)]
    fn test_message_type_from_str(input: &str, expected: MessageType) {
        assert_eq!(MessageType::from_str(input), expected);
    }

    #[test]
    fn test_strict_parse_rejects_unknown_types() {
        assert_eq!(MessageType::parse("voice"), Some(MessageType::Voice));
        assert_eq!(MessageType::parse("sticker"), None);
    }

    #[test]
    fn test_authorship() {
        let author = Uuid::new_v4();
        let message = Message::new(Uuid::new_v4(), author, "hi".into(), MessageType::Text, None);
        assert!(message.is_authored_by(author));
        assert!(!message.is_authored_by(Uuid::new_v4()));
    }

    #[test]
    fn test_edited_flag_follows_updated_at() {
        let mut message =
            Message::new(Uuid::new_v4(), Uuid::new_v4(), "hi".into(), MessageType::Text, None);
        assert!(!message.is_edited());

        message.updated_at = message.created_at + chrono::Duration::seconds(5);
        assert!(message.is_edited());
    }
}
