//! Chat entity and repository trait.
//!
//! Maps to the `chats` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::membership::Membership;
use super::message::Message;
use crate::shared::error::AppError;

/// Name shown for group chats that were created without one.
pub const DEFAULT_GROUP_CHAT_NAME: &str = "Group Chat";

/// Chat type enum matching database VARCHAR constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatType {
    /// Two-party direct conversation
    Private,
    #[default]
    Group,
}

impl ChatType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PRIVATE" => Self::Private,
            _ => Self::Group,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "PRIVATE",
            Self::Group => "GROUP",
        }
    }
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A conversation container.
///
/// Maps to the `chats` table:
/// - id: UUID PRIMARY KEY
/// - name: VARCHAR(100) NULL
/// - chat_type: VARCHAR(10) NOT NULL CHECK (chat_type IN ('PRIVATE', 'GROUP'))
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,

    /// Stored name; private chats usually have none
    pub name: Option<String>,

    pub chat_type: ChatType,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(name: Option<String>, chat_type: ChatType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name,
            chat_type,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_private(&self) -> bool {
        self.chat_type == ChatType::Private
    }

    /// Name to show a viewer: the stored name, then the other participant's
    /// name for private chats, then the generic group label.
    pub fn display_name(&self, peer_name: Option<&str>) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        match (self.chat_type, peer_name) {
            (ChatType::Private, Some(peer)) => peer.to_string(),
            _ => DEFAULT_GROUP_CHAT_NAME.to_string(),
        }
    }
}

/// One row of a user's chat list.
#[derive(Debug, Clone)]
pub struct ChatOverview {
    pub chat: Chat,

    /// Newest message in the chat, if any
    pub last_message: Option<Message>,

    /// Messages from others newer than the viewer's read marker
    pub unread_count: i64,

    /// Name of the first other participant
    pub peer_name: Option<String>,
}

/// Repository trait for Chat data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Chat>, AppError>;

    /// Insert a chat together with its memberships in one transaction.
    async fn create_with_members(
        &self,
        chat: &Chat,
        members: &[Membership],
    ) -> Result<Chat, AppError>;

    /// Return the private chat between exactly `user_a` and `user_b`,
    /// inserting `candidate` with both memberships when none exists.
    ///
    /// The boolean is true when a new chat was created.
    async fn find_or_create_private(
        &self,
        user_a: Uuid,
        user_b: Uuid,
        candidate: &Chat,
    ) -> Result<(Chat, bool), AppError>;

    async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<Chat>, AppError>;

    /// Delete a chat. Memberships and messages cascade.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// The chats `user_id` belongs to, most recently active first.
    async fn find_overviews_for_user(&self, user_id: Uuid) -> Result<Vec<ChatOverview>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    // ==========================================================================
    // ChatType Tests
    // ==========================================================================

    #[test_case("PRIVATE", ChatType::Private)]
    #[test_case("private", ChatType::Private)]
    #[test_case("GROUP", ChatType::Group)]
    #[test_case("garbage", ChatType::Group)]
    fn test_chat_type_from_str(input: &str, expected: ChatType) {
        assert_eq!(ChatType::from_str(input), expected);
    }

    #[test]
    fn test_chat_type_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&ChatType::Private).unwrap(), "\"PRIVATE\"");
        assert_eq!(ChatType::Group.to_string(), "GROUP");
    }

    // ==========================================================================
    // Display Name Tests
    // ==========================================================================

    #[test]
    fn test_display_name_prefers_stored_name() {
        let chat = Chat::new(Some("Team".into()), ChatType::Group);
        assert_eq!(chat.display_name(Some("Bob")), "Team");
    }

    #[test]
    fn test_private_chat_uses_peer_name() {
        let chat = Chat::new(None, ChatType::Private);
        assert_eq!(chat.display_name(Some("Bob")), "Bob");
    }

    #[test]
    fn test_unnamed_group_falls_back_to_label() {
        let chat = Chat::new(Some("   ".into()), ChatType::Group);
        assert_eq!(chat.display_name(Some("Bob")), DEFAULT_GROUP_CHAT_NAME);

        let private_without_peer = Chat::new(None, ChatType::Private);
        assert_eq!(private_without_peer.display_name(None), DEFAULT_GROUP_CHAT_NAME);
    }
}
