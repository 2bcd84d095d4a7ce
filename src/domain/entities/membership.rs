//! Chat membership entity and repository trait.
//!
//! Maps to the `user_chats` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Role of a participant inside one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatRole {
    Admin,
    Moderator,
    #[default]
    Member,
}

impl ChatRole {
    /// Strict parse for client input; unknown roles are `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" => Some(Self::Admin),
            "MODERATOR" => Some(Self::Moderator),
            "MEMBER" => Some(Self::Member),
            _ => None,
        }
    }

    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "ADMIN" => Self::Admin,
            "MODERATOR" => Self::Moderator,
            _ => Self::Member,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Moderator => "MODERATOR",
            Self::Member => "MEMBER",
        }
    }

    /// Admins and moderators may manage participants.
    pub fn can_manage_members(&self) -> bool {
        matches!(self, Self::Admin | Self::Moderator)
    }
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's membership in a chat.
///
/// Maps to the `user_chats` table:
/// - user_id: UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// - chat_id: UUID NOT NULL REFERENCES chats(id) ON DELETE CASCADE
/// - role: VARCHAR(10) NOT NULL DEFAULT 'MEMBER'
/// - last_read_at: TIMESTAMPTZ NULL
/// - joined_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - PRIMARY KEY (user_id, chat_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: Uuid,

    pub chat_id: Uuid,

    pub role: ChatRole,

    /// Read marker; messages after it count as unread
    pub last_read_at: Option<DateTime<Utc>>,

    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: Uuid, chat_id: Uuid, role: ChatRole) -> Self {
        Self {
            user_id,
            chat_id,
            role,
            last_read_at: None,
            joined_at: Utc::now(),
        }
    }
}

/// A membership joined with the member's public profile.
#[derive(Debug, Clone)]
pub struct Participant {
    pub membership: Membership,
    pub username: String,
    pub name: String,
}

/// Repository trait for membership data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn find(&self, chat_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, AppError>;

    /// Members of a chat with their profiles, in join order.
    async fn find_participants(&self, chat_id: Uuid) -> Result<Vec<Participant>, AppError>;

    async fn member_ids(&self, chat_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Insert a membership. A duplicate yields `AppError::Conflict`.
    async fn add(&self, membership: &Membership) -> Result<Membership, AppError>;

    async fn remove(&self, chat_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    async fn update_role(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        role: ChatRole,
    ) -> Result<Option<Membership>, AppError>;

    /// Move the read marker. Returns false when the membership is gone.
    async fn mark_read(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}
