//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Represents a user account in the chat system.
///
/// Maps to the `users` table:
/// - id: UUID PRIMARY KEY
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - username: VARCHAR(50) NOT NULL UNIQUE
/// - name: VARCHAR(100) NOT NULL
/// - password_hash: VARCHAR(255) NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    /// Email address (unique)
    pub email: String,

    /// Username (unique, generated at signup)
    pub username: String,

    /// Display name
    pub name: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new user with a fresh id and timestamps.
    pub fn new(email: String, username: String, name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email,
            username,
            name,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for User data access operations.
///
/// Implementations of this trait handle the actual database interactions.
/// The trait is defined in the domain layer to maintain dependency inversion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Find a user by their email address (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Load every user whose id is in `ids`. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError>;

    /// Users whose username contains `fragment`, ordered by username.
    async fn search_by_username(&self, fragment: &str, limit: i64)
        -> Result<Vec<User>, AppError>;

    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Update the display name, returning the updated row.
    async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<User>, AppError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    async fn username_exists(&self, username: &str) -> Result<bool, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_matching_timestamps() {
        let user = User::new(
            "ada@example.com".into(),
            "user_42".into(),
            "Ada".into(),
            "hash".into(),
        );
        assert_eq!(user.created_at, user.updated_at);
        assert_eq!(user.id.get_version_num(), 7);
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User::new(
            "ada@example.com".into(),
            "user_42".into(),
            "Ada".into(),
            "$argon2id$secret".into(),
        );
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
    }
}
