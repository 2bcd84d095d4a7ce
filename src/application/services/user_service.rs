//! User Service
//!
//! Profile lookups, username search and availability checks.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::auth_service::normalize_email;
use crate::domain::{User, UserRepository};

/// Name shown for the caller's own entry in search results
pub const SELF_CHAT_LABEL: &str = "Saved Messages";

/// Upper bound on search results
const SEARCH_LIMIT: i64 = 20;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// The caller's own profile, including email
    async fn get_profile(&self, user_id: Uuid) -> Result<UserDto, UserError>;

    /// Another user's public profile
    async fn get_user(&self, user_id: Uuid) -> Result<PublicUserDto, UserError>;

    /// Users whose username contains `fragment`
    async fn search(&self, viewer_id: Uuid, fragment: &str)
        -> Result<Vec<PublicUserDto>, UserError>;

    async fn username_taken(&self, username: &str) -> Result<bool, UserError>;

    async fn email_taken(&self, email: &str) -> Result<bool, UserError>;

    /// Set the display name from first and last name
    async fn complete_registration(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserDto, UserError>;
}

/// Private profile data transfer object
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

/// Public profile, safe to show to any authenticated user
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserDto {
    pub id: Uuid,
    pub username: String,
    pub name: String,
}

impl From<User> for PublicUserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
        }
    }
}

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// UserService implementation
pub struct UserServiceImpl<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> UserServiceImpl<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    async fn load(&self, user_id: Uuid) -> Result<User, UserError> {
        self.user_repo
            .find_by_id(user_id)
            .await
            .map_err(|e| UserError::Internal(e.to_string()))?
            .ok_or(UserError::NotFound)
    }
}

#[async_trait]
impl<U> UserService for UserServiceImpl<U>
where
    U: UserRepository + 'static,
{
    async fn get_profile(&self, user_id: Uuid) -> Result<UserDto, UserError> {
        self.load(user_id).await.map(UserDto::from)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<PublicUserDto, UserError> {
        self.load(user_id).await.map(PublicUserDto::from)
    }

    async fn search(
        &self,
        viewer_id: Uuid,
        fragment: &str,
    ) -> Result<Vec<PublicUserDto>, UserError> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Ok(Vec::new());
        }

        let users = self
            .user_repo
            .search_by_username(fragment, SEARCH_LIMIT)
            .await
            .map_err(|e| UserError::Internal(e.to_string()))?;

        Ok(users
            .into_iter()
            .map(|user| {
                let is_self = user.id == viewer_id;
                let mut dto = PublicUserDto::from(user);
                if is_self {
                    dto.name = SELF_CHAT_LABEL.to_string();
                }
                dto
            })
            .collect())
    }

    async fn username_taken(&self, username: &str) -> Result<bool, UserError> {
        self.user_repo
            .username_exists(username.trim())
            .await
            .map_err(|e| UserError::Internal(e.to_string()))
    }

    async fn email_taken(&self, email: &str) -> Result<bool, UserError> {
        self.user_repo
            .email_exists(&normalize_email(email))
            .await
            .map_err(|e| UserError::Internal(e.to_string()))
    }

    async fn complete_registration(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserDto, UserError> {
        let name = format!("{} {}", first_name.trim(), last_name.trim());

        let updated = self
            .user_repo
            .update_name(user_id, &name)
            .await
            .map_err(|e| UserError::Internal(e.to_string()))?
            .ok_or(UserError::NotFound)?;

        tracing::info!(user_id = %user_id, "Registration completed");
        Ok(updated.into())
    }
}
