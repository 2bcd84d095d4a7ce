//! Refresh token entity and repository trait.
//!
//! Maps to the `refresh_tokens` table. Only a SHA-256 hash of the opaque
//! token is stored; the raw value exists solely in the client's cookie or
//! response body.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// How the client receives its refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    /// Browser: HTTP-only cookie
    Web,
    /// Native app: JSON body, sent back as a Bearer header
    Mobile,
}

impl DeviceType {
    /// Parse the `deviceType` field sent by clients.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "WEB" => Some(Self::Web),
            "MOBILE" => Some(Self::Mobile),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "WEB",
            Self::Mobile => "MOBILE",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored refresh token.
///
/// Maps to the `refresh_tokens` table:
/// - id: UUID PRIMARY KEY
/// - token_hash: VARCHAR(64) NOT NULL UNIQUE (hex SHA-256)
/// - user_id: UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// - expires_at: TIMESTAMPTZ NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: Uuid,

    #[serde(skip_serializing)]
    pub token_hash: String,

    pub user_id: Uuid,

    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new(user_id: Uuid, token_hash: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            token_hash,
            user_id,
            expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Repository trait for refresh tokens.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(&self, token: &RefreshToken) -> Result<RefreshToken, AppError>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, AppError>;

    /// Delete a token. Returns false when it was already consumed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Drop a user's expired tokens; returns how many were removed.
    async fn delete_expired_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry() {
        let live = RefreshToken::new(Uuid::new_v4(), "h".into(), Utc::now() + Duration::days(7));
        assert!(!live.is_expired());

        let stale = RefreshToken::new(Uuid::new_v4(), "h".into(), Utc::now() - Duration::seconds(1));
        assert!(stale.is_expired());
    }

    #[test]
    fn test_device_type_parsing() {
        let web: DeviceType = serde_json::from_str("\"WEB\"").unwrap();
        assert_eq!(web, DeviceType::Web);
        assert!(serde_json::from_str::<DeviceType>("\"TABLET\"").is_err());
        assert_eq!(DeviceType::parse("mobile"), Some(DeviceType::Mobile));
        assert_eq!(DeviceType::parse("TABLET"), None);
    }
}
