//! Response DTOs
//!
//! Small envelopes for API responses. Entity shaped payloads live next to
//! their services.

use serde::Serialize;
use uuid::Uuid;

use crate::application::services::AuthTokens;

/// Plain message envelope
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{ "success": true }`
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Access token response; the refresh token is only included for mobile clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

impl AccessTokenResponse {
    pub fn web(tokens: &AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token.clone(),
            refresh_token: None,
            expires_in: tokens.expires_in,
        }
    }

    pub fn mobile(tokens: &AuthTokens) -> Self {
        Self {
            refresh_token: Some(tokens.refresh_token.clone()),
            ..Self::web(tokens)
        }
    }
}

/// Private chat lookup result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatIdResponse {
    pub chat_id: Uuid,
}
