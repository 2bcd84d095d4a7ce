//! Request DTOs
//!
//! Data structures for API request bodies. Identifiers and enum values
//! arrive as strings and are parsed in the handlers so that malformed
//! values produce a 400 with a specific message.

use serde::Deserialize;
use validator::Validate;

use crate::domain::MAX_MESSAGE_LENGTH;

/// `validator` length bounds are `u64`; same value as `MAX_MESSAGE_LENGTH`.
const MAX_MESSAGE_LENGTH_U64: u64 = MAX_MESSAGE_LENGTH as u64;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 20, message = "Password must be 8-20 characters"))]
    pub password: String,

    #[validate(length(min = 2, max = 50, message = "Name must be 2-50 characters"))]
    pub name: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub device_type: String,
}

/// Body of refresh and logout; the token itself travels in a cookie or header
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest {
    #[serde(default)]
    pub device_type: Option<String>,
}

/// Email availability check
#[derive(Debug, Deserialize, Validate)]
pub struct CheckEmailRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Complete registration request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRegistrationRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: String,
}

/// Create group chat request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[serde(default)]
    pub participant_ids: Vec<String>,
}

/// Rename chat request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateChatRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

/// Add participant request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantRequest {
    pub user_id: String,
}

/// Update participant role request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Private chat lookup request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PrivateChatRequest {
    pub user_id: String,
}

/// Create message request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    #[serde(default)]
    #[validate(length(max = MAX_MESSAGE_LENGTH_U64, message = "Message is too long"))]
    pub content: String,

    #[serde(rename = "type")]
    pub message_type: Option<String>,

    pub file_id: Option<String>,
}

/// Edit message request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMessageRequest {
    #[validate(length(min = 1, max = MAX_MESSAGE_LENGTH_U64, message = "Message must be 1-4000 characters"))]
    pub content: String,
}

/// Pagination for message listing (query string)
#[derive(Debug, Default, Deserialize)]
pub struct MessageListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("ada@example.com", "secret12", "Ada", true ; "valid")]
    #[test_case("not-an-email", "secret12", "Ada", false ; "bad email")]
    #[test_case("ada@example.com", "short", "Ada", false ; "short password")]
    #[test_case("ada@example.com", "a-very-long-password-123", "Ada", false ; "long password")]
    #[test_case("ada@example.com", "secret12", "A", false ; "short name")]
    fn test_signup_validation(email: &str, password: &str, name: &str, ok: bool) {
        let req = SignupRequest {
            email: email.into(),
            password: password.into(),
            name: name.into(),
        };
        assert_eq!(req.validate().is_ok(), ok);
    }

    #[test]
    fn test_login_uses_camel_case() {
        let req: LoginRequest = serde_json::from_str(
            r#"{"email":"ada@example.com","password":"x","deviceType":"MOBILE"}"#,
        )
        .unwrap();
        assert_eq!(req.device_type, "MOBILE");
    }

    #[test]
    fn test_create_message_defaults() {
        let req: CreateMessageRequest = serde_json::from_str(r#"{"fileId":"abc"}"#).unwrap();
        assert_eq!(req.content, "");
        assert_eq!(req.message_type, None);
        assert_eq!(req.file_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_message_length_limit() {
        let req = UpdateMessageRequest {
            content: "x".repeat(MAX_MESSAGE_LENGTH + 1),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_chat_without_participants() {
        let req: CreateChatRequest = serde_json::from_str(r#"{"name":"Team"}"#).unwrap();
        assert!(req.participant_ids.is_empty());
        assert!(req.validate().is_ok());
    }
}
