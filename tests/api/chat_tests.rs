//! Chat API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestApp;

#[tokio::test]
async fn test_chat_routes_require_token() {
    let app = TestApp::new();

    app.server
        .get("/chats/user-chats")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .post("/chats/private")
        .json(&json!({"userId": uuid::Uuid::new_v4()}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_chat_with_malformed_id() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .get("/chats/12345")
        .authorization_bearer(token)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Invalid chat ID format");
}

#[tokio::test]
async fn test_create_chat_with_malformed_participant() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .post("/chats")
        .authorization_bearer(token)
        .json(&json!({"name": "Team", "participantIds": ["not-a-uuid"]}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Invalid user ID format");
}

#[tokio::test]
async fn test_rename_validates_length() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .patch(&format!("/chats/{}", uuid::Uuid::new_v4()))
        .authorization_bearer(token)
        .json(&json!({"name": "x".repeat(101)}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_role_update_rejects_unknown_role() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .patch(&format!(
            "/chats/{}/participants/{}/role",
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4()
        ))
        .authorization_bearer(token)
        .json(&json!({"role": "OWNER"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Invalid role");
}
