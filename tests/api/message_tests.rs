//! Message API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestApp;

fn messages_path() -> String {
    format!("/chats/{}/messages", uuid::Uuid::new_v4())
}

#[tokio::test]
async fn test_messages_require_token() {
    let app = TestApp::new();

    app.server
        .get(&messages_path())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_message_with_malformed_id() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .get(&format!("{}/xyz", messages_path()))
        .authorization_bearer(token)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Invalid message ID format");
}

#[tokio::test]
async fn test_create_rejects_oversized_content() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .post(&messages_path())
        .authorization_bearer(token)
        .json(&json!({"content": "x".repeat(4001)}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_rejects_unknown_type() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .post(&messages_path())
        .authorization_bearer(token)
        .json(&json!({"content": "hi", "type": "STICKER"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Invalid message type");
}

#[tokio::test]
async fn test_update_rejects_empty_content() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .patch(&format!("{}/{}", messages_path(), uuid::Uuid::new_v4()))
        .authorization_bearer(token)
        .json(&json!({"content": ""}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_rejects_non_numeric_limit() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .get(&messages_path())
        .add_query_param("limit", "lots")
        .authorization_bearer(token)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
