//! User API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestApp;

#[tokio::test]
async fn test_me_requires_token() {
    let app = TestApp::new();

    let response = app.server.get("/users/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_rejects_garbage_token() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/users/me")
        .authorization_bearer("not-a-jwt")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["message"], "Invalid token");
}

#[tokio::test]
async fn test_public_profile_with_malformed_id() {
    let app = TestApp::new();

    let response = app.server.get("/users/not-a-uuid").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Invalid user ID format");
}

#[tokio::test]
async fn test_check_email_validates_body() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/users/check-email")
        .json(&json!({"email": "nope"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_complete_registration_validates_names() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .post("/users/complete-registration")
        .authorization_bearer(token)
        .json(&json!({"firstName": "", "lastName": "Lovelace"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
