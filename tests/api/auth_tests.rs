//! Authentication API Tests
//!
//! Requests that are rejected before reaching the database.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

use crate::common::{unique_email, TestApp};

#[test_case(json!({"email": "not-an-email", "password": "password123", "name": "Ada"}) ; "invalid email")]
#[test_case(json!({"email": "ada@example.com", "password": "short", "name": "Ada"}) ; "short password")]
#[test_case(json!({"email": "ada@example.com", "password": "a-password-well-over-twenty", "name": "Ada"}) ; "long password")]
#[test_case(json!({"email": "ada@example.com", "password": "password123", "name": "A"}) ; "short name")]
#[tokio::test]
async fn test_signup_rejects_invalid_body(body: Value) {
    let app = TestApp::new();

    let response = app.server.post("/auth/signup").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["errors"].is_array());
}

#[tokio::test]
async fn test_signup_requires_json() {
    let app = TestApp::new();

    let response = app.server.post("/auth/signup").text("email=x").await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_with_unknown_device_type_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/auth/login")
        .json(&json!({
            "email": unique_email(),
            "password": "password123",
            "deviceType": "TABLET"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Invalid device type");
}

#[tokio::test]
async fn test_refresh_without_device_type_fails() {
    let app = TestApp::new();

    let response = app.server.post("/auth/refresh").json(&json!({})).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Invalid device type");
}

#[tokio::test]
async fn test_web_refresh_without_cookie_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/auth/refresh")
        .json(&json!({"deviceType": "WEB"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Refresh token is required");
}

#[tokio::test]
async fn test_mobile_refresh_without_bearer_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/auth/refresh")
        .json(&json!({"deviceType": "MOBILE"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_without_token_is_a_no_op() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/auth/logout")
        .json(&json!({"deviceType": "WEB"}))
        .await;

    response.assert_status(StatusCode::NO_CONTENT);
}
