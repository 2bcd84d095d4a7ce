//! Gateway Handshake Tests

use axum::http::StatusCode;

use crate::common::TestApp;

#[tokio::test]
async fn test_handshake_without_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app.server.get("/gateway").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_handshake_with_invalid_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/gateway")
        .add_query_param("token", "garbage")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_without_upgrade_is_not_accepted() {
    let app = TestApp::new();
    let (_, token) = app.user();

    let response = app
        .server
        .get("/gateway")
        .add_query_param("token", token)
        .await;

    assert_ne!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert!(response.status_code().is_client_error());
}
