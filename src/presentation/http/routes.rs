//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{
    auth_middleware, create_security_headers_layer, logging, rate_limit_auth,
    rate_limit_websocket,
};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    let is_production = state.settings.is_production();

    Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/chats", chat_routes(state.clone()))
        .nest("/files", file_routes(state.clone()))
        // WebSocket gateway endpoint with rate limiting
        .merge(gateway_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(logging::track_metrics))
        // Outermost so headers land on every response
        .layer(create_security_headers_layer(is_production))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// Authentication routes (public, rate limited)
fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::auth::signup))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_auth))
}

/// User routes; lookups and availability checks are public
fn user_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(handlers::user::get_current_user))
        .route("/search/{username}", get(handlers::user::search_users))
        .route(
            "/complete-registration",
            post(handlers::user::complete_registration),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/{id}", get(handlers::user::get_user))
        .route(
            "/check-username/{username}",
            get(handlers::user::check_username),
        )
        .route("/check-email", post(handlers::user::check_email))
        .merge(protected)
}

/// Chat, participant and message routes (protected)
fn chat_routes(state: AppState) -> Router<AppState> {
    use handlers::{chat, message};

    Router::new()
        .route("/", post(chat::create_chat))
        .route("/user-chats", get(chat::get_user_chats))
        .route("/private", post(chat::get_or_create_private_chat))
        .route(
            "/{chat_id}",
            get(chat::get_chat)
                .patch(chat::update_chat)
                .delete(chat::delete_chat),
        )
        .route("/{chat_id}/read", post(chat::mark_chat_read))
        .route("/{chat_id}/participants", post(chat::add_participant))
        .route(
            "/{chat_id}/participants/{user_id}",
            delete(chat::remove_participant),
        )
        .route(
            "/{chat_id}/participants/{user_id}/role",
            patch(chat::update_participant_role),
        )
        .route(
            "/{chat_id}/messages",
            get(message::list_messages).post(message::create_message),
        )
        .route("/{chat_id}/messages/last", get(message::last_message))
        .route(
            "/{chat_id}/messages/{message_id}",
            get(message::get_message)
                .patch(message::update_message)
                .delete(message::delete_message),
        )
        .route(
            "/{chat_id}/messages/{message_id}/read",
            post(message::mark_message_read),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// File routes (protected)
fn file_routes(state: AppState) -> Router<AppState> {
    let upload_limit = state.settings.storage.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route(
            "/upload",
            post(handlers::file::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/{file_id}", get(handlers::file::get_file))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Socket gateway; the token is checked by the handler before upgrading
fn gateway_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/gateway", get(ws_handler))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_websocket))
}
