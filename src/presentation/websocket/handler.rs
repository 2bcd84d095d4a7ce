//! WebSocket Connection Handler
//!
//! Authenticates the handshake, then runs one task per socket that reads
//! client frames and forwards gateway frames back out.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::interval;
use uuid::Uuid;

use super::events::{
    chat_room, user_room, ChatRoomPayload, ClientFrame, SendMessagePayload, ServerFrame,
    JOIN_CHAT, JOIN_USER, LEAVE_CHAT, MESSAGE_SEND,
};
use super::gateway::Gateway;
use super::session::SessionState;
use crate::application::services::{MessageService, TokenService};
use crate::infrastructure::metrics;
use crate::presentation::http::extractors::parse_id;
use crate::presentation::http::handlers::message::{
    create_message_dto, message_error, message_service,
};
use crate::presentation::middleware::{authenticate, bearer_token, AuthUser};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Handshake query string
#[derive(Debug, Default, Deserialize)]
pub struct GatewayQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler. The token is verified before upgrading.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
) -> Response {
    let user = match handshake_user(&state.tokens, query.token.as_deref(), &headers) {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(error = %e, "Gateway handshake rejected");
            return e.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let limits = &state.settings.websocket;
    ws.max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Token from `?token=`, falling back to the Authorization header
fn handshake_user(
    tokens: &TokenService,
    query_token: Option<&str>,
    headers: &HeaderMap,
) -> Result<AuthUser, AppError> {
    let token = query_token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(headers))
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    authenticate(tokens, token)
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, user: AuthUser) {
    let connection_id = Uuid::now_v7();
    let mut session = SessionState::new(connection_id, user.user_id);

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    state.gateway.register(connection_id, user.user_id, tx.clone());
    state.gateway.join(connection_id, &user_room(user.user_id));
    metrics::websocket_connected();

    // Forward queued frames to the socket
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    let heartbeat = Duration::from_secs(state.settings.websocket.heartbeat_interval_secs.max(1));
    let mut ticker = interval(heartbeat);
    ticker.tick().await;

    let service = message_service(&state);

    loop {
        tokio::select! {
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        session.touch();
                        if let Some(reply) =
                            handle_text(&state.gateway, &service, &session, text.as_str()).await
                        {
                            state.gateway.send_to(connection_id, &reply);
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        session.touch();
                        state.gateway.send_to(
                            connection_id,
                            &ServerFrame::error(None, "Frames must be JSON text", 400),
                        );
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %connection_id, "Connection closed");
                        break;
                    }
                    Some(Ok(_)) => session.touch(),
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                if !session.is_alive(heartbeat) {
                    tracing::info!(connection_id = %connection_id, "Heartbeat timeout, closing connection");
                    break;
                }
                if tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
            }
        }
    }

    state.gateway.remove_connection(connection_id);
    metrics::websocket_disconnected();
    writer.abort();

    tracing::info!(
        user_id = %user.user_id,
        connection_id = %connection_id,
        "User disconnected"
    );
}

/// Parse and run one client frame. Returns the reply to send back, if any.
async fn handle_text<S: MessageService>(
    gateway: &Gateway,
    service: &S,
    session: &SessionState,
    text: &str,
) -> Option<ServerFrame> {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(_) => return Some(ServerFrame::error(None, "Invalid frame", 400)),
    };
    let id = frame.id;

    match dispatch(gateway, service, session, frame).await {
        Ok(data) => id.map(|id| ServerFrame::ack(id, data)),
        Err(err) => {
            let (status, _) = err.status_and_code();
            Some(ServerFrame::error(id, &err.public_message(), status.as_u16()))
        }
    }
}

async fn dispatch<S: MessageService>(
    gateway: &Gateway,
    service: &S,
    session: &SessionState,
    frame: ClientFrame,
) -> Result<Value, AppError> {
    match frame.event.as_str() {
        JOIN_USER => {
            let room = user_room(session.user_id);
            gateway.join(session.connection_id, &room);
            Ok(json!({ "room": room }))
        }
        JOIN_CHAT => {
            let chat_id = chat_id_of(frame.data)?;
            service
                .ensure_member(session.user_id, chat_id)
                .await
                .map_err(message_error)?;

            let room = chat_room(chat_id);
            gateway.join(session.connection_id, &room);
            Ok(json!({ "room": room }))
        }
        LEAVE_CHAT => {
            let room = chat_room(chat_id_of(frame.data)?);
            gateway.leave(session.connection_id, &room);
            Ok(json!({ "room": room }))
        }
        MESSAGE_SEND => {
            let payload: SendMessagePayload = payload(frame.data)?;
            let chat_id = parse_id(&payload.chat_id, "chat ID")?;
            let request = create_message_dto(
                payload.content,
                payload.message_type.as_deref(),
                payload.file_id.as_deref(),
            )?;

            let delivered = service
                .create_message(session.user_id, chat_id, request)
                .await
                .map_err(message_error)?;

            gateway.broadcast_new_message(&delivered);
            metrics::record_message_sent("gateway");

            serde_json::to_value(&delivered.message).map_err(|e| AppError::Internal(e.to_string()))
        }
        other => Err(AppError::BadRequest(format!("Unknown event: {}", other))),
    }
}

fn payload<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, AppError> {
    serde_json::from_value(data).map_err(|e| AppError::BadRequest(format!("Invalid payload: {}", e)))
}

fn chat_id_of(data: Value) -> Result<Uuid, AppError> {
    let ChatRoomPayload { chat_id } = payload(data)?;
    parse_id(&chat_id, "chat ID")
}
