//! Message Handlers
//!
//! REST access to chat messages. Writes are also pushed to the gateway.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    CreateMessageRequest, MessageListQuery, UpdateMessageRequest,
};
use crate::application::dto::response::SuccessResponse;
use crate::application::services::{
    CreateMessageDto, MessageDto, MessageError, MessageQueryDto, MessageService,
    MessageServiceImpl,
};
use crate::domain::MessageType;
use crate::infrastructure::metrics;
use crate::infrastructure::repositories::{
    PgFileRepository, PgMembershipRepository, PgMessageRepository, PgUserRepository,
};
use crate::presentation::http::extractors::{parse_id, QueryParams, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

pub(crate) type PgMessageService = MessageServiceImpl<
    PgMessageRepository,
    PgMembershipRepository,
    PgFileRepository,
    PgUserRepository,
>;

pub(crate) fn message_service(state: &AppState) -> PgMessageService {
    MessageServiceImpl::new(
        Arc::new(PgMessageRepository::new(state.db.clone())),
        Arc::new(PgMembershipRepository::new(state.db.clone())),
        Arc::new(PgFileRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
    )
}

pub(crate) fn message_error(err: MessageError) -> AppError {
    match err {
        MessageError::NotMember => {
            AppError::Forbidden("You are not a member of this chat".into())
        }
        MessageError::NotFound => AppError::NotFound("Message not found".into()),
        MessageError::NotAuthor => {
            AppError::Forbidden("You can only modify your own messages".into())
        }
        MessageError::FileNotFound => AppError::NotFound("File not found".into()),
        e @ (MessageError::EmptyContent | MessageError::ContentTooLong) => {
            AppError::BadRequest(e.to_string())
        }
        MessageError::Internal(msg) => AppError::Internal(msg),
    }
}

/// Turn raw client input into a create request. Shared with the gateway.
pub(crate) fn create_message_dto(
    content: String,
    message_type: Option<&str>,
    file_id: Option<&str>,
) -> Result<CreateMessageDto, AppError> {
    let message_type = match message_type {
        Some(raw) => MessageType::parse(raw)
            .ok_or_else(|| AppError::BadRequest("Invalid message type".into()))?,
        None => MessageType::default(),
    };
    let file_id = file_id.map(|id| parse_id(id, "file ID")).transpose()?;

    Ok(CreateMessageDto {
        content,
        message_type,
        file_id,
    })
}

fn ids(chat_id: &str, message_id: &str) -> Result<(uuid::Uuid, uuid::Uuid), AppError> {
    Ok((parse_id(chat_id, "chat ID")?, parse_id(message_id, "message ID")?))
}

/// List messages oldest first
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    QueryParams(query): QueryParams<MessageListQuery>,
) -> Result<Json<Vec<MessageDto>>, AppError> {
    let chat_id = parse_id(&chat_id, "chat ID")?;
    let query = MessageQueryDto {
        limit: query.limit,
        offset: query.offset,
    };

    let messages = message_service(&state)
        .list_messages(auth.user_id, chat_id, query)
        .await
        .map_err(message_error)?;
    Ok(Json(messages))
}

/// Send a message
pub async fn create_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    ValidatedJson(body): ValidatedJson<CreateMessageRequest>,
) -> Result<(StatusCode, Json<MessageDto>), AppError> {
    let chat_id = parse_id(&chat_id, "chat ID")?;
    let request = create_message_dto(
        body.content,
        body.message_type.as_deref(),
        body.file_id.as_deref(),
    )?;

    let delivered = message_service(&state)
        .create_message(auth.user_id, chat_id, request)
        .await
        .map_err(message_error)?;

    state.gateway.broadcast_new_message(&delivered);
    metrics::record_message_sent("http");

    Ok((StatusCode::CREATED, Json(delivered.message)))
}

/// Get a single message
pub async fn get_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Result<Json<MessageDto>, AppError> {
    let (chat_id, message_id) = ids(&chat_id, &message_id)?;
    let message = message_service(&state)
        .get_message(auth.user_id, chat_id, message_id)
        .await
        .map_err(message_error)?;
    Ok(Json(message))
}

/// Edit a message
pub async fn update_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
    ValidatedJson(body): ValidatedJson<UpdateMessageRequest>,
) -> Result<Json<MessageDto>, AppError> {
    let (chat_id, message_id) = ids(&chat_id, &message_id)?;
    let message = message_service(&state)
        .update_message(auth.user_id, chat_id, message_id, &body.content)
        .await
        .map_err(message_error)?;

    state.gateway.broadcast_message_updated(&message);
    Ok(Json(message))
}

/// Delete a message
pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, AppError> {
    let (chat_id, message_id) = ids(&chat_id, &message_id)?;
    message_service(&state)
        .delete_message(auth.user_id, chat_id, message_id)
        .await
        .map_err(message_error)?;

    state.gateway.broadcast_message_deleted(chat_id, message_id);
    Ok(Json(SuccessResponse::ok()))
}

/// Mark the chat read up to now
pub async fn mark_message_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, AppError> {
    let (chat_id, message_id) = ids(&chat_id, &message_id)?;
    message_service(&state)
        .mark_as_read(auth.user_id, chat_id, message_id)
        .await
        .map_err(message_error)?;
    Ok(Json(SuccessResponse::ok()))
}

/// Newest message of the chat, `null` when empty
pub async fn last_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<Option<MessageDto>>, AppError> {
    let chat_id = parse_id(&chat_id, "chat ID")?;
    let message = message_service(&state)
        .last_message(auth.user_id, chat_id)
        .await
        .map_err(message_error)?;
    Ok(Json(message))
}
