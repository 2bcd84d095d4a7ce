//! Chat Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    AddParticipantRequest, CreateChatRequest, PrivateChatRequest, UpdateChatRequest,
    UpdateRoleRequest,
};
use crate::application::dto::response::{ChatIdResponse, SuccessResponse};
use crate::application::services::{
    ChatDetailDto, ChatDto, ChatError, ChatListItemDto, ChatService, ChatServiceImpl,
    CreateChatDto, ParticipantDto,
};
use crate::domain::ChatRole;
use crate::infrastructure::repositories::{
    PgChatRepository, PgMembershipRepository, PgMessageRepository, PgUserRepository,
};
use crate::presentation::http::extractors::{parse_id, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::presentation::websocket::events::chat_room;
use crate::shared::error::AppError;
use crate::startup::AppState;

type PgChatService =
    ChatServiceImpl<PgChatRepository, PgMembershipRepository, PgMessageRepository, PgUserRepository>;

fn chat_service(state: &AppState) -> PgChatService {
    ChatServiceImpl::new(
        Arc::new(PgChatRepository::new(state.db.clone())),
        Arc::new(PgMembershipRepository::new(state.db.clone())),
        Arc::new(PgMessageRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
    )
}

pub(crate) fn chat_error(err: ChatError) -> AppError {
    match err {
        ChatError::NotFound => AppError::NotFound("Chat not found".into()),
        ChatError::UserNotFound => AppError::NotFound("User not found".into()),
        ChatError::ParticipantNotFound => AppError::NotFound("Participant not found".into()),
        ChatError::AlreadyParticipant => {
            AppError::Conflict("User is already a participant".into())
        }
        ChatError::InvalidRequest(msg) => AppError::BadRequest(msg),
        ChatError::Forbidden(msg) => AppError::Forbidden(msg),
        ChatError::Internal(msg) => AppError::Internal(msg),
    }
}

/// The caller's chats, most recently active first
pub async fn get_user_chats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ChatListItemDto>>, AppError> {
    let chats = chat_service(&state)
        .list_user_chats(auth.user_id)
        .await
        .map_err(chat_error)?;
    Ok(Json(chats))
}

/// Create a group chat
pub async fn create_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatDetailDto>), AppError> {
    let participant_ids = body
        .participant_ids
        .iter()
        .map(|id| parse_id(id, "user ID"))
        .collect::<Result<Vec<_>, _>>()?;

    let chat = chat_service(&state)
        .create_group_chat(
            auth.user_id,
            CreateChatDto {
                name: body.name,
                participant_ids,
            },
        )
        .await
        .map_err(chat_error)?;

    Ok((StatusCode::CREATED, Json(chat)))
}

/// Get a chat with participants and recent messages
pub async fn get_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatDetailDto>, AppError> {
    let chat_id = parse_id(&chat_id, "chat ID")?;
    let chat = chat_service(&state)
        .get_chat(auth.user_id, chat_id)
        .await
        .map_err(chat_error)?;
    Ok(Json(chat))
}

/// Rename a group chat
pub async fn update_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateChatRequest>,
) -> Result<Json<ChatDto>, AppError> {
    let chat_id = parse_id(&chat_id, "chat ID")?;
    let chat = chat_service(&state)
        .rename_chat(auth.user_id, chat_id, &body.name)
        .await
        .map_err(chat_error)?;
    Ok(Json(chat))
}

/// Delete a chat
pub async fn delete_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat ID")?;
    chat_service(&state)
        .delete_chat(auth.user_id, chat_id)
        .await
        .map_err(chat_error)?;
    state.gateway.close_room(&chat_room(chat_id));
    Ok(Json(SuccessResponse::ok()))
}

/// Add a member to a group chat
pub async fn add_participant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    ValidatedJson(body): ValidatedJson<AddParticipantRequest>,
) -> Result<(StatusCode, Json<ParticipantDto>), AppError> {
    let chat_id = parse_id(&chat_id, "chat ID")?;
    let user_id = parse_id(&body.user_id, "user ID")?;

    let participant = chat_service(&state)
        .add_participant(auth.user_id, chat_id, user_id)
        .await
        .map_err(chat_error)?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// Remove a member, or leave the chat
pub async fn remove_participant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, user_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat ID")?;
    let user_id = parse_id(&user_id, "user ID")?;

    chat_service(&state)
        .remove_participant(auth.user_id, chat_id, user_id)
        .await
        .map_err(chat_error)?;
    state.gateway.leave_user(user_id, &chat_room(chat_id));
    Ok(Json(SuccessResponse::ok()))
}

/// Change a member's role
pub async fn update_participant_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((chat_id, user_id)): Path<(String, String)>,
    ValidatedJson(body): ValidatedJson<UpdateRoleRequest>,
) -> Result<Json<ParticipantDto>, AppError> {
    let chat_id = parse_id(&chat_id, "chat ID")?;
    let user_id = parse_id(&user_id, "user ID")?;
    let role = ChatRole::parse(&body.role)
        .ok_or_else(|| AppError::BadRequest("Invalid role".into()))?;

    let participant = chat_service(&state)
        .update_participant_role(auth.user_id, chat_id, user_id, role)
        .await
        .map_err(chat_error)?;
    Ok(Json(participant))
}

/// Find or create the private chat with another user
pub async fn get_or_create_private_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<PrivateChatRequest>,
) -> Result<Json<ChatIdResponse>, AppError> {
    let other_user_id = parse_id(&body.user_id, "user ID")?;

    let chat_id = chat_service(&state)
        .get_or_create_private_chat(auth.user_id, other_user_id)
        .await
        .map_err(chat_error)?;
    Ok(Json(ChatIdResponse { chat_id }))
}

/// Mark every message in the chat as read
pub async fn mark_chat_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat ID")?;
    chat_service(&state)
        .mark_chat_read(auth.user_id, chat_id)
        .await
        .map_err(chat_error)?;
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use test_case::test_case;

    #[test_case(ChatError::NotFound, StatusCode::NOT_FOUND)]
    #[test_case(ChatError::AlreadyParticipant, StatusCode::CONFLICT)]
    #[test_case(ChatError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST)]
    #[test_case(ChatError::Forbidden("x".into()), StatusCode::FORBIDDEN)]
    fn test_chat_error_status(err: ChatError, expected: StatusCode) {
        assert_eq!(chat_error(err).into_response().status(), expected);
    }
}
