//! User Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::application::dto::request::{CheckEmailRequest, CompleteRegistrationRequest};
use crate::application::services::{
    PublicUserDto, UserDto, UserError, UserService, UserServiceImpl,
};
use crate::infrastructure::repositories::PgUserRepository;
use crate::presentation::http::extractors::{parse_id, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

fn user_service(state: &AppState) -> UserServiceImpl<PgUserRepository> {
    UserServiceImpl::new(Arc::new(PgUserRepository::new(state.db.clone())))
}

fn user_error(err: UserError) -> AppError {
    match err {
        UserError::NotFound => AppError::NotFound("User not found".into()),
        UserError::Internal(msg) => AppError::Internal(msg),
    }
}

/// Get the caller's profile
pub async fn get_current_user(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserDto>, AppError> {
    let profile = user_service(&state)
        .get_profile(auth.user_id)
        .await
        .map_err(user_error)?;
    Ok(Json(profile))
}

/// Search users by username fragment
pub async fn search_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> Result<Json<Vec<PublicUserDto>>, AppError> {
    let users = user_service(&state)
        .search(auth.user_id, &username)
        .await
        .map_err(user_error)?;
    Ok(Json(users))
}

/// Get a user's public profile
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicUserDto>, AppError> {
    let user_id = parse_id(&user_id, "user ID")?;
    let user = user_service(&state)
        .get_user(user_id)
        .await
        .map_err(user_error)?;
    Ok(Json(user))
}

/// `true` when the username is taken
pub async fn check_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<bool>, AppError> {
    let taken = user_service(&state)
        .username_taken(&username)
        .await
        .map_err(user_error)?;
    Ok(Json(taken))
}

/// `true` when the email is registered
pub async fn check_email(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CheckEmailRequest>,
) -> Result<Json<bool>, AppError> {
    let taken = user_service(&state)
        .email_taken(&body.email)
        .await
        .map_err(user_error)?;
    Ok(Json(taken))
}

/// Set the display name from first and last name
pub async fn complete_registration(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CompleteRegistrationRequest>,
) -> Result<Json<UserDto>, AppError> {
    let profile = user_service(&state)
        .complete_registration(auth.user_id, &body.first_name, &body.last_name)
        .await
        .map_err(user_error)?;
    Ok(Json(profile))
}
