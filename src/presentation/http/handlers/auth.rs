//! Authentication Handlers

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::application::dto::request::{DeviceRequest, LoginRequest, SignupRequest};
use crate::application::dto::response::{AccessTokenResponse, MessageResponse};
use crate::application::services::{AuthError, AuthService, AuthServiceImpl, AuthTokens};
use crate::domain::DeviceType;
use crate::infrastructure::repositories::{PgRefreshTokenRepository, PgUserRepository};
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::bearer_token;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Cookie carrying the refresh token for browser clients
pub const REFRESH_COOKIE: &str = "refresh_token";

fn auth_service(state: &AppState) -> AuthServiceImpl<PgUserRepository, PgRefreshTokenRepository> {
    AuthServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgRefreshTokenRepository::new(state.db.clone())),
        state.tokens.clone(),
    )
}

fn auth_error(err: AuthError) -> AppError {
    match err {
        AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
        AuthError::TokenExpired => AppError::Unauthorized("Token expired".into()),
        AuthError::UserNotFound => AppError::Unauthorized("User not found".into()),
        AuthError::EmailExists => AppError::Conflict("Email already exists".into()),
        AuthError::Conflict(msg) => AppError::Conflict(msg),
        AuthError::Internal(msg) => AppError::Internal(msg),
    }
}

fn parse_device(raw: Option<&str>) -> Result<DeviceType, AppError> {
    raw.and_then(DeviceType::parse)
        .ok_or_else(|| AppError::BadRequest("Invalid device type".into()))
}

/// HTTP-only refresh cookie. Cross-site in production, so it must be
/// `Secure; SameSite=None` there.
fn refresh_cookie(token: String, max_age_secs: i64, production: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .secure(production)
        .same_site(if production {
            SameSite::None
        } else {
            SameSite::Lax
        })
        .build()
}

/// Hand a fresh pair to the client: cookie for WEB, body for MOBILE.
fn deliver(
    state: &AppState,
    jar: CookieJar,
    device: DeviceType,
    tokens: AuthTokens,
) -> (CookieJar, Json<AccessTokenResponse>) {
    match device {
        DeviceType::Web => {
            let cookie = refresh_cookie(
                tokens.refresh_token.clone(),
                tokens.refresh_expires_in,
                state.settings.is_production(),
            );
            (jar.add(cookie), Json(AccessTokenResponse::web(&tokens)))
        }
        DeviceType::Mobile => (jar, Json(AccessTokenResponse::mobile(&tokens))),
    }
}

/// Read the presented refresh token: cookie for WEB, Bearer header for MOBILE.
fn presented_refresh_token(
    jar: &CookieJar,
    headers: &HeaderMap,
    device: DeviceType,
) -> Option<String> {
    match device {
        DeviceType::Web => jar
            .get(REFRESH_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty()),
        DeviceType::Mobile => bearer_token(headers).map(str::to_owned),
    }
}

/// Create an account
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    auth_service(&state)
        .signup(&body.email, &body.password, body.name.trim())
        .await
        .map_err(auth_error)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User created successfully")),
    ))
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<AccessTokenResponse>), AppError> {
    let device = parse_device(Some(&body.device_type))?;

    let tokens = auth_service(&state)
        .login(&body.email, &body.password)
        .await
        .map_err(auth_error)?;

    tracing::info!(user_id = %tokens.user_id, device = %device.as_str(), "User logged in");
    Ok(deliver(&state, jar, device, tokens))
}

/// Rotate the refresh token and issue a new access token
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<DeviceRequest>,
) -> Result<(CookieJar, Json<AccessTokenResponse>), AppError> {
    let device = parse_device(body.device_type.as_deref())?;
    let token = presented_refresh_token(&jar, &headers, device)
        .ok_or_else(|| AppError::BadRequest("Refresh token is required".into()))?;

    let tokens = auth_service(&state)
        .refresh(&token)
        .await
        .map_err(auth_error)?;

    Ok(deliver(&state, jar, device, tokens))
}

/// Revoke the refresh token and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<DeviceRequest>,
) -> Result<(CookieJar, StatusCode), AppError> {
    let device = parse_device(body.device_type.as_deref())?;

    if let Some(token) = presented_refresh_token(&jar, &headers, device) {
        auth_service(&state)
            .logout(&token)
            .await
            .map_err(auth_error)?;
    }

    let jar = jar.remove(Cookie::build(REFRESH_COOKIE).path("/"));
    Ok((jar, StatusCode::NO_CONTENT))
}
