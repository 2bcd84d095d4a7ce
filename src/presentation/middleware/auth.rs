//! Authentication Middleware
//!
//! Bearer token validation for protected routes, and the `AuthUser`
//! extractor handlers use to read the caller.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::application::services::{Claims, TokenError, TokenService};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated caller, taken from the access token claims
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
}

impl TryFrom<Claims> for AuthUser {
    type Error = TokenError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: claims.user_id()?,
            email: claims.email,
            name: claims.name,
        })
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Unauthorized("Token expired".into()),
            TokenError::Invalid => AppError::Unauthorized("Invalid token".into()),
            TokenError::Signing(msg) => AppError::Internal(msg),
        }
    }
}

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verify an access token and build the caller from its claims.
pub fn authenticate(tokens: &TokenService, token: &str) -> Result<AuthUser, AppError> {
    let claims = tokens.verify_access_token(token)?;
    Ok(AuthUser::try_from(claims)?)
}

/// Authentication middleware that validates the bearer token
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let user = authenticate(&state.tokens, token)?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use crate::domain::User;
    use axum::http::HeaderValue;
    use test_case::test_case;

    #[test_case("Bearer abc", Some("abc"))]
    #[test_case("Bearer   ", None)]
    #[test_case("Basic abc", None)]
    fn test_bearer_token(value: &str, expected: Option<&str>) {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        assert_eq!(bearer_token(&headers), expected);
    }

    #[test]
    fn test_authenticate_round_trips_claims() {
        let tokens = TokenService::new(&test_settings().jwt);
        let user = User::new(
            "ada@example.com".into(),
            "user_1".into(),
            "Ada".into(),
            "hash".into(),
        );
        let token = tokens.issue_access_token(&user).unwrap();

        let caller = authenticate(&tokens, &token).unwrap();
        assert_eq!(caller.user_id, user.id);
        assert_eq!(caller.email, "ada@example.com");
        assert_eq!(caller.name, "Ada");
    }

    #[test]
    fn test_garbage_token_is_unauthorized() {
        let tokens = TokenService::new(&test_settings().jwt);
        let result = authenticate(&tokens, "not.a.jwt");
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
