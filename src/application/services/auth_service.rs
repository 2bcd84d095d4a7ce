//! Authentication Service
//!
//! Handles signup, password login and refresh token rotation.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

use super::token_service::{TokenError, TokenService};
use crate::domain::{RefreshToken, RefreshTokenRepository, User, UserRepository};
use crate::shared::error::AppError;

/// Attempts at a short `user_NNNN` name before falling back to a longer one
const USERNAME_ATTEMPTS: usize = 16;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new account with a generated username
    async fn signup(&self, email: &str, password: &str, name: &str) -> Result<User, AuthError>;

    /// Authenticate with credentials and issue a token pair
    async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError>;

    /// Consume a refresh token and issue a new pair
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    /// Revoke a refresh token. Unknown tokens are ignored.
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;
}

/// Access token plus the raw refresh token handed to the client once
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Email already exists")]
    EmailExists,

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// Lowercased, trimmed form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// AuthService implementation
pub struct AuthServiceImpl<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<R>,
    tokens: Arc<TokenService>,
}

impl<U, R> AuthServiceImpl<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    pub fn new(user_repo: Arc<U>, token_repo: Arc<R>, tokens: Arc<TokenService>) -> Self {
        Self {
            user_repo,
            token_repo,
            tokens,
        }
    }

    /// Hash a password using Argon2id
    fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its hash
    fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    fn short_username() -> String {
        format!("user_{}", rand::rng().random_range(0..10000))
    }

    fn long_username() -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("user_{}", &id[..8])
    }

    /// Pick a username nobody holds yet.
    async fn generate_username(&self) -> Result<String, AuthError> {
        for _ in 0..USERNAME_ATTEMPTS {
            let candidate = Self::short_username();
            if !self.username_taken(&candidate).await? {
                return Ok(candidate);
            }
        }

        loop {
            let candidate = Self::long_username();
            if !self.username_taken(&candidate).await? {
                return Ok(candidate);
            }
        }
    }

    async fn username_taken(&self, username: &str) -> Result<bool, AuthError> {
        self.user_repo
            .username_exists(username)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Sign an access token and persist a new refresh token for `user`.
    async fn issue_tokens(&self, user: &User) -> Result<AuthTokens, AuthError> {
        let access_token = self.tokens.issue_access_token(user)?;
        let refresh_token = TokenService::generate_refresh_token();

        let record = RefreshToken::new(
            user.id,
            TokenService::hash_refresh_token(&refresh_token),
            self.tokens.refresh_token_expiry(),
        );
        self.token_repo
            .create(&record)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(AuthTokens {
            user_id: user.id,
            access_token,
            refresh_token,
            expires_in: self.tokens.access_token_ttl_secs(),
            refresh_expires_in: self.tokens.refresh_token_ttl_secs(),
        })
    }
}

#[async_trait]
impl<U, R> AuthService for AuthServiceImpl<U, R>
where
    U: UserRepository + 'static,
    R: RefreshTokenRepository + 'static,
{
    async fn signup(&self, email: &str, password: &str, name: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);

        if self
            .user_repo
            .email_exists(&email)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
        {
            return Err(AuthError::EmailExists);
        }

        let username = self.generate_username().await?;
        let password_hash = Self::hash_password(password)?;
        let user = User::new(email, username, name.trim().to_string(), password_hash);

        let created = self.user_repo.create(&user).await.map_err(|e| match e {
            AppError::Conflict(msg) => AuthError::Conflict(msg),
            e => AuthError::Internal(e.to_string()),
        })?;

        tracing::info!(user_id = %created.id, username = %created.username, "User signed up");
        Ok(created)
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        if let Err(e) = self.token_repo.delete_expired_for_user(user.id).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to prune expired refresh tokens");
        }

        let tokens = self.issue_tokens(&user).await?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(tokens)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let token_hash = TokenService::hash_refresh_token(refresh_token);

        let stored = self
            .token_repo
            .find_by_hash(&token_hash)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::TokenExpired)?;

        // Single use: whoever deletes the row owns the rotation
        let consumed = self
            .token_repo
            .delete(stored.id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !consumed || stored.is_expired() {
            return Err(AuthError::TokenExpired);
        }

        let user = self
            .user_repo
            .find_by_id(stored.user_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        let tokens = self.issue_tokens(&user).await?;
        tracing::debug!(user_id = %user.id, "Refresh token rotated");
        Ok(tokens)
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let token_hash = TokenService::hash_refresh_token(refresh_token);

        let stored = self
            .token_repo
            .find_by_hash(&token_hash)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if let Some(stored) = stored {
            self.token_repo
                .delete(stored.id)
                .await
                .map_err(|e| AuthError::Internal(e.to_string()))?;
            tracing::info!(user_id = %stored.user_id, "Refresh token revoked");
        }

        Ok(())
    }
}
