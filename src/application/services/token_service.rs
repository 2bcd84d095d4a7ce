//! Token Service
//!
//! Signs and verifies JWT access tokens and mints opaque refresh tokens.
//! Shared by the auth service, the HTTP auth middleware and the gateway
//! handshake.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::domain::User;

/// Number of random bytes in a refresh token
const REFRESH_TOKEN_BYTES: usize = 32;

/// JWT claims of an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub name: String,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// The user id carried in `sub`.
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Invalid)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Issues and checks tokens with the configured secret and lifetimes.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            access_ttl: Duration::minutes(settings.access_token_expiry_minutes),
            refresh_ttl: Duration::days(settings.refresh_token_expiry_days),
        }
    }

    /// Sign an access token for `user`.
    pub fn issue_access_token(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Decode and validate an access token (signature and expiry).
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// A fresh opaque refresh token: random bytes, base64url without padding.
    pub fn generate_refresh_token() -> String {
        let bytes: [u8; REFRESH_TOKEN_BYTES] = rand::random();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Hex SHA-256 of a refresh token; only this is persisted.
    pub fn hash_refresh_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn refresh_token_expiry(&self) -> DateTime<Utc> {
        Utc::now() + self.refresh_ttl
    }

    pub fn access_token_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn refresh_token_ttl_secs(&self) -> i64 {
        self.refresh_ttl.num_seconds()
    }
}
