//! Rate Limiting Middleware
//!
//! Redis-based sliding window rate limiting for the authentication
//! endpoints and the gateway handshake. Without Redis, or when Redis
//! fails, requests are let through.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use redis::aio::ConnectionManager;
use serde::Serialize;

use crate::config::RateLimitSettings;
use crate::infrastructure::cache::keys;
use crate::shared::error::ErrorResponse;
use crate::startup::AppState;

/// Limit applied to one class of endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_seconds: u64,
}

/// Endpoint classes with separate budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointType {
    /// signup, login, refresh, logout
    Auth,
    /// Gateway connection establishment
    WebSocket,
}

impl EndpointType {
    pub fn config(&self, settings: &RateLimitSettings) -> RateLimitConfig {
        let requests_per_window = match self {
            EndpointType::Auth => settings.auth_requests_per_window,
            EndpointType::WebSocket => settings.websocket_requests_per_window,
        };
        RateLimitConfig {
            requests_per_window,
            window_seconds: settings.window_seconds,
        }
    }

    fn key_name(&self) -> &'static str {
        match self {
            EndpointType::Auth => "auth",
            EndpointType::WebSocket => "ws",
        }
    }
}

/// Rate limit status returned to clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    /// Maximum requests allowed in the current window
    pub limit: u32,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Unix timestamp when the window resets
    pub reset_at: i64,
    /// Seconds until a retry can succeed
    pub retry_after: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitExceededResponse {
    #[serde(flatten)]
    error: ErrorResponse,
    rate_limit: RateLimitInfo,
}

/// Sliding window over a Redis sorted set: members are request ids,
/// scores are millisecond timestamps.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_start = tonumber(ARGV[2])
local max_requests = tonumber(ARGV[3])
local window_seconds = tonumber(ARGV[4])

redis.call('ZREMRANGEBYSCORE', key, '-inf', window_start)
local current_count = redis.call('ZCARD', key)

if current_count < max_requests then
    local member = now_ms .. ':' .. math.random(1000000)
    redis.call('ZADD', key, now_ms, member)
    redis.call('EXPIRE', key, window_seconds + 1)
    return {1, current_count + 1}
else
    local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
    local retry_after = 0
    if oldest and #oldest >= 2 then
        retry_after = oldest[2] + (window_seconds * 1000) - now_ms
    end
    return {0, current_count, retry_after}
end
"#;

/// Redis-backed sliding window rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    redis: ConnectionManager,
    config: RateLimitConfig,
    endpoint_type: EndpointType,
}

impl RateLimiter {
    pub fn new(redis: ConnectionManager, endpoint_type: EndpointType, config: RateLimitConfig) -> Self {
        Self {
            redis,
            config,
            endpoint_type,
        }
    }

    /// `Ok` when the request may proceed, `Err` when it is over the limit.
    /// Redis failures allow the request.
    pub async fn check(&self, identifier: &str) -> Result<RateLimitInfo, RateLimitInfo> {
        let key = keys::rate_limit(self.endpoint_type.key_name(), identifier);
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_ms = (self.config.window_seconds * 1000) as i64;

        let mut conn = self.redis.clone();
        let result: Result<Vec<i64>, _> = redis::Script::new(SLIDING_WINDOW_SCRIPT)
            .key(&key)
            .arg(now_ms)
            .arg(now_ms - window_ms)
            .arg(self.config.requests_per_window as i64)
            .arg(self.config.window_seconds as i64)
            .invoke_async(&mut conn)
            .await;

        match result {
            Ok(values) => evaluate(&values, self.config, now_ms),
            Err(e) => {
                tracing::error!(error = %e, "Rate limiter Redis error");
                Ok(RateLimitInfo {
                    limit: self.config.requests_per_window,
                    remaining: self.config.requests_per_window,
                    reset_at: now_ms / 1000 + self.config.window_seconds as i64,
                    retry_after: 0,
                })
            }
        }
    }
}

/// Interpret the script reply `{allowed, count, retry_after_ms?}`.
fn evaluate(
    values: &[i64],
    config: RateLimitConfig,
    now_ms: i64,
) -> Result<RateLimitInfo, RateLimitInfo> {
    let allowed = values.first().copied().unwrap_or(1) == 1;
    let count = values.get(1).copied().unwrap_or(0).max(0) as u32;
    let retry_ms = values.get(2).copied().unwrap_or(0).max(0);

    let info = RateLimitInfo {
        limit: config.requests_per_window,
        remaining: config.requests_per_window.saturating_sub(count),
        reset_at: now_ms / 1000 + config.window_seconds as i64,
        retry_after: if allowed {
            0
        } else {
            ((retry_ms as f64) / 1000.0).ceil() as u64
        },
    };

    if allowed {
        Ok(info)
    } else {
        Err(info)
    }
}

/// Client identifier: first X-Forwarded-For hop, then X-Real-IP, then the
/// socket address.
fn extract_identifier(request: &Request, client_ip: Option<IpAddr>) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| ip.parse::<IpAddr>().is_ok());
    if let Some(ip) = forwarded {
        return format!("ip:{}", ip);
    }

    let real_ip = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| ip.parse::<IpAddr>().is_ok());
    if let Some(ip) = real_ip {
        return format!("ip:{}", ip);
    }

    match client_ip {
        Some(ip) => format!("ip:{}", ip),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

/// Rate limiting middleware for authentication endpoints.
pub async fn rate_limit_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    rate_limit_inner(state, request, next, EndpointType::Auth).await
}

/// Rate limiting middleware for gateway handshakes.
pub async fn rate_limit_websocket(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    rate_limit_inner(state, request, next, EndpointType::WebSocket).await
}

async fn rate_limit_inner(
    state: AppState,
    request: Request,
    next: Next,
    endpoint_type: EndpointType,
) -> Response {
    let Some(redis) = state.redis.clone() else {
        return next.run(request).await;
    };

    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let identifier = extract_identifier(&request, client_ip);
    let config = endpoint_type.config(&state.settings.rate_limit);
    let limiter = RateLimiter::new(redis, endpoint_type, config);

    match limiter.check(&identifier).await {
        Ok(info) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut(), &info);
            response
        }
        Err(info) => {
            tracing::warn!(
                identifier = %identifier,
                endpoint_type = ?endpoint_type,
                "Rate limit exceeded"
            );
            create_rate_limit_response(info)
        }
    }
}

fn add_rate_limit_headers(headers: &mut header::HeaderMap, info: &RateLimitInfo) {
    if let Ok(v) = header::HeaderValue::from_str(&info.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", v);
    }
    if let Ok(v) = header::HeaderValue::from_str(&info.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", v);
    }
    if let Ok(v) = header::HeaderValue::from_str(&info.reset_at.to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }
}

/// 429 Too Many Requests with `Retry-After`.
fn create_rate_limit_response(info: RateLimitInfo) -> Response {
    let info = RateLimitInfo {
        remaining: 0,
        ..info
    };
    let body = RateLimitExceededResponse {
        error: ErrorResponse {
            code: 10006,
            message: "Too many requests, please slow down".to_string(),
            errors: None,
        },
        rate_limit: info.clone(),
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    if let Ok(v) = header::HeaderValue::from_str(&info.retry_after.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, v);
    }
    add_rate_limit_headers(response.headers_mut(), &info);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use pretty_assertions::assert_eq;

    const CONFIG: RateLimitConfig = RateLimitConfig {
        requests_per_window: 5,
        window_seconds: 60,
    };

    #[test]
    fn test_endpoint_budgets_come_from_settings() {
        let settings = RateLimitSettings {
            auth_requests_per_window: 7,
            websocket_requests_per_window: 11,
            window_seconds: 30,
        };
        assert_eq!(EndpointType::Auth.config(&settings).requests_per_window, 7);
        assert_eq!(EndpointType::WebSocket.config(&settings).requests_per_window, 11);
        assert_eq!(EndpointType::WebSocket.config(&settings).window_seconds, 30);
    }

    #[test]
    fn test_allowed_reply() {
        let info = evaluate(&[1, 2], CONFIG, 10_000).unwrap();
        assert_eq!(info.remaining, 3);
        assert_eq!(info.retry_after, 0);
        assert_eq!(info.reset_at, 70);
    }

    #[test]
    fn test_rejected_reply_rounds_retry_up() {
        let info = evaluate(&[0, 5, 1_200], CONFIG, 0).unwrap_err();
        assert_eq!(info.remaining, 0);
        assert_eq!(info.retry_after, 2);
    }

    #[test]
    fn test_identifier_prefers_forwarded_header() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        let ip = "10.1.1.1".parse().ok();
        assert_eq!(extract_identifier(&request, ip), "ip:203.0.113.7");
    }

    #[test]
    fn test_identifier_ignores_garbage_headers() {
        let request = Request::builder()
            .header("x-forwarded-for", "not-an-ip")
            .body(Body::empty())
            .unwrap();
        let ip = "10.1.1.1".parse().ok();
        assert_eq!(extract_identifier(&request, ip), "ip:10.1.1.1");
    }

    #[test]
    fn test_rate_limit_response_sets_retry_after() {
        let response = create_rate_limit_response(RateLimitInfo {
            limit: 5,
            remaining: 3,
            reset_at: 100,
            retry_after: 9,
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "9");
        assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");
    }
}
