//! Fixed-window rate limiting backed by the Redis cache.
//!
//! Requests pass unlimited when the server runs without a cache. When the
//! cache is configured but unreachable, requests are refused.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::api::AppState;
use crate::config::{
    RATE_LIMIT_AUTH_REQUESTS, RATE_LIMIT_AUTH_WINDOW_SECONDS, RATE_LIMIT_REQUESTS,
    RATE_LIMIT_WINDOW_SECONDS,
};
use crate::infra::RateLimitStatus;

/// 429 with `Retry-After`
#[derive(Debug)]
pub struct RateLimitError {
    pub limit: u64,
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from(self.retry_after));
        headers.insert("X-RateLimit-Limit", HeaderValue::from(self.limit));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));

        let body = Json(json!({
            "error": {
                "code": "RATE_LIMITED",
                "message": "Too many requests. Please try again later.",
            }
        }));

        (StatusCode::TOO_MANY_REQUESTS, headers, body).into_response()
    }
}

/// First hop of X-Forwarded-For, then X-Real-IP, then the socket address.
fn client_identifier(request: &Request) -> String {
    let headers = request.headers();

    if let Some(ip) = headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    if let Some(ip) = headers.get("X-Real-IP").and_then(|h| h.to_str().ok()) {
        return ip.trim().to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Limits shared by one group of routes
#[derive(Debug, Clone, Copy)]
struct Window {
    scope: &'static str,
    max_requests: u64,
    seconds: u64,
}

const GENERAL: Window = Window {
    scope: "general",
    max_requests: RATE_LIMIT_REQUESTS,
    seconds: RATE_LIMIT_WINDOW_SECONDS,
};

const AUTH: Window = Window {
    scope: "auth",
    max_requests: RATE_LIMIT_AUTH_REQUESTS,
    seconds: RATE_LIMIT_AUTH_WINDOW_SECONDS,
};

async fn enforce(
    window: Window,
    state: AppState,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let Some(cache) = state.cache.clone() else {
        return Ok(next.run(request).await);
    };

    let client = client_identifier(&request);
    let key = format!("{}:{}", window.scope, client);

    let status = match cache
        .check_rate_limit(&key, window.max_requests, window.seconds)
        .await
    {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(error = %e, scope = window.scope, "Rate limit check failed, denying request");
            return Err(RateLimitError {
                limit: window.max_requests,
                retry_after: window.seconds,
            });
        }
    };

    if !status.allowed {
        tracing::warn!(
            client = %client,
            scope = window.scope,
            count = status.count,
            "Rate limit exceeded"
        );
        return Err(RateLimitError {
            limit: status.limit,
            retry_after: status.reset_in,
        });
    }

    let mut response = next.run(request).await;
    insert_headers(response.headers_mut(), &status);
    Ok(response)
}

fn insert_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(status.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(status.remaining()));
}

/// RATE_LIMIT_REQUESTS per RATE_LIMIT_WINDOW_SECONDS per client.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(GENERAL, state, request, next).await
}

/// Stricter limit for login and registration.
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(AUTH, state, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn rejection_carries_retry_after() {
        let response = RateLimitError {
            limit: 10,
            retry_after: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["Retry-After"], "42");
        assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .header("X-Real-IP", "10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identifier(&request), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_real_ip_then_unknown() {
        let request = Request::builder()
            .header("X-Real-IP", "198.51.100.4")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identifier(&request), "198.51.100.4");

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_identifier(&bare), "unknown");
    }

    #[test]
    fn headers_report_remaining_requests() {
        let mut headers = HeaderMap::new();
        insert_headers(&mut headers, &RateLimitStatus::new(7, 10, 30));
        assert_eq!(headers["X-RateLimit-Limit"], "10");
        assert_eq!(headers["X-RateLimit-Remaining"], "3");
    }
}
