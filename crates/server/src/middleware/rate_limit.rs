use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::SecondsFormat;
use cqgate_core::{RateLimitDecision, RateLimitPolicy, RateLimiter};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Identity used when no forwarding header or peer address is known
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Middleware state: the shared limiter plus the policy of one endpoint
#[derive(Clone)]
pub struct RateLimitGuard {
    limiter: Arc<RateLimiter>,
    policy: RateLimitPolicy,
}

impl RateLimitGuard {
    pub fn new(limiter: Arc<RateLimiter>, policy: RateLimitPolicy) -> Self {
        Self { limiter, policy }
    }
}

/// 429 response body
#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitExceeded {
    pub error: String,
    pub message: String,
}

impl RateLimitExceeded {
    fn for_policy(policy: RateLimitPolicy) -> Self {
        Self {
            error: "Rate limit exceeded".to_string(),
            message: format!(
                "Too many requests. Limit: {} requests per {} seconds",
                policy.max_requests,
                policy.window_secs()
            ),
        }
    }
}

/// Derive the client identity from forwarding headers or the peer address
pub fn client_identity(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }

    remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Admit or reject the request and stamp the rate-limit headers on the
/// response either way
pub async fn enforce_rate_limit(
    State(guard): State<RateLimitGuard>,
    req: Request,
    next: Next,
) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_identity(req.headers(), remote);

    let decision = guard.limiter.admit(&client, guard.policy);

    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        tracing::warn!(
            client = %client,
            path = %req.uri().path(),
            limit = decision.limit,
            "Rate limit exceeded"
        );
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitExceeded::for_policy(guard.policy)),
        )
            .into_response()
    };

    apply_headers(response.headers_mut(), &decision);
    response
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));

    let reset = decision
        .reset_at
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    if let Ok(value) = HeaderValue::from_str(&reset) {
        headers.insert(RESET_HEADER, value);
    }
}
