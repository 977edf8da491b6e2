//! Request gate middleware
//!
//! Rate limits and authenticates every request to the protected `/api/*`
//! surface. OAuth endpoints, the human-facing pages and discovery stay open.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::credentials::CredentialVerifier;
use crate::auth::rate_limit::RateLimiter;

const HEADER_X_FORWARDED_FOR: &str = "x-forwarded-for";
const HEADER_X_REAL_IP: &str = "x-real-ip";
const UNKNOWN_IDENTITY: &str = "unknown";
const BEARER_REALM: &str = "Bearer realm=\"Google Workspace MCP\"";

/// Shared state of the gate
#[derive(Debug, Clone)]
pub struct GateState {
    pub limiter: Arc<RateLimiter>,
    pub verifier: Arc<CredentialVerifier>,
}

/// Why the gate refused a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    RateLimited { retry_after_secs: u64 },
    Unauthorized,
}

#[derive(Debug, Serialize)]
struct RejectionBody {
    error: &'static str,
    message: &'static str,
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            GateRejection::RateLimited { retry_after_secs } => {
                let body = RejectionBody {
                    error: "rate_limit_exceeded",
                    message: "Too many requests.",
                };
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            GateRejection::Unauthorized => {
                let body = RejectionBody {
                    error: "unauthorized",
                    message: "Valid Bearer token required.",
                };
                let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(BEARER_REALM),
                );
                response
            }
        }
    }
}

/// Paths reachable without a credential
pub fn is_public_path(path: &str) -> bool {
    path == "/"
        || path == "/favicon.ico"
        || path.starts_with("/api/oauth")
        || path.starts_with("/auth/")
        || path.starts_with("/.well-known")
}

/// Paths the gate guards
pub fn is_protected_path(path: &str) -> bool {
    path.starts_with("/api/") && !is_public_path(path)
}

/// Best-effort client identity from forwarding headers
pub fn client_identity(headers: &HeaderMap) -> String {
    if let Some(value) = header_str(headers, HEADER_X_FORWARDED_FOR) {
        let first = value.split(',').next().unwrap_or_default().trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    if let Some(value) = header_str(headers, HEADER_X_REAL_IP) {
        let ip = value.trim();
        if !ip.is_empty() {
            return ip.to_string();
        }
    }

    UNKNOWN_IDENTITY.to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Rate limit first, then check the credential
pub async fn check(state: &GateState, headers: &HeaderMap) -> Result<(), GateRejection> {
    let identity = client_identity(headers);

    if !state.limiter.allow(&identity).await {
        tracing::debug!(identity = %identity, "rate limit exceeded");
        return Err(GateRejection::RateLimited {
            retry_after_secs: state.limiter.window_secs(),
        });
    }

    let authorization = header_str(headers, header::AUTHORIZATION.as_str());
    if !state.verifier.validate(authorization) {
        tracing::debug!(identity = %identity, "missing or invalid credential");
        return Err(GateRejection::Unauthorized);
    }

    Ok(())
}

/// Axum middleware applying [`check`] to protected paths
pub async fn request_gate(
    State(state): State<GateState>,
    request: Request,
    next: Next,
) -> Response {
    if !is_protected_path(request.uri().path()) {
        return next.run(request).await;
    }

    match check(&state, request.headers()).await {
        Ok(()) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    }
}
