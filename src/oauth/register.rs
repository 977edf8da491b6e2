//! Dynamic client registration (RFC 7591)
//!
//! Anyone may register. Nothing is persisted and the returned credentials
//! are never checked afterwards.

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OAuthError;

const DEFAULT_CLIENT_NAME: &str = "MCP Client";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
}

impl ClientRegistration {
    pub fn issue(request: RegistrationRequest) -> Self {
        Self {
            client_id: Uuid::new_v4().to_string(),
            client_secret: Uuid::new_v4().to_string(),
            client_name: request
                .client_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
            redirect_uris: request.redirect_uris,
            grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: "client_secret_post".to_string(),
        }
    }
}

/// Empty bodies register with defaults; malformed JSON is rejected
pub fn parse_registration(body: &[u8]) -> Result<RegistrationRequest, OAuthError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RegistrationRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| OAuthError::InvalidClientMetadata(e.to_string()))
}

/// `POST /api/oauth/register`
pub async fn register(body: Bytes) -> Response {
    match parse_registration(&body) {
        Ok(request) => {
            let registration = ClientRegistration::issue(request);
            tracing::info!(client_name = %registration.client_name, "registered OAuth client");
            (StatusCode::CREATED, Json(registration)).into_response()
        }
        Err(e) => e.into_response(),
    }
}
