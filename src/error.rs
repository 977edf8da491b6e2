//! Error types for the Workspace MCP Server
//!
//! This module defines the error hierarchy for all operations in the server,
//! plus the OAuth protocol errors returned by the token endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Main error type for the Workspace MCP Server
#[derive(Error, Debug)]
pub enum WorkspaceMcpError {
    /// Google authorization errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Signed-token issuance errors
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Token store errors
    #[error("Token store error: {0}")]
    Store(#[from] StoreError),

    /// Google API errors
    #[error("Google API error: {0}")]
    Google(#[from] GoogleApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl WorkspaceMcpError {
    /// Whether the caller may retry the operation unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkspaceMcpError::Google(err) => err.is_retryable(),
            WorkspaceMcpError::Store(err) => err.is_retryable(),
            WorkspaceMcpError::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

/// Google (upstream) authorization errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// No stored Google credential for the requested user
    #[error("No Google authorization found for {email}. Authorize first at {login_url}")]
    NotAuthorized { email: String, login_url: String },

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },

    #[error("Failed to refresh access token: {message}")]
    TokenRefreshFailed { message: String },

    #[error("Google did not issue a refresh token for {email}; revoke access and authorize again")]
    MissingRefreshToken { email: String },

    #[error("Failed to resolve account email: {message}")]
    UserInfoFailed { message: String },
}

/// Signed-token issuance errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Signing secret is not configured")]
    SecretUnset,

    #[error("Failed to encode token payload: {message}")]
    Encode { message: String },
}

/// Token store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token store request failed: {message}")]
    RequestFailed { message: String },

    #[error("Token store write failed: {message}")]
    WriteFailed { message: String },

    #[error("Token store data is corrupt: {message}")]
    Corrupt { message: String },

    #[error("Token store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Store failures are transient from the caller's perspective, except corrupt data
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Corrupt { .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::RequestFailed {
            message: err.to_string(),
        }
    }
}

/// Google API errors
#[derive(Error, Debug)]
pub enum GoogleApiError {
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("API request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Unexpected API response: {message}")]
    InvalidResponse { message: String },
}

impl GoogleApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GoogleApiError::Timeout | GoogleApiError::RateLimited { .. } => true,
            GoogleApiError::RequestFailed { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GoogleApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GoogleApiError::Timeout
        } else if err.is_decode() {
            GoogleApiError::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            GoogleApiError::RequestFailed {
                status: err.status().map(|s| s.as_u16()).unwrap_or(502),
                message: err.to_string(),
            }
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Missing required environment variable: {var}")]
    MissingEnvVar { var: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid email address: {email}")]
    InvalidEmail { email: String },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid tool arguments: {message}")]
    InvalidArguments { message: String },
}

/// Result type alias for Workspace MCP operations
pub type Result<T> = std::result::Result<T, WorkspaceMcpError>;

/// OAuth 2.0 token/registration endpoint errors (RFC 6749 section 5.2)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    #[error("unsupported_grant_type")]
    UnsupportedGrantType,

    #[error("invalid_client_metadata: {0}")]
    InvalidClientMetadata(String),

    #[error("server_error: {0}")]
    ServerError(String),
}

#[derive(Debug, Serialize)]
struct OAuthErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_description: Option<String>,
}

impl OAuthError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::UnsupportedGrantType => "unsupported_grant_type",
            OAuthError::InvalidClientMetadata(_) => "invalid_client_metadata",
            OAuthError::ServerError(_) => "server_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            OAuthError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn description(&self) -> Option<String> {
        match self {
            OAuthError::InvalidRequest(d)
            | OAuthError::InvalidGrant(d)
            | OAuthError::InvalidClientMetadata(d)
            | OAuthError::ServerError(d) => Some(d.clone()),
            OAuthError::UnsupportedGrantType => None,
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let body = OAuthErrorBody {
            error: self.code(),
            error_description: self.description(),
        };
        (self.status(), Json(body)).into_response()
    }
}
