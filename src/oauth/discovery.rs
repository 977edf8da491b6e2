//! OAuth 2.0 authorization server metadata (RFC 8414)

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub registration_endpoint: String,
    pub response_types_supported: Vec<&'static str>,
    pub grant_types_supported: Vec<&'static str>,
    pub token_endpoint_auth_methods_supported: Vec<&'static str>,
    pub code_challenge_methods_supported: Vec<&'static str>,
}

impl AuthorizationServerMetadata {
    pub fn for_issuer(issuer: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: format!("{}/api/oauth/authorize", issuer),
            token_endpoint: format!("{}/api/oauth/token", issuer),
            registration_endpoint: format!("{}/api/oauth/register", issuer),
            response_types_supported: vec!["code"],
            grant_types_supported: vec!["authorization_code", "refresh_token"],
            token_endpoint_auth_methods_supported: vec![
                "client_secret_post",
                "client_secret_basic",
            ],
            code_challenge_methods_supported: vec!["S256"],
        }
    }
}

/// `GET /.well-known/oauth-authorization-server`
pub async fn discovery(State(state): State<AppState>) -> Json<AuthorizationServerMetadata> {
    Json(AuthorizationServerMetadata::for_issuer(state.config.issuer()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_endpoints() {
        let metadata = AuthorizationServerMetadata::for_issuer("https://mcp.example.com");
        assert_eq!(metadata.token_endpoint, "https://mcp.example.com/api/oauth/token");
        assert_eq!(metadata.code_challenge_methods_supported, vec!["S256"]);
        assert!(metadata.grant_types_supported.contains(&"refresh_token"));
    }
}
