//! Token endpoint: authorization_code and refresh_token grants

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::credentials::CredentialVerifier;
use crate::auth::token::{secret_eq, CodeClaims, TokenCodec, TokenKind};
use crate::config::tokens::{ACCESS_TTL_SECS, REFRESH_TTL_SECS};
use crate::error::OAuthError;
use crate::server::AppState;

/// Fields accepted by the token endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

/// Successful token response (RFC 6749 section 5.1)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    fn bearer(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: ACCESS_TTL_SECS,
            refresh_token,
        }
    }
}

/// Parse a JSON or form-encoded body, chosen by content type
pub fn parse_token_request(content_type: &str, body: &[u8]) -> Result<TokenRequest, OAuthError> {
    if content_type.contains("application/x-www-form-urlencoded") {
        let map: serde_json::Map<String, serde_json::Value> = url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
            .collect();
        return serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| OAuthError::InvalidRequest(e.to_string()));
    }

    serde_json::from_slice(body).map_err(|e| {
        OAuthError::InvalidRequest(format!("Body must be JSON or form-encoded: {}", e))
    })
}

/// Run a grant against the codec and verifier
pub fn exchange(
    codec: &TokenCodec,
    verifier: &CredentialVerifier,
    request: &TokenRequest,
) -> Result<TokenResponse, OAuthError> {
    match request.grant_type.as_deref() {
        Some("authorization_code") => {
            let code = request.code.as_deref().unwrap_or_default();
            let claims: CodeClaims = codec.verify(code).ok_or_else(|| {
                OAuthError::InvalidGrant("Authorization code expired or invalid".into())
            })?;

            check_code_binding(&claims, request)?;

            let access_token = issue(codec, TokenKind::Access, ACCESS_TTL_SECS)?;
            let refresh_token = issue(codec, TokenKind::Refresh, REFRESH_TTL_SECS)?;
            tracing::info!("issued access and refresh tokens for authorization code");

            Ok(TokenResponse::bearer(access_token, Some(refresh_token)))
        }
        Some("refresh_token") => {
            let presented = request.refresh_token.as_deref().unwrap_or_default();
            if !verifier.validate_refresh(presented) {
                return Err(OAuthError::InvalidGrant("Refresh token expired or invalid".into()));
            }

            let access_token = issue(codec, TokenKind::Access, ACCESS_TTL_SECS)?;
            tracing::info!("issued access token for refresh grant");

            Ok(TokenResponse::bearer(access_token, None))
        }
        _ => Err(OAuthError::UnsupportedGrantType),
    }
}

fn issue(codec: &TokenCodec, kind: TokenKind, ttl: i64) -> Result<String, OAuthError> {
    codec
        .issue_bearer(kind, ttl)
        .map(|(token, _)| token)
        .map_err(|e| OAuthError::ServerError(e.to_string()))
}

/// Optional redirect URI and PKCE checks; skipped when the request omits them
fn check_code_binding(claims: &CodeClaims, request: &TokenRequest) -> Result<(), OAuthError> {
    if let Some(redirect_uri) = request.redirect_uri.as_deref() {
        if redirect_uri != claims.redirect_uri {
            return Err(OAuthError::InvalidGrant("redirect_uri does not match".into()));
        }
    }

    if let Some(verifier) = request.code_verifier.as_deref() {
        if !claims.code_challenge.is_empty() {
            let computed = pkce_challenge(verifier);
            if !secret_eq(computed.as_bytes(), claims.code_challenge.as_bytes()) {
                return Err(OAuthError::InvalidGrant("code_verifier does not match".into()));
            }
        }
    }

    Ok(())
}

/// `BASE64URL(SHA256(verifier))`
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// `POST /api/oauth/token`
pub async fn token(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let result = parse_token_request(content_type, &body)
        .and_then(|request| exchange(&state.codec, &state.verifier, &request));

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::debug!("token request rejected: {}", e.code());
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::token::BearerClaims;

    fn setup(strict: bool) -> (TokenCodec, CredentialVerifier, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let codec = TokenCodec::new(Some("s3cret"), clock.clone());
        let verifier = CredentialVerifier::new(codec.clone(), Vec::new(), strict);
        (codec, verifier, clock)
    }

    fn code_request(code: &str) -> TokenRequest {
        TokenRequest {
            grant_type: Some("authorization_code".to_string()),
            code: Some(code.to_string()),
            ..Default::default()
        }
    }

    fn refresh_request(token: &str) -> TokenRequest {
        TokenRequest {
            grant_type: Some("refresh_token".to_string()),
            refresh_token: Some(token.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_form_and_json() {
        let form = parse_token_request(
            "application/x-www-form-urlencoded; charset=utf-8",
            b"grant_type=authorization_code&code=abc",
        )
        .unwrap();
        assert_eq!(form.grant_type.as_deref(), Some("authorization_code"));
        assert_eq!(form.code.as_deref(), Some("abc"));

        let json = parse_token_request(
            "application/json",
            br#"{"grant_type":"refresh_token","refresh_token":"r"}"#,
        )
        .unwrap();
        assert_eq!(json.refresh_token.as_deref(), Some("r"));

        assert!(parse_token_request("application/json", b"nope").is_err());
    }

    #[test]
    fn test_code_exchange_issues_pair() {
        let (codec, verifier, _) = setup(false);
        let code = codec.issue_code("https://x/cb", "").unwrap();

        let response = exchange(&codec, &verifier, &code_request(&code)).unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 86_400);

        let access: BearerClaims = codec.verify(&response.access_token).unwrap();
        let refresh_token = response.refresh_token.as_deref().unwrap();
        let refresh: BearerClaims = codec.verify(refresh_token).unwrap();
        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert_eq!(refresh.exp - refresh.iat, 90 * 86_400 * 1000);
    }

    #[test]
    fn test_code_replay_is_accepted() {
        let (codec, verifier, _) = setup(false);
        let code = codec.issue_code("https://x/cb", "").unwrap();
        assert!(exchange(&codec, &verifier, &code_request(&code)).is_ok());
        assert!(exchange(&codec, &verifier, &code_request(&code)).is_ok());
    }

    #[test]
    fn test_expired_code() {
        let (codec, verifier, clock) = setup(false);
        let code = codec.issue_code("https://x/cb", "").unwrap();
        clock.advance_secs(301);
        assert!(matches!(
            exchange(&codec, &verifier, &code_request(&code)),
            Err(OAuthError::InvalidGrant(_))
        ));
    }

    #[test]
    fn test_bearer_token_is_not_a_code() {
        let (codec, verifier, _) = setup(false);
        let (access, _) = codec.issue_bearer(TokenKind::Access, 60).unwrap();
        assert!(matches!(
            exchange(&codec, &verifier, &code_request(&access)),
            Err(OAuthError::InvalidGrant(_))
        ));
    }

    #[test]
    fn test_pkce_verifier() {
        let (codec, verifier, _) = setup(false);
        let challenge = pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");

        let code = codec.issue_code("https://x/cb", &challenge).unwrap();

        let mut request = code_request(&code);
        request.code_verifier = Some("wrong".to_string());
        assert!(matches!(
            exchange(&codec, &verifier, &request),
            Err(OAuthError::InvalidGrant(_))
        ));

        request.code_verifier = Some("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert!(exchange(&codec, &verifier, &request).is_ok());
    }

    #[test]
    fn test_redirect_uri_binding() {
        let (codec, verifier, _) = setup(false);
        let code = codec.issue_code("https://x/cb", "").unwrap();

        let mut request = code_request(&code);
        request.redirect_uri = Some("https://evil/cb".to_string());
        assert!(exchange(&codec, &verifier, &request).is_err());

        request.redirect_uri = Some("https://x/cb".to_string());
        assert!(exchange(&codec, &verifier, &request).is_ok());
    }

    #[test]
    fn test_refresh_grant() {
        let (codec, verifier, _) = setup(false);
        let (refresh, _) = codec.issue_bearer(TokenKind::Refresh, REFRESH_TTL_SECS).unwrap();
        let response = exchange(&codec, &verifier, &refresh_request(&refresh)).unwrap();
        assert!(response.refresh_token.is_none());
        assert!(codec.verify::<BearerClaims>(&response.access_token).is_some());

        // access tokens pass as refresh tokens unless kinds are strict
        let (access, _) = codec.issue_bearer(TokenKind::Access, ACCESS_TTL_SECS).unwrap();
        assert!(exchange(&codec, &verifier, &refresh_request(&access)).is_ok());
    }

    #[test]
    fn test_refresh_grant_strict_kinds() {
        let (codec, verifier, _) = setup(true);
        let (access, _) = codec.issue_bearer(TokenKind::Access, ACCESS_TTL_SECS).unwrap();
        assert!(matches!(
            exchange(&codec, &verifier, &refresh_request(&access)),
            Err(OAuthError::InvalidGrant(_))
        ));
    }

    #[test]
    fn test_unsupported_grant() {
        let (codec, verifier, _) = setup(false);
        let request = TokenRequest {
            grant_type: Some("password".to_string()),
            ..Default::default()
        };
        assert_eq!(
            exchange(&codec, &verifier, &request),
            Err(OAuthError::UnsupportedGrantType)
        );
        assert_eq!(
            exchange(&codec, &verifier, &TokenRequest::default()),
            Err(OAuthError::UnsupportedGrantType)
        );
    }
}
