//! Authorized Google API client for one user
//!
//! Holds a snapshot of the user's token record. Refreshes explicitly when the
//! access token is missing or about to expire, or once after a 401, and
//! persists each rotation through its [`RotationSink`] before continuing.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use yup_oauth2::ApplicationSecret;

use crate::auth::clock::Clock;
use crate::config::GoogleEndpoints;
use crate::error::{
    AuthError, GoogleApiError, Result, StoreError, ValidationError, WorkspaceMcpError,
};
use crate::google::store::{RotatedTokens, TokenRecord, TokenStore};

/// Refresh when the access token expires within this margin
const EXPIRY_MARGIN_MS: i64 = 60_000;

const MULTIPART_BOUNDARY_PREFIX: &str = "workspace_mcp_";

/// Token response of Google's OAuth endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl GoogleTokenResponse {
    pub fn rotated(self, now_millis: i64) -> RotatedTokens {
        RotatedTokens {
            access_token: self.access_token,
            expiry_millis: self.expires_in.map(|secs| now_millis + secs * 1000),
            refresh_token: self.refresh_token,
            scope: self.scope,
        }
    }
}

/// Where rotated tokens are written back
#[derive(Debug, Clone)]
pub struct RotationSink {
    store: Arc<dyn TokenStore>,
    email: String,
}

impl RotationSink {
    pub fn new(store: Arc<dyn TokenStore>, email: impl Into<String>) -> Self {
        Self {
            store,
            email: email.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub async fn persist(&self, record: &TokenRecord) -> std::result::Result<(), StoreError> {
        self.store.upsert(record).await
    }
}

/// Google API client primed with one user's credentials
#[derive(Debug)]
pub struct GoogleClient {
    http: reqwest::Client,
    oauth: ApplicationSecret,
    endpoints: GoogleEndpoints,
    record: Mutex<TokenRecord>,
    sink: RotationSink,
    clock: Arc<dyn Clock>,
}

impl GoogleClient {
    pub fn new(
        http: reqwest::Client,
        oauth: ApplicationSecret,
        endpoints: GoogleEndpoints,
        record: TokenRecord,
        sink: RotationSink,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http,
            oauth,
            endpoints,
            record: Mutex::new(record),
            sink,
            clock,
        }
    }

    pub fn email(&self) -> &str {
        self.sink.email()
    }

    pub fn endpoints(&self) -> &GoogleEndpoints {
        &self.endpoints
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Current token record, including any rotation applied so far
    pub async fn record(&self) -> TokenRecord {
        self.record.lock().await.clone()
    }

    /// A usable access token, refreshing first if needed
    pub async fn access_token(&self) -> Result<String> {
        let mut record = self.record.lock().await;

        let now = self.clock.now_millis();
        let fresh = match (&record.access_token, record.expiry_millis()) {
            (Some(_), Some(expiry)) => expiry - now > EXPIRY_MARGIN_MS,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if fresh {
            if let Some(token) = record.access_token.clone() {
                return Ok(token);
            }
        }

        self.refresh_locked(&mut record).await
    }

    /// Force a refresh
    pub async fn refresh(&self) -> Result<String> {
        let mut record = self.record.lock().await;
        self.refresh_locked(&mut record).await
    }

    async fn refresh_locked(&self, record: &mut TokenRecord) -> Result<String> {
        let params = [
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("refresh_token", record.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&self.oauth.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(GoogleApiError::from)?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WorkspaceMcpError::Auth(AuthError::TokenRefreshFailed {
                message: text,
            }));
        }

        let token_response: GoogleTokenResponse =
            response.json().await.map_err(GoogleApiError::from)?;
        let rotated = token_response.rotated(self.clock.now_millis());

        *record = record.apply_rotation(&rotated);
        tracing::info!(email = %self.sink.email(), "rotated Google access token");

        if let Err(e) = self.sink.persist(record).await {
            tracing::warn!(email = %self.sink.email(), "Failed to persist rotated token: {}", e);
        }

        Ok(rotated.access_token)
    }

    /// Send a request, retrying once with a fresh token after a 401
    async fn send<F>(&self, resource: &str, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.access_token().await?;
        let response = build(&token).send().await.map_err(GoogleApiError::from)?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!(email = %self.email(), "access token rejected, refreshing");
            let token = self.refresh().await?;
            build(&token).send().await.map_err(GoogleApiError::from)?
        } else {
            response
        };

        check_status(response, resource).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .send(url, |token| self.http.get(url).query(query).bearer_auth(token))
            .await?;
        Ok(response.json().await.map_err(GoogleApiError::from)?)
    }

    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let response = self
            .send(url, |token| self.http.get(url).query(query).bearer_auth(token))
            .await?;
        Ok(response.text().await.map_err(GoogleApiError::from)?)
    }

    pub async fn post_json<B, T>(&self, url: &str, query: &[(&str, String)], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(url, |token| {
                self.http.post(url).query(query).bearer_auth(token).json(body)
            })
            .await?;
        Ok(response.json().await.map_err(GoogleApiError::from)?)
    }

    pub async fn patch_json<B, T>(&self, url: &str, query: &[(&str, String)], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(url, |token| {
                self.http.patch(url).query(query).bearer_auth(token).json(body)
            })
            .await?;
        Ok(response.json().await.map_err(GoogleApiError::from)?)
    }

    pub async fn delete(&self, url: &str, query: &[(&str, String)]) -> Result<()> {
        self.send(url, |token| self.http.delete(url).query(query).bearer_auth(token))
            .await?;
        Ok(())
    }

    /// `multipart/related` upload of JSON metadata plus text content
    pub async fn upload_multipart<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        metadata: &serde_json::Value,
        content: &str,
        mime_type: &str,
    ) -> Result<T> {
        let body = MultipartBody::new(metadata, content, mime_type)?;
        let content_type = format!("multipart/related; boundary={}", body.boundary);
        let body = body.text;

        let response = self
            .send(url, |token| {
                self.http
                    .post(url)
                    .query(query)
                    .bearer_auth(token)
                    .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                    .body(body.clone())
            })
            .await?;
        Ok(response.json().await.map_err(GoogleApiError::from)?)
    }
}

/// `multipart/related` body with a boundary absent from the content
struct MultipartBody {
    boundary: String,
    text: String,
}

impl MultipartBody {
    fn new(metadata: &serde_json::Value, content: &str, mime_type: &str) -> Result<Self> {
        if mime_type.contains(['\r', '\n']) {
            return Err(WorkspaceMcpError::Validation(ValidationError::InvalidParameter {
                name: "mimeType".to_string(),
                message: "must not contain line breaks".to_string(),
            }));
        }

        let metadata = serde_json::to_string(metadata)?;
        let boundary = loop {
            let candidate = format!(
                "{}{}",
                MULTIPART_BOUNDARY_PREFIX,
                uuid::Uuid::new_v4().simple()
            );
            if !content.contains(&candidate) && !metadata.contains(&candidate) {
                break candidate;
            }
        };

        let text = format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
             --{b}\r\nContent-Type: {mime}\r\n\r\n{content}\r\n--{b}--",
            b = boundary,
            metadata = metadata,
            mime = mime_type,
            content = content,
        );
        Ok(Self { boundary, text })
    }
}

/// Map non-success statuses onto [`GoogleApiError`]
async fn check_status(response: Response, resource: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let err = match status {
        StatusCode::NOT_FOUND => GoogleApiError::NotFound {
            resource: resource.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => GoogleApiError::RateLimited {
            retry_after_secs: response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        },
        _ => GoogleApiError::RequestFailed {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        },
    };
    Err(err.into())
}

/// Shared HTTP client with the upstream timeout applied
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body() {
        let metadata = serde_json::json!({"name": "a.txt"});
        let body = MultipartBody::new(&metadata, "hello", "text/plain").unwrap();
        assert!(body.boundary.starts_with("workspace_mcp_"));
        assert!(body.text.starts_with(&format!("--{}\r\n", body.boundary)));
        assert!(body.text.contains("{\"name\":\"a.txt\"}"));
        assert!(body.text.contains("Content-Type: text/plain\r\n\r\nhello"));
        assert!(body.text.ends_with(&format!("--{}--", body.boundary)));
    }

    #[test]
    fn test_multipart_content_cannot_close_body_early() {
        let content = "line one\r\n--workspace_mcp_boundary--\r\ntrailing data kept";
        let body = MultipartBody::new(&serde_json::json!({}), content, "text/plain").unwrap();

        let close = format!("\r\n--{}--", body.boundary);
        assert_eq!(body.text.find(&close), Some(body.text.len() - close.len()));
        assert!(body.text.contains("trailing data kept\r\n--"));

        let other = MultipartBody::new(&serde_json::json!({}), content, "text/plain").unwrap();
        assert_ne!(body.boundary, other.boundary);
    }

    #[test]
    fn test_multipart_rejects_header_in_mime_type() {
        let result = MultipartBody::new(
            &serde_json::json!({}),
            "x",
            "text/plain\r\nContent-Disposition: attachment",
        );
        assert!(matches!(
            result,
            Err(WorkspaceMcpError::Validation(ValidationError::InvalidParameter { .. }))
        ));
    }

    #[test]
    fn test_token_response_rotation() {
        let response = GoogleTokenResponse {
            access_token: "a".to_string(),
            expires_in: Some(3599),
            refresh_token: None,
            scope: None,
        };
        let rotated = response.rotated(1_000);
        assert_eq!(rotated.expiry_millis, Some(3_600_000));
        assert!(rotated.refresh_token.is_none());
    }
}
