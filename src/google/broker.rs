//! Workspace credential broker
//!
//! Runs the upstream Google authorization-code exchange, persists the
//! resulting tokens per user email and hands out authorized clients.

use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::auth::clock::Clock;
use crate::config::Config;
use crate::error::{AuthError, ConfigError, GoogleApiError, Result, WorkspaceMcpError};
use crate::google::client::{build_http_client, GoogleClient, GoogleTokenResponse, RotationSink};
use crate::google::store::{TokenRecord, TokenStore};

/// Userinfo response; only the email is used
#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    email: Option<String>,
}

/// Result of a successful Google authorization
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub email: String,
    pub record: TokenRecord,
}

/// Canonical store key for an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct WorkspaceBroker {
    config: Arc<Config>,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
}

impl WorkspaceBroker {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let http = build_http_client(config.upstream_timeout_secs)?;
        Ok(Self {
            config,
            http,
            store,
            clock,
        })
    }

    /// Google consent URL: offline access, fixed scopes, consent always forced
    pub fn auth_url(&self, state: &str) -> Result<Url> {
        let client = &self.config.google_client;
        let redirect_uri = self.config.google_redirect_uri();
        let scope = self.config.scopes.join(" ");

        Url::parse_with_params(
            &client.auth_uri,
            &[
                ("client_id", client.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| {
            WorkspaceMcpError::Config(ConfigError::InvalidConfig {
                message: format!("Invalid Google auth URI {}: {}", client.auth_uri, e),
            })
        })
    }

    /// Exchange a Google authorization code and persist the tokens
    pub async fn exchange(&self, code: &str) -> Result<ExchangeOutcome> {
        let client = &self.config.google_client;
        let redirect_uri = self.config.google_redirect_uri();
        let params = [
            ("code", code),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&client.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(GoogleApiError::from)?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WorkspaceMcpError::Auth(AuthError::TokenExchangeFailed {
                message: text,
            }));
        }

        let tokens: GoogleTokenResponse = response.json().await.map_err(GoogleApiError::from)?;
        let email = self.resolve_email(&tokens.access_token).await?;

        let refresh_token = match tokens.refresh_token.clone().filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => match self.store.get(&email).await? {
                Some(existing) => existing.refresh_token,
                None => {
                    return Err(WorkspaceMcpError::Auth(AuthError::MissingRefreshToken {
                        email,
                    }))
                }
            },
        };

        let rotated = tokens.rotated(self.clock.now_millis());
        let record = TokenRecord {
            user_email: email.clone(),
            access_token: Some(rotated.access_token.clone()),
            refresh_token,
            token_expiry: rotated
                .expiry_millis
                .and_then(crate::google::store::millis_to_rfc3339),
            scopes: rotated.scope.clone(),
        };

        self.store.upsert(&record).await?;
        tracing::info!(email = %email, "stored Google authorization");

        Ok(ExchangeOutcome { email, record })
    }

    async fn resolve_email(&self, access_token: &str) -> Result<String> {
        let response = self
            .http
            .get(&self.config.google_endpoints.userinfo)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(GoogleApiError::from)?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WorkspaceMcpError::Auth(AuthError::UserInfoFailed { message: text }));
        }

        let info: UserInfo = response.json().await.map_err(GoogleApiError::from)?;
        info.email
            .map(|e| normalize_email(&e))
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                WorkspaceMcpError::Auth(AuthError::UserInfoFailed {
                    message: "userinfo response has no email".to_string(),
                })
            })
    }

    /// Authorized client for a user, or a remediation error naming the login URL
    pub async fn client_for(&self, email: &str) -> Result<GoogleClient> {
        let email = normalize_email(email);
        let record = self.store.get(&email).await?.ok_or_else(|| {
            WorkspaceMcpError::Auth(AuthError::NotAuthorized {
                email: email.clone(),
                login_url: self.config.login_url(),
            })
        })?;

        Ok(GoogleClient::new(
            self.http.clone(),
            self.config.google_client.clone(),
            self.config.google_endpoints.clone(),
            record,
            RotationSink::new(self.store.clone(), email),
            self.clock.clone(),
        ))
    }

    /// Remove a user's stored Google tokens
    pub async fn disconnect(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        self.store.delete(&email).await?;
        tracing::info!(email = %email, "removed Google authorization");
        Ok(())
    }
}
