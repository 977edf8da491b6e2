//! Persistence of upstream Google tokens
//!
//! Records are keyed by user email. Only the Google-issued tokens are
//! stored; self-issued bearer tokens never touch the store.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::{Config, SupabaseConfig, TokenStoreKind};
use crate::error::{ConfigError, Result, StoreError, WorkspaceMcpError};

/// Persisted Google credential of one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRecord {
    /// Unique key
    pub user_email: String,

    /// Short-lived access token
    #[serde(default)]
    pub access_token: Option<String>,

    /// Long-lived refresh token
    pub refresh_token: String,

    /// Access token expiry (RFC 3339)
    #[serde(default)]
    pub token_expiry: Option<String>,

    /// Granted scopes, space separated
    #[serde(default)]
    pub scopes: Option<String>,
}

/// Tokens returned by an upstream refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotatedTokens {
    pub access_token: String,
    pub expiry_millis: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

impl TokenRecord {
    /// Access token expiry in milliseconds since the epoch
    pub fn expiry_millis(&self) -> Option<i64> {
        self.token_expiry
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp_millis())
    }

    /// Merge a rotation into the record
    ///
    /// Access token and expiry always take the new values. Refresh token and
    /// scope keep the stored values unless the upstream sent new ones.
    pub fn apply_rotation(&self, rotated: &RotatedTokens) -> TokenRecord {
        TokenRecord {
            user_email: self.user_email.clone(),
            access_token: Some(rotated.access_token.clone()),
            refresh_token: rotated
                .refresh_token
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| self.refresh_token.clone()),
            token_expiry: rotated.expiry_millis.and_then(millis_to_rfc3339),
            scopes: rotated
                .scope
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| self.scopes.clone()),
        }
    }
}

pub fn millis_to_rfc3339(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Key-value store of token records
#[async_trait]
pub trait TokenStore: Send + Sync + Debug {
    async fn get(&self, email: &str) -> std::result::Result<Option<TokenRecord>, StoreError>;

    /// Create or replace the record for `record.user_email`
    async fn upsert(&self, record: &TokenRecord) -> std::result::Result<(), StoreError>;

    async fn delete(&self, email: &str) -> std::result::Result<(), StoreError>;
}

/// Build the store selected by the configuration
pub fn build_token_store(config: &Config) -> Result<Arc<dyn TokenStore>> {
    match config.token_store {
        TokenStoreKind::Supabase => {
            let supabase = config.supabase.clone().ok_or_else(|| {
                WorkspaceMcpError::Config(ConfigError::MissingEnvVar {
                    var: "SUPABASE_URL".to_string(),
                })
            })?;
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.upstream_timeout_secs))
                .build()?;
            Ok(Arc::new(SupabaseTokenStore::new(http, supabase)))
        }
        TokenStoreKind::File => Ok(Arc::new(FileTokenStore::new(config.token_store_path.clone()))),
    }
}

// ==================== Supabase ====================

/// PostgREST table accessed with the service key
#[derive(Debug, Clone)]
pub struct SupabaseTokenStore {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseTokenStore {
    pub fn new(http: reqwest::Client, config: SupabaseConfig) -> Self {
        Self { http, config }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.url, self.config.table)
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.table_url())
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }
}

async fn failure(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    format!("{} {}", status, text)
}

#[async_trait]
impl TokenStore for SupabaseTokenStore {
    async fn get(&self, email: &str) -> std::result::Result<Option<TokenRecord>, StoreError> {
        let response = self
            .request(reqwest::Method::GET)
            .query(&[("user_email", format!("eq.{}", email)), ("select", "*".to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::RequestFailed {
                message: failure(response).await,
            });
        }

        let rows: Vec<TokenRecord> = response.json().await.map_err(|e| StoreError::Corrupt {
            message: e.to_string(),
        })?;
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, record: &TokenRecord) -> std::result::Result<(), StoreError> {
        let response = self
            .request(reqwest::Method::POST)
            .query(&[("on_conflict", "user_email")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[record])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::WriteFailed {
                message: failure(response).await,
            });
        }
        Ok(())
    }

    async fn delete(&self, email: &str) -> std::result::Result<(), StoreError> {
        let response = self
            .request(reqwest::Method::DELETE)
            .query(&[("user_email", format!("eq.{}", email))])
            .send()
            .await?;

        match response.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            _ => Err(StoreError::WriteFailed {
                message: failure(response).await,
            }),
        }
    }
}

// ==================== File ====================

/// JSON map on local disk
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: RwLock::new(()),
        }
    }

    async fn load(&self) -> std::result::Result<HashMap<String, TokenRecord>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                message: format!("{}: {}", self.path.display(), e),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn save(
        &self,
        records: &HashMap<String, TokenRecord>,
    ) -> std::result::Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(records).map_err(|e| StoreError::WriteFailed {
            message: e.to_string(),
        })?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, email: &str) -> std::result::Result<Option<TokenRecord>, StoreError> {
        let _guard = self.lock.read().await;
        Ok(self.load().await?.remove(email))
    }

    async fn upsert(&self, record: &TokenRecord) -> std::result::Result<(), StoreError> {
        let _guard = self.lock.write().await;
        let mut records = self.load().await?;
        records.insert(record.user_email.clone(), record.clone());
        self.save(&records).await
    }

    async fn delete(&self, email: &str) -> std::result::Result<(), StoreError> {
        let _guard = self.lock.write().await;
        let mut records = self.load().await?;
        if records.remove(email).is_some() {
            self.save(&records).await?;
        }
        Ok(())
    }
}

// ==================== Memory ====================

/// Process-local store for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    records: RwLock<HashMap<String, TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, email: &str) -> std::result::Result<Option<TokenRecord>, StoreError> {
        Ok(self.records.read().await.get(email).cloned())
    }

    async fn upsert(&self, record: &TokenRecord) -> std::result::Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.user_email.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, email: &str) -> std::result::Result<(), StoreError> {
        self.records.write().await.remove(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TokenRecord {
        TokenRecord {
            user_email: "ada@example.com".to_string(),
            access_token: Some("old-access".to_string()),
            refresh_token: "old-refresh".to_string(),
            token_expiry: Some("2024-01-01T00:00:00.000Z".to_string()),
            scopes: Some("openid".to_string()),
        }
    }

    #[test]
    fn test_rotation_keeps_refresh_token_and_scope() {
        let rotated = record().apply_rotation(&RotatedTokens {
            access_token: "new-access".to_string(),
            expiry_millis: Some(1_704_067_200_000),
            refresh_token: None,
            scope: None,
        });
        assert_eq!(rotated.access_token.as_deref(), Some("new-access"));
        assert_eq!(rotated.refresh_token, "old-refresh");
        assert_eq!(rotated.scopes.as_deref(), Some("openid"));
        assert_eq!(rotated.expiry_millis(), Some(1_704_067_200_000));
    }

    #[test]
    fn test_rotation_takes_new_refresh_token() {
        let rotated = record().apply_rotation(&RotatedTokens {
            access_token: "new-access".to_string(),
            expiry_millis: None,
            refresh_token: Some("new-refresh".to_string()),
            scope: Some("openid email".to_string()),
        });
        assert_eq!(rotated.refresh_token, "new-refresh");
        assert_eq!(rotated.scopes.as_deref(), Some("openid email"));
        assert_eq!(rotated.token_expiry, None);
    }

    #[test]
    fn test_record_deserializes_nullable_columns() {
        let json = r#"{"user_email":"a@b.co","access_token":null,"refresh_token":"r","token_expiry":null,"scopes":null,"id":7}"#;
        let record: TokenRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.refresh_token, "r");
        assert!(record.access_token.is_none());
        assert!(record.expiry_millis().is_none());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryTokenStore::new();
        store.upsert(&record()).await.unwrap();
        assert_eq!(store.get("ada@example.com").await.unwrap(), Some(record()));
        store.delete("ada@example.com").await.unwrap();
        assert_eq!(store.get("ada@example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("workspace-mcp-{}", uuid::Uuid::new_v4()))
            .join("tokens.json");
        let store = FileTokenStore::new(path.clone());

        assert_eq!(store.get("ada@example.com").await.unwrap(), None);
        store.upsert(&record()).await.unwrap();

        let reopened = FileTokenStore::new(path.clone());
        assert_eq!(reopened.get("ada@example.com").await.unwrap(), Some(record()));

        reopened.delete("ada@example.com").await.unwrap();
        assert_eq!(store.get("ada@example.com").await.unwrap(), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_file_store_corrupt() {
        let path =
            std::env::temp_dir().join(format!("workspace-mcp-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "not json").unwrap();
        let store = FileTokenStore::new(path.clone());
        assert!(matches!(
            store.get("ada@example.com").await,
            Err(StoreError::Corrupt { .. })
        ));
        let _ = std::fs::remove_file(path);
    }
}
