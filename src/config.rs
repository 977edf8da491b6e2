//! Configuration management for the Workspace MCP Server
//!
//! Handles environment variables, the upstream Google OAuth client and the
//! fixed constants of the token-issuance core.

use std::net::SocketAddr;
use std::path::PathBuf;

use yup_oauth2::ApplicationSecret;

use crate::error::{ConfigError, Result, WorkspaceMcpError};

/// Which backend persists the upstream Google tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStoreKind {
    Supabase,
    File,
}

/// Supabase (PostgREST) connection parameters
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
    pub table: String,
}

/// Base URLs of the Google APIs the tools call
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub userinfo: String,
    pub gmail: String,
    pub calendar: String,
    pub drive: String,
    pub drive_upload: String,
    pub docs: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            userinfo: google::USERINFO_URL.to_string(),
            gmail: google::GMAIL_API_BASE.to_string(),
            calendar: google::CALENDAR_API_BASE.to_string(),
            drive: google::DRIVE_API_BASE.to_string(),
            drive_upload: google::DRIVE_UPLOAD_BASE.to_string(),
            docs: google::DOCS_API_BASE.to_string(),
        }
    }
}

/// Configuration for the Workspace MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared signing secret; doubles as the authorization password
    pub auth_secret: Option<String>,

    /// Static pre-shared API keys
    pub api_keys: Vec<String>,

    /// Externally visible base URL, without trailing slash
    pub public_base_url: String,

    /// Listen address
    pub bind_addr: SocketAddr,

    /// Upstream Google OAuth client
    pub google_client: ApplicationSecret,

    /// Google API base URLs
    pub google_endpoints: GoogleEndpoints,

    /// Token store backend
    pub token_store: TokenStoreKind,

    /// Supabase parameters, required for [`TokenStoreKind::Supabase`]
    pub supabase: Option<SupabaseConfig>,

    /// JSON file used by [`TokenStoreKind::File`]
    pub token_store_path: PathBuf,

    /// Upper bound for every upstream call
    pub upstream_timeout_secs: u64,

    /// Time zone attached to created and updated calendar events
    pub calendar_time_zone: String,

    /// Enforce access/refresh token kinds
    pub strict_token_kinds: bool,

    /// Google OAuth scopes
    pub scopes: Vec<String>,
}

impl Config {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let public_base_url = env_opt("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_base_url);

        let bind_addr = match env_opt("BIND_ADDR") {
            Some(addr) => addr.parse().map_err(|_| {
                WorkspaceMcpError::Config(ConfigError::InvalidConfig {
                    message: format!("BIND_ADDR is not a socket address: {}", addr),
                })
            })?,
            None => defaults.bind_addr,
        };

        let redirect_uri = format!("{}/auth/callback", public_base_url);
        let google_client = Self::load_google_client(&redirect_uri)?;

        let supabase = match (env_opt("SUPABASE_URL"), env_opt("SUPABASE_SERVICE_KEY")) {
            (Some(url), Some(service_key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                service_key,
                table: env_opt("SUPABASE_TOKEN_TABLE")
                    .unwrap_or_else(|| "google_mcp_tokens".to_string()),
            }),
            (Some(_), None) => {
                return Err(WorkspaceMcpError::Config(ConfigError::MissingEnvVar {
                    var: "SUPABASE_SERVICE_KEY".to_string(),
                }))
            }
            _ => None,
        };

        let token_store = match env_opt("TOKEN_STORE").as_deref() {
            Some("supabase") => TokenStoreKind::Supabase,
            Some("file") => TokenStoreKind::File,
            Some(other) => {
                return Err(WorkspaceMcpError::Config(ConfigError::InvalidConfig {
                    message: format!("TOKEN_STORE must be 'supabase' or 'file', got '{}'", other),
                }))
            }
            None if supabase.is_some() => TokenStoreKind::Supabase,
            None => TokenStoreKind::File,
        };

        if token_store == TokenStoreKind::Supabase && supabase.is_none() {
            return Err(WorkspaceMcpError::Config(ConfigError::MissingEnvVar {
                var: "SUPABASE_URL".to_string(),
            }));
        }

        let token_store_path = match env_opt("TOKEN_STORE_PATH") {
            Some(path) => PathBuf::from(path),
            None if token_store == TokenStoreKind::File => Self::default_token_store_path()?,
            None => defaults.token_store_path,
        };

        let upstream_timeout_secs = env_opt("UPSTREAM_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.upstream_timeout_secs);

        Ok(Self {
            auth_secret: env_opt("AUTH_SECRET"),
            api_keys: parse_api_keys(&std::env::var("MCP_API_KEYS").unwrap_or_default()),
            public_base_url,
            bind_addr,
            google_client,
            google_endpoints: GoogleEndpoints::default(),
            token_store,
            supabase,
            token_store_path,
            upstream_timeout_secs,
            calendar_time_zone: env_opt("CALENDAR_TIME_ZONE")
                .unwrap_or(defaults.calendar_time_zone),
            strict_token_kinds: env_opt("STRICT_TOKEN_KINDS")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            scopes: defaults.scopes,
        })
    }

    /// Google client credentials from a keys file or from the environment
    fn load_google_client(redirect_uri: &str) -> Result<ApplicationSecret> {
        if let Some(path) = env_opt("GOOGLE_OAUTH_KEYS_PATH") {
            let content = std::fs::read(&path)?;
            let mut secret = yup_oauth2::parse_application_secret(content).map_err(|e| {
                WorkspaceMcpError::Config(ConfigError::InvalidConfig {
                    message: format!("Invalid OAuth keys file {}: {}", path, e),
                })
            })?;
            secret.redirect_uris = vec![redirect_uri.to_string()];
            return Ok(secret);
        }

        Ok(google_client(
            env_opt("GOOGLE_CLIENT_ID").unwrap_or_default(),
            env_opt("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri,
        ))
    }

    /// Default token file location, creating the directory if necessary
    fn default_token_store_path() -> Result<PathBuf> {
        let dir = dirs::home_dir()
            .ok_or(WorkspaceMcpError::Config(ConfigError::HomeDirNotFound))?
            .join(".workspace-mcp");

        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }

        Ok(dir.join("tokens.json"))
    }

    /// OAuth issuer identifier (the base URL)
    pub fn issuer(&self) -> &str {
        &self.public_base_url
    }

    /// Redirect URI registered with Google
    pub fn google_redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.public_base_url)
    }

    /// Human-facing page that starts the Google authorization
    pub fn login_url(&self) -> String {
        format!("{}/auth/login", self.public_base_url)
    }
}

impl Default for Config {
    fn default() -> Self {
        let public_base_url = "http://localhost:3000".to_string();
        let redirect_uri = format!("{}/auth/callback", public_base_url);

        Self {
            auth_secret: None,
            api_keys: Vec::new(),
            public_base_url,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            google_client: google_client(String::new(), String::new(), &redirect_uri),
            google_endpoints: GoogleEndpoints::default(),
            token_store: TokenStoreKind::File,
            supabase: None,
            token_store_path: std::env::temp_dir().join("workspace-mcp-tokens.json"),
            upstream_timeout_secs: 20,
            calendar_time_zone: "Europe/Berlin".to_string(),
            strict_token_kinds: false,
            scopes: google::SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn google_client(
    client_id: String,
    client_secret: String,
    redirect_uri: &str,
) -> ApplicationSecret {
    ApplicationSecret {
        client_id,
        client_secret,
        auth_uri: google::AUTH_URI.to_string(),
        token_uri: google::TOKEN_URI.to_string(),
        redirect_uris: vec![redirect_uri.to_string()],
        ..Default::default()
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a comma-separated key list, dropping blanks
pub fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Lifetimes of self-issued credentials
pub mod tokens {
    /// Marker prefix of self-issued bearer tokens
    pub const BEARER_PREFIX: &str = "gws_";

    /// Access token lifetime (24 hours)
    pub const ACCESS_TTL_SECS: i64 = 86_400;

    /// Refresh token lifetime (90 days)
    pub const REFRESH_TTL_SECS: i64 = 90 * 86_400;

    /// Authorization code lifetime (5 minutes)
    pub const CODE_TTL_SECS: i64 = 300;
}

/// Request gate limits
pub mod rate_limit {
    /// Fixed window length
    pub const WINDOW_SECS: u64 = 60;

    /// Requests allowed per identity per window
    pub const MAX_REQUESTS: u32 = 100;
}

/// Google API constants
pub mod google {
    pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
    pub const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

    pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
    pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/calendars/primary";
    pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
    pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
    pub const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";

    /// Scopes requested on every consent
    pub const SCOPES: &[&str] = &[
        "https://mail.google.com/",
        "https://www.googleapis.com/auth/calendar",
        "https://www.googleapis.com/auth/drive",
        "https://www.googleapis.com/auth/userinfo.email",
        "openid",
    ];

    /// Google Workspace MIME types
    pub mod mime {
        pub const DOCUMENT: &str = "application/vnd.google-apps.document";
        pub const SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";
        pub const PRESENTATION: &str = "application/vnd.google-apps.presentation";
        pub const FOLDER: &str = "application/vnd.google-apps.folder";
    }
}
