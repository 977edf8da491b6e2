//! HTTP server
//!
//! Shared application state, the router and the human-facing Google
//! authorization pages.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::auth::clock::Clock;
use crate::auth::{request_gate, CredentialVerifier, GateState, RateLimiter, TokenCodec};
use crate::config::Config;
use crate::error::Result;
use crate::google::{TokenStore, WorkspaceBroker};
use crate::mcp::{mcp_method_not_allowed, mcp_post, McpServer, ToolHandler};
use crate::oauth::{authorize_form, authorize_submit, discovery, register, token};
use crate::pages;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub codec: Arc<TokenCodec>,
    pub verifier: Arc<CredentialVerifier>,
    pub limiter: Arc<RateLimiter>,
    pub broker: Arc<WorkspaceBroker>,
    pub mcp: Arc<McpServer>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let config = Arc::new(config);

        let codec = TokenCodec::new(config.auth_secret.as_deref(), clock.clone());
        if !codec.is_configured() {
            tracing::warn!("AUTH_SECRET is not set; authorization and signed tokens are disabled");
        }

        let verifier = CredentialVerifier::new(
            codec.clone(),
            config.api_keys.clone(),
            config.strict_token_kinds,
        );
        let limiter = RateLimiter::with_defaults(clock.clone());
        let broker = Arc::new(WorkspaceBroker::new(config.clone(), store, clock)?);
        let tools = ToolHandler::new(broker.clone(), config.calendar_time_zone.clone());

        Ok(Self {
            codec: Arc::new(codec),
            verifier: Arc::new(verifier),
            limiter: Arc::new(limiter),
            mcp: Arc::new(McpServer::new(tools)),
            broker,
            config,
        })
    }

    /// State handed to the request gate
    pub fn gate(&self) -> GateState {
        GateState {
            limiter: self.limiter.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let gate = state.gate();

    Router::new()
        .route("/", get(landing))
        .route("/favicon.ico", get(favicon))
        .route("/.well-known/oauth-authorization-server", get(discovery))
        .route("/api/oauth/authorize", get(authorize_form).post(authorize_submit))
        .route("/api/oauth/token", post(token))
        .route("/api/oauth/register", post(register))
        .route("/auth/login", get(auth_login))
        .route("/auth/callback", get(auth_callback))
        .route("/api/mcp", post(mcp_post).fallback(mcp_method_not_allowed))
        .layer(middleware::from_fn_with_state(gate, request_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, issuer = %state.config.issuer(), "listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn landing(State(state): State<AppState>) -> Html<String> {
    Html(pages::landing_page(&state.config.login_url()))
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    #[serde(default)]
    state: String,
}

/// Redirect to Google's consent screen
async fn auth_login(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Response {
    match state.broker.auth_url(&query.state) {
        Ok(url) => (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response(),
        Err(e) => {
            tracing::error!("Failed to build Google consent URL: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::callback_failure("Configuration error", &e.to_string())),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

/// Google redirects here after consent
async fn auth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error {
        tracing::info!(error = %error, "Google authorization denied");
        return Html(pages::callback_failure("Authorization denied", &error)).into_response();
    }

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing code").into_response();
    };

    match state.broker.exchange(&code).await {
        Ok(outcome) => Html(pages::callback_success(&outcome.email)).into_response(),
        Err(e) => {
            tracing::warn!("Google authorization failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::callback_failure("Error", &e.to_string())),
            )
                .into_response()
        }
    }
}
