//! Integration tests for the Google Workspace MCP Server
//!
//! Drive the full router in-process: OAuth endpoints, the request gate and
//! the MCP transport. Nothing here talks to Google.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;

use workspace_mcp_server::auth::ManualClock;
use workspace_mcp_server::config::Config;
use workspace_mcp_server::google::MemoryTokenStore;
use workspace_mcp_server::server::{build_router, AppState};

const SECRET: &str = "correct horse battery staple";
const API_KEY: &str = "static-key-1";
const START_MILLIS: i64 = 1_700_000_000_000;
const CLIENT_REDIRECT: &str = "https://agent.example/oauth/callback";

struct Harness {
    app: Router,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(START_MILLIS));
    let mut config = Config::default();
    config.auth_secret = Some(SECRET.to_string());
    config.api_keys = vec![API_KEY.to_string()];
    config.public_base_url = "https://mcp.example".to_string();

    let state = AppState::new(config, Arc::new(MemoryTokenStore::new()), clock.clone())
        .expect("app state");
    Harness {
        app: build_router(state),
        clock,
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("router call")
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn mcp(message: Value, authorization: Option<&str>, client_ip: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client_ip);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(message.to_string())).expect("request")
}

fn list_tools() -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})
}

/// Run the password challenge and return the issued code
async fn authorization_code(app: &Router, code_challenge: &str) -> String {
    let body = format!(
        "redirect_uri={}&state=xyz&code_challenge={}&password={}",
        urlencoding::encode(CLIENT_REDIRECT),
        urlencoding::encode(code_challenge),
        urlencoding::encode(SECRET),
    );
    let response = send(app, form("/api/oauth/authorize", &body)).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let url = Url::parse(&location).unwrap();
    assert!(location.starts_with(CLIENT_REDIRECT));

    let state = url.query_pairs().find(|(k, _)| k == "state").map(|(_, v)| v.into_owned());
    assert_eq!(state.as_deref(), Some("xyz"));

    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .expect("code parameter")
}

async fn token_grant(app: &Router, body: &str) -> Response<Body> {
    send(app, form("/api/oauth/token", body)).await
}

fn code_grant(code: &str) -> String {
    format!("grant_type=authorization_code&code={}", urlencoding::encode(code))
}

mod oauth_tests {
    use super::*;

    #[tokio::test]
    async fn test_discovery_document() {
        let h = harness();
        let response = send(&h.app, get("/.well-known/oauth-authorization-server")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let doc = body_json(response).await;
        assert_eq!(doc["issuer"], "https://mcp.example");
        assert_eq!(doc["authorization_endpoint"], "https://mcp.example/api/oauth/authorize");
        assert_eq!(doc["token_endpoint"], "https://mcp.example/api/oauth/token");
        assert_eq!(doc["registration_endpoint"], "https://mcp.example/api/oauth/register");
        assert_eq!(doc["code_challenge_methods_supported"], json!(["S256"]));
    }

    #[tokio::test]
    async fn test_authorize_form_carries_fields() {
        let h = harness();
        let uri = format!(
            "/api/oauth/authorize?redirect_uri={}&state=s%22tate&code_challenge=abc",
            urlencoding::encode(CLIENT_REDIRECT)
        );
        let response = send(&h.app, get(&uri)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let page = body_text(response).await;
        assert!(page.contains(&format!(r#"name="redirect_uri" value="{}""#, CLIENT_REDIRECT)));
        assert!(page.contains(r#"name="state" value="s&quot;tate""#));
        assert!(page.contains(r#"name="code_challenge" value="abc""#));
        assert!(page.contains(r#"type="password""#));
    }

    #[tokio::test]
    async fn test_multipart_submission_issues_code() {
        let h = harness();
        let boundary = "----form-boundary-7MA4YWxk";
        let mut body = String::new();
        for (name, value) in [
            ("redirect_uri", CLIENT_REDIRECT),
            ("state", "xyz"),
            ("code_challenge", "chal"),
            ("password", SECRET),
        ] {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            ));
        }
        body.push_str(&format!("--{}--\r\n", boundary));

        let request = Request::builder()
            .method("POST")
            .uri("/api/oauth/authorize")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();
        let response = send(&h.app, request).await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let location = response.headers()[header::LOCATION].to_str().unwrap();
        let url = Url::parse(location).unwrap();
        assert!(location.starts_with(CLIENT_REDIRECT));
        assert!(url.query_pairs().any(|(k, _)| k == "code"));
        assert!(url.query_pairs().any(|(k, v)| k == "state" && v == "xyz"));
    }

    #[tokio::test]
    async fn test_wrong_password_rerenders_challenge() {
        let h = harness();
        let body = format!(
            "redirect_uri={}&state=xyz&code_challenge=&password=guess",
            urlencoding::encode(CLIENT_REDIRECT)
        );
        let response = send(&h.app, form("/api/oauth/authorize", &body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::LOCATION).is_none());

        let page = body_text(response).await;
        assert!(page.contains("Invalid password"));
        assert!(page.contains(r#"name="state" value="xyz""#));
    }

    #[tokio::test]
    async fn test_code_exchange_is_repeatable() {
        let h = harness();
        let code = authorization_code(&h.app, "").await;
        let body = code_grant(&code);

        for _ in 0..2 {
            let response = token_grant(&h.app, &body).await;
            assert_eq!(response.status(), StatusCode::OK);

            let tokens = body_json(response).await;
            assert_eq!(tokens["token_type"], "Bearer");
            assert_eq!(tokens["expires_in"], 86_400);
            assert!(tokens["access_token"].as_str().unwrap().starts_with("gws_"));
            assert!(tokens["refresh_token"].as_str().unwrap().starts_with("gws_"));
        }
    }

    #[tokio::test]
    async fn test_code_expires_after_five_minutes() {
        let h = harness();
        let code = authorization_code(&h.app, "").await;
        h.clock.advance_secs(301);

        let body = code_grant(&code);
        let response = token_grant(&h.app, &body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid_grant");
    }

    #[tokio::test]
    async fn test_pkce_verifier_checked_when_supplied() {
        let h = harness();
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let code = authorization_code(&h.app, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM").await;

        let wrong = format!(
            "grant_type=authorization_code&code={}&code_verifier=nope",
            urlencoding::encode(&code)
        );
        assert_eq!(token_grant(&h.app, &wrong).await.status(), StatusCode::BAD_REQUEST);

        let right = format!(
            "grant_type=authorization_code&code={}&code_verifier={}",
            urlencoding::encode(&code),
            verifier
        );
        assert_eq!(token_grant(&h.app, &right).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_refresh_grant() {
        let h = harness();
        let code = authorization_code(&h.app, "").await;
        let tokens = body_json(token_grant(&h.app, &code_grant(&code)).await).await;

        for presented in [&tokens["refresh_token"], &tokens["access_token"]] {
            let body = format!(
                "grant_type=refresh_token&refresh_token={}",
                urlencoding::encode(presented.as_str().unwrap())
            );
            let response = token_grant(&h.app, &body).await;
            assert_eq!(response.status(), StatusCode::OK);

            let refreshed = body_json(response).await;
            assert!(refreshed["access_token"].as_str().unwrap().starts_with("gws_"));
            assert!(refreshed.get("refresh_token").is_none());
        }
    }

    #[tokio::test]
    async fn test_refresh_grant_accepts_json_body() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/api/oauth/token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"grant_type": "refresh_token", "refresh_token": API_KEY}).to_string(),
            ))
            .unwrap();
        assert_eq!(send(&h.app, request).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_refresh_token() {
        let h = harness();
        let response =
            token_grant(&h.app, "grant_type=refresh_token&refresh_token=gws_bogus.sig").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid_grant");
    }

    #[tokio::test]
    async fn test_unsupported_grant() {
        let h = harness();
        let response = token_grant(&h.app, "grant_type=client_credentials").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "unsupported_grant_type");
    }

    #[tokio::test]
    async fn test_registration() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/api/oauth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"client_name": "Agent", "redirect_uris": [CLIENT_REDIRECT]}).to_string(),
            ))
            .unwrap();
        let response = send(&h.app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let client = body_json(response).await;
        assert_eq!(client["client_name"], "Agent");
        assert_eq!(client["redirect_uris"], json!([CLIENT_REDIRECT]));
        assert!(!client["client_id"].as_str().unwrap().is_empty());
        assert!(!client["client_secret"].as_str().unwrap().is_empty());
    }
}

mod gate_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credentials_rejected() {
        let h = harness();
        for authorization in [None, Some(""), Some("Bearer"), Some("Bearer "), Some("Basic abc")] {
            let response = send(&h.app, mcp(list_tools(), authorization, "10.0.0.1")).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                response.headers()[header::WWW_AUTHENTICATE],
                "Bearer realm=\"Google Workspace MCP\""
            );
            assert_eq!(body_json(response).await["error"], "unauthorized");
        }
    }

    #[tokio::test]
    async fn test_static_key_lists_tools() {
        let h = harness();
        let auth = format!("Bearer {}", API_KEY);
        let response = send(&h.app, mcp(list_tools(), Some(&auth), "10.0.0.2")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["id"], 1);
        assert_eq!(json["result"]["tools"].as_array().unwrap().len(), 22);
    }

    #[tokio::test]
    async fn test_issued_token_authorizes_until_expiry() {
        let h = harness();
        let code = authorization_code(&h.app, "").await;
        let tokens = body_json(token_grant(&h.app, &code_grant(&code)).await).await;
        let auth = format!("bearer {}", tokens["access_token"].as_str().unwrap());

        let response = send(&h.app, mcp(list_tools(), Some(&auth), "10.0.0.3")).await;
        assert_eq!(response.status(), StatusCode::OK);

        h.clock.advance_secs(86_400);
        let response = send(&h.app, mcp(list_tools(), Some(&auth), "10.0.0.3")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let h = harness();
        let auth = format!("Bearer {}", API_KEY);

        for _ in 0..100 {
            let response = send(&h.app, mcp(list_tools(), Some(&auth), "203.0.113.7")).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = send(&h.app, mcp(list_tools(), Some(&auth), "203.0.113.7")).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
        assert_eq!(body_json(response).await["error"], "rate_limit_exceeded");

        // Another client is unaffected
        let response = send(&h.app, mcp(list_tools(), Some(&auth), "203.0.113.8")).await;
        assert_eq!(response.status(), StatusCode::OK);

        h.clock.advance_secs(61);
        let response = send(&h.app, mcp(list_tools(), Some(&auth), "203.0.113.7")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_precedes_auth() {
        let h = harness();
        for _ in 0..100 {
            send(&h.app, mcp(list_tools(), None, "198.51.100.1")).await;
        }
        let response = send(&h.app, mcp(list_tools(), None, "198.51.100.1")).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_public_paths_bypass_gate() {
        let h = harness();
        assert_eq!(send(&h.app, get("/")).await.status(), StatusCode::OK);
        assert_eq!(send(&h.app, get("/favicon.ico")).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            send(&h.app, get("/.well-known/oauth-authorization-server")).await.status(),
            StatusCode::OK
        );
        assert_eq!(send(&h.app, get("/api/oauth/authorize")).await.status(), StatusCode::OK);

        let login = send(&h.app, get("/auth/login?state=abc")).await;
        assert_eq!(login.status(), StatusCode::FOUND);
        let location = login.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://accounts.google.com/"));
        assert!(location.contains("state=abc"));
    }

    #[tokio::test]
    async fn test_callback_requires_code() {
        let h = harness();
        let response = send(&h.app, get("/auth/callback")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Missing code");

        let denied = send(&h.app, get("/auth/callback?error=access_denied")).await;
        assert_eq!(denied.status(), StatusCode::OK);
        assert!(body_text(denied).await.contains("access_denied"));
    }
}

mod mcp_transport_tests {
    use super::*;

    fn auth() -> String {
        format!("Bearer {}", API_KEY)
    }

    #[tokio::test]
    async fn test_notification_accepted_without_body() {
        let h = harness();
        let message = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        let response = send(&h.app, mcp(message, Some(&auth()), "10.1.0.1")).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_not_allowed() {
        let h = harness();
        let request = Request::builder()
            .uri("/api/mcp")
            .header(header::AUTHORIZATION, auth())
            .body(Body::empty())
            .unwrap();
        let response = send(&h.app, request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_tool_call_for_unknown_user() {
        let h = harness();
        let message = json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": "gmail_search", "arguments": {"userEmail": "ada@example.com", "query": "is:unread"}}
        });
        let response = send(&h.app, mcp(message, Some(&auth()), "10.1.0.2")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["result"]["isError"], true);
        let text = json["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("https://mcp.example/auth/login"));
    }

    #[tokio::test]
    async fn test_unparseable_body() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/api/mcp")
            .header(header::AUTHORIZATION, auth())
            .body(Body::from("{oops"))
            .unwrap();
        let response = send(&h.app, request).await;
        assert_eq!(body_json(response).await["error"]["code"], -32700);
    }
}
