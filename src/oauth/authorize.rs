//! Authorization endpoint: password challenge and code issuance

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use url::Url;

use crate::auth::token::TokenCodec;
use crate::pages::{authorize_page, AuthorizeFields};
use crate::server::AppState;

const INVALID_PASSWORD: &str = "Invalid password. Try again.";
const INVALID_REDIRECT: &str = "The redirect_uri of this request is not a valid URL.";

#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeQuery {
    #[serde(default)]
    redirect_uri: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    code_challenge: String,
}

impl From<AuthorizeQuery> for AuthorizeFields {
    fn from(query: AuthorizeQuery) -> Self {
        Self {
            redirect_uri: query.redirect_uri,
            state: query.state,
            code_challenge: query.code_challenge,
        }
    }
}

/// Result of a password submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// Re-render the prompt with an inline error
    Challenge {
        fields: AuthorizeFields,
        error: &'static str,
        status: StatusCode,
    },
    /// Send the user agent back to the client with a code
    Redirect(Url),
}

impl IntoResponse for AuthorizationOutcome {
    fn into_response(self) -> Response {
        match self {
            AuthorizationOutcome::Challenge {
                fields,
                error,
                status,
            } => (status, Html(authorize_page(&fields, Some(error)))).into_response(),
            AuthorizationOutcome::Redirect(url) => {
                (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
            }
        }
    }
}

/// Split a urlencoded submission into the round-tripped fields and the password
pub fn parse_submission(body: &[u8]) -> (AuthorizeFields, String) {
    let mut fields = AuthorizeFields::default();
    let mut password = String::new();

    for (key, value) in url::form_urlencoded::parse(body) {
        assign_field(&mut fields, &mut password, &key, value.into_owned());
    }

    (fields, password)
}

/// Same as [`parse_submission`] for a `multipart/form-data` body
pub async fn parse_multipart_submission(
    mut multipart: Multipart,
) -> Result<(AuthorizeFields, String), MultipartError> {
    let mut fields = AuthorizeFields::default();
    let mut password = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let value = field.text().await?;
        assign_field(&mut fields, &mut password, &name, value);
    }

    Ok((fields, password))
}

fn assign_field(fields: &mut AuthorizeFields, password: &mut String, key: &str, value: String) {
    match key {
        "redirect_uri" => fields.redirect_uri = value,
        "state" => fields.state = value,
        "code_challenge" => fields.code_challenge = value,
        "password" => *password = value,
        _ => {}
    }
}

/// Check the password and mint a code bound to the redirect URI and challenge
pub fn submit(codec: &TokenCodec, fields: AuthorizeFields, password: &str) -> AuthorizationOutcome {
    if !codec.secret_matches(password) {
        return AuthorizationOutcome::Challenge {
            fields,
            error: INVALID_PASSWORD,
            status: StatusCode::OK,
        };
    }

    let Ok(mut url) = Url::parse(&fields.redirect_uri) else {
        return AuthorizationOutcome::Challenge {
            fields,
            error: INVALID_REDIRECT,
            status: StatusCode::BAD_REQUEST,
        };
    };

    let code = match codec.issue_code(&fields.redirect_uri, &fields.code_challenge) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Failed to issue authorization code: {}", e);
            return AuthorizationOutcome::Challenge {
                fields,
                error: INVALID_PASSWORD,
                status: StatusCode::OK,
            };
        }
    };

    let mut params = vec![("code", code)];
    if !fields.state.is_empty() {
        params.push(("state", fields.state.clone()));
    }
    set_query_params(&mut url, &params);

    tracing::info!(redirect_host = url.host_str().unwrap_or_default(), "issued authorization code");
    AuthorizationOutcome::Redirect(url)
}

/// Replace (not append) the given query parameters
fn set_query_params(url: &mut Url, params: &[(&str, String)]) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !params.iter().any(|(name, _)| &**k == *name))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (k, v) in &kept {
        pairs.append_pair(k, v);
    }
    for (k, v) in params {
        pairs.append_pair(k, v);
    }
}

/// `GET /api/oauth/authorize`
pub async fn authorize_form(Query(query): Query<AuthorizeQuery>) -> Html<String> {
    Html(authorize_page(&query.into(), None))
}

/// `POST /api/oauth/authorize`, multipart, form-encoded or raw urlencoded body
pub async fn authorize_submit(State(state): State<AppState>, request: Request) -> Response {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let submission = if is_multipart {
        let multipart = match Multipart::from_request(request, &state).await {
            Ok(multipart) => multipart,
            Err(rejection) => return rejection.into_response(),
        };
        match parse_multipart_submission(multipart).await {
            Ok(submission) => submission,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    } else {
        match Bytes::from_request(request, &state).await {
            Ok(body) => parse_submission(&body),
            Err(rejection) => return rejection.into_response(),
        }
    };

    let (fields, password) = submission;
    submit(&state.codec, fields, &password).into_response()
}
