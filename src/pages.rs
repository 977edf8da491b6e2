//! Human-facing HTML pages
//!
//! Rendered with maud, which escapes every interpolated value, so the
//! round-tripped hidden fields of the authorization form cannot break out
//! of their attributes.

use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = "\
body{font-family:-apple-system,BlinkMacSystemFont,sans-serif;display:flex;justify-content:center;align-items:center;min-height:100vh;margin:0;background:#0a0a0a;color:#fff}\
.card{background:#1a1a1a;border:1px solid #333;border-radius:12px;padding:2rem;max-width:420px;width:90%}\
h1{font-size:1.3rem;margin:0 0 .5rem}\
p{color:#888;font-size:.9rem;margin:0 0 1.5rem}\
input{width:100%;padding:.75rem;border:1px solid #333;border-radius:8px;background:#111;color:#fff;font-size:1rem;box-sizing:border-box;margin-bottom:1rem}\
button{width:100%;padding:.75rem;border:none;border-radius:8px;background:#3b82f6;color:#fff;font-size:1rem;cursor:pointer}\
button:hover{background:#2563eb}\
a{color:#3b82f6}\
ul{list-style:none;padding:0}\
.err{color:#ef4444;font-size:.85rem;margin-bottom:1rem}";

/// Values carried through the password challenge unmodified
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizeFields {
    pub redirect_uri: String,
    pub state: String,
    pub code_challenge: String,
}

fn layout(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width,initial-scale=1";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                div class="card" { (body) }
            }
        }
    }
    .into_string()
}

/// Password challenge, optionally with an inline error
pub fn authorize_page(fields: &AuthorizeFields, error: Option<&str>) -> String {
    layout(
        "Google Workspace MCP - Authorize",
        html! {
            h1 { "Google Workspace MCP" }
            p { "Enter the access password to connect." }
            @if let Some(error) = error {
                div class="err" { (error) }
            }
            form method="POST" action="/api/oauth/authorize" {
                input type="hidden" name="redirect_uri" value=(fields.redirect_uri);
                input type="hidden" name="state" value=(fields.state);
                input type="hidden" name="code_challenge" value=(fields.code_challenge);
                input type="password" name="password" placeholder="Password" autofocus required;
                button type="submit" { "Authorize" }
            }
        },
    )
}

pub fn landing_page(login_url: &str) -> String {
    layout(
        "Google Workspace MCP",
        html! {
            h1 { "Google Workspace MCP" }
            p { "Remote tool server for Gmail, Calendar and Drive." }
            p {
                "Connect a Google account: "
                a href=(login_url) { "authorize with Google" }
            }
        },
    )
}

pub fn callback_success(email: &str) -> String {
    layout(
        "Google Workspace MCP - Connected",
        html! {
            h1 { "Connection successful" }
            p { strong { (email) } " is now connected to the Google Workspace MCP server." }
            ul {
                li { "Gmail: search, read, drafts, labels" }
                li { "Google Calendar: read, create and update events" }
                li { "Google Drive: search, read, create documents" }
            }
            p { "You can close this window. The connection stays active until you revoke it." }
        },
    )
}

pub fn callback_failure(title: &str, message: &str) -> String {
    layout(
        "Google Workspace MCP - Error",
        html! {
            h1 { (title) }
            div class="err" { (message) }
        },
    )
}
