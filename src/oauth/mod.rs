//! Self-contained OAuth 2.0 authorization server
//!
//! Password-gated authorization codes, a token endpoint for the
//! `authorization_code` and `refresh_token` grants, open client registration
//! and the discovery document.

pub mod authorize;
pub mod discovery;
pub mod register;
pub mod token;

pub use authorize::{authorize_form, authorize_submit, AuthorizationOutcome};
pub use discovery::{discovery, AuthorizationServerMetadata};
pub use register::{register, ClientRegistration};
pub use token::{token, TokenRequest, TokenResponse};
