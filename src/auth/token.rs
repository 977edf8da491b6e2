//! Stateless signed tokens
//!
//! A token is `base64url(json payload) + "." + base64url(HMAC-SHA-256(encoded payload))`,
//! optionally preceded by a class prefix. Validity depends only on the token bytes,
//! the shared secret and the current time; nothing is stored server-side.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use uuid::Uuid;

use crate::auth::clock::Clock;
use crate::config::tokens::{BEARER_PREFIX, CODE_TTL_SECS};
use crate::error::TokenError;

type HmacSha256 = Hmac<Sha256>;

const MAC_LEN: usize = 32;

/// Class of a self-issued bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Payload of an access or refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerClaims {
    /// Issued at (ms since epoch)
    pub iat: i64,

    /// Expiry (ms since epoch)
    pub exp: i64,

    /// Random identifier
    pub jti: String,

    pub kind: TokenKind,
}

/// Payload of an authorization code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeClaims {
    /// Redirect URI of the authorization request
    pub redirect_uri: String,

    /// PKCE challenge of the authorization request (may be empty)
    pub code_challenge: String,

    /// Expiry (ms since epoch)
    pub exp: i64,
}

/// Issues and verifies signed tokens under one process-wide secret
#[derive(Clone)]
pub struct TokenCodec {
    secret: Option<Vec<u8>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("clock", &self.clock)
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec. A blank secret counts as unset.
    pub fn new(secret: Option<&str>, clock: Arc<dyn Clock>) -> Self {
        let secret = secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.as_bytes().to_vec());
        Self { secret, clock }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Current time in milliseconds
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Sign arbitrary claims
    pub fn issue<C: Serialize>(&self, claims: &C, prefix: &str) -> Result<String, TokenError> {
        let secret = self.secret.as_deref().ok_or(TokenError::SecretUnset)?;

        let json = serde_json::to_vec(claims).map_err(|e| TokenError::Encode {
            message: e.to_string(),
        })?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let mac = URL_SAFE_NO_PAD.encode(sign(secret, payload.as_bytes())?);

        Ok(format!("{}{}.{}", prefix, payload, mac))
    }

    /// Issue a prefixed bearer token of the given kind
    pub fn issue_bearer(
        &self,
        kind: TokenKind,
        ttl_secs: i64,
    ) -> Result<(String, BearerClaims), TokenError> {
        let now = self.clock.now_millis();
        let claims = BearerClaims {
            iat: now,
            exp: now + ttl_secs * 1000,
            jti: Uuid::new_v4().to_string(),
            kind,
        };
        let token = self.issue(&claims, BEARER_PREFIX)?;
        Ok((token, claims))
    }

    /// Issue a five-minute authorization code
    pub fn issue_code(
        &self,
        redirect_uri: &str,
        code_challenge: &str,
    ) -> Result<String, TokenError> {
        let claims = CodeClaims {
            redirect_uri: redirect_uri.to_string(),
            code_challenge: code_challenge.to_string(),
            exp: self.clock.now_millis() + CODE_TTL_SECS * 1000,
        };
        self.issue(&claims, "")
    }

    /// Verify a token and decode its claims
    ///
    /// Returns `None` when the secret is unset, the separator is missing, the MAC
    /// does not match, the payload is not JSON, `exp` is not a number or has passed,
    /// or the payload does not have the shape of `C`.
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Option<C> {
        let secret = self.secret.as_deref()?;

        let token = token.strip_prefix(BEARER_PREFIX).unwrap_or(token);
        let (payload, mac) = token.rsplit_once('.')?;

        let expected = sign(secret, payload.as_bytes()).ok()?;
        let presented = URL_SAFE_NO_PAD.decode(mac).unwrap_or_default();
        if !mac_matches(&expected, &presented) {
            return None;
        }

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let value: serde_json::Value = serde_json::from_slice(&json).ok()?;
        let exp = value.get("exp")?.as_i64()?;
        if exp <= self.clock.now_millis() {
            return None;
        }

        serde_json::from_value(value).ok()
    }

    /// Constant-time comparison of a candidate against the secret, both trimmed
    pub fn secret_matches(&self, candidate: &str) -> bool {
        match self.secret.as_deref() {
            Some(secret) => secret_eq(secret, candidate.trim().as_bytes()),
            None => false,
        }
    }
}

fn sign(secret: &[u8], data: &[u8]) -> Result<[u8; MAC_LEN], TokenError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| TokenError::Encode {
        message: e.to_string(),
    })?;
    mac.update(data);

    let mut out = [0u8; MAC_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Compare against a fixed-size buffer so short or long input does not exit early
fn mac_matches(expected: &[u8; MAC_LEN], presented: &[u8]) -> bool {
    let mut buf = [0u8; MAC_LEN];
    let n = presented.len().min(MAC_LEN);
    buf[..n].copy_from_slice(&presented[..n]);

    let len_ok = Choice::from((presented.len() == MAC_LEN) as u8);
    bool::from(expected.ct_eq(&buf) & len_ok)
}

/// Constant-time equality of arbitrary-length secrets via their SHA-256 digests
pub(crate) fn secret_eq(a: &[u8], b: &[u8]) -> bool {
    let a = Sha256::digest(a);
    let b = Sha256::digest(b);
    a.as_slice().ct_eq(b.as_slice()).into()
}
