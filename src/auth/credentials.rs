//! Inbound credential verification
//!
//! A request is authorized by either a static pre-shared API key or a
//! self-issued signed bearer token.

use subtle::Choice;

use crate::auth::token::{secret_eq, BearerClaims, TokenCodec, TokenKind};

/// Decides whether an `Authorization` header carries a valid credential
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    codec: TokenCodec,
    api_keys: Vec<String>,
    strict_kinds: bool,
}

impl CredentialVerifier {
    pub fn new(codec: TokenCodec, api_keys: Vec<String>, strict_kinds: bool) -> Self {
        Self {
            codec,
            api_keys,
            strict_kinds,
        }
    }

    /// Validate an `Authorization` header value
    pub fn validate(&self, header: Option<&str>) -> bool {
        let Some(token) = header.and_then(extract_bearer) else {
            return false;
        };

        if self.matches_api_key(token) {
            return true;
        }

        match self.codec.verify::<BearerClaims>(token) {
            Some(claims) => !self.strict_kinds || claims.kind == TokenKind::Access,
            None => false,
        }
    }

    /// Validate a refresh token presented to the token endpoint
    ///
    /// Without strict kinds any credential accepted by [`validate`](Self::validate)
    /// also works here, access tokens included.
    pub fn validate_refresh(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }

        if self.matches_api_key(token) {
            return true;
        }

        match self.codec.verify::<BearerClaims>(token) {
            Some(claims) => !self.strict_kinds || claims.kind == TokenKind::Refresh,
            None => false,
        }
    }

    /// Checks every configured key without stopping at the first match
    fn matches_api_key(&self, token: &str) -> bool {
        let matched = self
            .api_keys
            .iter()
            .fold(Choice::from(0), |acc, key| {
                acc | Choice::from(secret_eq(key.as_bytes(), token.as_bytes()) as u8)
            });
        bool::from(matched)
    }
}

/// Strip a case-insensitive `Bearer` scheme and surrounding whitespace
pub fn extract_bearer(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = match header.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {
            let rest = &header[6..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest
            } else {
                header
            }
        }
        _ => header,
    }
    .trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::clock::ManualClock;

    fn verifier(strict: bool) -> (CredentialVerifier, TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let codec = TokenCodec::new(Some("s3cret"), clock.clone());
        let verifier = CredentialVerifier::new(
            codec.clone(),
            vec!["static-key-1".to_string(), "k2".to_string()],
            strict,
        );
        (verifier, codec, clock)
    }

    #[test]
    fn test_rejects_empty_headers() {
        let (verifier, _, _) = verifier(false);
        assert!(!verifier.validate(None));
        for header in ["", "Bearer", "Bearer ", "bearer   "] {
            assert!(!verifier.validate(Some(header)), "{:?}", header);
        }
    }

    #[test]
    fn test_rejects_expired_token() {
        let (verifier, codec, clock) = verifier(false);
        let (token, _) = codec.issue_bearer(TokenKind::Access, 60).unwrap();
        assert!(verifier.validate(Some(&format!("Bearer {}", token))));

        clock.advance_secs(61);
        assert!(!verifier.validate(Some(&format!("Bearer {}", token))));
    }

    #[test]
    fn test_static_keys() {
        let (verifier, _, _) = verifier(false);
        assert!(verifier.validate(Some("Bearer static-key-1")));
        assert!(verifier.validate(Some("Bearer k2")));
        assert!(!verifier.validate(Some("Bearer static-key")));
        assert!(!verifier.validate(Some("Bearer static-key-12")));
    }

    #[test]
    fn test_case_insensitive_scheme() {
        let (verifier, codec, _) = verifier(false);
        let (token, _) = codec.issue_bearer(TokenKind::Access, 60).unwrap();
        assert!(verifier.validate(Some(&format!("bearer {}", token))));
        assert!(verifier.validate(Some(&format!("BEARER   {}  ", token))));
    }

    #[test]
    fn test_kind_is_ignored_by_default() {
        let (verifier, codec, _) = verifier(false);
        let (access, _) = codec.issue_bearer(TokenKind::Access, 60).unwrap();
        let (refresh, _) = codec.issue_bearer(TokenKind::Refresh, 60).unwrap();
        assert!(verifier.validate(Some(&format!("Bearer {}", refresh))));
        assert!(verifier.validate_refresh(&access));
    }

    #[test]
    fn test_strict_kinds() {
        let (verifier, codec, _) = verifier(true);
        let (access, _) = codec.issue_bearer(TokenKind::Access, 60).unwrap();
        let (refresh, _) = codec.issue_bearer(TokenKind::Refresh, 60).unwrap();

        assert!(verifier.validate(Some(&format!("Bearer {}", access))));
        assert!(!verifier.validate(Some(&format!("Bearer {}", refresh))));
        assert!(verifier.validate_refresh(&refresh));
        assert!(!verifier.validate_refresh(&access));
        assert!(verifier.validate(Some("Bearer k2")));
    }

    #[test]
    fn test_authorization_code_is_not_a_credential() {
        let (verifier, codec, _) = verifier(false);
        let code = codec.issue_code("https://x/cb", "chal").unwrap();
        assert!(!verifier.validate(Some(&format!("Bearer {}", code))));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("  abc "), Some("abc"));
        assert_eq!(extract_bearer("Bearerabc"), Some("Bearerabc"));
        assert_eq!(extract_bearer("Bearer"), None);
        assert_eq!(extract_bearer(""), None);
    }
}
