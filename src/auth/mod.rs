//! Inbound authentication
//!
//! Signed tokens, credential verification, rate limiting and the request gate.

pub mod clock;
pub mod credentials;
pub mod gate;
pub mod rate_limit;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::CredentialVerifier;
pub use gate::{request_gate, GateRejection, GateState};
pub use rate_limit::RateLimiter;
pub use token::{BearerClaims, CodeClaims, TokenCodec, TokenKind};
