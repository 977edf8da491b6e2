//! Google Workspace integration
//!
//! Per-user credential brokering and the Gmail, Calendar and Drive
//! operations exposed as tools.

pub mod broker;
pub mod calendar;
pub mod client;
pub mod drive;
pub mod gmail;
pub mod store;
pub mod types;
pub mod utils;

pub use broker::{normalize_email, ExchangeOutcome, WorkspaceBroker};
pub use calendar::{CalendarApi, EventChanges, WorkingHours};
pub use client::GoogleClient;
pub use drive::DriveApi;
pub use gmail::{ComposeParams, GmailApi};
pub use store::{
    build_token_store, FileTokenStore, MemoryTokenStore, SupabaseTokenStore, TokenRecord,
    TokenStore,
};
