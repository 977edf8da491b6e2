//! Google Workspace MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing Gmail, Calendar and Drive
//! tools over HTTP, with its own OAuth 2.0 authorization server for agents
//! and per-user Google credential brokering.

pub mod auth;
pub mod config;
pub mod error;
pub mod google;
pub mod mcp;
pub mod oauth;
pub mod pages;
pub mod server;

pub use config::Config;
pub use error::{Result, WorkspaceMcpError};
pub use server::{build_router, serve, AppState};
