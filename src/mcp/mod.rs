//! MCP (Model Context Protocol) module
//!
//! JSON-RPC transport and the Workspace tool catalog.

pub mod server;
pub mod tools;
pub mod types;

pub use server::{mcp_method_not_allowed, mcp_post, McpServer};
pub use tools::ToolHandler;
