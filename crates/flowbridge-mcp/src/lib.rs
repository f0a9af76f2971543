//! FlowBridge MCP (Model Context Protocol) Server
//!
//! Exposes every flow of a [`flowbridge_core::FlowCatalog`] as an MCP tool,
//! speaking newline-delimited JSON-RPC 2.0 over stdio.

pub mod adapter;
pub mod error;
pub mod jsonrpc;
pub mod mcp;
pub mod server;

// Re-export key types
pub use adapter::{ToolAdapter, ToolOutput, ToolOutputStream};
pub use error::{McpError, McpResult};
pub use server::McpServer;

pub use server::{serve, serve_stdio};
