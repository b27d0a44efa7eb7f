//! Yargı MCP server
//!
//! MCP (Model Context Protocol) surface over the unified Turkish
//! legal-database gateway: an immutable tool registry, a reentrant
//! dispatcher with deadlines and a uniform result envelope, and a thin
//! stdio transport shell.

/// Uniform envelope, validation and dispatch.
pub mod dispatch;
/// Server-level error type.
pub mod error;
/// Pools, adapters and telemetry behind one handle.
pub mod gateway;
/// Dispatcher worker limits.
pub mod limits;
/// Immutable tool registry.
pub mod registry;
/// MCP protocol shell.
pub mod server;
/// Tool parameter structs, handlers and registration.
pub mod tools;

use std::sync::Arc;

pub use dispatch::{Dispatcher, Envelope};
pub use error::{McpResult, McpServerError};
pub use gateway::Gateway;
pub use registry::ToolRegistry;
pub use server::GatewayServer;

/// Build the full stack (gateway, registry, dispatcher) from environment
/// configuration and serve MCP over stdio until the client disconnects.
///
/// # Errors
///
/// Returns an error when configuration is invalid (including a missing
/// backend credential for an enabled backend) or the transport fails.
pub async fn serve_stdio() -> McpResult<()> {
    let config = yargi_core::GatewayConfig::from_env()?;
    let gateway = Arc::new(Gateway::new(config)?);
    let registry = Arc::new(tools::register_all());
    let dispatcher = Dispatcher::new(registry, Arc::clone(&gateway));

    let server = GatewayServer::new(dispatcher);
    let outcome = server.serve_stdio().await;

    gateway.shutdown().await;
    outcome
}
