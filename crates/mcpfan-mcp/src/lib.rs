//! # McpFan MCP Library
//!
//! Manages several independent MCP client connections and fans requests out
//! across them.
//!
//! This crate provides:
//! - Stdio and Streamable HTTP transports on top of `rmcp`
//! - `ClientRegistry`: exclusive owner of every (client, transport) pair
//! - `ServerCollection`: creates clients and merges capabilities and
//!   resource reads across all of them
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      ServerCollection                           │
//! │   add_http_client / add_stdio_client                            │
//! │   get_client_capabilities / get_resource_values / close         │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       ClientRegistry                            │
//! │  clients:    client_id → ProtocolClient                         │
//! │  transports: client_id → ClientTransport (once connected)       │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────┐  ┌──────────────────┐
//! │  StdioTransport  │  │   HttpTransport  │
//! │  (child process) │  │ (Streamable HTTP)│
//! └──────────────────┘  └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mcpfan_mcp::ServerCollection;
//!
//! let servers = ServerCollection::new();
//! servers.add_http_client("http://localhost:3000/mcp", None, None).await?;
//! servers.add_stdio_client("npx", "-y @scope/files", None, None).await?;
//!
//! let capabilities = servers.get_client_capabilities()?;
//! let contents = servers.get_resource_values(&["file:///README.md".into()]).await?;
//!
//! let report = servers.close().await;
//! ```

pub mod aggregate;
pub mod client;
pub mod registry;
pub mod transport;

pub use aggregate::ServerCollection;
pub use client::{
    ClientFactory, ClientHooks, ClientIdentity, CloseHook, ErrorHook, McpClient,
    McpClientFactory, McpClientHandler, ProtocolClient, ProtocolError,
};
pub use registry::{ClientEntry, ClientRegistry};
pub use transport::{
    ClientTransport, HttpTransport, RmcpTransportFactory, StdioTransport, TransportChannel,
    TransportFactory,
};

// Protocol types that cross the public API
pub use rmcp::model::{ResourceContents, ServerCapabilities};
