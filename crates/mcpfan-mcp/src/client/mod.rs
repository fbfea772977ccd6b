//! Protocol clients
//!
//! `ProtocolClient` is the seam the registry drives; `McpClient` is the
//! rmcp-backed implementation.

mod handler;
mod mcp;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mcpfan_core::{branding, RegistrySettings, TransportError};
use parking_lot::RwLock;
use rmcp::model::{ProtocolVersion, ResourceContents, ServerCapabilities};
use thiserror::Error;

use crate::transport::ClientTransport;

pub use handler::McpClientHandler;
pub use mcp::McpClient;

/// Errors reported by a protocol client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Client is not connected")]
    NotConnected,

    #[error("Client is already connected")]
    AlreadyConnected,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("MCP handshake failed: {0}")]
    Handshake(String),

    #[error("MCP request failed: {0}")]
    Request(String),

    #[error("Failed to shut down client: {0}")]
    Shutdown(String),
}

/// Identity a client announces to the server during initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: String,
    pub version: String,
    pub protocol_version: ProtocolVersion,
}

impl ClientIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Identity from registry settings, with an optional name override
    pub fn from_settings(settings: &RegistrySettings, name: Option<&str>) -> Self {
        Self {
            name: name
                .map(str::to_string)
                .unwrap_or_else(|| settings.client_name.clone()),
            version: settings.client_version.clone(),
            protocol_version: ProtocolVersion::default(),
        }
    }
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            name: branding::default_client_name(),
            version: branding::CLIENT_VERSION.to_string(),
            protocol_version: ProtocolVersion::default(),
        }
    }
}

/// Observer for asynchronous client errors. Never awaited.
pub type ErrorHook = Arc<dyn Fn(&ProtocolError) + Send + Sync>;

/// Observer fired once when the client's connection ends
pub type CloseHook = Arc<dyn Fn() + Send + Sync>;

/// Registered observers for one client.
///
/// Close hooks fire at most once per connection.
#[derive(Default)]
pub struct ClientHooks {
    error: RwLock<Vec<ErrorHook>>,
    close: RwLock<Vec<CloseHook>>,
    closed: AtomicBool,
}

impl ClientHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&self, hook: ErrorHook) {
        self.error.write().push(hook);
    }

    pub fn add_close(&self, hook: CloseHook) {
        self.close.write().push(hook);
    }

    pub fn report_error(&self, error: &ProtocolError) {
        let hooks = self.error.read().clone();
        for hook in hooks {
            hook(error);
        }
    }

    pub fn report_close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let hooks = self.close.read().clone();
        for hook in hooks {
            hook();
        }
    }

    /// Re-arm close hooks for a new connection
    pub(crate) fn reset(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }
}

/// A stateful handle bound to one transport
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    fn identity(&self) -> &ClientIdentity;

    /// Open the transport and run the initialization handshake
    async fn connect(&self, transport: Arc<dyn ClientTransport>) -> Result<(), ProtocolError>;

    /// Shut the client down. Closing an unconnected client is a no-op.
    async fn close(&self) -> Result<(), ProtocolError>;

    fn on_error(&self, hook: ErrorHook);

    fn on_close(&self, hook: CloseHook);

    /// Capabilities the server advertised, once negotiation completed
    fn server_capabilities(&self) -> Option<ServerCapabilities>;

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, ProtocolError>;
}

/// Builds protocol clients for the aggregation facade
pub trait ClientFactory: Send + Sync {
    fn create(&self, identity: ClientIdentity) -> Arc<dyn ProtocolClient>;
}

/// Factory producing rmcp-backed clients
#[derive(Debug, Default, Clone, Copy)]
pub struct McpClientFactory;

impl ClientFactory for McpClientFactory {
    fn create(&self, identity: ClientIdentity) -> Arc<dyn ProtocolClient> {
        Arc::new(McpClient::new(identity))
    }
}
