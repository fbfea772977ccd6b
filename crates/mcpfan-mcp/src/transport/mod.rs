//! Transport abstraction for MCP connections
//!
//! A `ClientTransport` owns the channel a single client talks over. It is
//! opened exactly once by the client during connect and closed separately
//! during teardown, so the registry can release both halves independently.

mod http;
mod stdio;

use std::sync::Arc;

use async_trait::async_trait;
use mcpfan_core::{TransportError, TransportKind, TransportSpec};
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use tokio_util::sync::CancellationToken;

pub use http::HttpTransport;
pub use stdio::{configure_child_process_platform, StdioTransport};

/// The underlying rmcp channel handed to a client on connect.
///
/// The cancellation token stops the client's service loop; transports keep
/// a handle to it so closing the transport also ends the session.
pub struct TransportChannel {
    pub(crate) inner: ChannelInner,
    pub(crate) cancel: CancellationToken,
}

pub(crate) enum ChannelInner {
    Http(StreamableHttpClientTransport<reqwest::Client>),
    Stdio(TokioChildProcess),
}

impl TransportChannel {
    pub fn kind(&self) -> TransportKind {
        match self.inner {
            ChannelInner::Http(_) => TransportKind::Http,
            ChannelInner::Stdio(_) => TransportKind::Stdio,
        }
    }
}

/// Transport trait for MCP connections
///
/// Each implementation handles the specifics of one channel kind.
#[async_trait]
pub trait ClientTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Description for logging
    fn description(&self) -> String;

    /// Session identifier negotiated with the server, when the transport
    /// exposes one
    fn session_id(&self) -> Option<String> {
        None
    }

    /// Whether `terminate_session` does anything for this transport
    fn supports_session_termination(&self) -> bool {
        false
    }

    /// Ask the server to release the session
    async fn terminate_session(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Hand the channel to a client. Succeeds at most once.
    async fn open(&self) -> Result<TransportChannel, TransportError>;

    /// Release the channel. Closing twice is not an error.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Factory for creating transport instances
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        client_id: &str,
        spec: &TransportSpec,
    ) -> Result<Arc<dyn ClientTransport>, TransportError>;
}

/// Factory producing the rmcp-backed transports
#[derive(Debug, Default, Clone, Copy)]
pub struct RmcpTransportFactory;

impl TransportFactory for RmcpTransportFactory {
    fn create(
        &self,
        client_id: &str,
        spec: &TransportSpec,
    ) -> Result<Arc<dyn ClientTransport>, TransportError> {
        match spec {
            TransportSpec::Http { url, headers } => Ok(Arc::new(HttpTransport::new(
                client_id.to_string(),
                url.clone(),
                headers.clone(),
            )?)),
            TransportSpec::Stdio { command, args, env } => Ok(Arc::new(StdioTransport::new(
                client_id.to_string(),
                command.clone(),
                args.clone(),
                env.clone(),
            ))),
        }
    }
}

/// Lifecycle of a transport's channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChannelState {
    Ready,
    Opened,
    Closed,
}

impl ChannelState {
    /// Move Ready → Opened, or report why the channel cannot be opened
    pub(crate) fn begin_open(&mut self) -> Result<(), TransportError> {
        match self {
            ChannelState::Ready => {
                *self = ChannelState::Opened;
                Ok(())
            }
            ChannelState::Opened => Err(TransportError::AlreadyOpened),
            ChannelState::Closed => Err(TransportError::Closed),
        }
    }
}
