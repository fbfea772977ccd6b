//! rmcp-backed protocol client

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rmcp::model::{ReadResourceRequestParams, ResourceContents, ServerCapabilities};
use rmcp::service::RunningService;
use rmcp::{RoleClient, ServiceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{
    ClientHooks, ClientIdentity, CloseHook, ErrorHook, McpClientHandler, ProtocolClient,
    ProtocolError,
};
use crate::transport::{ChannelInner, ClientTransport, TransportChannel};

/// Type alias for the running rmcp client service
pub type McpService = RunningService<RoleClient, McpClientHandler>;

/// MCP client bound to at most one transport at a time
pub struct McpClient {
    identity: ClientIdentity,
    handler: McpClientHandler,
    service: Mutex<Option<McpService>>,
    cancel: Mutex<Option<CancellationToken>>,
    connecting: AtomicBool,
    hooks: Arc<ClientHooks>,
}

impl McpClient {
    pub fn new(identity: ClientIdentity) -> Self {
        let handler = McpClientHandler::new(&identity);
        Self {
            identity,
            handler,
            service: Mutex::new(None),
            cancel: Mutex::new(None),
            connecting: AtomicBool::new(false),
            hooks: Arc::new(ClientHooks::new()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.service.lock().is_some()
    }

    fn fail(&self, error: ProtocolError) -> ProtocolError {
        self.hooks.report_error(&error);
        error
    }

    async fn establish(&self, transport: Arc<dyn ClientTransport>) -> Result<(), ProtocolError> {
        let TransportChannel { inner, cancel } = transport
            .open()
            .await
            .map_err(|e| self.fail(ProtocolError::Transport(e)))?;

        let handler = self.handler.clone();
        let served = match inner {
            ChannelInner::Http(t) => handler
                .serve_with_ct(t, cancel.clone())
                .await
                .map_err(|e| e.to_string()),
            ChannelInner::Stdio(t) => handler
                .serve_with_ct(t, cancel.clone())
                .await
                .map_err(|e| e.to_string()),
        };

        let service = match served {
            Ok(service) => service,
            Err(e) => {
                cancel.cancel();
                return Err(self.fail(ProtocolError::Handshake(e)));
            }
        };

        debug!(
            client = %self.identity.name,
            transport = %transport.description(),
            peer_info = ?service.peer_info(),
            "Connected to MCP server"
        );

        *self.service.lock() = Some(service);
        *self.cancel.lock() = Some(cancel.clone());
        self.hooks.reset();

        // Fire close hooks however the connection ends
        let hooks = Arc::clone(&self.hooks);
        tokio::spawn(async move {
            cancel.cancelled().await;
            hooks.report_close();
        });

        Ok(())
    }
}

#[async_trait]
impl ProtocolClient for McpClient {
    fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    async fn connect(&self, transport: Arc<dyn ClientTransport>) -> Result<(), ProtocolError> {
        if self.connecting.swap(true, Ordering::SeqCst) {
            return Err(ProtocolError::AlreadyConnected);
        }
        let result = self.establish(transport).await;
        if result.is_err() {
            self.connecting.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn close(&self) -> Result<(), ProtocolError> {
        let service = self.service.lock().take();
        let cancel = self.cancel.lock().take();
        self.connecting.store(false, Ordering::SeqCst);

        let Some(service) = service else {
            return Ok(());
        };

        info!(client = %self.identity.name, "Closing MCP client");
        let result = service.cancel().await;
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        self.hooks.report_close();

        match result {
            Ok(reason) => {
                debug!(client = %self.identity.name, ?reason, "MCP client stopped");
                Ok(())
            }
            Err(e) => Err(self.fail(ProtocolError::Shutdown(e.to_string()))),
        }
    }

    fn on_error(&self, hook: ErrorHook) {
        self.hooks.add_error(hook);
    }

    fn on_close(&self, hook: CloseHook) {
        self.hooks.add_close(hook);
    }

    fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.service
            .lock()
            .as_ref()
            .and_then(|service| service.peer_info().map(|info| info.capabilities.clone()))
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, ProtocolError> {
        let peer = self
            .service
            .lock()
            .as_ref()
            .map(|service| service.peer().clone())
            .ok_or(ProtocolError::NotConnected)?;

        let params = ReadResourceRequestParams {
            uri: uri.into(),
            meta: None,
        };

        let result = peer
            .read_resource(params)
            .await
            .map_err(|e| self.fail(ProtocolError::Request(e.to_string())))?;

        debug!(
            client = %self.identity.name,
            uri = %uri,
            count = result.contents.len(),
            "Read resource"
        );
        Ok(result.contents)
    }
}
