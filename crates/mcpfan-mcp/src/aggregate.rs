//! Aggregation facade
//!
//! `ServerCollection` presents every registered client as one collection of
//! servers. Reads fan out concurrently and fail fast; `close` delegates to
//! the registry's best-effort teardown.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use mcpfan_core::{
    stdio_client_id, ClientError, ClientId, ClientResult, RegistrySettings, TeardownReport,
    TransportSpec,
};
use rmcp::model::{ResourceContents, ServerCapabilities};
use tracing::{debug, info};

use crate::client::{ClientFactory, ClientIdentity, McpClientFactory, ProtocolClient};
use crate::registry::{with_timeout, ClientRegistry};
use crate::transport::{RmcpTransportFactory, TransportFactory};

/// A collection of MCP servers behind one registry
pub struct ServerCollection {
    registry: ClientRegistry,
    clients: Arc<dyn ClientFactory>,
}

impl ServerCollection {
    pub fn new() -> Self {
        Self::with_factories(Arc::new(RmcpTransportFactory), Arc::new(McpClientFactory))
    }

    pub fn with_factories(
        transports: Arc<dyn TransportFactory>,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            registry: ClientRegistry::with_factory(transports),
            clients,
        }
    }

    pub fn with_settings(mut self, settings: RegistrySettings) -> Self {
        self.registry = self.registry.with_settings(settings);
        self
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.registry.client_ids()
    }

    pub fn client(&self, id: &str) -> Option<Arc<dyn ProtocolClient>> {
        self.registry.get_client(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Create, register and connect a client for a Streamable HTTP server.
    ///
    /// The client ID defaults to the URL.
    pub async fn add_http_client(
        &self,
        url: &str,
        name: Option<&str>,
        client_id: Option<&str>,
    ) -> ClientResult<Arc<dyn ProtocolClient>> {
        self.add_client(TransportSpec::http(url), name, client_id).await
    }

    /// Create, register and connect a client for a child-process server.
    ///
    /// The client ID defaults to `"<command>-<args>"` using `args` verbatim.
    pub async fn add_stdio_client(
        &self,
        command: &str,
        args: &str,
        name: Option<&str>,
        client_id: Option<&str>,
    ) -> ClientResult<Arc<dyn ProtocolClient>> {
        let id = client_id
            .map(str::to_string)
            .unwrap_or_else(|| stdio_client_id(command, args));
        let spec = TransportSpec::stdio_from_line(command, args)?;
        self.add_client(spec, name, Some(&id)).await
    }

    /// Create, register and connect a client for any transport description.
    ///
    /// A failed connect leaves the entry registered so `close` releases it.
    pub async fn add_client(
        &self,
        spec: TransportSpec,
        name: Option<&str>,
        client_id: Option<&str>,
    ) -> ClientResult<Arc<dyn ProtocolClient>> {
        let id = client_id
            .map(str::to_string)
            .unwrap_or_else(|| spec.default_client_id());

        let identity = ClientIdentity::from_settings(self.registry.settings(), name);
        let client = self.clients.create(identity);
        self.registry.try_add_client(Arc::clone(&client), id.clone())?;
        self.registry.connect(&id, &spec).await?;

        info!(client_id = %id, name = %client.identity().name, "Added client");
        Ok(client)
    }

    /// Negotiated capabilities of every client, in registration order.
    ///
    /// Any client without capabilities fails the whole call.
    pub fn get_client_capabilities(&self) -> ClientResult<Vec<ServerCapabilities>> {
        self.registry
            .client_ids()
            .into_iter()
            .map(|id| {
                let client = self
                    .registry
                    .get_client(&id)
                    .ok_or_else(|| ClientError::NotFound(id.clone()))?;
                client
                    .server_capabilities()
                    .ok_or(ClientError::MissingCapabilities(id))
            })
            .collect()
    }

    /// Read every URI from every client concurrently.
    ///
    /// Results are grouped by client in registration order, then by URI in
    /// the order given. The first failed read aborts the call.
    pub async fn get_resource_values(
        &self,
        resource_uris: &[String],
    ) -> ClientResult<Vec<ResourceContents>> {
        let clients = self.registry.clients();
        let limit = self.registry.settings().read_timeout();

        let batches = try_join_all(
            clients
                .iter()
                .map(|(id, client)| read_all(id, client.as_ref(), resource_uris, limit)),
        )
        .await?;

        let contents: Vec<ResourceContents> = batches.into_iter().flatten().collect();
        debug!(
            clients = clients.len(),
            uris = resource_uris.len(),
            count = contents.len(),
            "Read resources"
        );
        Ok(contents)
    }

    /// Tear down every client. See [`ClientRegistry::disconnect_all`].
    pub async fn close(&self) -> TeardownReport {
        self.registry.disconnect_all().await
    }
}

impl Default for ServerCollection {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_all(
    id: &str,
    client: &dyn ProtocolClient,
    uris: &[String],
    limit: Option<Duration>,
) -> ClientResult<Vec<ResourceContents>> {
    let batches = try_join_all(uris.iter().map(|uri| read_one(id, client, uri, limit))).await?;
    Ok(batches.into_iter().flatten().collect())
}

async fn read_one(
    id: &str,
    client: &dyn ProtocolClient,
    uri: &str,
    limit: Option<Duration>,
) -> ClientResult<Vec<ResourceContents>> {
    match with_timeout(limit, client.read_resource(uri)).await {
        Some(Ok(contents)) => Ok(contents),
        Some(Err(e)) => Err(ClientError::ResourceRead {
            client_id: id.to_string(),
            uri: uri.to_string(),
            message: e.to_string(),
        }),
        None => Err(ClientError::Timeout {
            operation: "read_resource",
            client_id: id.to_string(),
        }),
    }
}
