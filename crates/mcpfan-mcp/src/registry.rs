//! Client Registry
//!
//! Exclusive owner of every (client, transport) pair. A client is added
//! first, then connected, which attaches its transport; it leaves the
//! registry through `remove_client`, `disconnect` or `disconnect_all`.
//!
//! Map mutations happen under a synchronous lock and never span an await,
//! so concurrent callers always observe whole operations.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use mcpfan_core::{
    split_args, ClientError, ClientId, ClientResult, RegistrySettings, TeardownReport,
    TeardownStage, TransportSpec,
};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::client::{ProtocolClient, ProtocolError};
use crate::transport::{ClientTransport, RmcpTransportFactory, TransportFactory};

/// A registered client together with its transport, if connected
#[derive(Clone)]
pub struct ClientEntry {
    pub client: Arc<dyn ProtocolClient>,
    pub transport: Option<Arc<dyn ClientTransport>>,
}

#[derive(Default)]
struct RegistryState {
    /// Registration order, used for every snapshot
    order: Vec<ClientId>,
    clients: HashMap<ClientId, Arc<dyn ProtocolClient>>,
    transports: HashMap<ClientId, Arc<dyn ClientTransport>>,
}

impl RegistryState {
    fn entries(&self) -> Vec<(ClientId, ClientEntry)> {
        self.order
            .iter()
            .filter_map(|id| {
                self.clients.get(id).map(|client| {
                    (
                        id.clone(),
                        ClientEntry {
                            client: Arc::clone(client),
                            transport: self.transports.get(id).cloned(),
                        },
                    )
                })
            })
            .collect()
    }

    /// Drop an entry but keep its slot in `order`
    fn remove_in_place(&mut self, id: &str) -> Option<ClientEntry> {
        let transport = self.transports.remove(id);
        let client = self.clients.remove(id)?;
        Some(ClientEntry { client, transport })
    }

    fn remove(&mut self, id: &str) -> Option<ClientEntry> {
        let entry = self.remove_in_place(id)?;
        self.order.retain(|existing| existing != id);
        Some(entry)
    }
}

/// Registry of protocol clients keyed by client ID
pub struct ClientRegistry {
    state: RwLock<RegistryState>,
    factory: Arc<dyn TransportFactory>,
    settings: RegistrySettings,
}

impl ClientRegistry {
    /// Registry using the rmcp transports and default settings
    pub fn new() -> Self {
        Self::with_factory(Arc::new(RmcpTransportFactory))
    }

    pub fn with_factory(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            factory,
            settings: RegistrySettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RegistrySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Insert a client with no transport attached.
    ///
    /// An existing entry under the same ID is replaced and handed back so
    /// the caller can tear it down.
    pub fn add_client(
        &self,
        client: Arc<dyn ProtocolClient>,
        id: impl Into<ClientId>,
    ) -> Option<ClientEntry> {
        let id = id.into();
        let mut state = self.state.write();
        let displaced = state.remove_in_place(&id);
        if displaced.is_some() {
            warn!(client_id = %id, "Client ID already registered, replacing entry");
        } else {
            state.order.push(id.clone());
        }
        state.clients.insert(id, client);
        displaced
    }

    /// Insert a client only if `id` is free
    pub fn try_add_client(
        &self,
        client: Arc<dyn ProtocolClient>,
        id: impl Into<ClientId>,
    ) -> ClientResult<()> {
        let id = id.into();
        let mut state = self.state.write();
        if state.clients.contains_key(&id) {
            return Err(ClientError::DuplicateClientId(id));
        }
        state.order.push(id.clone());
        state.clients.insert(id, client);
        Ok(())
    }

    pub fn get_client(&self, id: &str) -> Option<Arc<dyn ProtocolClient>> {
        self.state.read().clients.get(id).cloned()
    }

    pub fn get_transport(&self, id: &str) -> Option<Arc<dyn ClientTransport>> {
        self.state.read().transports.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.read().clients.contains_key(id)
    }

    pub fn is_connected(&self, id: &str) -> bool {
        self.state.read().transports.contains_key(id)
    }

    /// Registered IDs in registration order
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.state.read().order.clone()
    }

    /// Snapshot of every client in registration order
    pub fn clients(&self) -> Vec<(ClientId, Arc<dyn ProtocolClient>)> {
        self.state
            .read()
            .entries()
            .into_iter()
            .map(|(id, entry)| (id, entry.client))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().clients.is_empty()
    }

    /// Remove a client and its transport without closing either.
    ///
    /// Unknown IDs are a no-op.
    pub fn remove_client(&self, id: &str) -> Option<Arc<dyn ProtocolClient>> {
        let removed = self.state.write().remove(id)?;
        debug!(client_id = %id, "Removed client");
        Some(removed.client)
    }

    /// Connect a registered client over a Streamable HTTP transport
    pub async fn connect_http(&self, id: &str, url: &str) -> ClientResult<()> {
        self.connect(id, &TransportSpec::http(url)).await
    }

    /// Connect a registered client to a child process.
    ///
    /// `args` is tokenized shell-style; quoted arguments keep their spaces.
    pub async fn connect_stdio(&self, id: &str, command: &str, args: &str) -> ClientResult<()> {
        if !self.contains(id) {
            return Err(ClientError::NotFound(id.to_string()));
        }
        let args = split_args(args)?;
        self.connect_stdio_args(id, command, args).await
    }

    /// Connect a registered client to a child process with pre-split args
    pub async fn connect_stdio_args(
        &self,
        id: &str,
        command: &str,
        args: Vec<String>,
    ) -> ClientResult<()> {
        self.connect(id, &TransportSpec::stdio(command, args)).await
    }

    /// Build the transport described by `spec`, attach it and connect.
    pub async fn connect(&self, id: &str, spec: &TransportSpec) -> ClientResult<()> {
        let (client, transport) = {
            let mut state = self.state.write();
            let client = state
                .clients
                .get(id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(id.to_string()))?;
            if state.transports.contains_key(id) {
                return Err(ClientError::AlreadyConnected(id.to_string()));
            }
            let transport = self
                .factory
                .create(id, spec)
                .map_err(|e| ClientError::transport(id, e))?;
            state.transports.insert(id.to_string(), Arc::clone(&transport));
            (client, transport)
        };

        install_observers(id, client.as_ref());

        info!(
            client_id = %id,
            transport = %transport.description(),
            "Connecting client"
        );

        let outcome = with_timeout(
            self.settings.connect_timeout(),
            client.connect(Arc::clone(&transport)),
        )
        .await;
        let result = match outcome {
            Some(result) => result.map_err(|e| protocol_to_client_error(id, e)),
            None => Err(ClientError::Timeout {
                operation: "connect",
                client_id: id.to_string(),
            }),
        };

        if let Err(e) = &result {
            error!(client_id = %id, error = %e, "Failed to connect client");
            return result;
        }

        if let Some(session_id) = transport.session_id() {
            debug!(client_id = %id, session_id = %session_id, "Transport session established");
        }
        info!(client_id = %id, "Client connected");
        Ok(())
    }

    /// Remove one client and tear it down with the same best-effort policy
    /// as `disconnect_all`. Unknown IDs yield an empty report.
    pub async fn disconnect(&self, id: &str) -> TeardownReport {
        let Some(entry) = self.state.write().remove(id) else {
            return TeardownReport::default();
        };
        info!(client_id = %id, "Disconnecting client");
        self.teardown(vec![(id.to_string(), entry)]).await
    }

    /// Tear down every client concurrently, then empty the registry.
    ///
    /// Never fails: every error is logged and collected in the report.
    pub async fn disconnect_all(&self) -> TeardownReport {
        let entries = self.state.read().entries();
        info!(count = entries.len(), "Disconnecting all clients");

        let report = self.teardown(entries).await;

        {
            let mut state = self.state.write();
            state.clients.clear();
            state.transports.clear();
            state.order.clear();
        }

        if report.is_clean() {
            debug!(count = report.clients.len(), "All clients disconnected");
        } else {
            warn!(
                count = report.clients.len(),
                failures = report.failures.len(),
                "Disconnected all clients with failures"
            );
        }
        report
    }

    async fn teardown(&self, entries: Vec<(ClientId, ClientEntry)>) -> TeardownReport {
        let limit = self.settings.teardown_timeout();

        let (ids, tasks): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .map(|(id, entry)| {
                let task = tokio::spawn(teardown_entry(id.clone(), entry, limit));
                (id, task)
            })
            .unzip();

        let mut report = TeardownReport::default();
        for (id, joined) in ids.into_iter().zip(join_all(tasks).await) {
            match joined {
                Ok(entry_report) => report.merge(entry_report),
                Err(e) => {
                    warn!(client_id = %id, error = %e, "Teardown task failed");
                    report.clients.push(id.clone());
                    report.record(&id, TeardownStage::Task, e);
                }
            }
        }
        report
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminate session, close client, close transport. Each step runs
/// regardless of the ones before it, including when one of them panics.
async fn teardown_entry(
    id: ClientId,
    entry: ClientEntry,
    limit: Option<Duration>,
) -> TeardownReport {
    let mut report = TeardownReport {
        clients: vec![id.clone()],
        failures: Vec::new(),
    };
    let ClientEntry { client, transport } = entry;

    if let Some(transport) = transport.as_ref().filter(|t| t.supports_session_termination()) {
        let result = guarded_step(limit, transport.terminate_session()).await;
        note(&mut report, &id, TeardownStage::TerminateSession, result);
    }

    let result = guarded_step(limit, client.close()).await;
    note(&mut report, &id, TeardownStage::CloseClient, result);

    if let Some(transport) = transport {
        let result = guarded_step(limit, transport.close()).await;
        note(&mut report, &id, TeardownStage::CloseTransport, result);
    }

    report
}

/// Run one teardown step under the timeout, turning a panic into a failure
async fn guarded_step<F, E>(limit: Option<Duration>, step: F) -> Result<(), String>
where
    F: Future<Output = Result<(), E>>,
    E: ToString,
{
    match AssertUnwindSafe(with_timeout(limit, step)).catch_unwind().await {
        Ok(Some(Ok(()))) => Ok(()),
        Ok(Some(Err(e))) => Err(e.to_string()),
        Ok(None) => Err("timed out".to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

fn note(report: &mut TeardownReport, id: &str, stage: TeardownStage, result: Result<(), String>) {
    if let Err(e) = result {
        warn!(client_id = %id, stage = %stage, error = %e, "Teardown step failed");
        report.record(id, stage, e);
    }
}

/// Await `fut`, giving up after `limit` when one is set
pub(crate) async fn with_timeout<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Report asynchronous client errors and closes through the log
fn install_observers(id: &str, client: &dyn ProtocolClient) {
    let error_id = id.to_string();
    client.on_error(Arc::new(move |e: &ProtocolError| {
        warn!(client_id = %error_id, error = %e, "Client error");
    }));
    let close_id = id.to_string();
    client.on_close(Arc::new(move || {
        debug!(client_id = %close_id, "Client connection closed");
    }));
}

pub(crate) fn protocol_to_client_error(id: &str, error: ProtocolError) -> ClientError {
    match error {
        ProtocolError::Transport(source) => ClientError::transport(id, source),
        ProtocolError::AlreadyConnected => ClientError::AlreadyConnected(id.to_string()),
        other => ClientError::Client {
            client_id: id.to_string(),
            message: other.to_string(),
        },
    }
}
