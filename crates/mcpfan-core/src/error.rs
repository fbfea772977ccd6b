//! Error taxonomy for client registry and transport operations

use thiserror::Error;

use crate::domain::ClientId;

/// Errors raised by transports while opening, closing or terminating a session
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The child process could not be started
    #[error("Failed to spawn process '{command}': {message}")]
    Spawn { command: String, message: String },

    /// HTTP client construction or request failure
    #[error("HTTP transport error: {0}")]
    Http(String),

    /// The channel was already handed to a client
    #[error("Transport already opened")]
    AlreadyOpened,

    /// The transport has been closed and cannot be reused
    #[error("Transport is closed")]
    Closed,

    /// Session termination failed
    #[error("Failed to terminate session: {0}")]
    Terminate(String),

    /// Anything the transport implementation reports that fits no other kind
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the client registry and the aggregation facade
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Referenced a client ID that is not registered
    #[error("Client not found: {0}")]
    NotFound(ClientId),

    /// A client with this ID already exists
    #[error("Client ID already registered: {0}")]
    DuplicateClientId(ClientId),

    /// The client already has a transport attached
    #[error("Client already connected: {0}")]
    AlreadyConnected(ClientId),

    /// Argument string could not be tokenized
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Transport failure during connect
    #[error("Transport error for client '{client_id}': {source}")]
    Transport {
        client_id: ClientId,
        #[source]
        source: TransportError,
    },

    /// Connected client has not completed capability negotiation
    #[error("Client '{0}' has no negotiated server capabilities")]
    MissingCapabilities(ClientId),

    /// A resource read failed
    #[error("Failed to read resource '{uri}' from client '{client_id}': {message}")]
    ResourceRead {
        client_id: ClientId,
        uri: String,
        message: String,
    },

    /// A configured timeout elapsed
    #[error("{operation} timed out for client '{client_id}'")]
    Timeout {
        operation: &'static str,
        client_id: ClientId,
    },

    /// Protocol-level client failure (handshake, request, shutdown)
    #[error("Client '{client_id}' failed: {message}")]
    Client { client_id: ClientId, message: String },
}

impl ClientError {
    /// Client ID the error refers to, if any
    pub fn client_id(&self) -> Option<&str> {
        match self {
            ClientError::NotFound(id)
            | ClientError::DuplicateClientId(id)
            | ClientError::AlreadyConnected(id)
            | ClientError::MissingCapabilities(id) => Some(id),
            ClientError::Transport { client_id, .. }
            | ClientError::ResourceRead { client_id, .. }
            | ClientError::Timeout { client_id, .. }
            | ClientError::Client { client_id, .. } => Some(client_id),
            ClientError::InvalidArguments(_) => None,
        }
    }

    /// Wrap a transport error for a client
    pub fn transport(client_id: impl Into<ClientId>, source: TransportError) -> Self {
        ClientError::Transport {
            client_id: client_id.into(),
            source,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
