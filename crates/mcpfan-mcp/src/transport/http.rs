//! HTTP transport for MCP servers
//!
//! Connects to MCP servers over Streamable HTTP. Definition headers are baked
//! into the underlying `reqwest::Client` so they go out with every request.

use std::collections::HashMap;

use async_trait::async_trait;
use mcpfan_core::{TransportError, TransportKind};
use parking_lot::Mutex;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{ChannelInner, ChannelState, ClientTransport, TransportChannel};

/// Streamable HTTP transport
///
/// Holds two cancellation tokens: `session` ends the client's service loop,
/// which makes rmcp's HTTP worker release the server-side session; `root`
/// is its parent and is cancelled on close.
pub struct HttpTransport {
    client_id: String,
    url: String,
    http: reqwest::Client,
    state: Mutex<ChannelState>,
    root: CancellationToken,
    session: CancellationToken,
}

impl HttpTransport {
    pub fn new(
        client_id: String,
        url: String,
        headers: HashMap<String, String>,
    ) -> Result<Self, TransportError> {
        let header_map = build_default_headers(&client_id, &headers)?;
        let http = reqwest::Client::builder()
            .default_headers(header_map)
            .build()
            .map_err(|e| {
                let err = format!("Failed to build HTTP client: {}", e);
                error!(client_id = %client_id, "{}", err);
                TransportError::Http(err)
            })?;

        let root = CancellationToken::new();
        let session = root.child_token();
        Ok(Self {
            client_id,
            url,
            http,
            state: Mutex::new(ChannelState::Ready),
            root,
            session,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Build a reqwest HeaderMap from definition-provided headers.
fn build_default_headers(
    client_id: &str,
    headers: &HashMap<String, String>,
) -> Result<reqwest::header::HeaderMap, TransportError> {
    let mut header_map = reqwest::header::HeaderMap::new();
    for (key, value) in headers {
        let header_name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            let err = format!("Invalid header name '{}': {}", key, e);
            error!(client_id = %client_id, "{}", err);
            TransportError::Http(err)
        })?;
        let header_value = reqwest::header::HeaderValue::from_str(value).map_err(|e| {
            let err = format!("Invalid header value for '{}': {}", key, e);
            error!(client_id = %client_id, "{}", err);
            TransportError::Http(err)
        })?;
        header_map.insert(header_name, header_value);
    }
    Ok(header_map)
}

#[async_trait]
impl ClientTransport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    fn description(&self) -> String {
        format!("http:{}", self.url)
    }

    fn supports_session_termination(&self) -> bool {
        true
    }

    /// Ask rmcp's worker to end the session. The worker sends the session
    /// DELETE itself and only logs a failure, so this never reports one.
    async fn terminate_session(&self) -> Result<(), TransportError> {
        if *self.state.lock() != ChannelState::Opened {
            return Ok(());
        }
        debug!(client_id = %self.client_id, url = %self.url, "Terminating HTTP session");
        self.session.cancel();
        Ok(())
    }

    async fn open(&self) -> Result<TransportChannel, TransportError> {
        self.state.lock().begin_open()?;

        info!(
            client_id = %self.client_id,
            url = %self.url,
            "Opening Streamable HTTP transport"
        );

        let config = StreamableHttpClientTransportConfig::with_uri(self.url.as_str());
        let transport = StreamableHttpClientTransport::with_client(self.http.clone(), config);

        Ok(TransportChannel {
            inner: ChannelInner::Http(transport),
            cancel: self.session.clone(),
        })
    }

    async fn close(&self) -> Result<(), TransportError> {
        let previous = std::mem::replace(&mut *self.state.lock(), ChannelState::Closed);
        if previous != ChannelState::Closed {
            debug!(client_id = %self.client_id, url = %self.url, "Closing HTTP transport");
        }
        self.root.cancel();
        Ok(())
    }
}
