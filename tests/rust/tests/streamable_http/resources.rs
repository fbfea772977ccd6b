//! Test: facade against live Streamable HTTP servers
//!
//! Validates that:
//! 1. `add_http_client` completes the MCP handshake
//! 2. Negotiated capabilities are reported per server, in order
//! 3. Resource reads fan out to every server and keep their order
//! 4. `close` tears every session down cleanly and the server drops it

use std::sync::Arc;

use mcpfan_core::ClientError;
use mcpfan_mcp::{ResourceContents, ServerCollection};
use pretty_assertions::assert_eq;
use rmcp::{
    model::*,
    service::RequestContext,
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    },
    ErrorData as McpError, RoleServer, ServerHandler,
};
use tests::fixtures::text_of;
use tokio_util::sync::CancellationToken;

/// Serves `mem://` resources whose text names the server
#[derive(Clone)]
struct MemoryResourceServer {
    name: &'static str,
}

impl ServerHandler for MemoryResourceServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_resources().build(),
            server_info: Implementation {
                name: self.name.to_string(),
                version: "1.0.0".to_string(),
                ..Default::default()
            },
            instructions: None,
        }
    }

    async fn read_resource(
        &self,
        params: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        if !params.uri.starts_with("mem://") {
            return Err(McpError::invalid_params(
                format!("Resource '{}' not found", params.uri),
                None,
            ));
        }
        let contents: ResourceContents = serde_json::from_value(serde_json::json!({
            "uri": params.uri,
            "mimeType": "text/plain",
            "text": format!("{}:{}", self.name, params.uri),
        }))
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(ReadResourceResult {
            contents: vec![contents],
        })
    }
}

/// Start a test server and return the URL, cancellation token and the
/// server's session table
async fn start_test_server(
    handler: MemoryResourceServer,
) -> (String, CancellationToken, Arc<LocalSessionManager>) {
    let ct = CancellationToken::new();
    let sessions = Arc::new(LocalSessionManager::default());

    let service = StreamableHttpService::new(
        move || Ok(handler.clone()),
        Arc::clone(&sessions),
        StreamableHttpServerConfig {
            stateful_mode: true,
            sse_keep_alive: Some(std::time::Duration::from_secs(15)),
            sse_retry: Some(std::time::Duration::from_secs(3)),
            cancellation_token: ct.child_token(),
        },
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to random port");
    let addr = listener.local_addr().unwrap();
    let url = format!("http://127.0.0.1:{}/mcp", addr.port());

    let ct_clone = ct.clone();
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { ct_clone.cancelled().await })
            .await
            .unwrap();
    });

    // Give server a moment to start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (url, ct, sessions)
}

async fn session_count(sessions: &LocalSessionManager) -> usize {
    sessions.sessions.read().await.len()
}

/// Session release is sent by the client worker after teardown returns
async fn wait_for_sessions_released(sessions: &LocalSessionManager) {
    let released = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while session_count(sessions).await > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(
        released.is_ok(),
        "server still holds {} session(s)",
        session_count(sessions).await
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fan_out_across_live_servers() {
    tests::init_test_tracing();

    let (url_a, ct_a, sessions_a) =
        start_test_server(MemoryResourceServer { name: "alpha" }).await;
    let (url_b, ct_b, sessions_b) =
        start_test_server(MemoryResourceServer { name: "beta" }).await;

    let servers = ServerCollection::new();
    servers
        .add_http_client(&url_a, Some("fan-test"), Some("alpha"))
        .await
        .expect("alpha should connect");
    servers
        .add_http_client(&url_b, None, None)
        .await
        .expect("beta should connect");
    assert_eq!(servers.client_ids(), vec!["alpha".to_string(), url_b.clone()]);
    assert_eq!(session_count(&sessions_a).await, 1);
    assert_eq!(session_count(&sessions_b).await, 1);

    let capabilities = servers
        .get_client_capabilities()
        .expect("both servers negotiated");
    assert_eq!(capabilities.len(), 2);
    assert!(capabilities.iter().all(|c| c.resources.is_some()));
    assert!(capabilities.iter().all(|c| c.tools.is_none()));

    let uris = vec!["mem://one".to_string(), "mem://two".to_string()];
    let contents = servers
        .get_resource_values(&uris)
        .await
        .expect("reads should succeed");
    let texts: Vec<_> = contents.iter().map(text_of).collect();
    assert_eq!(
        texts,
        vec![
            "alpha:mem://one",
            "alpha:mem://two",
            "beta:mem://one",
            "beta:mem://two",
        ]
    );

    let report = servers.close().await;
    assert!(report.is_clean(), "teardown failures: {:?}", report.failures);
    assert!(servers.is_empty());
    wait_for_sessions_released(&sessions_a).await;
    wait_for_sessions_released(&sessions_b).await;

    ct_a.cancel();
    ct_b.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_error_aborts_resource_read() {
    let (url, ct, sessions) = start_test_server(MemoryResourceServer { name: "alpha" }).await;

    let servers = ServerCollection::new();
    servers
        .add_http_client(&url, None, Some("alpha"))
        .await
        .expect("alpha should connect");

    let err = servers
        .get_resource_values(&["file:///etc/hosts".to_string()])
        .await
        .unwrap_err();
    assert!(
        matches!(&err, ClientError::ResourceRead { client_id, uri, .. }
            if client_id == "alpha" && uri == "file:///etc/hosts"),
        "unexpected error: {err:?}"
    );

    servers.close().await;
    wait_for_sessions_released(&sessions).await;
    ct.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_server_fails_to_connect() {
    // Bind then drop a listener so the port is very likely closed
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let servers = ServerCollection::new();
    let result = servers
        .add_http_client(&format!("http://127.0.0.1:{port}/mcp"), None, Some("gone"))
        .await;
    assert!(result.is_err());

    // The half-created entry is still released by close
    let report = servers.close().await;
    assert!(servers.is_empty());
    assert_eq!(report.clients, vec!["gone"]);
}
