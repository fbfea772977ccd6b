//! Connecting registered clients

use std::sync::Arc;
use std::time::Duration;

use mcpfan_core::{ClientError, RegistrySettings, TransportError, TransportKind};
use mcpfan_mcp::{ClientRegistry, ProtocolError};
use pretty_assertions::assert_eq;
use tests::mocks::TransportBehavior;
use tests::{EventLog, MockClient, MockFactory};

#[tokio::test]
async fn test_connect_unregistered_is_not_found_and_stores_nothing() {
    let factory = MockFactory::new(EventLog::new());
    let registry = ClientRegistry::with_factory(factory.clone());

    let err = registry
        .connect_http("ghost", "http://localhost:1/mcp")
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::NotFound("ghost".to_string()));

    let err = registry
        .connect_stdio("ghost", "echo-server", "a")
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::NotFound("ghost".to_string()));

    assert!(registry.get_transport("ghost").is_none());
    assert!(factory.transports().is_empty());
}

#[tokio::test]
async fn test_connect_http_attaches_transport_and_hooks() {
    let factory = MockFactory::new(EventLog::new());
    factory.set_behavior(
        "remote",
        TransportBehavior {
            session_id: Some("session-123".to_string()),
            ..Default::default()
        },
    );
    let registry = ClientRegistry::with_factory(factory.clone());
    let client = Arc::new(MockClient::new("remote"));
    registry.add_client(client.clone(), "remote");

    registry
        .connect_http("remote", "http://localhost:1/mcp")
        .await
        .unwrap();

    assert!(client.is_connected());
    assert_eq!(client.error_hook_count(), 1);
    let transport = registry.get_transport("remote").expect("transport stored");
    assert_eq!(transport.kind(), TransportKind::Http);
    assert_eq!(transport.session_id().as_deref(), Some("session-123"));

    // Errors reported after connect are observed, never raised
    client.emit_error(ProtocolError::Request("late failure".to_string()));
    assert!(registry.contains("remote"));
}

#[tokio::test]
async fn test_connect_stdio_tokenizes_quoted_args() {
    let registry = ClientRegistry::with_factory(MockFactory::new(EventLog::new()));
    registry.add_client(Arc::new(MockClient::new("files")), "files");

    registry
        .connect_stdio("files", "node", "server.js --root '/tmp/my dir'")
        .await
        .unwrap();

    let transport = registry.get_transport("files").unwrap();
    assert_eq!(transport.kind(), TransportKind::Stdio);
}

#[tokio::test]
async fn test_second_connect_is_rejected() {
    let registry = ClientRegistry::with_factory(MockFactory::new(EventLog::new()));
    registry.add_client(Arc::new(MockClient::new("a")), "a");
    registry.connect_stdio("a", "echo-server", "a").await.unwrap();

    let err = registry
        .connect_http("a", "http://localhost:1/mcp")
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::AlreadyConnected("a".to_string()));
}

#[tokio::test]
async fn test_client_connect_failure_propagates_and_keeps_transport() {
    let factory = MockFactory::new(EventLog::new());
    let registry = ClientRegistry::with_factory(factory.clone());
    let failure = ProtocolError::Transport(TransportError::Spawn {
        command: "echo-server".to_string(),
        message: "No such file or directory".to_string(),
    });
    registry.add_client(
        Arc::new(MockClient::new("a").failing_connect(failure)),
        "a",
    );

    let err = registry.connect_stdio("a", "echo-server", "a").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport {
            ref client_id,
            source: TransportError::Spawn { .. },
        } if client_id == "a"
    ));

    // The transport was stored before connect, so teardown still closes it
    assert!(registry.is_connected("a"));
    let report = registry.disconnect_all().await;
    assert!(report.is_clean());
    assert!(factory.transports()[0].is_closed());
}

#[tokio::test]
async fn test_transport_construction_failure_stores_nothing() {
    let factory = MockFactory::new(EventLog::new());
    factory.refuse("a", TransportError::Http("Invalid header name".to_string()));
    let registry = ClientRegistry::with_factory(factory.clone());
    registry.add_client(Arc::new(MockClient::new("a")), "a");

    let err = registry
        .connect_http("a", "http://localhost:1/mcp")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    assert!(!registry.is_connected("a"));
}

#[tokio::test]
async fn test_handshake_failure_maps_to_client_error() {
    let registry = ClientRegistry::with_factory(MockFactory::new(EventLog::new()));
    registry.add_client(
        Arc::new(
            MockClient::new("a").failing_connect(ProtocolError::Handshake("bad version".into())),
        ),
        "a",
    );

    let err = registry
        .connect_http("a", "http://localhost:1/mcp")
        .await
        .unwrap_err();
    match err {
        ClientError::Client { client_id, message } => {
            assert_eq!(client_id, "a");
            assert!(message.contains("bad version"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout() {
    let registry =
        ClientRegistry::with_factory(MockFactory::new(EventLog::new())).with_settings(
            RegistrySettings {
                connect_timeout_ms: Some(100),
                ..Default::default()
            },
        );
    registry.add_client(
        Arc::new(MockClient::new("slow").with_connect_delay(Duration::from_secs(60))),
        "slow",
    );

    let err = registry
        .connect_http("slow", "http://localhost:1/mcp")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Timeout {
            operation: "connect",
            client_id: "slow".to_string(),
        }
    );
}

#[tokio::test]
async fn test_invalid_quoting_is_rejected_before_transport() {
    let factory = MockFactory::new(EventLog::new());
    let registry = ClientRegistry::with_factory(factory.clone());
    registry.add_client(Arc::new(MockClient::new("a")), "a");

    let err = registry
        .connect_stdio("a", "node", "--name 'unterminated")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidArguments(_)));
    assert!(factory.transports().is_empty());
}
