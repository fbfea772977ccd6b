//! Capability aggregation

use mcpfan_core::ClientError;
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::fixtures::{capabilities, capability_values};
use tests::MockClient;

use super::{collection, factory};

#[tokio::test]
async fn test_capabilities_follow_registration_order() {
    let factory = factory();
    factory.queue_client(MockClient::new("a").with_capabilities(capabilities(json!({"tools": {}}))));
    factory.queue_client(
        MockClient::new("b").with_capabilities(capabilities(json!({"resources": {}}))),
    );
    factory.queue_client(
        MockClient::new("c").with_capabilities(capabilities(json!({"prompts": {}}))),
    );
    let servers = collection(&factory);
    for id in ["a", "b", "c"] {
        servers
            .add_http_client(&format!("http://localhost:1/{id}"), None, Some(id))
            .await
            .unwrap();
    }

    let result = servers.get_client_capabilities().unwrap();

    assert_eq!(
        capability_values(&result),
        vec![
            json!({"tools": {}}),
            json!({"resources": {}}),
            json!({"prompts": {}}),
        ]
    );
}

#[tokio::test]
async fn test_missing_capabilities_fail_the_whole_call() {
    let factory = factory();
    factory.queue_client(MockClient::new("a").with_capabilities(capabilities(json!({"tools": {}}))));
    // Second client never negotiated anything
    factory.queue_client(MockClient::new("b"));
    let servers = collection(&factory);
    servers
        .add_stdio_client("echo-server", "a", None, None)
        .await
        .unwrap();
    servers
        .add_stdio_client("echo-server", "b", None, None)
        .await
        .unwrap();

    let err = servers.get_client_capabilities().unwrap_err();
    assert_eq!(err, ClientError::MissingCapabilities("echo-server-b".to_string()));
}

#[tokio::test]
async fn test_echo_servers_scenario() {
    let factory = factory();
    for tag in ["a", "b"] {
        factory.queue_client(
            MockClient::new(tag).with_capabilities(capabilities(json!({"resources": {}}))),
        );
    }
    let servers = collection(&factory);

    servers
        .add_stdio_client("echo-server", "a", None, None)
        .await
        .unwrap();
    servers
        .add_stdio_client("echo-server", "b", None, None)
        .await
        .unwrap();
    assert_eq!(servers.client_ids(), vec!["echo-server-a", "echo-server-b"]);

    assert_eq!(servers.get_client_capabilities().unwrap().len(), 2);

    let report = servers.close().await;
    assert!(report.is_clean());
    assert!(servers.client_ids().is_empty());
    assert!(servers.client("echo-server-a").is_none());
    assert!(servers.client("echo-server-b").is_none());
    assert!(factory.clients().iter().all(|c| !c.is_connected()));
}
