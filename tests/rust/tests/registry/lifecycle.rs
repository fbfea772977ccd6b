//! Adding, looking up and removing clients

use std::sync::Arc;

use mcpfan_mcp::{ClientRegistry, ProtocolClient};
use pretty_assertions::assert_eq;
use tests::{EventLog, MockClient, MockFactory};

fn registry() -> ClientRegistry {
    ClientRegistry::with_factory(MockFactory::new(EventLog::new()))
}

fn client(tag: &str) -> Arc<dyn ProtocolClient> {
    Arc::new(MockClient::new(tag))
}

#[test]
fn test_get_returns_added_client() {
    let registry = registry();
    let c = client("c");
    registry.add_client(Arc::clone(&c), "id");

    let found = registry.get_client("id").expect("client should be registered");
    assert!(Arc::ptr_eq(&found, &c));
    assert!(registry.get_client("other").is_none());
    assert!(registry.get_transport("id").is_none());
}

#[test]
fn test_remove_twice_returns_absent_second_time() {
    let registry = registry();
    let c = client("c");
    registry.add_client(Arc::clone(&c), "id");

    let removed = registry.remove_client("id").expect("first removal returns the client");
    assert!(Arc::ptr_eq(&removed, &c));
    assert!(registry.remove_client("id").is_none());
    assert!(registry.remove_client("never-added").is_none());
}

#[test]
fn test_client_ids_in_registration_order() {
    let registry = registry();
    for id in ["c", "a", "b"] {
        registry.add_client(client(id), id);
    }
    registry.remove_client("a");
    registry.add_client(client("d"), "d");

    assert_eq!(registry.client_ids(), vec!["c", "b", "d"]);
    assert_eq!(registry.len(), 3);
}

#[tokio::test]
async fn test_overwrite_hands_back_connected_entry() {
    let events = EventLog::new();
    let registry = ClientRegistry::with_factory(MockFactory::new(events.clone()));
    let first: Arc<dyn ProtocolClient> = Arc::new(MockClient::new("first").with_events(events));
    registry.add_client(Arc::clone(&first), "id");
    registry.connect_http("id", "http://localhost:1/mcp").await.unwrap();

    let displaced = registry
        .add_client(client("second"), "id")
        .expect("previous entry is returned");

    assert!(Arc::ptr_eq(&displaced.client, &first));
    assert!(displaced.transport.is_some());
    // The replacement starts without a transport
    assert!(!registry.is_connected("id"));
    assert_eq!(registry.client_ids(), vec!["id"]);
}
