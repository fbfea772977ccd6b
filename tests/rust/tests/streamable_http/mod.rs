//! Streamable HTTP Integration Tests
//!
//! Runs in-process rmcp servers on axum and drives them through the real
//! `HttpTransport` / `McpClient` pair:
//! - capability negotiation
//! - resource fan-out across two live servers
//! - session teardown

mod resources;
