//! # McpFan Core Library
//!
//! Protocol-agnostic building blocks shared by the MCP layer and the CLI.
//!
//! ## Modules
//!
//! - `branding` - Product naming and default client identity
//! - `domain` - Client identity, transport specs and argument tokenizing
//! - `error` - Error taxonomy for registry and transport operations
//! - `teardown` - Diagnostics collected during best-effort disconnects
//! - `config` - Registry settings and the `mcpServers` file format

pub mod branding;
pub mod config;
pub mod domain;
pub mod error;
pub mod teardown;

pub use config::{ConfigError, ConfiguredServer, RegistrySettings, ServerEntry, ServersConfig};
pub use domain::*;
pub use error::{ClientError, ClientResult, TransportError};
pub use teardown::{TeardownFailure, TeardownReport, TeardownStage};
