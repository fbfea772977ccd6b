//! Domain types shared across the workspace

pub mod args;
pub mod transport;

pub use args::{command_line_args, split_args, split_command_line};
pub use transport::{http_client_id, stdio_client_id, TransportKind, TransportSpec};

/// Opaque, caller-visible identifier of a registered client
pub type ClientId = String;
