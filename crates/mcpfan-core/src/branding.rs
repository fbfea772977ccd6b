//! Centralized branding constants
//!
//! All product naming comes from this module.

/// Human-readable product name
pub const DISPLAY_NAME: &str = "McpFan";

/// Machine identifier, used for log file prefixes and client names
pub const IDENTIFIER: &str = "mcpfan";

/// Log file prefix for rolling file appenders
pub const LOG_PREFIX: &str = "mcpfan";

/// Version reported to MCP servers during initialization
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default client name announced to servers when the caller supplies none
pub fn default_client_name() -> String {
    format!("{}-client", IDENTIFIER)
}

/// Client name announced to a specific server
///
/// # Example
/// ```
/// use mcpfan_core::branding;
///
/// assert_eq!(branding::client_name_for("github"), "mcpfan-github");
/// ```
pub fn client_name_for(client_id: &str) -> String {
    format!("{}-{}", IDENTIFIER, client_id)
}
