//! rmcp client handler: announces the client identity and logs server
//! notifications.

use rmcp::model::{ClientCapabilities, ClientInfo, Implementation, LoggingLevel};
use rmcp::service::NotificationContext;
use rmcp::RoleClient;
use tracing::{debug, info, warn};

use mcpfan_core::branding;

use super::ClientIdentity;

/// Client handler for MCP connections
#[derive(Clone)]
pub struct McpClientHandler {
    info: ClientInfo,
    client_name: String,
}

impl std::fmt::Debug for McpClientHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClientHandler")
            .field("client_name", &self.client_name)
            .finish()
    }
}

impl McpClientHandler {
    pub fn new(identity: &ClientIdentity) -> Self {
        Self {
            info: ClientInfo {
                protocol_version: identity.protocol_version.clone(),
                capabilities: ClientCapabilities::default(),
                client_info: Implementation {
                    name: identity.name.clone(),
                    version: identity.version.clone(),
                    title: Some(branding::DISPLAY_NAME.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
            client_name: identity.name.clone(),
        }
    }
}

impl rmcp::ClientHandler for McpClientHandler {
    fn get_info(&self) -> ClientInfo {
        self.info.clone()
    }

    fn on_resource_list_changed(
        &self,
        _context: NotificationContext<RoleClient>,
    ) -> impl std::future::Future<Output = ()> + Send + '_ {
        let client_name = self.client_name.clone();
        async move {
            info!(client = %client_name, "Server sent resources/list_changed notification");
        }
    }

    fn on_logging_message(
        &self,
        params: rmcp::model::LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl std::future::Future<Output = ()> + Send + '_ {
        let client_name = self.client_name.clone();
        async move {
            let message = match &params.data {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };

            match params.level {
                LoggingLevel::Warning => {
                    warn!(client = %client_name, logger = ?params.logger, "Server log: {}", message)
                }
                LoggingLevel::Error
                | LoggingLevel::Critical
                | LoggingLevel::Alert
                | LoggingLevel::Emergency => {
                    warn!(
                        client = %client_name,
                        level = ?params.level,
                        logger = ?params.logger,
                        "Server error log: {}",
                        message
                    )
                }
                _ => debug!(
                    client = %client_name,
                    level = ?params.level,
                    logger = ?params.logger,
                    "Server log: {}",
                    message
                ),
            }
        }
    }
}
