//! Settings and the server configuration file format
//!
//! The file follows the Standard MCP Format used by VS Code, Cursor and
//! Claude Desktop: transport fields (`command`/`args`/`env` OR
//! `url`/`headers`) sit at the top level of each entry.
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "github": { "url": "https://api.example.com/mcp" },
//!     "files": { "command": "npx", "args": ["-y", "@scope/files"] }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::branding;
use crate::domain::{split_command_line, ClientId, TransportSpec};

/// Errors while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid server entry '{id}': {message}")]
    InvalidEntry { id: String, message: String },
}

/// Tunables for the client registry.
///
/// All timeouts are unset by default: operations wait as long as the
/// transport does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Name announced to servers when a client is created without one
    pub client_name: String,
    /// Version announced to servers
    pub client_version: String,
    pub connect_timeout_ms: Option<u64>,
    pub teardown_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            client_name: branding::default_client_name(),
            client_version: branding::CLIENT_VERSION.to_string(),
            connect_timeout_ms: None,
            teardown_timeout_ms: None,
            read_timeout_ms: None,
        }
    }
}

impl RegistrySettings {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn teardown_timeout(&self) -> Option<Duration> {
        self.teardown_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

/// Top-level configuration file
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServersConfig {
    /// Entries keyed by client ID; sorted so registration order is stable
    #[serde(rename = "mcpServers", default)]
    pub servers: BTreeMap<String, ServerEntry>,
    #[serde(default)]
    pub settings: RegistrySettings,
}

/// A single server entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerEntry {
    // --- Stdio Transport ---
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub env: Option<HashMap<String, String>>,

    // --- HTTP Transport ---
    pub url: Option<String>,
    pub headers: Option<HashMap<String, String>>,

    /// Display name announced to the server
    pub name: Option<String>,
}

/// A config entry resolved into something the registry can connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredServer {
    pub id: ClientId,
    pub name: Option<String>,
    pub transport: TransportSpec,
}

impl ServersConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Resolve every entry, in ID order
    pub fn resolve(&self) -> Result<Vec<ConfiguredServer>, ConfigError> {
        self.servers
            .iter()
            .map(|(id, entry)| {
                Ok(ConfiguredServer {
                    id: id.clone(),
                    name: entry.name.clone(),
                    transport: entry.to_transport_spec(id)?,
                })
            })
            .collect()
    }
}

impl ServerEntry {
    /// Build the transport spec for this entry.
    ///
    /// A `command` with embedded arguments and no `args` list is split
    /// shell-style, so `"docker run -i image"` works as users paste it.
    pub fn to_transport_spec(&self, id: &str) -> Result<TransportSpec, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidEntry {
            id: id.to_string(),
            message: message.to_string(),
        };

        match (&self.url, &self.command) {
            (Some(_), Some(_)) => Err(invalid("both 'url' and 'command' are set")),
            (None, None) => Err(invalid("one of 'url' or 'command' is required")),
            (Some(url), None) => Ok(TransportSpec::Http {
                url: url.clone(),
                headers: self.headers.clone().unwrap_or_default(),
            }),
            (None, Some(command)) => {
                let args = self.args.clone().unwrap_or_default();
                let (command, args) = if args.is_empty() && command.contains(' ') {
                    let split = split_command_line(command).map_err(|e| invalid(&e.to_string()))?;
                    debug!(
                        client_id = %id,
                        command = %split.0,
                        args = ?split.1,
                        "Split embedded arguments out of config command"
                    );
                    split
                } else {
                    (command.clone(), args)
                };
                Ok(TransportSpec::Stdio {
                    command,
                    args,
                    env: self.env.clone().unwrap_or_default(),
                })
            }
        }
    }
}
