//! Command-line arguments

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mcpfan_core::{
    command_line_args, split_command_line, stdio_client_id, ConfiguredServer, RegistrySettings,
    ServersConfig, TransportSpec,
};

#[derive(Parser, Debug)]
#[command(
    name = "mcpfan",
    version,
    about = "Connect to several MCP servers at once and fan requests out across them",
    long_about = "McpFan connects to every given MCP server, prints the capabilities each one\n\
                  negotiated and, when --resource is given, reads those resources from all of them.\n\n\
                  Servers come from --http, --stdio and the mcpServers entries of --config.\n\
                  --stdio runs the given command on this machine; only use trusted servers."
)]
pub struct Cli {
    /// Streamable HTTP server URL (repeatable)
    #[arg(long = "http", value_name = "URL")]
    pub http: Vec<String>,

    /// Child-process server as one command line, e.g. "npx -y @scope/server" (repeatable)
    #[arg(long = "stdio", value_name = "COMMAND")]
    pub stdio: Vec<String>,

    /// JSON file with an mcpServers table
    #[arg(long, short = 'c', env = "MCPFAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Resource URI to read from every server (repeatable)
    #[arg(long = "resource", short = 'r', value_name = "URI")]
    pub resources: Vec<String>,

    /// Client name announced to servers
    #[arg(long, env = "MCPFAN_CLIENT_NAME")]
    pub name: Option<String>,

    /// Give up on a server that has not finished connecting after this long
    #[arg(long, env = "MCPFAN_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Also write daily-rotated logs to this directory
    #[arg(long, env = "MCPFAN_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    pub fn load_config(&self) -> Result<Option<ServersConfig>> {
        self.config
            .as_ref()
            .map(|path| {
                ServersConfig::load(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))
            })
            .transpose()
    }

    /// Settings from the config file with command-line overrides applied
    pub fn settings(&self, config: Option<&ServersConfig>) -> RegistrySettings {
        let mut settings = config.map(|c| c.settings.clone()).unwrap_or_default();
        if let Some(ms) = self.connect_timeout_ms {
            settings.connect_timeout_ms = Some(ms);
        }
        if let Some(name) = &self.name {
            settings.client_name = name.clone();
        }
        settings
    }

    /// Every server to connect: config entries first, then --http, then --stdio
    pub fn servers(&self, config: Option<&ServersConfig>) -> Result<Vec<ConfiguredServer>> {
        let mut servers = match config {
            Some(config) => config.resolve()?,
            None => Vec::new(),
        };

        for url in &self.http {
            validate_url(url)?;
            let transport = TransportSpec::http(url);
            servers.push(ConfiguredServer {
                id: transport.default_client_id(),
                name: None,
                transport,
            });
        }

        for line in &self.stdio {
            let (command, args) = split_command_line(line)
                .with_context(|| format!("Invalid --stdio command line: {}", line))?;
            // Same ID as add_stdio_client given the argument text as written
            let id = stdio_client_id(&command, command_line_args(line));
            let transport = TransportSpec::stdio(command, args);
            servers.push(ConfiguredServer {
                id,
                name: None,
                transport,
            });
        }

        if servers.is_empty() {
            bail!("No servers given; use --http, --stdio or --config");
        }
        Ok(servers)
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => bail!("Unsupported URL scheme '{}' in {}", other, url),
    }
}
