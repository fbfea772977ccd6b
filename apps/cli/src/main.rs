//! McpFan command-line entry point
//!
//! Connects to every configured MCP server, prints their capabilities and
//! any requested resources, then shuts all of them down.

mod cli;
mod logging;
mod output;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use mcpfan_core::ConfiguredServer;
use mcpfan_mcp::ServerCollection;
use tracing::{error, info};

use crate::cli::Cli;
use crate::output::{RunSummary, ServerSummary};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = logging::init_tracing(cli.log_dir.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    let servers = cli.servers(config.as_ref())?;
    let collection = ServerCollection::new().with_settings(cli.settings(config.as_ref()));

    info!(count = servers.len(), "Connecting to servers");

    // Whatever happens, every server that got registered is shut down
    let outcome = collect(&collection, &servers, &cli.resources).await;
    let report = collection.close().await;
    output::report_teardown(&report);

    output::print_summary(&outcome?, cli.json)
}

async fn collect(
    collection: &ServerCollection,
    servers: &[ConfiguredServer],
    resources: &[String],
) -> Result<RunSummary> {
    for server in servers {
        collection
            .add_client(
                server.transport.clone(),
                server.name.as_deref(),
                Some(&server.id),
            )
            .await
            .with_context(|| format!("Failed to connect to '{}'", server.id))?;
    }

    let capabilities = collection.get_client_capabilities()?;
    let servers = collection
        .client_ids()
        .into_iter()
        .zip(capabilities)
        .map(|(id, capabilities)| ServerSummary { id, capabilities })
        .collect();

    let resources = if resources.is_empty() {
        Vec::new()
    } else {
        collection.get_resource_values(resources).await?
    };

    Ok(RunSummary { servers, resources })
}
