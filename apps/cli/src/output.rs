//! Printing results

use std::io::Write;

use anyhow::Result;
use mcpfan_core::{ClientId, TeardownReport};
use mcpfan_mcp::{ResourceContents, ServerCapabilities};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct ServerSummary {
    pub id: ClientId,
    pub capabilities: ServerCapabilities,
}

/// Everything one run collected
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub servers: Vec<ServerSummary>,
    pub resources: Vec<ResourceContents>,
}

pub fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, summary)?;
        writeln!(out)?;
    } else {
        write_plain(&mut out, summary)?;
    }
    Ok(())
}

fn write_plain(out: &mut impl Write, summary: &RunSummary) -> Result<()> {
    writeln!(out, "Servers ({}):", summary.servers.len())?;
    for server in &summary.servers {
        let features = capability_names(&server.capabilities)?;
        if features.is_empty() {
            writeln!(out, "  {}: (none)", server.id)?;
        } else {
            writeln!(out, "  {}: {}", server.id, features.join(", "))?;
        }
    }

    if summary.resources.is_empty() {
        return Ok(());
    }
    writeln!(out, "Resources ({}):", summary.resources.len())?;
    for contents in &summary.resources {
        match contents {
            ResourceContents::TextResourceContents {
                uri,
                mime_type,
                text,
                ..
            } => {
                writeln!(out, "  {} ({})", uri, mime_type.as_deref().unwrap_or("text"))?;
                for line in text.lines() {
                    writeln!(out, "    {}", line)?;
                }
            }
            ResourceContents::BlobResourceContents {
                uri,
                mime_type,
                blob,
                ..
            } => {
                writeln!(
                    out,
                    "  {} ({}, {} base64 chars)",
                    uri,
                    mime_type.as_deref().unwrap_or("binary"),
                    blob.len()
                )?;
            }
        }
    }
    Ok(())
}

/// Names of the capability groups a server advertised
fn capability_names(capabilities: &ServerCapabilities) -> Result<Vec<String>> {
    let value = serde_json::to_value(capabilities)?;
    Ok(value
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default())
}

/// Surface swallowed teardown failures
pub fn report_teardown(report: &TeardownReport) {
    for failure in &report.failures {
        warn!(
            client_id = %failure.client_id,
            stage = %failure.stage,
            error = %failure.error,
            "Server did not shut down cleanly"
        );
    }
}
