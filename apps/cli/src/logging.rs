//! Tracing setup for the binary

use std::path::Path;

use mcpfan_core::branding;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when RUST_LOG is not set.
/// Crate names use underscores in tracing targets (mcpfan-core → mcpfan_core).
const DEFAULT_FILTER: &str = "info,mcpfan=debug,mcpfan_core=debug,mcpfan_mcp=debug,rmcp=warn";

/// Install the global subscriber.
///
/// Console output goes to stderr so stdout stays clean for results. The
/// returned guard flushes the file writer and must outlive `main`'s work.
pub fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let (file_layer, guard) = match log_dir.map(file_writer) {
        Some(Ok((writer, guard))) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("Warning: file logging disabled: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

/// Daily-rotated log file, e.g. `mcpfan.2026-10-16.log`
fn file_writer(
    dir: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("failed to create {}: {}", dir.display(), e))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(branding::LOG_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| e.to_string())?;
    Ok(tracing_appender::non_blocking(appender))
}
