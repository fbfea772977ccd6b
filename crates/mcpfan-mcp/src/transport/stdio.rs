//! STDIO transport for MCP servers
//!
//! Handles MCP servers that run as child processes communicating over
//! stdin/stdout.

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use mcpfan_core::{TransportError, TransportKind};
use parking_lot::Mutex;
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{ChannelInner, ChannelState, ClientTransport, TransportChannel};

/// Apply platform-specific child process isolation.
///
/// Windows: CREATE_NO_WINDOW keeps console-subsystem children from popping
/// up a console window.
///
/// Unix: a new process group keeps terminal signals (SIGINT, SIGTSTP) sent
/// to the parent from reaching the server processes.
pub fn configure_child_process_platform(cmd: &mut Command) {
    #[cfg(windows)]
    {
        #[allow(unused_imports)]
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(unix)]
    {
        cmd.process_group(0);
    }
}

/// STDIO transport for child process MCP servers
pub struct StdioTransport {
    client_id: String,
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    state: Mutex<ChannelState>,
    cancel: CancellationToken,
}

impl StdioTransport {
    pub fn new(
        client_id: String,
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    ) -> Self {
        Self {
            client_id,
            command,
            args,
            env,
            state: Mutex::new(ChannelState::Ready),
            cancel: CancellationToken::new(),
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn spawn_error(&self, message: String) -> TransportError {
        error!(client_id = %self.client_id, command = %self.command, "{}", message);
        TransportError::Spawn {
            command: self.command.clone(),
            message,
        }
    }
}

#[async_trait]
impl ClientTransport for StdioTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    fn description(&self) -> String {
        format!("stdio:{}", self.command)
    }

    async fn open(&self) -> Result<TransportChannel, TransportError> {
        self.state.lock().begin_open()?;

        info!(
            client_id = %self.client_id,
            command = %self.command,
            args = ?self.args,
            "Spawning STDIO server"
        );

        let command_path = which::which(&self.command)
            .or_else(|_| which::which(format!("{}.exe", &self.command)))
            .map_err(|_| {
                self.spawn_error(format!(
                    "Command not found: {}. Ensure it's installed and in PATH.",
                    self.command
                ))
            })?;

        debug!(client_id = %self.client_id, path = ?command_path, "Found command");

        let args = self.args.clone();
        let env = self.env.clone();
        let transport = TokioChildProcess::new(Command::new(&command_path).configure(move |cmd| {
            cmd.args(&args)
                .envs(&env)
                .stderr(Stdio::null())
                .kill_on_drop(true);
            configure_child_process_platform(cmd);
        }))
        .map_err(|e| self.spawn_error(format!("Failed to spawn process: {}", e)))?;

        Ok(TransportChannel {
            inner: ChannelInner::Stdio(transport),
            cancel: self.cancel.clone(),
        })
    }

    async fn close(&self) -> Result<(), TransportError> {
        let previous = std::mem::replace(&mut *self.state.lock(), ChannelState::Closed);
        if previous != ChannelState::Closed {
            debug!(client_id = %self.client_id, command = %self.command, "Closing STDIO transport");
        }
        // The child is killed when the service loop drops the process handle
        self.cancel.cancel();
        Ok(())
    }
}
