//! Diagnostics retained from best-effort teardown
//!
//! Disconnecting never fails; every swallowed error lands here instead.

use std::fmt;

use serde::Serialize;

use crate::domain::ClientId;

/// Step of the per-client teardown sequence that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownStage {
    TerminateSession,
    CloseClient,
    CloseTransport,
    /// The teardown task failed outside its steps, e.g. it was cancelled
    Task,
}

impl fmt::Display for TeardownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TeardownStage::TerminateSession => "terminate_session",
            TeardownStage::CloseClient => "close_client",
            TeardownStage::CloseTransport => "close_transport",
            TeardownStage::Task => "task",
        };
        f.write_str(s)
    }
}

/// One swallowed teardown failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownFailure {
    pub client_id: ClientId,
    pub stage: TeardownStage,
    pub error: String,
}

/// Outcome of a disconnect: which clients were torn down and what went wrong
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    /// Clients that were torn down, in registry order
    pub clients: Vec<ClientId>,
    /// Failures in the order clients were torn down, then by stage
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures recorded for a single client
    pub fn failures_for<'a>(
        &'a self,
        client_id: &'a str,
    ) -> impl Iterator<Item = &'a TeardownFailure> + 'a {
        self.failures.iter().filter(move |f| f.client_id == client_id)
    }

    pub fn record(&mut self, client_id: &str, stage: TeardownStage, error: impl ToString) {
        self.failures.push(TeardownFailure {
            client_id: client_id.to_string(),
            stage,
            error: error.to_string(),
        });
    }

    /// Append another report, keeping order
    pub fn merge(&mut self, other: TeardownReport) {
        self.clients.extend(other.clients);
        self.failures.extend(other.failures);
    }
}
