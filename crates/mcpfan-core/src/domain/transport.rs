//! Transport descriptions and default client identity derivation

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

use super::args::split_args;
use super::ClientId;

/// Kind of channel a client talks over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Streamable HTTP (network)
    Http,
    /// Child process over stdin/stdout
    Stdio,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Http => write!(f, "http"),
            TransportKind::Stdio => write!(f, "stdio"),
        }
    }
}

/// Runtime description of a transport, ready to be handed to a factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSpec {
    Http {
        url: String,
        headers: HashMap<String, String>,
    },
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
}

impl TransportSpec {
    /// HTTP transport without extra headers
    pub fn http(url: impl Into<String>) -> Self {
        TransportSpec::Http {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    /// Stdio transport from an already split argument list
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        TransportSpec::Stdio {
            command: command.into(),
            args,
            env: HashMap::new(),
        }
    }

    /// Stdio transport from a single argument string.
    ///
    /// The string is tokenized shell-style, so `"--root '/tmp/my dir'"` yields
    /// two arguments.
    pub fn stdio_from_line(command: impl Into<String>, args: &str) -> ClientResult<Self> {
        Ok(Self::stdio(command, split_args(args)?))
    }

    /// Attach HTTP headers or process environment, depending on the kind
    pub fn with_extra(mut self, extra: HashMap<String, String>) -> Self {
        match &mut self {
            TransportSpec::Http { headers, .. } => headers.extend(extra),
            TransportSpec::Stdio { env, .. } => env.extend(extra),
        }
        self
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            TransportSpec::Http { .. } => TransportKind::Http,
            TransportSpec::Stdio { .. } => TransportKind::Stdio,
        }
    }

    /// Client ID used when the caller does not supply one.
    ///
    /// Stdio arguments are re-joined with single spaces, which drops their
    /// quoting. Callers that still hold the argument text as written should
    /// use `stdio_client_id` on that text instead.
    pub fn default_client_id(&self) -> ClientId {
        match self {
            TransportSpec::Http { url, .. } => http_client_id(url),
            TransportSpec::Stdio { command, args, .. } => {
                stdio_client_id(command, &args.join(" "))
            }
        }
    }

    /// Short description for logging
    pub fn description(&self) -> String {
        match self {
            TransportSpec::Http { url, .. } => format!("http:{}", url),
            TransportSpec::Stdio { command, .. } => format!("stdio:{}", command),
        }
    }
}

/// Default ID for a network client: the URL itself
pub fn http_client_id(url: &str) -> ClientId {
    url.to_string()
}

/// Default ID for a subprocess client: `"<command>-<args>"`
pub fn stdio_client_id(command: &str, args: &str) -> ClientId {
    format!("{}-{}", command, args)
}
