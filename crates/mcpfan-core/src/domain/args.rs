//! Shell-style argument tokenizing for stdio servers
//!
//! Handles the formats users copy from other MCP clients:
//! - `"-y @some/server"` → `["-y", "@some/server"]`
//! - `"--root '/tmp/my dir'"` → `["--root", "/tmp/my dir"]`
//! - `"docker run -i --rm image"` as a full command line

use crate::error::{ClientError, ClientResult};

/// Split an argument string into tokens, honouring quotes and escapes.
///
/// An empty or whitespace-only string yields no arguments.
pub fn split_args(args: &str) -> ClientResult<Vec<String>> {
    shell_words::split(args).map_err(|e| {
        ClientError::InvalidArguments(format!(
            "Failed to parse arguments '{}' - check for unmatched quotes: {}",
            args, e
        ))
    })
}

/// Split a full command line into `(executable, args)`.
pub fn split_command_line(line: &str) -> ClientResult<(String, Vec<String>)> {
    let mut parts = split_args(line)?.into_iter();
    let executable = parts
        .next()
        .ok_or_else(|| ClientError::InvalidArguments("Empty command after parsing".to_string()))?;
    Ok((executable, parts.collect()))
}

/// Raw argument text of a command line: everything after the executable
/// token, as written. Quotes and escapes inside the first token are honoured
/// when finding where it ends.
pub fn command_line_args(line: &str) -> &str {
    let line = line.trim();
    let mut quote = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('\''), _) => {}
            (_, '\\') => escaped = true,
            (Some('"'), '"') => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, c) if c.is_whitespace() => return line[i..].trim_start(),
            (None, _) => {}
        }
    }
    ""
}
