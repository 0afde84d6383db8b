//! Identity listing against a running ssh-agent.
//!
//! The wire exchange is handled by `ssh-agent-client-rs`; this module only
//! maps its keys to the labels bootstrap compares against.

use std::io;
use std::path::Path;
use thiserror::Error;

/// A key held by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Free-form label, usually the path or filename the key was added from.
    pub comment: String,
}

impl Identity {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("agent I/O failed: {0}")]
    Io(#[from] io::Error),

    #[cfg(unix)]
    #[error("agent request failed: {0}")]
    Agent(#[from] ssh_agent_client_rs::Error),
}

/// Lists the identities held by the agent listening on `socket`.
#[cfg(unix)]
pub fn list_identities(socket: &Path) -> Result<Vec<Identity>, ProtocolError> {
    let mut client = ssh_agent_client_rs::Client::connect(socket)?;
    let keys = client.list_identities()?;
    Ok(keys
        .iter()
        .map(|key| Identity::new(key.comment()))
        .collect())
}

#[cfg(not(unix))]
pub fn list_identities(_socket: &Path) -> Result<Vec<Identity>, ProtocolError> {
    Err(ProtocolError::Io(io::Error::new(
        io::ErrorKind::Unsupported,
        "ssh-agent sockets require a Unix platform",
    )))
}
