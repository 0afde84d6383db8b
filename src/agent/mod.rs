//! Credential agent bootstrap.
//!
//! Before any repository is touched, the run needs a reachable ssh-agent
//! holding the configured private key. [`AgentBootstrap::ensure_agent_and_key`]
//! reuses an agent announced through the environment or starts one, lists the
//! identities it holds, and registers the key only when no identity mentions
//! its filename. Calling it again once the key is loaded does nothing.
//!
//! The agent's address is returned as an [`AgentContext`] and handed to every
//! git invocation explicitly; the process environment is never rewritten.

pub mod protocol;

use crate::constants::{AGENT_PID_ENV, AGENT_SETTLE_DELAY, AGENT_SOCK_ENV};
use anyhow::Context;
use protocol::{Identity, ProtocolError};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Where the running agent can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentContext {
    auth_sock: PathBuf,
    agent_pid: Option<u32>,
}

impl AgentContext {
    pub fn new(auth_sock: impl Into<PathBuf>, agent_pid: Option<u32>) -> Self {
        Self {
            auth_sock: auth_sock.into(),
            agent_pid,
        }
    }

    /// Reads the agent announced by `SSH_AUTH_SOCK`, if any.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let sock = std::env::var_os(AGENT_SOCK_ENV).filter(|s| !s.is_empty())?;
        let pid = std::env::var(AGENT_PID_ENV)
            .ok()
            .and_then(|p| p.trim().parse().ok());
        Some(Self::new(sock, pid))
    }

    pub fn auth_sock(&self) -> &Path {
        &self.auth_sock
    }

    pub fn agent_pid(&self) -> Option<u32> {
        self.agent_pid
    }

    /// Points a child process at this agent.
    pub fn apply(&self, command: &mut Command) {
        command.env(AGENT_SOCK_ENV, &self.auth_sock);
        if let Some(pid) = self.agent_pid {
            command.env(AGENT_PID_ENV, pid.to_string());
        }
    }
}

/// Failures that abort the whole run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("SSH key does not exist: {}", .path.display())]
    KeyNotFound { path: PathBuf },

    #[error("failed to get home directory to expand {}", .path.display())]
    HomeDirUnavailable { path: PathBuf },

    #[error("failed to start ssh-agent: {0}")]
    AgentStartFailed(String),

    #[error("failed to list keys from SSH agent at {}: {source}", .socket.display())]
    AgentUnreachable {
        socket: PathBuf,
        #[source]
        source: ProtocolError,
    },

    #[error("failed to add SSH key {} to agent: {reason}", .path.display())]
    KeyAddFailed { path: PathBuf, reason: String },
}

/// The agent operations bootstrap depends on.
pub trait AgentBackend {
    /// Launches a new agent and returns its startup announcement.
    fn start_agent(&self) -> anyhow::Result<String>;

    fn list_identities(&self, socket: &Path) -> Result<Vec<Identity>, ProtocolError>;

    /// Registers `key`, prompting on the terminal for a passphrase if needed.
    fn add_key(&self, agent: &AgentContext, key: &Path) -> anyhow::Result<()>;
}

/// [`AgentBackend`] using the OpenSSH `ssh-agent` and `ssh-add` tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAgent;

impl AgentBackend for SystemAgent {
    fn start_agent(&self) -> anyhow::Result<String> {
        let output = Command::new("ssh-agent")
            .arg("-s")
            .stdin(Stdio::null())
            .output()
            .context("Failed to execute ssh-agent")?;
        if !output.status.success() {
            anyhow::bail!(
                "ssh-agent exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn list_identities(&self, socket: &Path) -> Result<Vec<Identity>, ProtocolError> {
        protocol::list_identities(socket)
    }

    fn add_key(&self, agent: &AgentContext, key: &Path) -> anyhow::Result<()> {
        let mut command = Command::new("ssh-add");
        command
            .arg(key)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        agent.apply(&mut command);

        let status = command.status().context("Failed to execute ssh-add")?;
        if !status.success() {
            anyhow::bail!("ssh-add exited with {status}");
        }
        Ok(())
    }
}

/// Brings up the credential agent once per run and loads the key into it.
pub struct AgentBootstrap<B> {
    backend: B,
    home: Option<PathBuf>,
    settle_delay: Duration,
    /// Agent launched by an earlier call, reused when nothing is announced.
    started: OnceLock<AgentContext>,
}

impl AgentBootstrap<SystemAgent> {
    /// Bootstrap against the real OpenSSH tools and the caller's home directory.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SystemAgent).with_home(dirs::home_dir())
    }
}

impl<B: AgentBackend> AgentBootstrap<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            home: None,
            settle_delay: AGENT_SETTLE_DELAY,
            started: OnceLock::new(),
        }
    }

    /// Home directory used to expand `~` in key paths.
    #[must_use]
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Makes sure an agent is reachable and holds the key at `key_path`.
    ///
    /// `discovered` is the agent already announced to this process, if any.
    /// When absent, the agent this bootstrap started earlier is reused, and
    /// only the first such call starts one. Returns the agent that was used.
    pub fn ensure_agent_and_key(
        &self,
        key_path: &Path,
        discovered: Option<AgentContext>,
    ) -> Result<AgentContext, AgentError> {
        let key = expand_home(key_path, self.home.as_deref())?;
        if !key.is_file() {
            return Err(AgentError::KeyNotFound { path: key });
        }

        let agent = match discovered {
            Some(agent) => {
                debug!(socket = %agent.auth_sock().display(), "reusing announced ssh-agent");
                agent
            }
            None => match self.started.get() {
                Some(agent) => {
                    debug!(
                        socket = %agent.auth_sock().display(),
                        "reusing ssh-agent started by this run"
                    );
                    agent.clone()
                }
                None => {
                    debug!("{AGENT_SOCK_ENV} not set, starting ssh-agent");
                    let agent = self.start_agent()?;
                    self.started.get_or_init(|| agent).clone()
                }
            },
        };

        let identities = self
            .backend
            .list_identities(agent.auth_sock())
            .map_err(|source| AgentError::AgentUnreachable {
                socket: agent.auth_sock().to_path_buf(),
                source,
            })?;

        let file_name = key
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if identities.iter().any(|id| id.comment.contains(&file_name)) {
            debug!(key = %file_name, "SSH key already loaded in agent");
            return Ok(agent);
        }

        info!(key = %key.display(), "adding SSH key to agent");
        self.backend
            .add_key(&agent, &key)
            .map_err(|e| AgentError::KeyAddFailed {
                path: key.clone(),
                reason: format!("{e:#}"),
            })?;
        info!("SSH key added");
        Ok(agent)
    }

    fn start_agent(&self) -> Result<AgentContext, AgentError> {
        info!("starting ssh-agent");
        let announcement = self
            .backend
            .start_agent()
            .map_err(|e| AgentError::AgentStartFailed(format!("{e:#}")))?;
        debug!("ssh-agent output: {}", announcement.trim());

        let agent = parse_announcement(&announcement).ok_or_else(|| {
            AgentError::AgentStartFailed(format!(
                "no {AGENT_SOCK_ENV} in ssh-agent output: {}",
                announcement.trim()
            ))
        })?;

        thread::sleep(self.settle_delay);
        if !agent.auth_sock().exists() {
            return Err(AgentError::AgentStartFailed(format!(
                "agent socket {} did not appear",
                agent.auth_sock().display()
            )));
        }
        Ok(agent)
    }
}

/// Recovers the agent address from `ssh-agent` startup output.
///
/// Understands both the Bourne form (`SSH_AUTH_SOCK=/tmp/x; export ...`) and
/// the csh form (`setenv SSH_AUTH_SOCK /tmp/x;`).
pub fn parse_announcement(output: &str) -> Option<AgentContext> {
    let mut sock = None;
    let mut pid = None;

    for statement in output.split([';', '\n']).map(str::trim) {
        let assignment = statement
            .strip_prefix("setenv ")
            .and_then(|rest| rest.split_once(' '))
            .or_else(|| statement.split_once('='));
        match assignment {
            Some((name, value)) if name.trim() == AGENT_SOCK_ENV => {
                let value = value.trim();
                if !value.is_empty() {
                    sock = Some(PathBuf::from(value));
                }
            }
            Some((name, value)) if name.trim() == AGENT_PID_ENV => {
                pid = value.trim().parse().ok();
            }
            _ => {}
        }
    }

    sock.map(|sock| AgentContext::new(sock, pid))
}

/// Expands a leading `~` or `~/` against `home`.
pub fn expand_home(path: &Path, home: Option<&Path>) -> Result<PathBuf, AgentError> {
    let Some(rest) = path.to_str().and_then(|s| s.strip_prefix('~')) else {
        return Ok(path.to_path_buf());
    };
    if !(rest.is_empty() || rest.starts_with('/')) {
        // `~user` forms are taken literally.
        return Ok(path.to_path_buf());
    }

    let home = home.ok_or_else(|| AgentError::HomeDirUnavailable {
        path: path.to_path_buf(),
    })?;
    Ok(home.join(rest.trim_start_matches('/')))
}
