//! Cloning via the external `ghq` tool
//!
//! `ghq get` is run with `GHQ_ROOT` pointed at the chosen workspace root.
//! Its output is forwarded to the terminal unmodified so the user sees
//! clone progress.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::{CloneError, Result};

/// Default deadline for `ghq get`
pub const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for the `ghq --version` probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Clones a repository into a workspace root
#[async_trait]
pub trait Cloner: Send + Sync {
    async fn get(&self, repository: &str, workspace: &str) -> Result<()>;
}

/// Cloner backed by the `ghq` binary
pub struct GhqCloner {
    /// Configuration used to resolve workspace roots
    config: Arc<Config>,
    /// Program to run (normally `ghq`)
    program: String,
    /// Deadline for `ghq get`
    timeout: Duration,
}

impl GhqCloner {
    /// Create a cloner using the `[clone]` deadline
    pub fn new(config: Arc<Config>) -> Self {
        let timeout = if config.clone.timeout_secs == 0 {
            DEFAULT_CLONE_TIMEOUT
        } else {
            config.clone_timeout()
        };
        Self {
            config,
            program: "ghq".to_string(),
            timeout,
        }
    }

    /// Use a different executable in place of `ghq`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the clone deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that the tool is installed and runnable
    pub async fn check_installed(&self) -> Result<()> {
        let probe = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        match timeout(PROBE_TIMEOUT, probe).await {
            Ok(Ok(output)) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                debug!("{} version: {}", self.program, version.trim());
                Ok(())
            }
            _ => Err(CloneError::ToolMissing.into()),
        }
    }
}

#[async_trait]
impl Cloner for GhqCloner {
    #[instrument(skip(self))]
    async fn get(&self, repository: &str, workspace: &str) -> Result<()> {
        self.check_installed().await?;

        let root_path = self.config.require_root(workspace)?;

        if repository.trim().is_empty() {
            return Err(CloneError::Failed("repository must not be empty".to_string()).into());
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(["get", repository])
            .env("GHQ_ROOT", root_path)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        match timeout(self.timeout, cmd.status()).await {
            Ok(Ok(status)) if status.success() => {
                info!("Cloned {} into {:?}", repository, root_path);
                Ok(())
            }
            Ok(Ok(status)) => Err(CloneError::Failed(format!(
                "{} get exited with {}",
                self.program, status
            ))
            .into()),
            Ok(Err(e)) => Err(CloneError::Failed(e.to_string()).into()),
            Err(_) => Err(CloneError::Timeout(self.timeout).into()),
        }
    }
}
