//! Git subprocess adapter with per-operation deadlines
//!
//! Provides non-blocking git command execution with:
//! - Separate deadlines for read and write operations
//! - Timeout handling (the child is killed when the deadline expires)
//! - Structured output parsing

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::{Worktree, parse_worktree_list};
use crate::config::Config;
use crate::error::{GitError, Result};

/// Default deadline for read operations (status, rev-parse)
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(150);

/// Default deadline for write and worktree operations
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(300);

/// Git operations used by the status service and promote engine
#[async_trait]
pub trait GitOps: Send + Sync {
    /// Whether `git status --porcelain` reports anything
    async fn is_dirty(&self, path: &Path) -> Result<bool>;

    /// Abbreviated name of HEAD
    async fn current_branch(&self, path: &Path) -> Result<String>;

    /// Worktrees attached to the repository at `path`
    async fn list_worktrees(&self, path: &Path) -> Result<Vec<Worktree>>;

    /// Initialize a repository in `path`
    async fn init(&self, path: &Path) -> Result<()>;

    /// Stage everything and commit with `message`
    async fn commit_all(&self, path: &Path, message: &str) -> Result<()>;
}

/// Git adapter that runs the `git` binary
#[derive(Debug, Clone)]
pub struct GitCli {
    /// Deadline for read operations
    read_timeout: Duration,
    /// Deadline for write and worktree operations
    write_timeout: Duration,
}

impl GitCli {
    /// Create an adapter with the default deadlines
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT)
    }

    /// Create an adapter with custom deadlines
    pub fn with_timeouts(read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            read_timeout,
            write_timeout,
        }
    }

    /// Create an adapter using the deadlines from `[git]`
    pub fn from_config(config: &Config) -> Self {
        Self::with_timeouts(config.read_timeout(), config.write_timeout())
    }

    /// Run `git <args>` in `dir` and return stdout
    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    async fn execute(
        &self,
        dir: &Path,
        operation: &'static str,
        args: &[&str],
        deadline: Duration,
    ) -> Result<String> {
        let mut cmd = Command::new("git");
        cmd.current_dir(dir)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match timeout(deadline, cmd.output()).await {
            Ok(Ok(output)) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    let cause = if stderr.is_empty() { stdout } else { stderr };
                    Err(GitError::CommandFailed { operation, cause }.into())
                }
            }
            Ok(Err(e)) => {
                warn!("git {} could not be started: {}", operation, e);
                Err(GitError::CommandFailed {
                    operation,
                    cause: e.to_string(),
                }
                .into())
            }
            Err(_) => Err(GitError::Timeout {
                operation,
                after: deadline,
            }
            .into()),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitOps for GitCli {
    async fn is_dirty(&self, path: &Path) -> Result<bool> {
        let output = self
            .execute(path, "status", &["status", "--porcelain"], self.read_timeout)
            .await?;
        Ok(output.bytes().any(|b| !b.is_ascii_whitespace()))
    }

    async fn current_branch(&self, path: &Path) -> Result<String> {
        let output = self
            .execute(
                path,
                "rev-parse",
                &["rev-parse", "--abbrev-ref", "HEAD"],
                self.read_timeout,
            )
            .await?;
        Ok(output.lines().next().unwrap_or("").trim().to_string())
    }

    async fn list_worktrees(&self, path: &Path) -> Result<Vec<Worktree>> {
        let output = self
            .execute(
                path,
                "worktree",
                &["worktree", "list", "--porcelain"],
                self.write_timeout,
            )
            .await?;
        Ok(parse_worktree_list(&output))
    }

    async fn init(&self, path: &Path) -> Result<()> {
        self.execute(path, "init", &["init"], self.write_timeout)
            .await?;
        debug!("Initialized repository at {:?}", path);
        Ok(())
    }

    async fn commit_all(&self, path: &Path, message: &str) -> Result<()> {
        self.execute(path, "add", &["add", "."], self.write_timeout)
            .await?;
        self.execute(path, "commit", &["commit", "-m", message], self.write_timeout)
            .await?;
        debug!("Committed all changes in {:?}", path);
        Ok(())
    }
}

/// Returns `true` if the `git` binary is installed and runnable
pub async fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}
