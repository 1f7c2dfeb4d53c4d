//! Promote engine - moves projects between roots
//!
//! Every precondition is checked before the single `rename` that commits a
//! promote or undo. Work after the rename (git init, auto commit, history
//! append on promote) is best-effort and never rolls the move back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::scanner::{has_git_dir, is_safe_name};
use super::{PromoteRecord, WorkspaceKind};
use crate::config::{Config, HistoryLog};
use crate::error::{
    ConfigError, FsError, GitError, HistoryError, ProjectError, PromoteError, Result, UndoError,
};
use crate::git::GitOps;

/// Host and owner segments used for non-sandbox destinations
///
/// Real ghq layouts derive these from the origin URL; these are fixed placeholders.
pub const PLACEHOLDER_HOST: &str = "github.com";
pub const PLACEHOLDER_OWNER: &str = "user";

/// Parameters of a single promote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromoteOptions {
    pub project_name: String,
    pub from_root: String,
    pub to_root: String,
    /// Skip the dirty-repository check
    pub force: bool,
    /// Validate and compute paths without touching the filesystem
    pub dry_run: bool,
    /// Run `git init` in the destination when it has no `.git`
    pub auto_git_init: bool,
    /// Commit everything in the destination after the move
    pub auto_commit: bool,
}

impl PromoteOptions {
    /// Options pre-filled from the `[promote]` section
    pub fn from_config(config: &Config, project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            from_root: config.promote.from.clone(),
            to_root: config.promote.to.clone(),
            auto_git_init: config.promote.auto_git_init,
            auto_commit: config.promote.auto_commit,
            ..Default::default()
        }
    }
}

/// Write-side entry point: promote and undo
pub struct PromoteEngine {
    /// Application configuration
    config: Arc<Config>,
    /// Git operations for dirty checks and post-move setup
    git: Arc<dyn GitOps>,
    /// Promote history
    history: HistoryLog,
}

impl PromoteEngine {
    /// Create a new promote engine
    pub fn new(config: Arc<Config>, git: Arc<dyn GitOps>, history: HistoryLog) -> Self {
        Self {
            config,
            git,
            history,
        }
    }

    /// Get the history log
    pub fn history_log(&self) -> &HistoryLog {
        &self.history
    }

    /// Stored promote records, oldest first (empty when history is disabled)
    pub fn history(&self) -> Result<Vec<PromoteRecord>> {
        if !self.config.history.enabled {
            return Ok(Vec::new());
        }
        self.history.load()
    }

    /// Where a project named `name` lands in `to_root`
    ///
    /// Sandbox roots are flat; every other root uses a ghq-like
    /// `github.com/user/<name>` layout.
    pub fn destination_for(to_root: &str, to_path: &Path, name: &str) -> PathBuf {
        if WorkspaceKind::from_root(to_root) == WorkspaceKind::Sandbox {
            to_path.join(name)
        } else {
            to_path
                .join(PLACEHOLDER_HOST)
                .join(PLACEHOLDER_OWNER)
                .join(name)
        }
    }

    /// Move a project from one root to another
    #[instrument(skip(self), fields(project = %options.project_name))]
    pub async fn promote(&self, options: &PromoteOptions) -> Result<PromoteRecord> {
        let from_path = self.config.require_root(&options.from_root)?;
        let to_path = self.config.require_root(&options.to_root)?;

        if options.from_root == options.to_root {
            return Err(ConfigError::InvalidValue {
                key: "promote.to".to_string(),
                reason: "source and destination roots are the same".to_string(),
            }
            .into());
        }

        if !is_safe_name(&options.project_name) {
            return Err(ProjectError::InvalidName(options.project_name.clone()).into());
        }

        let src = from_path.join(&options.project_name);
        if !path_exists(&src).await? {
            return Err(PromoteError::SourceNotFound(src).into());
        }

        if !options.force && has_git_dir(&src) {
            match self.git.is_dirty(&src).await {
                Ok(true) => return Err(GitError::DirtyRepo(src.clone()).into()),
                Ok(false) => {}
                Err(e) => debug!("Dirty check failed, treating as clean: {}", e),
            }
        }

        let dst = Self::destination_for(&options.to_root, to_path, &options.project_name);
        if path_exists(&dst).await? {
            return Err(PromoteError::DestinationExists(dst).into());
        }

        let mut record = PromoteRecord {
            timestamp: 0,
            project_name: options.project_name.clone(),
            from_root: options.from_root.clone(),
            from_path: src.clone(),
            to_root: options.to_root.clone(),
            to_path: dst.clone(),
        };

        if options.dry_run {
            debug!("Dry run: would move {:?} to {:?}", src, dst);
            return Ok(record);
        }

        if let Some(parent) = dst.parent() {
            create_dir_all(parent).await?;
        }

        move_dir(&src, &dst).await?;
        info!("Promoted {:?} to {:?}", src, dst);

        if options.auto_git_init && !dst.join(".git").exists() {
            if let Err(e) = self.git.init(&dst).await {
                warn!("git init after promote failed: {}", e);
            }
        }

        if options.auto_commit && has_git_dir(&dst) {
            let message = format!("ghqx: promoted from {}", options.from_root);
            if let Err(e) = self.git.commit_all(&dst, &message).await {
                warn!("Auto commit after promote failed: {}", e);
            }
        }

        record.timestamp = Utc::now().timestamp();

        // History failures never fail a completed move
        if self.config.history.enabled {
            let entry = record.clone();
            if let Err(e) = self.with_history(move |log| log.append(entry)).await {
                warn!("Failed to record promote in history: {}", e);
            }
        }

        Ok(record)
    }

    /// Reverse the most recent promote
    #[instrument(skip(self))]
    pub async fn undo(&self, dry_run: bool) -> Result<PromoteRecord> {
        if !self.config.history.enabled {
            return Err(UndoError::Disabled.into());
        }

        let record = self
            .with_history(|log| log.last())
            .await?
            .ok_or(UndoError::NoHistory)?;

        if !path_exists(&record.to_path).await? {
            return Err(UndoError::DestinationMissing(record.to_path.clone()).into());
        }
        if path_exists(&record.from_path).await? {
            return Err(UndoError::SourceOccupied(record.from_path.clone()).into());
        }

        if dry_run {
            debug!(
                "Dry run: would move {:?} back to {:?}",
                record.to_path, record.from_path
            );
            return Ok(record);
        }

        if let Some(parent) = record.from_path.parent() {
            create_dir_all(parent).await?;
        }

        move_dir(&record.to_path, &record.from_path).await?;
        info!(
            "Moved {:?} back to {:?}",
            record.to_path, record.from_path
        );

        self.with_history(|log| log.pop()).await?;
        Ok(record)
    }

    /// Run a history file operation on the blocking pool
    async fn with_history<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&HistoryLog) -> Result<T> + Send + 'static,
    {
        let log = self.history.clone();
        tokio::task::spawn_blocking(move || op(&log))
            .await
            .map_err(|e| HistoryError::WriteFailed {
                path: self.history.path().to_path_buf(),
                cause: e.to_string(),
            })?
    }
}

async fn create_dir_all(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        FsError::CreateDirFailed {
            path: path.to_path_buf(),
            cause: e.to_string(),
        }
        .into()
    })
}

/// Whether anything (including a dangling symlink) exists at `path`
async fn path_exists(path: &Path) -> Result<bool> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(FsError::ReadDirFailed {
            path: path.to_path_buf(),
            cause: e.to_string(),
        }
        .into()),
    }
}

async fn move_dir(from: &Path, to: &Path) -> Result<()> {
    tokio::fs::rename(from, to).await.map_err(|e| {
        PromoteError::MoveFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            cause: e.to_string(),
        }
        .into()
    })
}
