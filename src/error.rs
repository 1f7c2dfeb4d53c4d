//! Error types for ghqx
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `Display` and `Error` impls.
//! `Display` is the user-facing message; [`Error::hint`] and [`Error::detail`] carry the
//! remediation hint and the internal cause respectively.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for ghqx
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Root(#[from] RootError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Promote(#[from] PromoteError),

    #[error(transparent)]
    Undo(#[from] UndoError),

    #[error(transparent)]
    Cloner(#[from] CloneError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found")]
    Missing { searched: Vec<PathBuf> },

    #[error("Configuration file could not be parsed")]
    Unparseable { path: PathBuf, reason: String },

    #[error("No roots are configured")]
    NoRoots,

    #[error("Default root '{0}' is not a configured root")]
    InvalidDefaultRoot(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration")]
    SaveFailed { path: PathBuf, reason: String },

    #[error("Could not determine the home directory")]
    NoHomeDirectory,
}

/// Root resolution errors
#[derive(Error, Debug)]
pub enum RootError {
    #[error("Unknown root '{0}'")]
    Unknown(String),

    #[error("Root directory does not exist: {}", .0.display())]
    DirectoryMissing(PathBuf),
}

/// Project lookup and naming errors
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Invalid project name '{0}'")]
    InvalidName(String),
}

/// Git operations errors
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Repository has uncommitted changes: {}", .0.display())]
    DirtyRepo(PathBuf),

    #[error("git {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("git {operation} failed")]
    CommandFailed {
        operation: &'static str,
        cause: String,
    },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Failed to scan {}", .path.display())]
    ScanFailed { path: PathBuf, cause: String },

    #[error("Failed to create directory {}", .path.display())]
    CreateDirFailed { path: PathBuf, cause: String },

    #[error("Failed to read directory {}", .path.display())]
    ReadDirFailed { path: PathBuf, cause: String },
}

/// Promote errors
#[derive(Error, Debug)]
pub enum PromoteError {
    #[error("Project to promote does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("Failed to move {} to {}", .from.display(), .to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        cause: String,
    },
}

/// Undo errors
#[derive(Error, Debug)]
pub enum UndoError {
    #[error("Undo is unavailable because history is disabled")]
    Disabled,

    #[error("Nothing to undo")]
    NoHistory,

    #[error("Promoted project no longer exists: {}", .0.display())]
    DestinationMissing(PathBuf),

    #[error("Original location is occupied: {}", .0.display())]
    SourceOccupied(PathBuf),
}

/// External cloner errors
#[derive(Error, Debug)]
pub enum CloneError {
    #[error("ghq is not installed or not in PATH")]
    ToolMissing,

    #[error("ghq get timed out after {0:?}")]
    Timeout(Duration),

    #[error("ghq get failed")]
    Failed(String),
}

/// History log errors
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to read history file {}", .path.display())]
    ReadFailed { path: PathBuf, cause: String },

    #[error("History file is corrupt: {}", .path.display())]
    Corrupt { path: PathBuf, cause: String },

    #[error("Failed to write history file {}", .path.display())]
    WriteFailed { path: PathBuf, cause: String },
}

impl Error {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(e) => match e {
                ConfigError::Missing { .. } => "CONFIG_MISSING",
                ConfigError::Unparseable { .. } => "CONFIG_UNPARSEABLE",
                ConfigError::NoRoots => "CONFIG_NO_ROOTS",
                ConfigError::InvalidDefaultRoot(_) => "CONFIG_INVALID_DEFAULT_ROOT",
                ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
                ConfigError::SaveFailed { .. } => "CONFIG_SAVE_FAILED",
                ConfigError::NoHomeDirectory => "CONFIG_NO_HOME",
            },
            Error::Root(e) => match e {
                RootError::Unknown(_) => "ROOT_UNKNOWN",
                RootError::DirectoryMissing(_) => "ROOT_DIRECTORY_MISSING",
            },
            Error::Project(e) => match e {
                ProjectError::NotFound(_) => "PROJECT_NOT_FOUND",
                ProjectError::InvalidName(_) => "PROJECT_NAME_INVALID",
            },
            Error::Git(e) => match e {
                GitError::DirtyRepo(_) => "GIT_DIRTY_REPO",
                GitError::Timeout { .. } => "GIT_TIMEOUT",
                GitError::CommandFailed { .. } => "GIT_COMMAND_FAILED",
            },
            Error::Fs(e) => match e {
                FsError::ScanFailed { .. } => "SCAN_FAILED",
                FsError::CreateDirFailed { .. } => "CREATE_DIR_FAILED",
                FsError::ReadDirFailed { .. } => "READ_DIR_FAILED",
            },
            Error::Promote(e) => match e {
                PromoteError::SourceNotFound(_) => "PROMOTE_SOURCE_NOT_FOUND",
                PromoteError::DestinationExists(_) => "PROMOTE_DESTINATION_EXISTS",
                PromoteError::MoveFailed { .. } => "PROMOTE_MOVE_FAILED",
            },
            Error::Undo(e) => match e {
                UndoError::Disabled => "UNDO_DISABLED",
                UndoError::NoHistory => "UNDO_NO_HISTORY",
                UndoError::DestinationMissing(_) => "UNDO_DESTINATION_MISSING",
                UndoError::SourceOccupied(_) => "UNDO_SOURCE_OCCUPIED",
            },
            Error::Cloner(e) => match e {
                CloneError::ToolMissing => "CLONE_TOOL_MISSING",
                CloneError::Timeout(_) => "CLONE_TIMEOUT",
                CloneError::Failed(_) => "CLONE_FAILED",
            },
            Error::History(e) => match e {
                HistoryError::ReadFailed { .. } => "HISTORY_READ_FAILED",
                HistoryError::Corrupt { .. } => "HISTORY_CORRUPT",
                HistoryError::WriteFailed { .. } => "HISTORY_WRITE_FAILED",
            },
        }
    }

    /// Remediation hint shown to the user, if any
    pub fn hint(&self) -> Option<String> {
        let hint = match self {
            Error::Config(ConfigError::Missing { .. }) => {
                "Run `ghqx config init` to create a default configuration".to_string()
            }
            Error::Config(ConfigError::NoRoots) => {
                "Add at least one entry under [roots] in the config file".to_string()
            }
            Error::Config(ConfigError::InvalidDefaultRoot(_)) => {
                "Set [default].root to one of the names under [roots]".to_string()
            }
            Error::Root(RootError::Unknown(_)) => {
                "Run `ghqx roots` to list the configured roots".to_string()
            }
            Error::Root(RootError::DirectoryMissing(path)) => {
                format!("Create the directory with `mkdir -p {}`", path.display())
            }
            Error::Git(GitError::DirtyRepo(_)) => {
                "Commit or stash your changes, or pass --force to promote anyway".to_string()
            }
            Error::Promote(PromoteError::DestinationExists(_)) => {
                "Remove or rename the existing directory, then retry".to_string()
            }
            Error::Undo(UndoError::Disabled) => {
                "Set [history].enabled = true to record promotions".to_string()
            }
            Error::Undo(UndoError::NoHistory) => {
                "Only promotions recorded in history can be undone".to_string()
            }
            Error::Undo(UndoError::SourceOccupied(_)) => {
                "Move the directory at the original location out of the way, then retry"
                    .to_string()
            }
            Error::Cloner(CloneError::ToolMissing) => {
                "Install ghq: go install github.com/x-motemen/ghq@latest".to_string()
            }
            _ => return None,
        };
        Some(hint)
    }

    /// Internal detail (cause, path) for debug output
    pub fn detail(&self) -> Option<String> {
        match self {
            Error::Config(ConfigError::Missing { searched }) => Some(
                searched
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Error::Config(ConfigError::Unparseable { path, reason })
            | Error::Config(ConfigError::SaveFailed { path, reason }) => {
                Some(format!("{}: {}", path.display(), reason))
            }
            Error::Git(GitError::CommandFailed { cause, .. }) => Some(cause.clone()),
            Error::Fs(
                FsError::ScanFailed { cause, .. }
                | FsError::CreateDirFailed { cause, .. }
                | FsError::ReadDirFailed { cause, .. },
            ) => Some(cause.clone()),
            Error::Promote(PromoteError::MoveFailed { cause, .. }) => Some(cause.clone()),
            Error::Cloner(CloneError::Failed(cause)) => Some(cause.clone()),
            Error::History(
                HistoryError::ReadFailed { cause, .. }
                | HistoryError::Corrupt { cause, .. }
                | HistoryError::WriteFailed { cause, .. },
            ) => Some(cause.clone()),
            _ => None,
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;
