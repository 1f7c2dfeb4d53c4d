//! Core workspace types
//!
//! Defines the workspace model:
//! - `WorkspaceKind` classifies a root by its name
//! - `Project` is a git repository discovered under a root
//! - `PromoteRecord` is one entry of the promote history

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Semantic classification of a root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceKind {
    /// Throwaway clones and experiments
    Sandbox,
    /// Active development
    Dev,
    /// Released or archived work
    Release,
    /// Any other root name
    Unknown,
}

impl WorkspaceKind {
    /// Classify a root by exact name match
    pub fn from_root(name: &str) -> Self {
        match name {
            "sandbox" => Self::Sandbox,
            "dev" => Self::Dev,
            "release" => Self::Release,
            _ => Self::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for WorkspaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sandbox => write!(f, "sandbox"),
            Self::Dev => write!(f, "dev"),
            Self::Release => write!(f, "release"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A git repository discovered under a root
///
/// `(root, name)` is globally unique; `name` alone is only unique within a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Slash-separated path relative to the root (e.g. `github.com/user/repo`)
    pub name: String,
    /// Last two segments of `name`
    pub display_name: String,
    /// Root the project was found under
    pub root: String,
    /// Absolute path to the project directory
    pub path: PathBuf,
    /// Classification derived from `root`
    pub workspace_kind: WorkspaceKind,
    /// Whether the directory contains a `.git` directory
    pub has_git: bool,
    /// Working tree has uncommitted changes (only when dirty checking was requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirty: Option<bool>,
    /// Current branch (only when branch loading was requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl Project {
    /// Create a project from its slash-normalized name
    pub fn new(root: impl Into<String>, name: impl Into<String>, path: PathBuf) -> Self {
        let root = root.into();
        let name = name.into();
        Self {
            display_name: display_name(&name),
            workspace_kind: WorkspaceKind::from_root(&root),
            name,
            root,
            path,
            has_git: true,
            dirty: None,
            branch: None,
        }
    }
}

/// Last two path segments of `name` joined by `/`
pub fn display_name(name: &str) -> String {
    let segments: Vec<&str> = name.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return name.to_string();
    }
    segments[segments.len() - 2..].join("/")
}

/// Sort projects by `(root, name)` for deterministic display
pub fn sort_projects(projects: &mut [Project]) {
    projects.sort_by(|a, b| a.root.cmp(&b.root).then_with(|| a.name.cmp(&b.name)));
}

/// Enrichment requested from the status service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Run `git status` on each project
    pub check_dirty: bool,
    /// Resolve the current branch of each project
    pub load_branch: bool,
}

impl ScanOptions {
    pub fn needs_git(&self) -> bool {
        self.check_dirty || self.load_branch
    }
}

/// One promote operation, as stored in the history file
///
/// Field names are serialized in PascalCase for compatibility with existing history files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PromoteRecord {
    /// Unix seconds; `0` for dry runs
    pub timestamp: i64,
    pub project_name: String,
    pub from_root: String,
    pub from_path: PathBuf,
    pub to_root: String,
    pub to_path: PathBuf,
}

impl PromoteRecord {
    /// Whether this record describes a planned move that was never performed
    pub fn is_dry_run(&self) -> bool {
        self.timestamp == 0
    }
}
