//! Filesystem scanner
//!
//! Walks a root depth-first and emits a [`Project`] for every directory that
//! contains a `.git` directory. Scanning does not descend into a project once
//! found, so nested repositories and worktrees inside it are not reported.

use std::path::{Component, Path};

use async_trait::async_trait;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use super::Project;
use crate::error::{FsError, Result, RootError};

/// Characters never allowed in a project name
const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Discovers projects under a root
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan_root(&self, root_name: &str, root_path: &Path) -> Result<Vec<Project>>;
}

/// Scanner backed by the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsScanner;

impl FsScanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Scanner for FsScanner {
    async fn scan_root(&self, root_name: &str, root_path: &Path) -> Result<Vec<Project>> {
        let root_name = root_name.to_string();
        let root_path = root_path.to_path_buf();
        let walk_path = root_path.clone();

        tokio::task::spawn_blocking(move || walk_root(&root_name, &walk_path))
            .await
            .map_err(|e| FsError::ScanFailed {
                path: root_path,
                cause: e.to_string(),
            })?
    }
}

/// Blocking walk of a single root
///
/// Per-entry errors (permission denied, vanished entries) are skipped; only a
/// failure to read the root itself is reported.
#[instrument(skip_all, fields(root = root_name, path = %root_path.display()))]
pub fn walk_root(root_name: &str, root_path: &Path) -> Result<Vec<Project>> {
    if !root_path.exists() {
        return Err(RootError::DirectoryMissing(root_path.to_path_buf()).into());
    }
    if !root_path.is_dir() {
        return Err(FsError::ScanFailed {
            path: root_path.to_path_buf(),
            cause: "not a directory".to_string(),
        }
        .into());
    }

    let mut projects = Vec::new();
    let mut walker = WalkDir::new(root_path).follow_links(false).into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 || e.path() == Some(root_path) => {
                return Err(FsError::ScanFailed {
                    path: root_path.to_path_buf(),
                    cause: e.to_string(),
                }
                .into());
            }
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        if has_git_dir(entry.path()) {
            let name = project_name(root_path, entry.path());
            projects.push(Project::new(root_name, name, entry.path().to_path_buf()));
            walker.skip_current_dir();
        }
    }

    debug!("Found {} project(s)", projects.len());
    Ok(projects)
}

/// Whether `path/.git` exists and is a directory
pub fn has_git_dir(path: &Path) -> bool {
    path.join(".git").is_dir()
}

/// Create a directory and its parents; succeeds if it already exists
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| {
        FsError::CreateDirFailed {
            path: path.to_path_buf(),
            cause: e.to_string(),
        }
        .into()
    })
}

/// Whether `name` can be used as a single directory name under a root
pub fn is_safe_name(name: &str) -> bool {
    !(name.is_empty() || name == "." || name == ".." || name.contains(UNSAFE_CHARS))
}

/// Join the normal components of a relative path with `/`
pub fn normalize_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Name of the project at `path`, relative to `root_path`
///
/// A repository at the root itself is named after the root directory.
fn project_name(root_path: &Path, path: &Path) -> String {
    let name = path
        .strip_prefix(root_path)
        .map(normalize_name)
        .unwrap_or_default();

    if name.is_empty() {
        return root_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    name
}
