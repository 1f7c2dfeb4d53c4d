//! Git worktree listing
//!
//! Parses the stanzas produced by `git worktree list --porcelain`.

use std::path::PathBuf;

use serde::Serialize;

/// Worktree information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Worktree {
    /// Path to the worktree
    pub path: PathBuf,
    /// Branch name without `refs/heads/` (empty for detached HEAD)
    pub branch: String,
    /// Whether this is a bare repository entry
    pub bare: bool,
    /// Whether the worktree is locked
    pub locked: bool,
}

/// Parse `git worktree list --porcelain` output
///
/// Stanzas are separated by blank lines. The final stanza is emitted even
/// without a trailing blank line. Unknown keys are ignored.
pub fn parse_worktree_list(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut current: Option<Worktree> = None;

    for line in output.lines() {
        let line = line.trim_end();

        if line.is_empty() {
            if let Some(worktree) = current.take() {
                worktrees.push(worktree);
            }
            continue;
        }

        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        match key {
            "worktree" => {
                if let Some(worktree) = current.take() {
                    worktrees.push(worktree);
                }
                current = Some(Worktree {
                    path: PathBuf::from(value),
                    ..Default::default()
                });
            }
            "branch" => {
                if let Some(worktree) = current.as_mut() {
                    worktree.branch = value
                        .strip_prefix("refs/heads/")
                        .unwrap_or(value)
                        .to_string();
                }
            }
            "bare" => {
                if let Some(worktree) = current.as_mut() {
                    worktree.bare = true;
                }
            }
            // `locked` may carry a reason after the keyword
            "locked" => {
                if let Some(worktree) = current.as_mut() {
                    worktree.locked = true;
                }
            }
            _ => {}
        }
    }

    // Don't forget the last worktree
    if let Some(worktree) = current {
        worktrees.push(worktree);
    }

    worktrees
}
