//! Git integration via the `git` binary
//!
//! Provides:
//! - `GitOps` - The operations the rest of the crate needs from git
//! - `GitCli` - Deadline-bounded subprocess implementation
//! - `Worktree` - Parsed `git worktree list --porcelain` entries

mod executor;
mod worktree;

pub use executor::*;
pub use worktree::*;
