//! ghqx - A workspace manager for git repositories
//!
//! Organizes repositories into named workspace roots (typically `sandbox`,
//! `dev` and `release`) and moves projects between them with an undoable
//! history. Cloning is delegated to the external `ghq` tool.
//!
//! # Architecture
//!
//! - **StatusService** - Read path: scans every root concurrently and
//!   optionally enriches projects with git state
//! - **PromoteEngine** - Write path: validated moves between roots and undo
//! - **HistoryLog** - Bounded JSON log that makes undo well-defined
//!
//! # Modules
//!
//! - [`workspace`] - Project model, scanner, status service, promote engine
//! - [`git`] - Deadline-bounded git subprocess adapter
//! - [`ghq`] - External cloner adapter
//! - [`config`] - Configuration and history persistence
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod ghq;
pub mod git;
pub mod workspace;

pub use config::{Config, HistoryLog};
pub use error::{Error, Result};
pub use workspace::{
    Project, PromoteEngine, PromoteOptions, PromoteRecord, ScanOptions, StatusService,
    WorkspaceKind,
};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
