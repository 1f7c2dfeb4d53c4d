//! Workspace model module
//!
//! Provides the multi-root workspace model:
//! - `Project` - A git repository discovered under a named root
//! - `Scanner` - Project discovery on disk
//! - `StatusService` - Concurrent scanning of every root
//! - `PromoteEngine` - Moving projects between roots, with undo

mod promote;
mod scanner;
mod status;
mod types;

pub use promote::*;
pub use scanner::*;
pub use status::*;
pub use types::*;
