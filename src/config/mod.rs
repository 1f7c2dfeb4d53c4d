//! Configuration and persistence module
//!
//! Handles:
//! - User configuration (`~/.config/ghqx/config.toml` and friends)
//! - Promote history (`<user-config-dir>/ghqx/history.json`)

mod history;
mod settings;

pub use history::*;
pub use settings::*;
