//! User configuration settings
//!
//! Layered configuration: defaults → config file → environment variables (`GHQX_*`)

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result, RootError};
use crate::workspace::WorkspaceKind;

/// Application directory name under the user config directory
pub const APP_DIR: &str = "ghqx";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "GHQX_CONFIG";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Named roots mapped to absolute paths
    pub roots: BTreeMap<String, PathBuf>,

    /// Default root selection
    pub default: DefaultSettings,

    /// Defaults for `promote`
    pub promote: PromoteSettings,

    /// Promote history settings
    pub history: HistorySettings,

    /// Git subprocess deadlines
    pub git: GitSettings,

    /// External cloner settings
    pub clone: CloneSettings,

    /// Filesystem scan settings
    pub scan: ScanSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSettings {
    /// Root used when none is given (may be empty)
    pub root: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromoteSettings {
    pub from: String,
    pub to: String,
    pub auto_git_init: bool,
    pub auto_commit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub enabled: bool,
    /// Maximum retained records; oldest are dropped first
    pub max: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    /// Deadline for read operations (status, rev-parse) in milliseconds
    pub read_timeout_ms: u64,
    /// Deadline for write and worktree operations in milliseconds
    pub write_timeout_ms: u64,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            read_timeout_ms: 150,
            write_timeout_ms: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneSettings {
    pub timeout_secs: u64,
}

impl Default for CloneSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Deadline for walking a single root
    pub timeout_secs: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl Config {
    /// Discover and load the configuration file
    ///
    /// An explicit path that does not exist is an error; it does not fall through
    /// to the other locations.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::discover(explicit, |key| std::env::var_os(key))?;
        Self::load_from(&path)
    }

    /// Load and validate configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config: Config = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Layer the config file
            .merge(Toml::file(path))
            // Layer environment variables (GHQX_HISTORY__MAX, etc.)
            .merge(Env::prefixed("GHQX_").split("__"))
            .extract()
            .map_err(|e| ConfigError::Unparseable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        config.expand_home();
        config.validate()?;

        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Resolve which config file to use
    ///
    /// Order: explicit argument, `GHQX_CONFIG`, `$XDG_CONFIG_HOME/ghqx/config.toml`,
    /// `$HOME/.config/ghqx/config.toml`, `$HOME/.ghqx.toml`. First existing file wins.
    pub fn discover<F>(explicit: Option<&Path>, lookup: F) -> Result<PathBuf>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            return Err(ConfigError::Missing {
                searched: vec![path.to_path_buf()],
            }
            .into());
        }

        let candidates = Self::candidate_paths(lookup);
        if let Some(found) = candidates.iter().find(|p| p.is_file()) {
            return Ok(found.clone());
        }

        Err(ConfigError::Missing {
            searched: candidates,
        }
        .into())
    }

    /// Candidate config locations in priority order (explicit argument excluded)
    pub fn candidate_paths<F>(lookup: F) -> Vec<PathBuf>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        let mut paths = Vec::new();
        if let Some(path) = non_empty(CONFIG_ENV) {
            paths.push(path);
        }
        if let Some(xdg) = non_empty("XDG_CONFIG_HOME") {
            paths.push(xdg.join(APP_DIR).join("config.toml"));
        }
        if let Some(home) = non_empty("HOME") {
            paths.push(home.join(".config").join(APP_DIR).join("config.toml"));
            paths.push(home.join(".ghqx.toml"));
        }
        paths
    }

    /// Default location for a newly created config file
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Location of the promote history file
    pub fn history_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("history.json"))
    }

    /// Check structural invariants
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(ConfigError::NoRoots.into());
        }

        for (name, path) in &self.roots {
            if name.trim().is_empty() {
                return Err(invalid("roots", "root names must not be empty"));
            }
            if !path.is_absolute() {
                return Err(invalid(
                    &format!("roots.{}", name),
                    &format!("path must be absolute, got {}", path.display()),
                ));
            }
        }

        if !self.default.root.is_empty() && !self.roots.contains_key(&self.default.root) {
            return Err(ConfigError::InvalidDefaultRoot(self.default.root.clone()).into());
        }

        for (key, value) in [("promote.from", &self.promote.from), ("promote.to", &self.promote.to)] {
            if !value.is_empty() && !self.roots.contains_key(value) {
                return Err(invalid(key, &format!("'{}' is not a configured root", value)));
            }
        }

        if self.history.max == 0 {
            return Err(invalid("history.max", "must be a positive integer"));
        }

        Ok(())
    }

    /// Look up a root path by name
    pub fn get_root(&self, name: &str) -> Option<&Path> {
        self.roots.get(name).map(PathBuf::as_path)
    }

    /// Look up a root path by name, failing with `RootUnknown`
    pub fn require_root(&self, name: &str) -> Result<&Path> {
        self.get_root(name)
            .ok_or_else(|| RootError::Unknown(name.to_string()).into())
    }

    /// The configured default root, or any root when none is set
    ///
    /// Callers must not depend on which root is chosen in the fallback case.
    pub fn default_root_or_first(&self) -> Option<&str> {
        if !self.default.root.is_empty() {
            return Some(self.default.root.as_str());
        }
        self.roots.keys().next().map(String::as_str)
    }

    /// Root names in sorted order
    pub fn root_names(&self) -> Vec<&str> {
        self.roots.keys().map(String::as_str).collect()
    }

    /// Workspace classification of a configured root
    pub fn workspace_kind(&self, name: &str) -> WorkspaceKind {
        WorkspaceKind::from_root(name)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.git.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.git.write_timeout_ms)
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone.timeout_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.timeout_secs)
    }

    /// A starter configuration with sandbox, dev and release roots under `~/ghqx`
    pub fn template() -> Result<Self> {
        let base = home_dir()?.join(APP_DIR);
        let mut config = Config::default();
        for name in ["sandbox", "dev", "release"] {
            config.roots.insert(name.to_string(), base.join(name));
        }
        config.default.root = "sandbox".to_string();
        config.promote.from = "sandbox".to_string();
        config.promote.to = "dev".to_string();
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::InvalidValue {
                key: "config".to_string(),
                reason: format!("cannot be encoded as TOML: {}", e),
            }
            .into()
        })
    }

    /// Save configuration to a specific file (whole-file rewrite)
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let toml = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        std::fs::write(path, toml).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(())
    }

    /// Expand `~/` prefixes in root paths
    fn expand_home(&mut self) {
        let Ok(home) = home_dir() else {
            return;
        };
        for path in self.roots.values_mut() {
            if let Ok(rest) = path.strip_prefix("~") {
                *path = home.join(rest);
            }
        }
    }

    fn config_dir() -> Result<PathBuf> {
        let dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(dirs.config_dir().join(APP_DIR))
    }
}

fn home_dir() -> Result<PathBuf> {
    let dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
    Ok(dirs.home_dir().to_path_buf())
}

fn invalid(key: &str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
