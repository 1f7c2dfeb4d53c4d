//! ghqx - Workspace manager for git repositories
//!
//! Run with `ghqx --help` for usage.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ghqx::{
    APP_NAME, Config, Error, HistoryLog, Project, PromoteEngine, PromoteOptions, PromoteRecord,
    ScanOptions, StatusService, VERSION,
    error::ConfigError,
    ghq::{Cloner, GhqCloner},
    git::{GitCli, GitOps},
    workspace::{FsScanner, ensure_dir, sort_projects},
};

/// Environment variable that enables debug error output
const DEBUG_ENV: &str = "GHQX_DEBUG";

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version = VERSION)]
#[command(about = "Organize git repositories into sandbox, dev and release workspaces")]
#[command(long_about = None)]
struct Cli {
    /// Enable debug logging and detailed error output
    #[arg(short, long)]
    debug: bool,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List projects in every root
    Status {
        /// Only scan this root
        #[arg(short, long)]
        root: Option<String>,

        /// Check each project for uncommitted changes
        #[arg(long)]
        dirty: bool,

        /// Show the current branch of each project
        #[arg(long)]
        branch: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the absolute path of a project
    Path {
        /// Project name relative to its root (e.g. github.com/user/repo)
        name: String,

        /// Only look in this root
        #[arg(short, long)]
        root: Option<String>,
    },

    /// List configured roots
    Roots,

    /// List the worktrees of a project
    Worktrees {
        /// Project name relative to its root
        name: String,

        /// Only look in this root
        #[arg(short, long)]
        root: Option<String>,
    },

    /// Clone a repository into a workspace with ghq
    Get {
        /// Repository URL or ghq-style path
        repository: String,

        /// Target workspace (default: the configured default root)
        #[arg(short, long)]
        workspace: Option<String>,
    },

    /// Move a project from one workspace to another
    Promote {
        /// Project directory name in the source root
        name: String,

        /// Source root (default: [promote].from)
        #[arg(long)]
        from: Option<String>,

        /// Destination root (default: [promote].to)
        #[arg(long)]
        to: Option<String>,

        /// Promote even if the repository has uncommitted changes
        #[arg(short, long)]
        force: bool,

        /// Show what would happen without moving anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Run `git init` in the destination if it is not a repository
        #[arg(long)]
        git_init: bool,

        /// Commit all changes in the destination after moving
        #[arg(long)]
        commit: bool,
    },

    /// Reverse the most recent promote
    Undo {
        /// Show what would happen without moving anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Show promote history
    History {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Delete every record (undo is no longer possible)
        #[arg(long, conflicts_with = "json")]
        clear: bool,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the path of the configuration file in use
    Path,
    /// Load and validate the configuration
    Validate,
    /// Write a starter configuration and create its root directories
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn setup_logging(debug: bool) -> color_eyre::Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        // Keep command output clean unless asked otherwise
        EnvFilter::try_from_env("GHQX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();

    Ok(())
}

fn debug_output_enabled(flag: bool) -> bool {
    flag || std::env::var(DEBUG_ENV)
        .map(|v| !v.is_empty() && v != "0")
        .unwrap_or(false)
}

/// Print an error as message + hint, plus code and detail in debug mode
fn report(err: &Error, debug: bool) {
    eprintln!("Error: {}", err);
    if let Some(hint) = err.hint() {
        eprintln!("hint: {}", hint);
    }
    if debug_output_enabled(debug) {
        eprintln!("code: {}", err.code());
        if let Some(detail) = err.detail() {
            eprintln!("detail: {}", detail);
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON: {}", e),
    }
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn status_service(config: &Arc<Config>) -> StatusService {
    StatusService::new(
        Arc::clone(config),
        Arc::new(FsScanner::new()),
        Arc::new(GitCli::from_config(config)),
    )
}

fn promote_engine(config: &Arc<Config>) -> ghqx::Result<PromoteEngine> {
    let history = HistoryLog::new(Config::history_path()?, config.history.max);
    Ok(PromoteEngine::new(
        Arc::clone(config),
        Arc::new(GitCli::from_config(config)),
        history,
    ))
}

fn require_setting(value: String, key: &str, flag: &str) -> ghqx::Result<String> {
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("no root given; pass {} or set {}", flag, key),
        }
        .into());
    }
    Ok(value)
}

fn print_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects found.");
        return;
    }

    let width = projects.iter().map(|p| p.root.len()).max().unwrap_or(0);
    for project in projects {
        let mut line = format!("{:<width$}  {}", project.root, project.name, width = width);
        if let Some(branch) = &project.branch {
            line.push_str(&format!("  [{}]", branch));
        }
        if project.dirty == Some(true) {
            line.push_str("  *");
        }
        println!("{}", line);
    }
}

fn print_record(verb: &str, record: &PromoteRecord) {
    println!(
        "{} {}: {} -> {}",
        verb,
        record.project_name,
        record.from_path.display(),
        record.to_path.display()
    );
}

async fn run(cli: Cli) -> ghqx::Result<()> {
    // `config init` and `config path` must work without a loadable config
    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Init { force } => return init_config(cli.config.as_deref(), *force),
            ConfigAction::Path => {
                match Config::discover(cli.config.as_deref(), |key| std::env::var_os(key)) {
                    Ok(path) => println!("{}", path.display()),
                    Err(_) => println!("{} (not found)", Config::default_config_path()?.display()),
                }
                return Ok(());
            }
            _ => {}
        }
    }

    let config = Arc::new(Config::load(cli.config.as_deref())?);

    match cli.command {
        Commands::Status {
            root,
            dirty,
            branch,
            json,
        } => {
            let options = ScanOptions {
                check_dirty: dirty,
                load_branch: branch,
            };
            let mut projects = status_service(&config)
                .get_all(options, root.as_deref())
                .await?;
            sort_projects(&mut projects);

            if json {
                print_json(&projects);
            } else {
                print_projects(&projects);
            }
        }

        Commands::Path { name, root } => {
            let service = status_service(&config);
            let project = match root {
                Some(root) => service.find_project_in(&root, &name).await?,
                None => service.find_project(&name).await?,
            };
            println!("{}", project.path.display());
        }

        Commands::Roots => {
            let default = config.default_root_or_first().unwrap_or_default();
            for name in config.root_names() {
                let path = config.require_root(name)?;
                let marker = if name == default { "*" } else { " " };
                let state = if path.is_dir() { "" } else { "  (missing)" };
                println!(
                    "{} {:<10} {:<8} {}{}",
                    marker,
                    name,
                    config.workspace_kind(name),
                    path.display(),
                    state
                );
            }
        }

        Commands::Worktrees { name, root } => {
            let service = status_service(&config);
            let project = match root {
                Some(root) => service.find_project_in(&root, &name).await?,
                None => service.find_project(&name).await?,
            };

            let git = GitCli::from_config(&config);
            for worktree in git.list_worktrees(&project.path).await? {
                let branch = if worktree.branch.is_empty() {
                    "(detached)".to_string()
                } else {
                    worktree.branch.clone()
                };
                let mut flags = Vec::new();
                if worktree.bare {
                    flags.push("bare");
                }
                if worktree.locked {
                    flags.push("locked");
                }
                println!(
                    "{}  {}  {}",
                    worktree.path.display(),
                    branch,
                    flags.join(",")
                );
            }
        }

        Commands::Get {
            repository,
            workspace,
        } => {
            let workspace = match workspace {
                Some(w) => w,
                None => config
                    .default_root_or_first()
                    .ok_or(ConfigError::NoRoots)?
                    .to_string(),
            };
            GhqCloner::new(Arc::clone(&config))
                .get(&repository, &workspace)
                .await?;
        }

        Commands::Promote {
            name,
            from,
            to,
            force,
            dry_run,
            git_init,
            commit,
        } => {
            let mut options = PromoteOptions::from_config(&config, name);
            if let Some(from) = from {
                options.from_root = from;
            }
            if let Some(to) = to {
                options.to_root = to;
            }
            options.from_root = require_setting(options.from_root, "promote.from", "--from")?;
            options.to_root = require_setting(options.to_root, "promote.to", "--to")?;
            options.force = force;
            options.dry_run = dry_run;
            options.auto_git_init |= git_init;
            options.auto_commit |= commit;

            let record = promote_engine(&config)?.promote(&options).await?;
            if dry_run {
                print_record("Would promote", &record);
            } else {
                print_record("Promoted", &record);
            }
        }

        Commands::Undo { dry_run } => {
            let record = promote_engine(&config)?.undo(dry_run).await?;
            let verb = if dry_run { "Would restore" } else { "Restored" };
            println!(
                "{} {}: {} -> {}",
                verb,
                record.project_name,
                record.to_path.display(),
                record.from_path.display()
            );
        }

        Commands::History { json, clear } => {
            let engine = promote_engine(&config)?;
            if clear {
                engine.history_log().clear()?;
                println!("Cleared promote history.");
                return Ok(());
            }

            let records = engine.history()?;
            if json {
                print_json(&records);
            } else if records.is_empty() {
                println!("No promote history.");
            } else {
                for record in &records {
                    println!(
                        "{}  {}  {} -> {}",
                        format_timestamp(record.timestamp),
                        record.project_name,
                        record.from_root,
                        record.to_root
                    );
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => print!("{}", config.to_toml()?),
            ConfigAction::Validate => println!("Configuration OK"),
            ConfigAction::Init { .. } | ConfigAction::Path => {}
        },
    }

    Ok(())
}

fn init_config(explicit: Option<&Path>, force: bool) -> ghqx::Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };

    if path.exists() && !force {
        return Err(ConfigError::InvalidValue {
            key: "config".to_string(),
            reason: format!("{} already exists; pass --force to overwrite", path.display()),
        }
        .into());
    }

    let config = Config::template()?;
    config.save_to(&path)?;
    for root in config.roots.values() {
        ensure_dir(root)?;
    }

    debug!("Wrote starter configuration to {:?}", path);
    println!("Wrote {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    // Install color-eyre error hooks
    color_eyre::install()?;

    let cli = Cli::parse();
    let debug = cli.debug;
    setup_logging(debug)?;

    match run(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            report(&e, debug);
            Ok(ExitCode::FAILURE)
        }
    }
}
