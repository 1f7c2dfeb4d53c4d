//! Integration tests for ghqx
//!
//! Tests that need the `git` binary skip themselves when it is unavailable.
//! All tests use isolated roots and history files under a temp directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use ghqx::error::{Error, GitError, UndoError};
use ghqx::git::{GitCli, GitOps, git_available};
use ghqx::workspace::{FsScanner, sort_projects};
use ghqx::{
    Config, HistoryLog, PromoteEngine, PromoteOptions, ScanOptions, StatusService, WorkspaceKind,
};

/// Git adapter with deadlines generous enough for slow CI machines
fn test_git() -> Arc<GitCli> {
    Arc::new(GitCli::with_timeouts(
        Duration::from_secs(10),
        Duration::from_secs(10),
    ))
}

struct Workspace {
    temp: TempDir,
    config: Arc<Config>,
}

impl Workspace {
    fn new(tweak: impl FnOnce(&mut Config)) -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        for name in ["sandbox", "dev"] {
            let root = temp.path().join(name);
            std::fs::create_dir_all(&root).unwrap();
            config.roots.insert(name.to_string(), root);
        }
        tweak(&mut config);
        config.validate().unwrap();

        Self {
            temp,
            config: Arc::new(config),
        }
    }

    fn root(&self, name: &str) -> PathBuf {
        self.config.get_root(name).unwrap().to_path_buf()
    }

    fn status(&self) -> StatusService {
        StatusService::new(
            Arc::clone(&self.config),
            Arc::new(FsScanner::new()),
            test_git(),
        )
    }

    fn engine(&self) -> PromoteEngine {
        let history = HistoryLog::new(
            self.temp.path().join("config/ghqx/history.json"),
            self.config.history.max,
        );
        PromoteEngine::new(Arc::clone(&self.config), test_git(), history)
    }
}

fn promote_options(name: &str) -> PromoteOptions {
    PromoteOptions {
        project_name: name.to_string(),
        from_root: "sandbox".to_string(),
        to_root: "dev".to_string(),
        ..Default::default()
    }
}

/// Helper to create a git repository with one commit
async fn create_test_repo(path: &Path) {
    std::fs::create_dir_all(path).unwrap();
    for args in [
        vec!["init"],
        vec!["config", "user.email", "test@test.com"],
        vec!["config", "user.name", "Test User"],
    ] {
        tokio::process::Command::new("git")
            .current_dir(path)
            .args(&args)
            .output()
            .await
            .unwrap();
    }

    std::fs::write(path.join("README.md"), "# Test Repository\n").unwrap();

    for args in [vec!["add", "README.md"], vec!["commit", "-m", "Initial commit"]] {
        tokio::process::Command::new("git")
            .current_dir(path)
            .args(&args)
            .output()
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_scan_happy_path() {
    let ws = Workspace::new(|_| {});
    std::fs::create_dir_all(ws.root("sandbox").join("github.com/u/r/.git")).unwrap();

    let projects = ws
        .status()
        .get_all(ScanOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(projects.len(), 1);
    let project = &projects[0];
    assert_eq!(project.name, "github.com/u/r");
    assert_eq!(project.display_name, "u/r");
    assert_eq!(project.root, "sandbox");
    assert_eq!(project.workspace_kind, WorkspaceKind::Sandbox);
    assert!(project.has_git);
    assert!(project.path.starts_with(ws.root("sandbox")));
}

#[tokio::test]
async fn test_scan_missing_root_directory() {
    let ws = Workspace::new(|c| {
        c.roots
            .insert("release".to_string(), PathBuf::from("/nonexistent/ghqx/release"));
    });

    let err = ws
        .status()
        .get_all(ScanOptions::default(), Some("release"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ROOT_DIRECTORY_MISSING");

    // The other roots still scan fine on their own
    ws.status()
        .get_all(ScanOptions::default(), Some("dev"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_per_root_results_match_full_scan() {
    let ws = Workspace::new(|_| {});
    for (root, rel) in [
        ("sandbox", "a"),
        ("sandbox", "nested/b"),
        ("dev", "github.com/u/c"),
        ("dev", "github.com/u/d"),
    ] {
        std::fs::create_dir_all(ws.root(root).join(rel).join(".git")).unwrap();
    }

    let service = ws.status();
    let mut all = service.get_all(ScanOptions::default(), None).await.unwrap();

    let mut per_root = Vec::new();
    for root in ws.config.root_names() {
        per_root.extend(
            service
                .get_all(ScanOptions::default(), Some(root))
                .await
                .unwrap(),
        );
    }

    sort_projects(&mut all);
    sort_projects(&mut per_root);
    assert_eq!(all, per_root);
}

#[tokio::test]
async fn test_status_enrichment_with_git() {
    if !git_available().await {
        eprintln!("Skipping test: git not available");
        return;
    }

    let ws = Workspace::new(|_| {});
    let repo = ws.root("dev").join("github.com/u/tool");
    create_test_repo(&repo).await;
    std::fs::write(repo.join("scratch.txt"), "wip").unwrap();

    let options = ScanOptions {
        check_dirty: true,
        load_branch: true,
    };
    let projects = ws.status().get_all(options, Some("dev")).await.unwrap();

    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].dirty, Some(true));
    assert!(projects[0].branch.as_deref().is_some_and(|b| !b.is_empty()));
}

#[tokio::test]
async fn test_dry_run_promote() {
    let ws = Workspace::new(|_| {});
    let src = ws.root("sandbox").join("proj");
    std::fs::create_dir_all(&src).unwrap();

    let record = ws
        .engine()
        .promote(&PromoteOptions {
            dry_run: true,
            ..promote_options("proj")
        })
        .await
        .unwrap();

    assert_eq!(record.from_path, src);
    assert_eq!(record.to_path, ws.root("dev").join("github.com/user/proj"));
    assert!(src.is_dir());
    assert_eq!(std::fs::read_dir(ws.root("dev")).unwrap().count(), 0);
}

#[tokio::test]
async fn test_promote_then_undo_round_trip() {
    let ws = Workspace::new(|_| {});
    let src = ws.root("sandbox").join("proj");
    let dst = ws.root("dev").join("github.com/user/proj");
    std::fs::create_dir_all(src.join(".git")).unwrap();
    std::fs::write(src.join("main.rs"), "fn main() {}").unwrap();

    let engine = ws.engine();
    engine.promote(&promote_options("proj")).await.unwrap();
    assert!(!src.exists());
    assert!(dst.join(".git").is_dir());
    assert_eq!(engine.history().unwrap().len(), 1);

    // The promoted project is now found under dev
    let found = ws.status().find_project("github.com/user/proj").await.unwrap();
    assert_eq!(found.root, "dev");

    engine.undo(false).await.unwrap();
    assert!(src.join(".git").is_dir());
    assert_eq!(std::fs::read_to_string(src.join("main.rs")).unwrap(), "fn main() {}");
    assert!(!dst.exists());
    assert_eq!(engine.history().unwrap().len(), 0);
}

#[tokio::test]
async fn test_undo_refused_when_source_reoccupied() {
    let ws = Workspace::new(|_| {});
    let src = ws.root("sandbox").join("proj");
    let dst = ws.root("dev").join("github.com/user/proj");
    std::fs::create_dir_all(&src).unwrap();

    let engine = ws.engine();
    engine.promote(&promote_options("proj")).await.unwrap();
    std::fs::create_dir_all(&src).unwrap();

    let err = engine.undo(false).await.unwrap_err();
    assert!(matches!(err, Error::Undo(UndoError::SourceOccupied(_))));
    assert!(src.is_dir());
    assert!(dst.is_dir());
    assert_eq!(engine.history().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dirty_repo_safety() {
    if !git_available().await {
        eprintln!("Skipping test: git not available");
        return;
    }

    let ws = Workspace::new(|_| {});
    let src = ws.root("sandbox").join("proj");
    create_test_repo(&src).await;
    std::fs::write(src.join("uncommitted.txt"), "new").unwrap();

    let engine = ws.engine();
    let err = engine.promote(&promote_options("proj")).await.unwrap_err();
    assert!(matches!(err, Error::Git(GitError::DirtyRepo(_))));
    assert!(src.is_dir());

    engine
        .promote(&PromoteOptions {
            force: true,
            ..promote_options("proj")
        })
        .await
        .unwrap();
    assert!(ws.root("dev").join("github.com/user/proj/.git").is_dir());
}

#[tokio::test]
async fn test_auto_git_init_and_commit() {
    if !git_available().await {
        eprintln!("Skipping test: git not available");
        return;
    }

    let ws = Workspace::new(|_| {});
    let src = ws.root("sandbox").join("proj");
    create_test_repo(&src).await;
    std::fs::write(src.join("notes.txt"), "pending").unwrap();

    let engine = ws.engine();
    let record = engine
        .promote(&PromoteOptions {
            force: true,
            auto_git_init: true,
            auto_commit: true,
            ..promote_options("proj")
        })
        .await
        .unwrap();

    let git = test_git();
    assert!(!git.is_dirty(&record.to_path).await.unwrap());

    let log = tokio::process::Command::new("git")
        .current_dir(&record.to_path)
        .args(["log", "-1", "--format=%s"])
        .output()
        .await
        .unwrap();
    assert_eq!(
        String::from_utf8_lossy(&log.stdout).trim(),
        "ghqx: promoted from sandbox"
    );
}

#[tokio::test]
async fn test_list_worktrees() {
    if !git_available().await {
        eprintln!("Skipping test: git not available");
        return;
    }

    let ws = Workspace::new(|_| {});
    let repo = ws.root("dev").join("repo");
    create_test_repo(&repo).await;

    let linked = ws.root("dev").join("repo-feature");
    tokio::process::Command::new("git")
        .current_dir(&repo)
        .args(["worktree", "add", "-b", "feature"])
        .arg(&linked)
        .output()
        .await
        .unwrap();

    let worktrees = test_git().list_worktrees(&repo).await.unwrap();
    assert_eq!(worktrees.len(), 2);
    assert!(worktrees.iter().any(|w| w.branch == "feature"));
}

#[tokio::test]
async fn test_history_cap() {
    let ws = Workspace::new(|c| c.history.max = 3);
    let engine = ws.engine();

    for i in 1..=5 {
        let name = format!("proj{}", i);
        std::fs::create_dir_all(ws.root("sandbox").join(&name)).unwrap();
        engine.promote(&promote_options(&name)).await.unwrap();
    }

    let names: Vec<String> = engine
        .history()
        .unwrap()
        .into_iter()
        .map(|r| r.project_name)
        .collect();
    assert_eq!(names, vec!["proj3", "proj4", "proj5"]);

    // Two undos leave min(5, 3) - 2 records
    engine.undo(false).await.unwrap();
    engine.undo(false).await.unwrap();
    assert_eq!(engine.history().unwrap().len(), 1);
    assert!(ws.root("sandbox").join("proj5").is_dir());
    assert!(ws.root("sandbox").join("proj4").is_dir());
}
