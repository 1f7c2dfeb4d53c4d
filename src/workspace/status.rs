//! Status service - concurrent multi-root scanning
//!
//! Scans every configured root on its own task, enriches the results with
//! git state on request, and merges everything into a single list.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{Project, ScanOptions, Scanner};
use crate::config::Config;
use crate::error::{Error, FsError, ProjectError, Result};
use crate::git::GitOps;

/// Default deadline for walking one root
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// Read-side entry point: lists and looks up projects across roots
#[derive(Clone)]
pub struct StatusService {
    /// Application configuration
    config: Arc<Config>,
    /// Project discovery
    scanner: Arc<dyn Scanner>,
    /// Git enrichment
    git: Arc<dyn GitOps>,
    /// Deadline for a single root walk
    scan_timeout: Duration,
}

impl StatusService {
    /// Create a new status service
    pub fn new(config: Arc<Config>, scanner: Arc<dyn Scanner>, git: Arc<dyn GitOps>) -> Self {
        let scan_timeout = if config.scan.timeout_secs == 0 {
            DEFAULT_SCAN_TIMEOUT
        } else {
            config.scan_timeout()
        };
        Self {
            config,
            scanner,
            git,
            scan_timeout,
        }
    }

    /// Set the per-root scan deadline
    pub fn with_scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    /// Scan all roots (or only `root_filter`) in parallel
    ///
    /// Projects are merged in task-completion order; callers that display
    /// them must sort. If any root fails, the first error observed is returned
    /// and the others are dropped.
    #[instrument(skip(self))]
    pub async fn get_all(
        &self,
        options: ScanOptions,
        root_filter: Option<&str>,
    ) -> Result<Vec<Project>> {
        let targets: Vec<(String, PathBuf)> = match root_filter {
            Some(name) => vec![(name.to_string(), self.config.require_root(name)?.to_path_buf())],
            None => self
                .config
                .roots
                .iter()
                .map(|(name, path)| (name.clone(), path.clone()))
                .collect(),
        };

        let results: Arc<Mutex<Vec<Project>>> = Arc::new(Mutex::new(Vec::new()));
        let errors: Arc<Mutex<Vec<Error>>> = Arc::new(Mutex::new(Vec::new()));

        let mut paths = Vec::with_capacity(targets.len());
        let mut tasks = Vec::with_capacity(targets.len());

        for (root_name, root_path) in targets {
            paths.push(root_path.clone());

            let scanner = Arc::clone(&self.scanner);
            let git = Arc::clone(&self.git);
            let results = Arc::clone(&results);
            let errors = Arc::clone(&errors);
            let scan_timeout = self.scan_timeout;

            tasks.push(tokio::spawn(async move {
                match scan_and_enrich(scanner, git, &root_name, root_path, options, scan_timeout)
                    .await
                {
                    Ok(projects) => results.lock().await.extend(projects),
                    Err(e) => {
                        warn!("Scan of root '{}' failed: {}", root_name, e);
                        errors.lock().await.push(e);
                    }
                }
            }));
        }

        for (joined, path) in join_all(tasks).await.into_iter().zip(paths) {
            if let Err(e) = joined {
                errors.lock().await.push(
                    FsError::ScanFailed {
                        path,
                        cause: e.to_string(),
                    }
                    .into(),
                );
            }
        }

        let mut errors = errors.lock().await;
        if !errors.is_empty() {
            return Err(errors.swap_remove(0));
        }

        let projects = std::mem::take(&mut *results.lock().await);
        info!("Found {} project(s)", projects.len());
        Ok(projects)
    }

    /// Find a project by exact `name` across all roots
    pub async fn find_project(&self, name: &str) -> Result<Project> {
        self.find(name, None).await
    }

    /// Find a project by exact `name` within a single root
    pub async fn find_project_in(&self, root: &str, name: &str) -> Result<Project> {
        self.find(name, Some(root)).await
    }

    async fn find(&self, name: &str, root: Option<&str>) -> Result<Project> {
        self.get_all(ScanOptions::default(), root)
            .await?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ProjectError::NotFound(name.to_string()).into())
    }
}

/// Scan one root, then enrich its projects one at a time
async fn scan_and_enrich(
    scanner: Arc<dyn Scanner>,
    git: Arc<dyn GitOps>,
    root_name: &str,
    root_path: PathBuf,
    options: ScanOptions,
    scan_timeout: Duration,
) -> Result<Vec<Project>> {
    let scanned = timeout(scan_timeout, scanner.scan_root(root_name, &root_path)).await;
    let mut projects = match scanned {
        Ok(result) => result?,
        Err(_) => {
            return Err(FsError::ScanFailed {
                path: root_path,
                cause: format!("timed out after {:?}", scan_timeout),
            }
            .into());
        }
    };

    if !options.needs_git() {
        return Ok(projects);
    }

    for project in &mut projects {
        if options.check_dirty {
            match git.is_dirty(&project.path).await {
                Ok(dirty) => project.dirty = Some(dirty),
                Err(e) => debug!("Dirty check failed for {}: {}", project.name, e),
            }
        }
        if options.load_branch {
            match git.current_branch(&project.path).await {
                Ok(branch) => project.branch = Some(branch),
                Err(e) => debug!("Branch lookup failed for {}: {}", project.name, e),
            }
        }
    }

    Ok(projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::error::{GitError, RootError};
    use crate::git::Worktree;
    use crate::workspace::sort_projects;

    /// In-memory scanner: root path → project names
    struct FakeScanner {
        trees: HashMap<PathBuf, Vec<&'static str>>,
    }

    #[async_trait]
    impl Scanner for FakeScanner {
        async fn scan_root(&self, root_name: &str, root_path: &Path) -> Result<Vec<Project>> {
            let names = self
                .trees
                .get(root_path)
                .ok_or_else(|| RootError::DirectoryMissing(root_path.to_path_buf()))?;
            Ok(names
                .iter()
                .map(|n| Project::new(root_name, *n, root_path.join(n)))
                .collect())
        }
    }

    /// Scanner that never finishes within a test's deadline
    struct SlowScanner;

    #[async_trait]
    impl Scanner for SlowScanner {
        async fn scan_root(&self, _root_name: &str, _root_path: &Path) -> Result<Vec<Project>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    /// Git fake: every path ending in "dirty" is dirty, branch is always "main"
    struct FakeGit;

    #[async_trait]
    impl GitOps for FakeGit {
        async fn is_dirty(&self, path: &Path) -> Result<bool> {
            Ok(path.ends_with("dirty"))
        }
        async fn current_branch(&self, path: &Path) -> Result<String> {
            if path.ends_with("broken") {
                return Err(GitError::Timeout {
                    operation: "rev-parse",
                    after: Duration::from_millis(150),
                }
                .into());
            }
            Ok("main".to_string())
        }
        async fn list_worktrees(&self, _path: &Path) -> Result<Vec<Worktree>> {
            Ok(Vec::new())
        }
        async fn init(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
        async fn commit_all(&self, _path: &Path, _message: &str) -> Result<()> {
            Ok(())
        }
    }

    fn service(trees: &[(&str, &str, Vec<&'static str>)]) -> StatusService {
        let mut config = Config::default();
        let mut map = HashMap::new();
        for (name, path, projects) in trees {
            config.roots.insert(name.to_string(), PathBuf::from(path));
            map.insert(PathBuf::from(path), projects.clone());
        }
        let scanner = FakeScanner { trees: map };
        StatusService::new(Arc::new(config), Arc::new(scanner), Arc::new(FakeGit))
    }

    #[tokio::test]
    async fn test_get_all_merges_every_root() {
        let service = service(&[
            ("sandbox", "/w/sandbox", vec!["a", "b"]),
            ("dev", "/w/dev", vec!["github.com/u/c"]),
            ("release", "/w/release", vec![]),
        ]);

        let mut projects = service.get_all(ScanOptions::default(), None).await.unwrap();
        sort_projects(&mut projects);

        let keys: Vec<(String, String)> = projects
            .iter()
            .map(|p| (p.root.clone(), p.name.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("dev".to_string(), "github.com/u/c".to_string()),
                ("sandbox".to_string(), "a".to_string()),
                ("sandbox".to_string(), "b".to_string()),
            ]
        );
        assert!(projects.iter().all(|p| p.dirty.is_none() && p.branch.is_none()));
    }

    #[tokio::test]
    async fn test_root_filter() {
        let service = service(&[
            ("sandbox", "/w/sandbox", vec!["a"]),
            ("dev", "/w/dev", vec!["b"]),
        ]);

        let projects = service
            .get_all(ScanOptions::default(), Some("dev"))
            .await
            .unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].root, "dev");

        let err = service
            .get_all(ScanOptions::default(), Some("staging"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ROOT_UNKNOWN");
    }

    #[tokio::test]
    async fn test_enrichment() {
        let service = service(&[("sandbox", "/w/sandbox", vec!["clean", "dirty", "broken"])]);
        let options = ScanOptions {
            check_dirty: true,
            load_branch: true,
        };

        let projects = service.get_all(options, None).await.unwrap();
        let by_name: HashMap<&str, &Project> =
            projects.iter().map(|p| (p.name.as_str(), p)).collect();

        assert_eq!(by_name["clean"].dirty, Some(false));
        assert_eq!(by_name["dirty"].dirty, Some(true));
        assert_eq!(by_name["clean"].branch.as_deref(), Some("main"));
        assert_eq!(by_name["broken"].branch, None);
    }

    #[tokio::test]
    async fn test_root_error_is_surfaced() {
        let mut service = service(&[("sandbox", "/w/sandbox", vec!["a"])]);
        let mut config = (*service.config).clone();
        config
            .roots
            .insert("dev".to_string(), PathBuf::from("/w/missing"));
        service.config = Arc::new(config);

        let err = service
            .get_all(ScanOptions::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ROOT_DIRECTORY_MISSING");
    }

    #[tokio::test]
    async fn test_first_error_wins_when_several_roots_fail() {
        let mut config = Config::default();
        for (name, path) in [("sandbox", "/w/gone-a"), ("dev", "/w/gone-b"), ("release", "/w/ok")] {
            config.roots.insert(name.to_string(), PathBuf::from(path));
        }
        let scanner = FakeScanner {
            trees: HashMap::from([(PathBuf::from("/w/ok"), vec!["a"])]),
        };
        let service = StatusService::new(Arc::new(config), Arc::new(scanner), Arc::new(FakeGit));

        let err = service
            .get_all(ScanOptions::default(), None)
            .await
            .unwrap_err();
        match err {
            Error::Root(RootError::DirectoryMissing(path)) => {
                assert!(path == Path::new("/w/gone-a") || path == Path::new("/w/gone-b"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scan_deadline() {
        let mut config = Config::default();
        config
            .roots
            .insert("sandbox".to_string(), PathBuf::from("/w/sandbox"));
        let service = StatusService::new(Arc::new(config), Arc::new(SlowScanner), Arc::new(FakeGit))
            .with_scan_timeout(Duration::from_millis(20));

        let err = service
            .get_all(ScanOptions::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SCAN_FAILED");
        assert!(err.detail().is_some_and(|d| d.contains("timed out")));
    }

    #[tokio::test]
    async fn test_find_project_exact_match() {
        let service = service(&[
            ("sandbox", "/w/sandbox", vec!["proj"]),
            ("dev", "/w/dev", vec!["github.com/user/tool"]),
        ]);

        let found = service.find_project("github.com/user/tool").await.unwrap();
        assert_eq!(found.root, "dev");

        // display_name is not a lookup key
        let err = service.find_project("user/tool").await.unwrap_err();
        assert_eq!(err.code(), "PROJECT_NOT_FOUND");

        let err = service.find_project_in("sandbox", "github.com/user/tool").await.unwrap_err();
        assert_eq!(err.code(), "PROJECT_NOT_FOUND");
    }
}
