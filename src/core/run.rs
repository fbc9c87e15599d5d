//! Build orchestration
//!
//! Walks the recipe group by group, driving every package through the
//! lifecycle `pending -> downloading -> downloaded -> building -> built`
//! (any stage may fall to `failed`). Groups are a hard barrier: no package
//! of a later group starts before every package of the current group
//! reached a terminal state, because later groups may need build artifacts
//! from the whole earlier group. Within a group, packages run on a bounded
//! worker pool.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::backend::{Builder, Downloader};
use crate::core::recipe::{PackageSpec, Recipe};
use crate::core::work::{PackageState, WorkDir, Working};
use crate::error::PkgstackError;

/// What to do when a package fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Let in-flight workers finish, start nothing new, abort the recipe
    #[default]
    Stop,
    /// Record the failure and keep going; the run still ends unsuccessful
    Continue,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(Self::Stop),
            "continue" => Ok(Self::Continue),
            other => Err(format!("unknown failure policy '{other}' (stop, continue)")),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Continue => write!(f, "continue"),
        }
    }
}

/// Orchestrator tunables
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Worker bound within a group; 1 means sequential
    pub jobs: usize,

    /// Failure policy
    pub on_failure: FailurePolicy,
}

impl RunnerOptions {
    /// Worker count actually used; `jobs == 0` means one per CPU
    fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            on_failure: FailurePolicy::Stop,
        }
    }
}

/// Final record for one package
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    /// Package name
    pub package: String,

    /// Zero-based group index
    pub group: usize,

    /// Numbered directory the package was bound to
    pub num: usize,

    /// Terminal state reached
    pub state: PackageState,

    /// Whether the package was skipped as already built
    pub skipped: bool,

    /// Failure reason reported by the backend, if any
    pub reason: Option<String>,
}

impl PackageOutcome {
    /// Whether the package ended in `built`
    pub fn ok(&self) -> bool {
        self.state == PackageState::Built
    }
}

/// Aggregate result of one orchestrator run
#[derive(Debug, Default)]
pub struct RunResult {
    outcomes: Vec<PackageOutcome>,
    aborted: bool,
}

impl RunResult {
    /// Per-package outcomes, in recipe order; packages never started
    /// (stop policy) do not appear.
    pub fn outcomes(&self) -> &[PackageOutcome] {
        &self.outcomes
    }

    /// Whether the run stopped before visiting every package
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    /// Overall success: every package visited and every one `built`
    pub fn success(&self) -> bool {
        !self.aborted && self.outcomes.iter().all(PackageOutcome::ok)
    }
}

/// Drives the selected backends over a recipe through the work manager
pub struct Runner {
    recipe: Recipe,
    working: Working,
    downloader: Arc<dyn Downloader>,
    builder: Arc<dyn Builder>,
    options: RunnerOptions,
}

impl Runner {
    /// Create a runner over an opened work root
    pub fn new(
        recipe: Recipe,
        working: Working,
        downloader: Arc<dyn Downloader>,
        builder: Arc<dyn Builder>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            recipe,
            working,
            downloader,
            builder,
            options,
        }
    }

    /// Process the whole recipe and report per-package outcomes.
    ///
    /// Directory numbers are allocated before any worker of a group
    /// starts, so concurrent workers never race on the assignment.
    pub async fn run(&self) -> Result<RunResult, PkgstackError> {
        let jobs = self.options.effective_jobs();
        let failed = Arc::new(AtomicBool::new(false));
        let mut outcomes = Vec::with_capacity(self.recipe.len());
        let mut aborted = false;
        let mut position = 0;

        tracing::info!(
            recipe = %self.recipe.id,
            groups = self.recipe.groups().len(),
            packages = self.recipe.len(),
            jobs,
            "starting run"
        );

        for (group_index, group) in self.recipe.groups().iter().enumerate() {
            let mut pending = Vec::with_capacity(group.len());
            for pkg in group {
                position += 1;
                pending.push((pkg.clone(), self.working.num_dir(position, &pkg.name)?));
            }

            tracing::debug!(group = group_index, packages = pending.len(), "group start");

            let semaphore = Arc::new(Semaphore::new(jobs));
            let mut workers: JoinSet<PackageOutcome> = JoinSet::new();

            for (pkg, dir) in pending {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("semaphore closed");

                if self.options.on_failure == FailurePolicy::Stop
                    && failed.load(Ordering::SeqCst)
                {
                    aborted = true;
                    break;
                }

                let downloader = Arc::clone(&self.downloader);
                let builder = Arc::clone(&self.builder);
                let failed = Arc::clone(&failed);
                workers.spawn_blocking(move || {
                    let _permit = permit;
                    let outcome =
                        process_package(&*downloader, &*builder, &pkg, &dir, group_index);
                    if !outcome.ok() {
                        failed.store(true, Ordering::SeqCst);
                    }
                    outcome
                });
            }

            // Group barrier: wait for every started worker.
            while let Some(joined) = workers.join_next().await {
                let outcome = joined
                    .map_err(|e| PkgstackError::Generic(format!("worker panicked: {e}")))?;
                outcomes.push(outcome);
            }

            if aborted {
                break;
            }
            if self.options.on_failure == FailurePolicy::Stop && failed.load(Ordering::SeqCst) {
                aborted = true;
                break;
            }
        }

        outcomes.sort_by_key(|o| o.num);
        let result = RunResult { outcomes, aborted };
        tracing::info!(
            recipe = %self.recipe.id,
            success = result.success(),
            packages = result.outcomes().len(),
            "run finished"
        );
        Ok(result)
    }
}

/// Run one package through the state machine, persisting transitions as
/// they occur. Never returns without the persisted state being terminal
/// (or a recorded reason when even that write failed).
fn process_package(
    downloader: &dyn Downloader,
    builder: &dyn Builder,
    pkg: &PackageSpec,
    dir: &WorkDir,
    group: usize,
) -> PackageOutcome {
    let outcome = |state, skipped, reason| PackageOutcome {
        package: pkg.name.clone(),
        group,
        num: dir.num(),
        state,
        skipped,
        reason,
    };

    match dir.state() {
        Ok(PackageState::Built) => {
            tracing::info!(package = %pkg.name, num = dir.num(), "already built, skipping");
            return outcome(PackageState::Built, true, None);
        }
        Ok(_) => {}
        Err(e) => return outcome(PackageState::Failed, false, Some(e.to_string())),
    }

    match run_stages(downloader, builder, pkg, dir) {
        Ok(()) => {
            tracing::info!(package = %pkg.name, num = dir.num(), "built");
            outcome(PackageState::Built, false, None)
        }
        Err(reason) => {
            tracing::warn!(package = %pkg.name, num = dir.num(), reason = %reason, "failed");
            if let Err(e) = dir.set_state(PackageState::Failed) {
                tracing::error!(package = %pkg.name, error = %e, "could not persist failure");
            }
            outcome(PackageState::Failed, false, Some(reason))
        }
    }
}

/// Success path of the per-package state machine
fn run_stages(
    downloader: &dyn Downloader,
    builder: &dyn Builder,
    pkg: &PackageSpec,
    dir: &WorkDir,
) -> Result<(), String> {
    dir.set_state(PackageState::Downloading)
        .map_err(|e| e.to_string())?;
    downloader
        .download(pkg, dir.path())
        .map_err(|e| e.to_string())?;
    dir.set_state(PackageState::Downloaded)
        .map_err(|e| e.to_string())?;

    dir.set_state(PackageState::Building)
        .map_err(|e| e.to_string())?;
    builder
        .prepare(pkg, dir.path())
        .map_err(|e| e.to_string())?;
    builder.build(pkg, dir.path()).map_err(|e| e.to_string())?;
    dir.set_state(PackageState::Built).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Backend recording calls, failing for selected packages
    #[derive(Default)]
    #[derive(Debug)]
    struct Scripted {
        fail_downloads: Vec<String>,
        fail_builds: Vec<String>,
        downloads: Mutex<Vec<String>>,
        builds: Mutex<Vec<String>>,
    }

    impl Downloader for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn download(&self, package: &PackageSpec, _dir: &Path) -> Result<(), BackendError> {
            self.downloads.lock().unwrap().push(package.name.clone());
            if self.fail_downloads.contains(&package.name) {
                return Err(BackendError::DownloadFailed {
                    package: package.name.clone(),
                    reason: "scripted".to_string(),
                });
            }
            Ok(())
        }
    }

    impl Builder for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn build(&self, package: &PackageSpec, _dir: &Path) -> Result<(), BackendError> {
            self.builds.lock().unwrap().push(package.name.clone());
            if self.fail_builds.contains(&package.name) {
                return Err(BackendError::BuildFailed {
                    package: package.name.clone(),
                    reason: "scripted".to_string(),
                });
            }
            Ok(())
        }
    }

    fn recipe(doc: &str) -> Recipe {
        Recipe::from_yaml(doc, "test").unwrap()
    }

    fn runner(
        root: &Path,
        rec: Recipe,
        backend: Arc<Scripted>,
        options: RunnerOptions,
    ) -> Runner {
        let working = Working::new(root).unwrap();
        Runner::new(rec, working, backend.clone(), backend, options)
    }

    const TWO_PACKAGES: &str = "test:\n  packages:\n    - - a\n      - b\n";

    #[tokio::test]
    async fn test_two_bare_packages_build_successfully() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(Scripted::default());
        let r = runner(
            tmp.path(),
            recipe(TWO_PACKAGES),
            backend.clone(),
            RunnerOptions::default(),
        );

        let result = r.run().await.unwrap();

        assert!(result.success());
        assert_eq!(result.outcomes().len(), 2);
        assert!(result.outcomes().iter().all(PackageOutcome::ok));
        assert_eq!(*backend.downloads.lock().unwrap(), ["a", "b"]);
        assert_eq!(*backend.builds.lock().unwrap(), ["a", "b"]);

        // Terminal states are persisted.
        let working = Working::new(tmp.path()).unwrap();
        for (num, name) in [(1, "a"), (2, "b")] {
            let dir = working.num_dir(num, name).unwrap();
            assert_eq!(dir.state().unwrap(), PackageState::Built);
        }
    }

    #[tokio::test]
    async fn test_stop_policy_halts_after_first_failure() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(Scripted {
            fail_builds: vec!["a".to_string()],
            ..Default::default()
        });
        let r = runner(
            tmp.path(),
            recipe(TWO_PACKAGES),
            backend.clone(),
            RunnerOptions::default(),
        );

        let result = r.run().await.unwrap();

        assert!(!result.success());
        assert!(result.aborted());
        // b was never attempted.
        assert_eq!(*backend.downloads.lock().unwrap(), ["a"]);
        assert_eq!(result.outcomes().len(), 1);
        assert_eq!(result.outcomes()[0].state, PackageState::Failed);
        assert!(result.outcomes()[0].reason.is_some());
    }

    #[tokio::test]
    async fn test_continue_policy_attempts_everything() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(Scripted {
            fail_builds: vec!["a".to_string()],
            ..Default::default()
        });
        let options = RunnerOptions {
            jobs: 1,
            on_failure: FailurePolicy::Continue,
        };
        let r = runner(tmp.path(), recipe(TWO_PACKAGES), backend.clone(), options);

        let result = r.run().await.unwrap();

        assert!(!result.success());
        assert!(!result.aborted());
        assert_eq!(*backend.downloads.lock().unwrap(), ["a", "b"]);
        assert_eq!(result.outcomes().len(), 2);
        assert!(!result.outcomes()[0].ok());
        assert!(result.outcomes()[1].ok());
    }

    #[tokio::test]
    async fn test_stop_policy_never_starts_later_groups() {
        let tmp = TempDir::new().unwrap();
        let doc = "test:\n  packages:\n    - - a\n    - - b\n";
        let backend = Arc::new(Scripted {
            fail_downloads: vec!["a".to_string()],
            ..Default::default()
        });
        let r = runner(tmp.path(), recipe(doc), backend.clone(), RunnerOptions::default());

        let result = r.run().await.unwrap();

        assert!(!result.success());
        assert_eq!(*backend.downloads.lock().unwrap(), ["a"]);
        assert!(backend.builds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_skips_built_packages() {
        let tmp = TempDir::new().unwrap();

        let backend = Arc::new(Scripted::default());
        let r = runner(
            tmp.path(),
            recipe(TWO_PACKAGES),
            backend.clone(),
            RunnerOptions::default(),
        );
        assert!(r.run().await.unwrap().success());
        assert_eq!(backend.downloads.lock().unwrap().len(), 2);

        // Fresh runner over the same root: zero primitive invocations.
        let backend2 = Arc::new(Scripted::default());
        let r2 = runner(
            tmp.path(),
            recipe(TWO_PACKAGES),
            backend2.clone(),
            RunnerOptions::default(),
        );
        let result = r2.run().await.unwrap();

        assert!(result.success());
        assert!(result.outcomes().iter().all(|o| o.skipped));
        assert!(backend2.downloads.lock().unwrap().is_empty());
        assert!(backend2.builds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resumption_retries_only_failed_packages() {
        let tmp = TempDir::new().unwrap();

        // First run: a builds, b fails.
        let backend = Arc::new(Scripted {
            fail_builds: vec!["b".to_string()],
            ..Default::default()
        });
        let options = RunnerOptions {
            jobs: 1,
            on_failure: FailurePolicy::Continue,
        };
        let r = runner(
            tmp.path(),
            recipe(TWO_PACKAGES),
            backend.clone(),
            options.clone(),
        );
        assert!(!r.run().await.unwrap().success());

        // Second run: only b is re-attempted, and this time it succeeds.
        let backend2 = Arc::new(Scripted::default());
        let r2 = runner(tmp.path(), recipe(TWO_PACKAGES), backend2.clone(), options);
        let result = r2.run().await.unwrap();

        assert!(result.success());
        assert_eq!(*backend2.downloads.lock().unwrap(), ["b"]);
        assert!(result.outcomes()[0].skipped);
        assert!(!result.outcomes()[1].skipped);
    }

    #[tokio::test]
    async fn test_empty_recipe_succeeds_with_no_work() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(Scripted::default());
        let r = runner(
            tmp.path(),
            recipe("test:\n  packages: []\n"),
            backend.clone(),
            RunnerOptions::default(),
        );

        let result = r.run().await.unwrap();
        assert!(result.success());
        assert!(result.outcomes().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_group_builds_everything() {
        let tmp = TempDir::new().unwrap();
        let doc = "test:\n  packages:\n    - - a\n      - b\n      - c\n      - d\n";
        let backend = Arc::new(Scripted::default());
        let options = RunnerOptions {
            jobs: 4,
            on_failure: FailurePolicy::Stop,
        };
        let r = runner(tmp.path(), recipe(doc), backend.clone(), options);

        let result = r.run().await.unwrap();

        assert!(result.success());
        assert_eq!(result.outcomes().len(), 4);
        // Outcomes are reported in recipe order regardless of completion order.
        let names: Vec<_> = result.outcomes().iter().map(|o| o.package.clone()).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!("stop".parse::<FailurePolicy>().unwrap(), FailurePolicy::Stop);
        assert_eq!(
            "continue".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::Continue
        );
        assert!("abort".parse::<FailurePolicy>().is_err());
    }
}
