//! Repository acquisition: shallow, bounded-parallelism fetches into a local
//! store.
//!
//! - Fetches run behind the [`RepoFetcher`] trait; [`GitFetcher`] is the
//!   production implementation (`git clone --depth=1`)
//! - A `tokio` semaphore bounds parallelism to the caller-supplied limit
//! - Each fetch has a hard wall-clock timeout
//! - A failed fetch marks its descriptor failed and never affects the others
//!
//! Acquisition is idempotent: the presence of `<store>/<owner>__<name>` is
//! treated as success without re-fetching. This is a cache, not a freshness
//! guarantee.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::model::{RepoDescriptor, RepoHandle};

/// How many completed fetches between progress log lines.
const PROGRESS_INTERVAL: usize = 20;

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while acquiring repositories.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Fetch exceeded the wall-clock timeout
    #[error("fetch timed out after {0}s")]
    Timeout(u64),

    /// git exited non-zero
    #[error("git exited with status {code}: {stderr}")]
    GitExit { code: i32, stderr: String },

    /// Failed to launch or wait on the git process
    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create the local repository store
    #[error("failed to create repository store {path}: {source}")]
    Store {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ============================================================================
// Fetcher seam
// ============================================================================

/// Produces a local copy of a single repository.
///
/// The pool is generic over this trait so tests can observe scheduling
/// without touching the network.
#[async_trait]
pub trait RepoFetcher: Send + Sync {
    /// Fetches `repo` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on timeout, transport failure, or a non-zero
    /// git exit. The caller records the failure; it is never fatal to the
    /// run.
    async fn fetch(&self, repo: &RepoDescriptor, dest: &Path) -> Result<(), FetchError>;
}

/// Shallow `git clone` fetcher.
///
/// Clones with `--depth=1 --single-branch --no-tags` to bound transfer cost,
/// and with `GIT_TERMINAL_PROMPT=0` so a private repository fails instead of
/// prompting for credentials.
pub struct GitFetcher {
    fetch_timeout: Duration,
}

impl GitFetcher {
    pub fn new(fetch_timeout: Duration) -> Self {
        Self { fetch_timeout }
    }
}

#[async_trait]
impl RepoFetcher for GitFetcher {
    async fn fetch(&self, repo: &RepoDescriptor, dest: &Path) -> Result<(), FetchError> {
        let mut command = tokio::process::Command::new("git");
        command
            .arg("clone")
            .arg("--depth=1")
            .arg("--single-branch")
            .arg("--no-tags")
            .arg("--quiet")
            .arg(&repo.url)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.fetch_timeout, command.output())
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout.as_secs()))??;

        if output.status.success() {
            Ok(())
        } else {
            Err(FetchError::GitExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

// ============================================================================
// Bounded fan-out
// ============================================================================

/// Fetches all repositories into `store` with at most `max_workers` fetches
/// in flight.
///
/// Returns one [`RepoHandle`] per input descriptor, input order preserved.
/// Individual fetch failures are recorded on the handle and logged; they do
/// not fail the call. There are no retries — re-running the pipeline is the
/// retry mechanism, which is safe because acquisition is idempotent.
///
/// # Errors
///
/// Returns [`FetchError::Store`] only if the store directory itself cannot
/// be created.
pub async fn fetch_all<F>(
    fetcher: Arc<F>,
    repos: Vec<RepoDescriptor>,
    store: &Path,
    max_workers: usize,
) -> Result<Vec<RepoHandle>, FetchError>
where
    F: RepoFetcher + 'static,
{
    std::fs::create_dir_all(store).map_err(|source| FetchError::Store {
        path: store.to_path_buf(),
        source,
    })?;

    let total = repos.len();
    info!(total, store = %store.display(), "acquiring repositories");

    let mut handles: Vec<RepoHandle> = repos
        .into_iter()
        .map(|descriptor| {
            let local_path = store.join(descriptor.local_dir_name());
            RepoHandle {
                descriptor,
                local_path,
                fetched: false,
            }
        })
        .collect();

    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut tasks: JoinSet<(usize, bool)> = JoinSet::new();

    for (idx, handle) in handles.iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let fetcher = Arc::clone(&fetcher);
        let repo = handle.descriptor.clone();
        let dest = handle.local_path.clone();

        tasks.spawn(async move {
            let permit = semaphore.acquire_owned().await;
            let fetched = match permit {
                Ok(_permit) => fetch_one(fetcher.as_ref(), &repo, &dest).await,
                Err(_) => false,
            };
            (idx, fetched)
        });
    }

    let mut completed = 0;
    while let Some(joined) = tasks.join_next().await {
        completed += 1;
        match joined {
            Ok((idx, fetched)) => handles[idx].fetched = fetched,
            Err(err) => warn!(error = %err, "acquisition task aborted"),
        }
        if completed % PROGRESS_INTERVAL == 0 {
            info!(completed, total, "acquisition progress");
        }
    }

    let fetched = handles.iter().filter(|h| h.fetched).count();
    info!(fetched, total, "acquisition complete");

    Ok(handles)
}

/// Fetches one repository, treating a pre-existing destination as success.
async fn fetch_one<F: RepoFetcher + ?Sized>(
    fetcher: &F,
    repo: &RepoDescriptor,
    dest: &Path,
) -> bool {
    if dest.exists() {
        debug!(repo = %repo.url, "already present, skipping fetch");
        return true;
    }

    match fetcher.fetch(repo, dest).await {
        Ok(()) => true,
        Err(err) => {
            warn!(repo = %repo.url, error = %err, "acquisition failed");
            false
        }
    }
}

/// Annotates descriptors against an already-populated store without
/// fetching anything (`--skip-fetch` mode).
///
/// Directory presence is the sole success signal, matching the cache check
/// in [`fetch_all`].
pub fn probe_store(repos: Vec<RepoDescriptor>, store: &Path) -> Vec<RepoHandle> {
    repos
        .into_iter()
        .map(|descriptor| {
            let local_path = store.join(descriptor.local_dir_name());
            let fetched = local_path.exists();
            RepoHandle {
                descriptor,
                local_path,
                fetched,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RepoHost;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher that records scheduling and creates the destination.
    struct MockFetcher {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
        fail_names: Vec<&'static str>,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                fail_names: Vec::new(),
            }
        }

        fn failing(names: Vec<&'static str>) -> Self {
            Self {
                fail_names: names,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl RepoFetcher for MockFetcher {
        async fn fetch(&self, repo: &RepoDescriptor, dest: &Path) -> Result<(), FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            // Yield so other tasks get a chance to overlap.
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_names.contains(&repo.name.as_str()) {
                return Err(FetchError::GitExit {
                    code: 128,
                    stderr: "repository not found".to_string(),
                });
            }
            std::fs::create_dir_all(dest)?;
            Ok(())
        }
    }

    fn descriptors(names: &[&str]) -> Vec<RepoDescriptor> {
        names
            .iter()
            .map(|n| RepoDescriptor::new(RepoHost::GitHub, "acme", *n))
            .collect()
    }

    #[tokio::test]
    async fn pool_never_exceeds_worker_limit() {
        let store = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let repos = descriptors(&["a", "b", "c", "d", "e", "f", "g", "h"]);

        let handles = fetch_all(Arc::clone(&fetcher), repos, store.path(), 3)
            .await
            .unwrap();

        assert_eq!(handles.len(), 8);
        assert!(handles.iter().all(|h| h.fetched));
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn failures_are_isolated_per_descriptor() {
        let store = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::failing(vec!["bad"]));
        let repos = descriptors(&["good", "bad", "fine"]);

        let handles = fetch_all(fetcher, repos, store.path(), 2).await.unwrap();

        assert_eq!(handles.len(), 3);
        assert!(handles[0].fetched);
        assert!(!handles[1].fetched);
        assert!(handles[2].fetched);
    }

    #[tokio::test]
    async fn output_preserves_input_order() {
        let store = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let names = ["z", "a", "m", "q"];
        let repos = descriptors(&names);

        let handles = fetch_all(fetcher, repos, store.path(), 4).await.unwrap();

        let got: Vec<&str> = handles.iter().map(|h| h.descriptor.name.as_str()).collect();
        assert_eq!(got, names);
    }

    #[tokio::test]
    async fn existing_directory_skips_the_fetch() {
        let store = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(store.path().join("acme__cached")).unwrap();

        let fetcher = Arc::new(MockFetcher::new());
        let repos = descriptors(&["cached"]);

        let handles = fetch_all(Arc::clone(&fetcher), repos, store.path(), 2)
            .await
            .unwrap();

        assert!(handles[0].fetched);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn local_path_is_owner_and_name() {
        let store = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let repos = descriptors(&["foo"]);

        let handles = fetch_all(fetcher, repos, store.path(), 1).await.unwrap();
        assert_eq!(handles[0].local_path, store.path().join("acme__foo"));
    }

    #[test]
    fn probe_store_marks_present_directories_only() {
        let store = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(store.path().join("acme__here")).unwrap();

        let handles = probe_store(descriptors(&["here", "gone"]), store.path());

        assert!(handles[0].fetched);
        assert!(!handles[1].fetched);
    }
}
