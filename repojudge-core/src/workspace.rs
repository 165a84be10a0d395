//! Transient clone workspaces.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{JudgeError, Result};

/// Boxed future returned by [`GitCloner::clone_repo`].
pub type CloneFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Capability to clone a remote repository into a directory.
pub trait GitCloner {
    /// Clone `url` into `destination`, which must not exist yet.
    fn clone_repo<'a>(&'a self, url: &'a str, destination: &'a Path) -> CloneFuture<'a>;
}

/// Pause between cleanup attempts.
pub trait Sleeper {
    /// Sleep for `duration`.
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Tokio-backed sleeper used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Clones with the `git` executable, never prompting for credentials.
#[derive(Debug, Clone)]
pub struct GitCommandCloner {
    timeout: Duration,
}

impl GitCommandCloner {
    /// Create a cloner that gives up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl GitCloner for GitCommandCloner {
    fn clone_repo<'a>(&'a self, url: &'a str, destination: &'a Path) -> CloneFuture<'a> {
        Box::pin(run_git_clone(url, destination, self.timeout))
    }
}

async fn run_git_clone(url: &str, destination: &Path, timeout: Duration) -> Result<()> {
    let mut command = Command::new("git");
    command
        .arg("clone")
        .arg(url)
        .arg(destination)
        .env("GIT_TERMINAL_PROMPT", "0")
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| JudgeError::Clone(format!("git clone timed out after {}s", timeout.as_secs())))?
        .map_err(|err| JudgeError::Clone(format!("git clone failed to start: {err}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(JudgeError::Clone(format!(
            "git clone exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

/// A checkout under evaluation.
///
/// Cloned workspaces that are dropped without being released are removed
/// on a best-effort basis.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    managed: bool,
    remove_on_drop: bool,
}

impl Workspace {
    /// Wrap an existing directory that must never be deleted.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            managed: false,
            remove_on_drop: false,
        }
    }

    /// Directory holding the checkout.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the directory was created by a [`WorkspaceManager`].
    pub fn is_managed(&self) -> bool {
        self.managed
    }

    fn disarm(&mut self) {
        self.remove_on_drop = false;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.remove_on_drop {
            if let Err(err) = std::fs::remove_dir_all(&self.path) {
                log::warn!(
                    "dropped workspace {} could not be removed: {err}",
                    self.path.display()
                );
            }
        }
    }
}

/// Deletes a workspace directory tree.
pub type Remover = Arc<dyn Fn(&Path) -> io::Result<()> + Send + Sync>;

/// Creates and removes per-request clone directories.
pub struct WorkspaceManager {
    root: PathBuf,
    keep: bool,
    attempts: u32,
    backoff: Duration,
    cloner: Arc<dyn GitCloner + Send + Sync>,
    sleeper: Arc<dyn Sleeper + Send + Sync>,
    remover: Remover,
}

impl WorkspaceManager {
    /// Manager using `git` and real sleeps.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(GitCommandCloner::new(config.clone_timeout)),
            Arc::new(TokioSleeper),
        )
    }

    /// Manager over explicit clone and sleep capabilities.
    pub fn with_parts(
        config: &PipelineConfig,
        cloner: Arc<dyn GitCloner + Send + Sync>,
        sleeper: Arc<dyn Sleeper + Send + Sync>,
    ) -> Self {
        Self {
            root: config.workspace_root.clone(),
            keep: config.keep_workspace,
            attempts: config.cleanup_attempts.max(1),
            backoff: config.cleanup_backoff,
            cloner,
            sleeper,
            remover: Arc::new(|path: &Path| std::fs::remove_dir_all(path)),
        }
    }

    /// Replace the directory remover.
    pub fn with_remover(mut self, remover: Remover) -> Self {
        self.remover = remover;
        self
    }

    /// Clone `url` into a fresh directory below the workspace root.
    pub async fn acquire(&self, url: &str) -> Result<Workspace> {
        if url.trim().is_empty() {
            return Err(JudgeError::Clone("repository url is required".to_string()));
        }
        std::fs::create_dir_all(&self.root)
            .map_err(|err| JudgeError::Clone(format!("create workspace root failed: {err}")))?;

        let path = self.root.join(Uuid::new_v4().to_string());
        log::info!("cloning {url} into {}", path.display());
        if let Err(err) = self.cloner.clone_repo(url, &path).await {
            if path.exists() {
                if let Err(cleanup) = std::fs::remove_dir_all(&path) {
                    log::warn!(
                        "partial clone {} could not be removed: {cleanup}",
                        path.display()
                    );
                }
            }
            return Err(match err {
                JudgeError::Clone(_) => err,
                other => JudgeError::Clone(other.to_string()),
            });
        }

        Ok(Workspace {
            path,
            managed: true,
            remove_on_drop: !self.keep,
        })
    }

    /// Delete a workspace, retrying with a fixed backoff.
    ///
    /// Never fails: once every attempt is spent the directory is left behind
    /// and a warning is logged.
    pub async fn release(&self, mut workspace: Workspace) {
        if !workspace.remove_on_drop {
            if workspace.managed {
                log::info!("keeping workspace {}", workspace.path.display());
            }
            return;
        }
        workspace.disarm();

        for attempt in 1..=self.attempts {
            match (self.remover)(&workspace.path) {
                Ok(()) => {
                    log::debug!("removed workspace {}", workspace.path.display());
                    return;
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => return,
                Err(err) => {
                    log::warn!(
                        "cleanup attempt {attempt}/{} for {} failed: {err}",
                        self.attempts,
                        workspace.path.display()
                    );
                    if attempt < self.attempts {
                        self.sleeper.sleep(self.backoff).await;
                    }
                }
            }
        }

        log::warn!(
            "leaving workspace {} behind after {} attempts",
            workspace.path.display(),
            self.attempts
        );
    }
}
