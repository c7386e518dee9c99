use crate::credentials::Credentials;
use crate::repository::Repository;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// One failed clone attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "git clone failed{}: {}",
    .exit_code.map(|c| format!(" with exit code {}", c)).unwrap_or_default(),
    .stderr.trim()
)]
pub struct CloneError {
    /// `None` when the process could not be spawned or was killed by a signal.
    pub exit_code: Option<i32>,
    pub stderr: String,
}

#[async_trait]
pub trait Cloner: Send + Sync {
    /// Clones `repository` into `destination_root/<name>`.
    async fn clone_repository(
        &self,
        repository: &Repository,
        destination_root: &Path,
        shallow: bool,
    ) -> Result<(), CloneError>;
}

/// Clones by running the `git` executable.
#[derive(Debug, Clone)]
pub struct Git {
    program: PathBuf,
    credentials: Credentials,
}

impl Git {
    pub fn new(program: impl Into<PathBuf>, credentials: Credentials) -> Self {
        Git {
            program: program.into(),
            credentials,
        }
    }

    fn clone_url(&self, repository: &Repository) -> String {
        if repository.private {
            self.credentials.embed_in_url(&repository.clone_url)
        } else {
            repository.clone_url.clone()
        }
    }

    fn clone_args(&self, repository: &Repository, shallow: bool) -> Vec<String> {
        let mut args = vec![String::from("clone"), self.clone_url(repository)];
        if shallow {
            args.push(String::from("--depth=1"));
        }
        args
    }
}

#[async_trait]
impl Cloner for Git {
    async fn clone_repository(
        &self,
        repository: &Repository,
        destination_root: &Path,
        shallow: bool,
    ) -> Result<(), CloneError> {
        log::debug!(
            "Running {:?} clone {} shallow={} cwd={:?}",
            &self.program,
            &repository.clone_url,
            shallow,
            destination_root
        );

        let output = Command::new(&self.program)
            .args(self.clone_args(repository, shallow))
            .current_dir(destination_root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CloneError {
                exit_code: None,
                stderr: format!("failed to run {:?}: {}", &self.program, e),
            })?;

        if output.status.success() {
            log::debug!("Cloned name={}", &repository.name);
            Ok(())
        } else {
            Err(CloneError {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
