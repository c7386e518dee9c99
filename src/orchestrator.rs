use crate::git::{CloneError, Cloner};
use crate::progress::Progress;
use crate::repository::Repository;
use console::style;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const DEFAULT_RETRIES: usize = 3;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the repositories are cloned into, created if missing.
    pub root: PathBuf,
    /// Number of clones running at the same time.
    pub parallelism: usize,
    /// Attempts per repository, including the first one.
    pub retries: usize,
    pub shallow: bool,
}

#[derive(Debug, Error)]
#[error("failed to create destination directory {}", .path.display())]
pub struct FilesystemError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Terminal state of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped,
    Cloned { attempts: usize },
    ExhaustedRetries { attempts: usize, last_error: CloneError },
}

/// `succeeded` counts skipped and cloned repositories, never exhausted ones.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Tally {
    fn record(&mut self, name: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Skipped => {
                self.skipped += 1;
                self.succeeded += 1;
            }
            Outcome::Cloned { attempts } => {
                log::debug!("Cloned name={} attempts={}", name, attempts);
                self.succeeded += 1;
            }
            Outcome::ExhaustedRetries {
                attempts,
                last_error,
            } => {
                log::debug!(
                    "Exhausted name={} attempts={} last_err={}",
                    name,
                    attempts,
                    last_error
                );
                self.failed += 1;
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total
    }
}

struct WorkItem {
    repository: Repository,
    attempts: usize,
    last_error: Option<CloneError>,
}

impl WorkItem {
    fn new(repository: Repository) -> Self {
        WorkItem {
            repository,
            attempts: 0,
            last_error: None,
        }
    }
}

pub struct Orchestrator<C> {
    cloner: Arc<C>,
    config: Arc<Config>,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl<C: Cloner + 'static> Orchestrator<C> {
    pub fn new(cloner: C, config: Config) -> Self {
        Orchestrator {
            cloner: Arc::new(cloner),
            config: Arc::new(config),
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
        }
    }

    /// Sends status lines to `out` instead of stdout.
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    /// Sends clone failures and retry notices to `err` instead of stderr.
    pub fn with_error_output(mut self, err: impl Write + Send + 'static) -> Self {
        self.err = Box::new(err);
        self
    }

    /// Runs every repository to a terminal state and returns the tally.
    ///
    /// Only a destination root that cannot be created fails the run, before anything is
    /// dispatched. Individual clone failures end up in the tally.
    pub async fn run(self, repositories: Vec<Repository>) -> Result<Tally, FilesystemError> {
        create_root(&self.config.root)?;

        let total = repositories.len();
        let progress = Arc::new(Progress::with_outputs(total, self.out, self.err));
        progress.println(&format!("Found {} repositories to clone", total));

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut tally = Tally {
            total,
            ..Tally::default()
        };
        let mut tasks = JoinSet::new();

        for repository in repositories {
            // The semaphore is never closed.
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let cloner = Arc::clone(&self.cloner);
            let config = Arc::clone(&self.config);
            let progress = Arc::clone(&progress);
            tasks.spawn(async move {
                let name = repository.name.clone();
                let outcome = process(cloner.as_ref(), &config, &progress, repository).await;
                drop(permit);
                (name, outcome)
            });
        }

        while let Some(res) = tasks.join_next().await {
            match res {
                Ok((name, outcome)) => tally.record(&name, &outcome),
                Err(e) => {
                    log::error!("Clone task failed: {}", e);
                    tally.failed += 1;
                }
            }
        }

        debug_assert_eq!(progress.done(), tally.succeeded);
        progress.println(&format!(
            "{} {}/{} repositories",
            style("Cloned").bold(),
            tally.succeeded,
            progress.total()
        ));
        Ok(tally)
    }
}

fn create_root(root: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(root).map_err(|source| FilesystemError {
        path: root.to_owned(),
        source,
    })
}

async fn process<C: Cloner + ?Sized>(
    cloner: &C,
    config: &Config,
    progress: &Progress,
    repository: Repository,
) -> Outcome {
    if config.root.join(&repository.name).is_dir() {
        progress.skipped(&repository.name);
        return Outcome::Skipped;
    }

    let retries = config.retries.max(1);
    let mut item = WorkItem::new(repository);
    loop {
        if let Some(err) = &item.last_error {
            log::debug!("Retrying name={} last_err={}", &item.repository.name, err);
        }
        item.attempts += 1;
        let err = match cloner
            .clone_repository(&item.repository, &config.root, config.shallow)
            .await
        {
            Ok(()) => {
                progress.cloned(&item.repository.name);
                return Outcome::Cloned {
                    attempts: item.attempts,
                };
            }
            Err(err) => err,
        };

        log::debug!(
            "Clone failed: name={} attempt={} err={:?}",
            &item.repository.name,
            item.attempts,
            &err
        );
        progress.eprintln(&format!(
            "{} {} (attempt {}/{}): {}",
            style("Failed to clone").red(),
            style(&item.repository.name).bold(),
            item.attempts,
            retries,
            &err
        ));

        if item.attempts >= retries {
            log::error!(
                "Failed to clone: name={} attempts={} err={}",
                &item.repository.name,
                item.attempts,
                &err
            );
            progress.eprintln(&format!(
                "{} {} after {} attempts",
                style("Giving up on").red().bold(),
                style(&item.repository.name).bold(),
                item.attempts
            ));
            return Outcome::ExhaustedRetries {
                attempts: item.attempts,
                last_error: err,
            };
        }

        progress.eprintln(&format!(
            "{} {} (attempt {}/{})",
            style("Retrying").yellow(),
            style(&item.repository.name).bold(),
            item.attempts + 1,
            retries
        ));
        item.last_error = Some(err);
    }
}
