mod credentials;
mod git;
mod github;
mod orchestrator;
mod progress;
mod repository;

use anyhow::{Context, Result};
use clap::Parser;
use credentials::Credentials;
use git::Git;
use orchestrator::{Config, Orchestrator, Tally};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Clone every repository owned by a GitHub account.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Opts {
    /// Directory the repositories are cloned into. Created if missing.
    #[clap(short, long)]
    directory: String,

    /// GitHub username, used in the url of private repositories.
    #[clap(short, long, env = "GITHUB_USERNAME")]
    username: String,

    /// Personal access token.
    #[clap(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// Clone repositories that are not forks.
    #[clap(long)]
    source: bool,

    /// Clone forks.
    #[clap(long)]
    forks: bool,

    /// Only fetch the latest commit.
    #[clap(long)]
    shallow: bool,

    /// Number of concurrent clones. Defaults to the number of processors.
    #[clap(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    parallelism: Option<u32>,

    /// Attempts per repository.
    #[clap(short, long, default_value_t = orchestrator::DEFAULT_RETRIES as u32, value_parser = clap::value_parser!(u32).range(1..))]
    retries: u32,

    /// Base url of the GitHub API, for GitHub Enterprise.
    #[clap(long, default_value = github::DEFAULT_API_URL)]
    api_url: String,

    /// Git executable.
    #[clap(long, default_value = "git")]
    git: PathBuf,
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

async fn run(opts: Opts) -> Result<Tally> {
    let config = Config {
        root: expand_home(&opts.directory),
        parallelism: opts
            .parallelism
            .map(|p| p as usize)
            .unwrap_or_else(default_parallelism),
        retries: opts.retries as usize,
        shallow: opts.shallow,
    };
    log::debug!("config={:?}", &config);

    let client = github::make_http_client(&opts.token)?;
    let repositories = github::fetch_repositories(&client, &opts.api_url)
        .await
        .with_context(|| "Failed to list repositories")?;
    let repositories = repository::filter(repositories, opts.source, opts.forks);

    let credentials = Credentials::new(opts.username, opts.token);
    let git = Git::new(opts.git, credentials);
    let root = config.root.clone();
    Orchestrator::new(git, config)
        .run(repositories)
        .await
        .with_context(|| format!("Failed to clone into {:?}", root))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts = Opts::parse();

    let runtime = tokio::runtime::Runtime::new().with_context(|| "Failed to start runtime")?;
    let tally = runtime.block_on(async {
        tokio::select! {
            tally = run(opts) => tally.map(Some),
            _ = tokio::signal::ctrl_c() => Ok(None),
        }
    });
    // Dropping the runtime cancels in-flight clones and kills their git processes.
    drop(runtime);

    let tally = match tally? {
        Some(tally) => tally,
        None => {
            log::warn!("Interrupted, partial clones are left on disk");
            std::process::exit(130);
        }
    };

    log::debug!(
        "succeeded={} skipped={} failed={} total={}",
        tally.succeeded,
        tally.skipped,
        tally.failed,
        tally.total
    );
    if !tally.is_complete() {
        log::error!(
            "Failed to clone {} of {} repositories",
            tally.failed,
            tally.total
        );
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Opts::command().debug_assert();
    }

    #[test]
    fn every_option_has_help() {
        let command = Opts::command();
        let undocumented: Vec<&str> = command
            .get_arguments()
            .filter(|a| a.get_help().is_none())
            .map(|a| a.get_id())
            .filter(|id| *id != "help" && *id != "version")
            .collect();
        assert!(undocumented.is_empty(), "{:?}", undocumented);
    }

    #[test]
    fn defaults() {
        let opts =
            Opts::try_parse_from(["github-clone-all", "-d", "out", "-u", "me", "-t", "tok"])
                .unwrap();
        assert_eq!(opts.retries, 3);
        assert_eq!(opts.parallelism, None);
        assert_eq!(opts.api_url, "https://api.github.com");
        assert_eq!(opts.git, PathBuf::from("git"));
        assert!(!opts.source && !opts.forks && !opts.shallow);
    }

    #[test]
    fn flags() {
        let opts = Opts::try_parse_from([
            "github-clone-all",
            "--directory",
            "out",
            "--username",
            "me",
            "--token",
            "tok",
            "--forks",
            "--shallow",
            "-p",
            "8",
            "-r",
            "5",
        ])
        .unwrap();
        assert!(opts.forks && opts.shallow && !opts.source);
        assert_eq!(opts.parallelism, Some(8));
        assert_eq!(opts.retries, 5);
    }

    #[test]
    fn zero_is_rejected() {
        let base = ["github-clone-all", "-d", "out", "-u", "me", "-t", "tok"];
        assert!(Opts::try_parse_from(base.iter().chain(&["-p", "0"])).is_err());
        assert!(Opts::try_parse_from(base.iter().chain(&["-r", "0"])).is_err());
    }

    #[test]
    fn home_is_expanded() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("~/code"), home.join("code"));
        assert_eq!(expand_home("~other/code"), PathBuf::from("~other/code"));
        assert_eq!(expand_home("/abs"), PathBuf::from("/abs"));
    }

    #[test]
    fn default_parallelism_is_positive() {
        assert!(default_parallelism() >= 1);
    }
}
