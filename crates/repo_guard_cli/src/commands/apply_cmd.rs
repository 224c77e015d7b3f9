//! The `apply` command: provision a repository from a plan.
//!
//! ```bash
//! # Protect branches and apply merge settings from the built-in plan
//! GITHUB_TOKEN=ghp_... repo-guard apply --owner my-org --repo my-repo
//!
//! # Also provision Actions secrets from a plan file
//! repo-guard apply --owner my-org --repo my-repo --config plan.toml --secrets
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Args;
use github_client::{create_token_client, GitHubClient};
use repo_guard_core::{ProvisionOptions, Provisioner, RepositoryRef, RunReport};
use secrecy::SecretString;
use tracing::{info, instrument};

use crate::config::{PlanFile, RunSection};
use crate::errors::Error;
use crate::report::format_report;

#[cfg(test)]
#[path = "apply_cmd_tests.rs"]
mod tests;

/// Arguments of `repo-guard apply`.
#[derive(Args, Clone)]
pub struct ApplyArgs {
    /// Owner (user or organization) of the repository
    #[arg(long)]
    pub owner: String,

    /// Name of the repository
    #[arg(long)]
    pub repo: String,

    /// Also provision the Actions secrets of the plan
    #[arg(long)]
    pub secrets: bool,

    /// GitHub token with administration rights on the repository
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Plan file to apply. Defaults to ./repo-guard.toml, then the built-in plan.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Do not apply repository merge settings
    #[arg(long)]
    pub skip_settings: bool,

    /// Timeout of each GitHub request in seconds, overrides the plan file
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Maximum number of concurrent requests within a phase, overrides the plan file
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Upload marked, unencrypted placeholders when a secret cannot be encrypted
    #[arg(long)]
    pub allow_placeholder_secrets: bool,

    /// GitHub API root, for GitHub Enterprise Server
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ApplyArgs {
    /// The validated target repository.
    pub fn repository(&self) -> Result<RepositoryRef, Error> {
        RepositoryRef::from_parts(self.owner.as_str(), self.repo.as_str())
            .map_err(|e| Error::InvalidArguments(e.to_string()))
    }

    /// The GitHub token, from `--token` or `GITHUB_TOKEN`.
    pub fn token(&self) -> Result<SecretString, Error> {
        match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(SecretString::from(token.to_string())),
            _ => Err(Error::InvalidArguments(
                "A GitHub token is required, pass --token or set GITHUB_TOKEN".to_string(),
            )),
        }
    }

    /// Run options, with command line flags taking precedence over the plan file.
    pub fn options(&self, run: &RunSection) -> ProvisionOptions {
        ProvisionOptions {
            provision_secrets: self.secrets,
            apply_settings: !self.skip_settings,
            allow_placeholder_secrets: self.allow_placeholder_secrets
                || run.allow_placeholder_secrets,
            max_concurrency: self.max_concurrency.unwrap_or(run.max_concurrency),
        }
    }

    /// Request timeout, with `--timeout-secs` taking precedence over the plan file.
    pub fn timeout(&self, run: &RunSection) -> Result<Duration, Error> {
        match self.timeout_secs.unwrap_or(run.timeout_secs) {
            0 => Err(Error::InvalidArguments(
                "The request timeout must be at least one second".to_string(),
            )),
            secs => Ok(Duration::from_secs(secs)),
        }
    }
}

/// Runs `repo-guard apply`.
///
/// # Errors
///
/// Returns an error if the arguments or the plan are invalid, the GitHub client cannot be
/// created, or the repository is not accessible. A run in which operations fail still
/// returns `Ok` with the failures recorded in the report.
#[instrument(skip(args), fields(owner = %args.owner, repo = %args.repo))]
pub async fn execute(args: &ApplyArgs) -> Result<RunReport, Error> {
    let repo = args.repository()?;
    let token = args.token()?;

    let working_dir = std::env::current_dir().map_err(Error::LoadFile)?;
    let plan_file = PlanFile::load_or_default(args.config.as_deref(), &working_dir)?;
    let plan = plan_file.to_plan(args.secrets)?;
    let options = args.options(&plan_file.run);
    let timeout = args.timeout(&plan_file.run)?;

    let octocrab = create_token_client(&token, args.api_url.as_deref())
        .map_err(|e| Error::Auth(e.to_string()))?;
    let client = GitHubClient::new(octocrab).with_timeout(timeout);

    let provisioner = Provisioner::new(Arc::new(client), plan, options)
        .map_err(|e| Error::Config(e.to_string()))?;

    info!(
        secrets = args.secrets,
        timeout_secs = timeout.as_secs(),
        "Applying plan"
    );

    Ok(provisioner.run(&repo).await?)
}

/// Renders the report for the terminal, or as JSON when requested.
pub fn render(args: &ApplyArgs, report: &RunReport) -> Result<String, Error> {
    if args.json {
        Ok(serde_json::to_string_pretty(report)?)
    } else {
        Ok(format_report(report))
    }
}
