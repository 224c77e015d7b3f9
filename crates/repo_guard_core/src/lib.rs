//! Idempotent provisioning of GitHub repository governance.
//!
//! `repo_guard_core` applies a [`ProvisioningPlan`] to a repository: branch protection rules
//! for each declared branch, repository merge settings and GitHub Actions secrets. Every run
//! re-derives the remote state from the API, so running the same plan again converges on the
//! same configuration.
//!
//! The [`Provisioner`] drives a run and returns a [`RunReport`]. The report decides the exit
//! status of a run: it succeeds when at least one branch was protected.
//!
//! # Example
//!
//! ```rust,no_run
//! use github_client::{create_token_client, GitHubClient};
//! use repo_guard_core::{ProvisionOptions, Provisioner, ProvisioningPlan, RepositoryRef};
//! use secrecy::SecretString;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let token = SecretString::from("ghp_example".to_string());
//! let client = Arc::new(GitHubClient::new(create_token_client(&token, None)?));
//!
//! let options = ProvisionOptions {
//!     provision_secrets: true,
//!     ..Default::default()
//! };
//! let provisioner = Provisioner::new(client, ProvisioningPlan::default(), options)?;
//! let report = provisioner.run(&RepositoryRef::parse("my-org/my-repo")?).await?;
//!
//! for result in report.summary().details {
//!     println!("{}", result);
//! }
//! # Ok(())
//! # }
//! ```

pub mod branch_protection;
pub use branch_protection::BranchProtectionManager;

pub mod encryption;
pub use encryption::{
    default_sealer, encrypt_or_placeholder, placeholder_value, SealedValue, SecretSealer,
    UnavailableSealer, PLACEHOLDER_PREFIX,
};
#[cfg(feature = "sealed-box")]
pub use encryption::SodiumSealer;

pub mod errors;
pub use errors::{Error, ProvisionResult, ValidationError};

pub mod outcome;
pub use outcome::{
    summarize, OperationKind, OperationResult, Outcome, RunReport, RunSummary, SecretsPhase,
};

pub mod plan;
pub use plan::{
    BranchPolicy, ProvisionOptions, ProvisioningPlan, RepoSettings, SecretSpec, DEFAULT_BRANCHES,
    DEFAULT_SECRET_NAMES, PLACEHOLDER_SECRET_VALUE,
};

pub mod provisioner;
pub use provisioner::Provisioner;

pub mod repository;
pub use repository::{OwnerName, RepositoryName, RepositoryRef};

pub mod secrets;
pub use secrets::{EncryptionKey, SecretProvisioner, SecretsState};

pub mod settings_manager;
pub use settings_manager::SettingsManager;

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "lib_integration_tests.rs"]
mod integration_tests;
