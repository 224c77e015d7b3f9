//! Plan file management for the repo-guard CLI.
//!
//! A plan file is a TOML document describing what `repo-guard apply` provisions: the branches
//! to protect, the repository merge settings, the Actions secrets and the run options. When no
//! plan file is given and none exists in the working directory the built-in plan is used.
//!
//! # Example
//!
//! ```toml
//! [run]
//! timeout_secs = 30
//! max_concurrency = 1
//! allow_placeholder_secrets = false
//!
//! [[branches]]
//! branch_name = "main"
//! required_approvals = 2
//! dismiss_stale_reviews = true
//!
//! [settings]
//! allow_squash_merge = true
//! delete_branch_on_merge = true
//!
//! [[secrets]]
//! name = "DEPLOY_TOKEN"
//! env = "DEPLOY_TOKEN"
//! ```

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use repo_guard_core::{
    BranchPolicy, ProvisioningPlan, RepoSettings, SecretSpec, DEFAULT_BRANCHES,
    DEFAULT_SECRET_NAMES, PLACEHOLDER_SECRET_VALUE,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::Error;

/// Plan file looked up in the working directory when `--config` is not given
pub const DEFAULT_PLAN_FILENAME: &str = "repo-guard.toml";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrency() -> usize {
    1
}

/// Options of a run that can be overridden from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSection {
    /// Timeout of each GitHub request in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of concurrent requests within a phase
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Upload marked placeholders when secrets cannot be encrypted
    #[serde(default)]
    pub allow_placeholder_secrets: bool,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            allow_placeholder_secrets: false,
        }
    }
}

/// A secret declared in a plan file.
///
/// The value is either written inline or read from an environment variable at load time.
/// When both are present the environment variable wins if it is set.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Name of the environment variable holding the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

impl std::fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEntry")
            .field("name", &self.name)
            .field("value", &self.value.as_ref().map(|_| "[REDACTED]"))
            .field("env", &self.env)
            .finish()
    }
}

impl SecretEntry {
    /// Resolves the value of the secret.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if neither the environment variable nor an inline value
    /// provides one.
    pub fn resolve(&self) -> Result<SecretSpec, Error> {
        let from_env = self.env.as_deref().and_then(|var| env::var(var).ok());

        match from_env.or_else(|| self.value.clone()) {
            Some(value) => Ok(SecretSpec::new(self.name.clone(), value)),
            None => Err(Error::Config(format!(
                "Secret '{}' has no value: set {} or add an inline value",
                self.name,
                self.env
                    .as_deref()
                    .map(|var| format!("the {} environment variable", var))
                    .unwrap_or_else(|| "an environment variable".to_string())
            ))),
        }
    }
}

/// The TOML plan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub run: RunSection,

    /// Branch policies in the order they are applied
    #[serde(default)]
    pub branches: Vec<BranchPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<RepoSettings>,

    #[serde(default)]
    pub secrets: Vec<SecretEntry>,
}

impl Default for PlanFile {
    /// The built-in plan, as written by `repo-guard init`.
    fn default() -> Self {
        Self {
            run: RunSection::default(),
            branches: DEFAULT_BRANCHES.into_iter().map(BranchPolicy::new).collect(),
            settings: Some(RepoSettings::recommended()),
            secrets: DEFAULT_SECRET_NAMES
                .into_iter()
                .map(|name| SecretEntry {
                    name: name.to_string(),
                    value: Some(PLACEHOLDER_SECRET_VALUE.to_string()),
                    env: None,
                })
                .collect(),
        }
    }
}

impl PlanFile {
    /// Loads a plan file from the given path.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the file does not exist
    /// - `Error::LoadFile` if the file cannot be read
    /// - `Error::ParseTomlFile` if the file is not a valid plan
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Loading plan from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!("Plan file not found: {:?}", path)));
        }

        let content = fs::read_to_string(path).map_err(Error::LoadFile)?;
        toml::from_str(&content).map_err(Error::ParseTomlFile)
    }

    /// Loads the plan named on the command line, or the one in the working directory.
    ///
    /// An explicitly named file must exist. Without one, `repo-guard.toml` in `working_dir`
    /// is used if present, and the built-in plan otherwise.
    pub fn load_or_default(explicit: Option<&Path>, working_dir: &Path) -> Result<Self, Error> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = working_dir.join(DEFAULT_PLAN_FILENAME);
        if candidate.exists() {
            Self::load(&candidate)
        } else {
            info!("No plan file found, using the built-in plan");
            Ok(Self::default())
        }
    }

    /// Saves the plan to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the plan cannot be serialized or written.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        debug!("Saving plan to {:?}", path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create plan directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize plan: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write plan file: {}", e)))?;

        info!("Plan saved to {:?}", path);
        Ok(())
    }

    /// Builds the provisioning plan, resolving every secret value.
    ///
    /// Secret values are only resolved when `with_secrets` is set, so a run without secrets
    /// does not need the environment variables they name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a secret value cannot be resolved.
    pub fn to_plan(&self, with_secrets: bool) -> Result<ProvisioningPlan, Error> {
        let secrets = if with_secrets {
            self.secrets
                .iter()
                .map(SecretEntry::resolve)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        Ok(ProvisioningPlan::new(
            self.branches.clone(),
            self.settings.clone(),
            secrets,
        ))
    }
}

/// The path `init` writes to when none is given.
pub fn default_plan_path() -> PathBuf {
    PathBuf::from(DEFAULT_PLAN_FILENAME)
}
