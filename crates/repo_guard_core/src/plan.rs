//! The provisioning plan.
//!
//! A [`ProvisioningPlan`] is the complete, explicit description of what a run applies: an
//! ordered list of branch policies, the repository merge settings and the set of Actions
//! secrets. It is handed to the [`crate::Provisioner`] at construction time.

use github_client::{BranchProtectionRequest, RepositorySettingsUpdate, RequiredPullRequestReviews};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ValidationError;

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;

/// GitHub rejects review counts above this value.
pub const MAX_REQUIRED_APPROVALS: u32 = 6;

/// Value given to the secrets of the built-in plan. Operators replace it in the GitHub UI.
pub const PLACEHOLDER_SECRET_VALUE: &str = "REPLACE_ME";

/// Branches protected by the built-in plan, in the order they are applied.
pub const DEFAULT_BRANCHES: [&str; 3] = ["main", "develop", "staging"];

/// Secrets created by the built-in plan.
pub const DEFAULT_SECRET_NAMES: [&str; 3] = ["DEPLOY_TOKEN", "DOCKER_USERNAME", "DOCKER_PASSWORD"];

fn default_required_approvals() -> u32 {
    1
}

/// Protection policy for one branch.
///
/// Status check gating and push restriction allow-lists are not supported; the rule sent to
/// GitHub always disables them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPolicy {
    /// The branch the policy applies to
    pub branch_name: String,
    /// Number of approving reviews required before merging
    #[serde(default = "default_required_approvals")]
    pub required_approvals: u32,
    /// Dismiss approvals when new commits are pushed
    #[serde(default)]
    pub dismiss_stale_reviews: bool,
    /// Apply the rule to administrators as well
    #[serde(default)]
    pub enforce_admins: bool,
    #[serde(default)]
    pub allow_force_pushes: bool,
    #[serde(default)]
    pub allow_deletions: bool,
    #[serde(default)]
    pub require_code_owner_reviews: bool,
    #[serde(default)]
    pub require_conversation_resolution: bool,
}

impl BranchPolicy {
    /// Creates a policy requiring one approval, dismissing stale reviews and forbidding
    /// force pushes and deletions.
    pub fn new(branch_name: impl Into<String>) -> Self {
        Self {
            branch_name: branch_name.into(),
            required_approvals: default_required_approvals(),
            dismiss_stale_reviews: true,
            enforce_admins: false,
            allow_force_pushes: false,
            allow_deletions: false,
            require_code_owner_reviews: false,
            require_conversation_resolution: false,
        }
    }

    /// Sets the number of required approvals.
    pub fn with_required_approvals(mut self, count: u32) -> Self {
        self.required_approvals = count;
        self
    }

    /// Checks the policy against GitHub's limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.branch_name.trim().is_empty() {
            return Err(ValidationError::empty_field("branch_name"));
        }

        if self.required_approvals > MAX_REQUIRED_APPROVALS {
            return Err(ValidationError::new(
                "required_approvals",
                format!(
                    "{} for branch '{}' exceeds the maximum of {}",
                    self.required_approvals, self.branch_name, MAX_REQUIRED_APPROVALS
                ),
            ));
        }

        Ok(())
    }

    /// Builds the full-replace protection body for this policy.
    pub fn to_request(&self) -> BranchProtectionRequest {
        BranchProtectionRequest {
            required_status_checks: None,
            enforce_admins: self.enforce_admins,
            required_pull_request_reviews: Some(RequiredPullRequestReviews {
                required_approving_review_count: self.required_approvals,
                dismiss_stale_reviews: self.dismiss_stale_reviews,
                require_code_owner_reviews: self.require_code_owner_reviews,
                require_last_push_approval: false,
            }),
            restrictions: None,
            allow_force_pushes: self.allow_force_pushes,
            allow_deletions: self.allow_deletions,
            block_creations: false,
            required_conversation_resolution: self.require_conversation_resolution,
        }
    }
}

/// Repository-wide merge settings.
///
/// Fields left as `None` are not sent, so GitHub keeps their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_branch_on_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_auto_merge: Option<bool>,
}

impl RepoSettings {
    /// The settings applied by the built-in plan.
    pub fn recommended() -> Self {
        Self {
            allow_squash_merge: Some(true),
            allow_merge_commit: Some(true),
            allow_rebase_merge: Some(true),
            delete_branch_on_merge: Some(true),
            allow_auto_merge: Some(true),
        }
    }

    /// Builds the partial-update body for these settings.
    pub fn to_update(&self) -> RepositorySettingsUpdate {
        RepositorySettingsUpdate {
            allow_squash_merge: self.allow_squash_merge,
            allow_merge_commit: self.allow_merge_commit,
            allow_rebase_merge: self.allow_rebase_merge,
            delete_branch_on_merge: self.delete_branch_on_merge,
            allow_auto_merge: self.allow_auto_merge,
        }
    }

    /// Returns true if no setting is configured.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// An Actions secret to create or replace.
///
/// The value is never logged or serialized.
#[derive(Debug)]
pub struct SecretSpec {
    /// Secret name, unique within a plan
    pub name: String,
    /// Plaintext value, encrypted before it leaves the process
    pub value: SecretString,
}

impl SecretSpec {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: SecretString::from(value.into()),
        }
    }

    /// Checks the name against GitHub's secret naming rules.
    ///
    /// # Validation Rules
    /// - Characters: ASCII alphanumeric and underscores
    /// - Must not start with a digit
    /// - Must not start with the reserved `GITHUB_` prefix
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::empty_field("secret_name"));
        }

        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ValidationError::invalid_format(
                "secret_name",
                "must contain only alphanumeric characters or underscores",
            ));
        }

        if self.name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(ValidationError::invalid_format(
                "secret_name",
                "must not start with a number",
            ));
        }

        if self.name.to_ascii_uppercase().starts_with("GITHUB_") {
            return Err(ValidationError::invalid_format(
                "secret_name",
                "must not start with the reserved GITHUB_ prefix",
            ));
        }

        Ok(())
    }
}

/// Switches controlling which phases run and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Run the secrets phase
    pub provision_secrets: bool,
    /// Run the repository settings phase
    pub apply_settings: bool,
    /// Upload a marked, unencrypted placeholder when no sealed-box implementation can be used,
    /// instead of failing the secret
    pub allow_placeholder_secrets: bool,
    /// Upper bound on concurrent requests within one phase. `1` runs every operation in turn.
    pub max_concurrency: usize,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            provision_secrets: false,
            apply_settings: true,
            allow_placeholder_secrets: false,
            max_concurrency: 1,
        }
    }
}

/// Everything a provisioning run applies, in the order it is applied.
#[derive(Debug)]
pub struct ProvisioningPlan {
    /// Branch policies in declaration order
    pub branches: Vec<BranchPolicy>,
    /// Merge settings, if any should be applied
    pub settings: Option<RepoSettings>,
    /// Secrets with unique names
    pub secrets: Vec<SecretSpec>,
}

impl ProvisioningPlan {
    /// Creates a plan, collapsing secrets that share a name.
    ///
    /// When several secrets have the same name the last declared value wins and keeps the
    /// position of the first declaration. Names are compared case-insensitively, as GitHub
    /// stores them uppercased.
    pub fn new(
        branches: Vec<BranchPolicy>,
        settings: Option<RepoSettings>,
        secrets: Vec<SecretSpec>,
    ) -> Self {
        Self {
            branches,
            settings,
            secrets: dedup_secrets(secrets),
        }
    }

    /// Validates every policy and secret name in the plan.
    ///
    /// # Errors
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for policy in &self.branches {
            policy.validate()?;
        }

        for secret in &self.secrets {
            secret.validate()?;
        }

        Ok(())
    }

    /// Collapses secrets that share a name, in place.
    ///
    /// Plans built without [`ProvisioningPlan::new`] may still hold duplicates.
    pub fn dedup_secrets(&mut self) {
        self.secrets = dedup_secrets(std::mem::take(&mut self.secrets));
    }
}

impl Default for ProvisioningPlan {
    /// The built-in plan: protect `main`, `develop` and `staging`, apply the recommended merge
    /// settings and create placeholder secrets for the usual deployment credentials.
    fn default() -> Self {
        Self::new(
            DEFAULT_BRANCHES.into_iter().map(BranchPolicy::new).collect(),
            Some(RepoSettings::recommended()),
            DEFAULT_SECRET_NAMES
                .into_iter()
                .map(|name| SecretSpec::new(name, PLACEHOLDER_SECRET_VALUE))
                .collect(),
        )
    }
}

fn dedup_secrets(secrets: Vec<SecretSpec>) -> Vec<SecretSpec> {
    let mut unique: Vec<SecretSpec> = Vec::with_capacity(secrets.len());
    for secret in secrets {
        match unique.iter_mut().find(|s| s.name.eq_ignore_ascii_case(&secret.name)) {
            Some(existing) => {
                warn!(
                    secret = secret.name.as_str(),
                    "Secret declared more than once, keeping the last value"
                );
                existing.value = secret.value;
            }
            None => unique.push(secret),
        }
    }
    unique
}
