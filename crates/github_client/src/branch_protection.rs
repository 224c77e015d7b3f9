//! Branch protection domain types.
//!
//! This module contains the request body for the full-replace branch protection endpoint
//! (`PUT /repos/{owner}/{repo}/branches/{branch}/protection`) and the branch lookup model.
//!
//! See: https://docs.github.com/en/rest/branches/branch-protection

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "branch_protection_tests.rs"]
mod tests;

/// A branch as returned by `GET /repos/{owner}/{repo}/branches/{branch}`.
///
/// Only the fields needed to confirm that the branch exists are kept.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Branch {
    /// The branch name
    pub name: String,
    /// Whether the branch already carries a protection rule
    #[serde(default)]
    pub protected: bool,
}

/// Request body for replacing the protection rule of a branch.
///
/// Every call replaces the remote rule entirely. Fields that GitHub requires to be present
/// but that this crate does not manage (`required_status_checks`, `restrictions`) are always
/// serialized as `null`.
///
/// # Examples
///
/// ```rust
/// use github_client::{BranchProtectionRequest, RequiredPullRequestReviews};
///
/// let request = BranchProtectionRequest {
///     enforce_admins: true,
///     required_pull_request_reviews: Some(RequiredPullRequestReviews {
///         required_approving_review_count: 2,
///         dismiss_stale_reviews: true,
///         require_code_owner_reviews: false,
///         require_last_push_approval: false,
///     }),
///     ..Default::default()
/// };
///
/// let body = serde_json::to_value(&request).unwrap();
/// assert!(body["required_status_checks"].is_null());
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct BranchProtectionRequest {
    /// Status check gating is not supported, always `null`
    pub required_status_checks: Option<serde_json::Value>,
    /// Enforce the rule for repository administrators as well
    pub enforce_admins: bool,
    /// Pull request review requirements, `null` disables them
    pub required_pull_request_reviews: Option<RequiredPullRequestReviews>,
    /// Push restriction allow-lists are not supported, always `null`
    pub restrictions: Option<serde_json::Value>,
    /// Permit force pushes to the branch
    pub allow_force_pushes: bool,
    /// Permit deletion of the branch
    pub allow_deletions: bool,
    /// Block creation of matching branches
    pub block_creations: bool,
    /// Require all review conversations to be resolved before merging
    pub required_conversation_resolution: bool,
}

/// Pull request review requirements of a branch protection rule.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequiredPullRequestReviews {
    /// Required number of approving reviews before merging
    pub required_approving_review_count: u32,
    /// Whether stale reviews are dismissed when new commits are pushed
    pub dismiss_stale_reviews: bool,
    /// Whether code owner reviews are required
    pub require_code_owner_reviews: bool,
    /// Whether the most recent push must be approved by someone other than its author
    pub require_last_push_approval: bool,
}
