//! Repository domain types.
//!
//! This module contains the repository model returned by `GET /repos/{owner}/{repo}` and the
//! partial-update body sent to `PATCH /repos/{owner}/{repo}`.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;

/// Represents a GitHub repository.
///
/// Only the fields the provisioning workflow reads are deserialized. Everything else in the
/// GitHub response is ignored.
///
/// # Examples
///
/// ```rust
/// use github_client::Repository;
///
/// let repo = Repository::new("my-repo".to_string(), "owner/my-repo".to_string());
///
/// assert_eq!(repo.full_name(), "owner/my-repo");
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Repository {
    /// The full name of the repository (owner/name)
    full_name: String,
    /// The name of the repository
    name: String,
}

impl Repository {
    pub fn new(name: String, full_name: String) -> Self {
        Self { full_name, name }
    }

    /// Returns the name of the repository (without owner).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full name of the repository (owner/name).
    pub fn full_name(&self) -> &str {
        &self.full_name
    }
}

/// Represents the merge settings that can be updated for a repository.
///
/// Only fields that are `Some` are serialized, so GitHub keeps its current value for every
/// field left as `None`. Use `Default::default()` and set the fields to change.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RepositorySettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_branch_on_merge: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_auto_merge: Option<bool>,
}

impl RepositorySettingsUpdate {
    /// Returns true if no field would be sent.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
