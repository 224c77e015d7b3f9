//! Repository identity types
//!
//! A [`RepositoryRef`] names the repository every request of a run is made against. It is
//! built once at startup from validated owner and repository names and never changes.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ValidationError;

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;

/// Validated GitHub repository name
///
/// Represents a repository name that conforms to GitHub's naming rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Create a new repository name with validation
    ///
    /// # Validation Rules
    /// - Length: 1-100 characters
    /// - Characters: ASCII alphanumeric, hyphens, underscores, periods
    /// - Must not start with `.` or `-`
    ///
    /// # Errors
    /// Returns `ValidationError` if validation fails
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ValidationError::empty_field("repository_name"));
        }

        if name.len() > 100 {
            return Err(ValidationError::too_long(
                "repository_name",
                name.len(),
                100,
            ));
        }

        if name.starts_with('.') || name.starts_with('-') {
            return Err(ValidationError::invalid_format(
                "repository_name",
                "must not start with '.' or '-'",
            ));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ValidationError::invalid_format(
                "repository_name",
                "must contain only alphanumeric characters, hyphens, underscores, or periods",
            ));
        }

        Ok(Self(name))
    }

    /// Get the repository name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RepositoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated GitHub user or organization name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerName(String);

impl OwnerName {
    /// Create a new owner name with validation
    ///
    /// # Validation Rules
    /// - Length: 1-39 characters
    /// - Characters: ASCII alphanumeric and hyphens only
    /// - Must not start or end with hyphen
    /// - No consecutive hyphens
    ///
    /// # Errors
    /// Returns `ValidationError` if validation fails
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ValidationError::empty_field("owner_name"));
        }

        if name.len() > 39 {
            return Err(ValidationError::too_long("owner_name", name.len(), 39));
        }

        if name.starts_with('-') || name.ends_with('-') {
            return Err(ValidationError::invalid_format(
                "owner_name",
                "must not start or end with hyphen",
            ));
        }

        if name.contains("--") {
            return Err(ValidationError::invalid_format(
                "owner_name",
                "must not contain consecutive hyphens",
            ));
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ValidationError::invalid_format(
                "owner_name",
                "must contain only alphanumeric characters and hyphens",
            ));
        }

        Ok(Self(name))
    }

    /// Get the owner name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for OwnerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The repository a provisioning run targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    owner: OwnerName,
    name: RepositoryName,
}

impl RepositoryRef {
    /// Creates a reference from already validated parts.
    pub fn new(owner: OwnerName, name: RepositoryName) -> Self {
        Self { owner, name }
    }

    /// Validates an owner and a repository name and combines them.
    ///
    /// # Errors
    /// Returns `ValidationError` if either part is invalid.
    pub fn from_parts(
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(OwnerName::new(owner)?, RepositoryName::new(name)?))
    }

    /// Parses an `owner/name` string.
    ///
    /// # Errors
    /// Returns `ValidationError` if the string does not contain exactly one `/` or either part
    /// is invalid.
    pub fn parse(full_name: &str) -> Result<Self, ValidationError> {
        match full_name.split_once('/') {
            Some((owner, name)) if !name.contains('/') => Self::from_parts(owner, name),
            _ => Err(ValidationError::invalid_format(
                "repository",
                "must be in the form 'owner/name'",
            )),
        }
    }

    /// The owning user or organization.
    pub fn owner(&self) -> &str {
        self.owner.as_str()
    }

    /// The repository name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The web page of one of the repository's settings screens, such as `branches` or
    /// `secrets/actions`. An empty `section` yields the general settings page.
    pub fn settings_url(&self, section: &str) -> Result<Url, url::ParseError> {
        let base = Url::parse("https://github.com/")?;
        let page = if section.is_empty() {
            format!("{}/{}/settings", self.owner, self.name)
        } else {
            format!("{}/{}/settings/{}", self.owner, self.name, section)
        };
        base.join(&page)
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
