//! Error types for the provisioning workflow.
//!
//! Only [`Error::AccessDenied`] ever escapes [`crate::Provisioner::run`]. Every other variant is
//! converted into an [`crate::OperationResult`] or a secrets-phase status by the phase that
//! produced it.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Result type alias used across the crate.
pub type ProvisionResult<T> = Result<T, Error>;

/// Errors raised while provisioning a repository.
#[derive(Error, Debug)]
pub enum Error {
    /// The repository could not be reached with the supplied credential.
    ///
    /// Fatal: the run stops before any phase begins.
    #[error("Repository {repository} is not accessible: {reason}")]
    AccessDenied { repository: String, reason: String },

    /// A branch named in the plan does not exist, or its existence could not be confirmed.
    #[error("Branch '{branch}' does not exist or could not be verified")]
    PreconditionUnmet { branch: String },

    /// GitHub refused a mutating call.
    #[error("GitHub rejected the request: {detail}")]
    RemoteRejected {
        /// The HTTP status of the refusal, when GitHub answered at all
        status: Option<u16>,
        detail: String,
    },

    /// No usable sealed-box implementation for the repository key.
    #[error("Secret encryption is unavailable: {0}")]
    EncryptionUnavailable(String),

    /// The repository public key for Actions secrets could not be obtained.
    ///
    /// Fatal for the secrets phase only.
    #[error("Failed to fetch the Actions secrets public key: {0}")]
    KeyFetchFailed(String),

    /// A value supplied by the caller is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<github_client::Error> for Error {
    fn from(value: github_client::Error) -> Self {
        Error::RemoteRejected {
            status: value.status(),
            detail: value.to_string(),
        }
    }
}

/// A value failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    /// Name of the offending field
    pub field: String,
    /// Why the value was rejected
    pub reason: String,
}

impl ValidationError {
    /// Creates an error for a field with an arbitrary reason.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The field was empty.
    pub fn empty_field(field: &str) -> Self {
        Self::new(field, "must not be empty")
    }

    /// The field exceeded its maximum length.
    pub fn too_long(field: &str, actual: usize, max: usize) -> Self {
        Self::new(
            field,
            format!("length {} exceeds the maximum of {}", actual, max),
        )
    }

    /// The field did not match the expected format.
    pub fn invalid_format(field: &str, reason: &str) -> Self {
        Self::new(field, reason)
    }
}
