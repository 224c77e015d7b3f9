//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when talking to the GitHub REST API
//! through the github_client crate. Every remote failure is classified from the HTTP status
//! code of the response rather than from the text of the message.

use std::time::Duration;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// Each variant carries enough context for the caller to decide whether an operation
/// should be recorded as failed, skipped or treated as fatal.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::Error;
///
/// match client.get_branch("owner", "repo", "main").await {
///     Ok(branch) => println!("Branch {} exists", branch.name),
///     Err(Error::NotFound) => println!("No such branch"),
///     Err(err) => eprintln!("Lookup failed: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client initialization failure.
    ///
    /// This error occurs when the token cannot be used to build an authenticated client,
    /// for instance because the base URI is malformed.
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// Error deserializing the response from GitHub.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The request could not be built, for example because a path segment could not be encoded.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested resource was not found (HTTP 404).
    #[error("Resource not found")]
    NotFound,

    /// GitHub API rate limit has been exceeded.
    ///
    /// Reported when GitHub answers 403 or 429 and the `x-ratelimit-remaining` header is zero.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// GitHub answered with a non-success status code.
    ///
    /// Authentication failures (401, 403) are reported through this variant too, see
    /// [`Error::is_auth_failure`].
    #[error("GitHub returned HTTP {status}: {message}")]
    RemoteStatus {
        /// The HTTP status code of the response
        status: u16,
        /// The `message` field of the error body, or the raw body if it had none
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The request never produced a response (connection refused, DNS failure, TLS error ...).
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl Error {
    /// Returns the HTTP status code associated with the error, if there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotFound => Some(404),
            Error::RemoteStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if GitHub rejected the credential or its permissions.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}
