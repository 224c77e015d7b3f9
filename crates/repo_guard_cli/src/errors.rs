use std::io;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the repo-guard CLI application.
///
/// Every variant is fatal for the invocation and maps to exit code 2.
#[derive(Error, Debug)]
pub enum Error {
    /// The GitHub client could not be created from the supplied credential or API URL.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Configuration error occurred while loading, validating or saving the plan file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line arguments were provided.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Failed to load a file from the filesystem.
    #[error("Failed to load file: {0}")]
    LoadFile(#[source] io::Error),

    /// Failed to parse a TOML plan file.
    #[error("Failed to parse TOML plan file: {0}")]
    ParseTomlFile(#[source] toml::de::Error),

    /// The run report could not be rendered as JSON.
    #[error("Failed to render report: {0}")]
    Render(#[from] serde_json::Error),

    /// The provisioning run was aborted.
    #[error(transparent)]
    Provisioning(#[from] repo_guard_core::Error),

    /// Failed to flush the standard output buffer.
    #[error("Failed to flush the std out buffer.")]
    StdOutFlushFailed,
}
