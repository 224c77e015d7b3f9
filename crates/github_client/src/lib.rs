//! Crate for interacting with the GitHub REST API.
//!
//! This crate provides a client for the handful of repository administration endpoints used
//! to provision a repository: repository and branch lookups, branch protection, repository
//! merge settings and GitHub Actions secrets. Every request is authenticated with a bearer
//! token, carries an explicit API version header and is bounded by a timeout.
//!
//! Responses are classified from their HTTP status code. Callers receive typed values on
//! success and an [`Error`] describing the status on failure.

use std::time::Duration;

use async_trait::async_trait;
use http::{header::ACCEPT, HeaderName, Method, StatusCode};
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub mod branch_protection;
pub use branch_protection::{Branch, BranchProtectionRequest, RequiredPullRequestReviews};

pub mod errors;
pub use errors::Error;

pub mod repository;
pub use repository::{Repository, RepositorySettingsUpdate};

pub mod secrets;
pub use secrets::{ActionsPublicKey, ActionsSecretPayload, SecretWrite};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// The REST API version sent with every request.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// The media type sent in the `Accept` header of every request.
pub const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Timeout applied to a request when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const API_VERSION_HEADER: &str = "x-github-api-version";
const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Operations against the GitHub API needed to provision a repository.
///
/// [`GitHubClient`] is the production implementation. The trait exists so that the
/// provisioning workflow can be exercised against an in-memory remote in tests.
#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    /// Fetches a repository, failing if it does not exist or is not accessible.
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error>;

    /// Fetches a single branch of a repository.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if the branch does not exist.
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Branch, Error>;

    /// Replaces the protection rule of a branch with `protection`.
    ///
    /// The remote rule is replaced entirely, nothing of a previous rule is kept.
    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        protection: &BranchProtectionRequest,
    ) -> Result<(), Error>;

    /// Updates settings for a specific repository.
    ///
    /// Only the fields provided in the `settings` argument will be updated.
    async fn update_repository_settings(
        &self,
        owner: &str,
        repo: &str,
        settings: &RepositorySettingsUpdate,
    ) -> Result<Repository, Error>;

    /// Fetches the public key used to encrypt GitHub Actions secrets for the repository.
    async fn get_actions_public_key(&self, owner: &str, repo: &str)
        -> Result<ActionsPublicKey, Error>;

    /// Creates or replaces a GitHub Actions secret.
    ///
    /// Writing a secret with an existing name replaces its value.
    async fn put_actions_secret(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        payload: &ActionsSecretPayload,
    ) -> Result<SecretWrite, Error>;
}

/// The status, rate limit state and body of a GitHub response.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    /// HTTP status code of the response
    pub status: StatusCode,
    /// Value of the `x-ratelimit-remaining` header, if present
    pub rate_limit_remaining: Option<u64>,
    /// The raw response body
    pub body: String,
}

impl RemoteResponse {
    /// Returns true for 2xx responses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Deserializes the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Converts a non-success response into the matching [`Error`].
    pub fn into_error(self) -> Error {
        let message = serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| self.body.chars().take(200).collect());

        match self.status.as_u16() {
            404 => Error::NotFound,
            403 | 429 if self.rate_limit_remaining == Some(0) => Error::RateLimitExceeded,
            status => Error::RemoteStatus { status, message },
        }
    }
}

/// A client for interacting with the GitHub API, authenticated with a token.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Octocrab,
    timeout: Duration,
}

impl GitHubClient {
    /// Creates a new `GitHubClient` from an authenticated `Octocrab` instance.
    ///
    /// Requests use [`DEFAULT_REQUEST_TIMEOUT`] until [`GitHubClient::with_timeout`] is called.
    pub fn new(client: Octocrab) -> Self {
        Self {
            client,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the timeout applied to every request made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the timeout applied to every request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends a request and captures the status and body of the response.
    ///
    /// Non-success statuses are returned as a `RemoteResponse`, not as an error. Only transport
    /// failures and timeouts produce an `Err`.
    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<RemoteResponse, Error>
    where
        B: Serialize + ?Sized + Sync,
    {
        let request = async {
            let response = match method.as_str() {
                "GET" => self.client._get(path).await,
                "PUT" => self.client._put(path, body).await,
                "PATCH" => self.client._patch(path, body).await,
                other => {
                    return Err(Error::InvalidRequest(format!(
                        "Unsupported HTTP method {other}"
                    )))
                }
            }
            .map_err(|e| log_octocrab_error("Request to GitHub failed", e))?;

            let status = response.status();
            let rate_limit_remaining = response
                .headers()
                .get(RATE_LIMIT_REMAINING_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());

            let body = self
                .client
                .body_to_string(response)
                .await
                .map_err(|e| log_octocrab_error("Failed to read GitHub response body", e))?;

            debug!(
                method = %method,
                path = path,
                status = status.as_u16(),
                "Received response from GitHub"
            );

            Ok(RemoteResponse {
                status,
                rate_limit_remaining,
                body,
            })
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    path = path,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Request to GitHub timed out"
                );
                Err(Error::Timeout(self.timeout))
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        if response.is_success() {
            response.json()
        } else {
            Err(response.into_error())
        }
    }
}

#[async_trait]
impl ProvisioningClient for GitHubClient {
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error> {
        let path = api_path(&["repos", owner, repo])?;
        self.get_json(&path).await
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Branch, Error> {
        let path = api_path(&["repos", owner, repo, "branches", branch])?;
        self.get_json(&path).await
    }

    #[instrument(skip(self, protection), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        protection: &BranchProtectionRequest,
    ) -> Result<(), Error> {
        let path = api_path(&["repos", owner, repo, "branches", branch, "protection"])?;
        let response = self.send(Method::PUT, &path, Some(protection)).await?;
        if response.is_success() {
            info!(status = response.status.as_u16(), "Branch protection replaced");
            Ok(())
        } else {
            Err(response.into_error())
        }
    }

    #[instrument(skip(self, settings), fields(owner = %owner, repo = %repo))]
    async fn update_repository_settings(
        &self,
        owner: &str,
        repo: &str,
        settings: &RepositorySettingsUpdate,
    ) -> Result<Repository, Error> {
        let path = api_path(&["repos", owner, repo])?;
        let response = self.send(Method::PATCH, &path, Some(settings)).await?;
        if response.is_success() {
            response.json()
        } else {
            Err(response.into_error())
        }
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn get_actions_public_key(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ActionsPublicKey, Error> {
        let path = api_path(&["repos", owner, repo, "actions", "secrets", "public-key"])?;
        self.get_json(&path).await
    }

    #[instrument(skip(self, payload), fields(owner = %owner, repo = %repo, secret = %name))]
    async fn put_actions_secret(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        payload: &ActionsSecretPayload,
    ) -> Result<SecretWrite, Error> {
        let path = api_path(&["repos", owner, repo, "actions", "secrets", name])?;
        let response = self.send(Method::PUT, &path, Some(payload)).await?;
        if response.is_success() {
            Ok(SecretWrite::from_status(response.status.as_u16()))
        } else {
            Err(response.into_error())
        }
    }
}

/// Builds an API path from raw segments, percent-encoding each one.
///
/// A `/` inside a segment (as in the branch name `release/1.0`) is encoded as `%2F` so that it
/// stays a single path segment.
pub fn api_path(segments: &[&str]) -> Result<String, Error> {
    let mut url = Url::parse("https://api.github.com/")
        .map_err(|e| Error::InvalidRequest(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidRequest("Base URL cannot have path segments".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.path().to_string())
}

/// Creates an `Octocrab` client authenticated with a personal access token.
///
/// The client sends the `X-GitHub-Api-Version` and `Accept` headers with every request.
/// `base_uri` points the client at a GitHub Enterprise Server API root or a test server; when
/// it is `None` the public `https://api.github.com` endpoint is used.
///
/// # Errors
/// Returns an `Error::AuthError` if the base URI is invalid or the client cannot be built.
///
/// # Example
///
/// ```rust,no_run
/// use github_client::{create_token_client, GitHubClient};
/// use secrecy::SecretString;
///
/// # fn example() -> Result<(), github_client::Error> {
/// let token = SecretString::from("ghp_example".to_string());
/// let octocrab = create_token_client(&token, None)?;
/// let client = GitHubClient::new(octocrab);
/// # Ok(())
/// # }
/// ```
#[instrument(skip(token))]
pub fn create_token_client(token: &SecretString, base_uri: Option<&str>) -> Result<Octocrab, Error> {
    let mut builder = Octocrab::builder()
        .personal_token(token.expose_secret().to_string())
        .add_header(
            HeaderName::from_static(API_VERSION_HEADER),
            GITHUB_API_VERSION.to_string(),
        )
        .add_header(ACCEPT, GITHUB_MEDIA_TYPE.to_string());

    if let Some(uri) = base_uri {
        builder = builder.base_uri(uri).map_err(|e| {
            error!(base_uri = uri, error = %e, "Invalid GitHub API base URI");
            Error::AuthError(format!("Invalid GitHub API base URI '{}': {}", uri, e))
        })?;
    }

    builder.build().map_err(|e| {
        error!(error = ?e, "Failed to build Octocrab client with token credentials");
        Error::AuthError(format!("Failed to build GitHub client: {}", e))
    })
}

fn log_octocrab_error(message: &str, e: octocrab::Error) -> Error {
    match &e {
        octocrab::Error::GitHub { source, .. } => error!(
            error_message = source.message,
            "{}. Received an error from GitHub", message
        ),
        octocrab::Error::UriParse { source, .. } => error!(
            error_message = source.to_string(),
            "{}. Failed to parse URI.", message
        ),
        octocrab::Error::Uri { source, .. } => error!(
            error_message = source.to_string(),
            "{}. Failed to parse URI.", message
        ),
        octocrab::Error::InvalidHeaderValue { source, .. } => error!(
            error_message = source.to_string(),
            "{}. One of the header values was invalid.", message
        ),
        _ => error!(error_message = e.to_string(), "{}", message),
    };

    Error::Transport(e.to_string())
}
