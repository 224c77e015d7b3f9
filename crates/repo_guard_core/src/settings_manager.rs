//! Repository merge settings.

use github_client::ProvisioningClient;
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::Error;
use crate::outcome::{OperationKind, OperationResult};
use crate::plan::RepoSettings;
use crate::repository::RepositoryRef;

#[cfg(test)]
#[path = "settings_manager_tests.rs"]
mod tests;

/// Applies repository-wide merge settings with a single partial update.
#[derive(Clone)]
pub struct SettingsManager {
    client: Arc<dyn ProvisioningClient>,
}

impl SettingsManager {
    pub fn new(client: Arc<dyn ProvisioningClient>) -> Self {
        Self { client }
    }

    /// Sends the configured settings in one PATCH.
    ///
    /// Only fields set in `settings` are sent. A settings object with no field set is
    /// recorded as `Skipped` without a request. Failures are recorded, never raised.
    pub async fn apply_settings(
        &self,
        repo: &RepositoryRef,
        settings: &RepoSettings,
    ) -> OperationResult {
        let target = repo.to_string();

        if settings.is_empty() {
            info!(repository = %repo, "No repository settings configured");
            return OperationResult::skipped(
                OperationKind::RepoSettings,
                target,
                "No settings configured",
            );
        }

        info!(repository = %repo, "Applying repository settings");

        match self
            .client
            .update_repository_settings(repo.owner(), repo.name(), &settings.to_update())
            .await
        {
            Ok(_) => {
                info!(repository = %repo, "Repository settings applied");
                OperationResult::succeeded(OperationKind::RepoSettings, target, "Settings applied")
            }
            Err(e) => {
                let rejected = Error::from(e);
                warn!(repository = %repo, error = %rejected, "Failed to apply repository settings");
                OperationResult::failed(OperationKind::RepoSettings, target, rejected.to_string())
            }
        }
    }
}
