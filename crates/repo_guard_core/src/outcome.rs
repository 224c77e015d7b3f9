//! Results of a provisioning run.
//!
//! Each attempted operation yields one [`OperationResult`]. The results of a run are collected
//! into a [`RunReport`] in the order the operations were declared, and [`summarize`] reduces
//! them to the counts shown to the operator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::RepositoryRef;

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;

/// The kind of mutation an operation performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    BranchProtection,
    RepoSettings,
    SecretUpsert,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OperationKind::BranchProtection => "branch protection",
            OperationKind::RepoSettings => "repository settings",
            OperationKind::SecretUpsert => "secret",
        };
        write!(f, "{}", label)
    }
}

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The remote accepted the change
    Succeeded,
    /// A precondition did not hold, so nothing was sent
    Skipped,
    /// The change was attempted and not applied
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// The result of one attempted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub kind: OperationKind,
    /// Branch name, secret name, or the repository for settings
    pub target: String,
    pub outcome: Outcome,
    /// Human readable explanation, such as the remote status of a failure
    pub detail: String,
}

impl OperationResult {
    pub fn succeeded(kind: OperationKind, target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, target, Outcome::Succeeded, detail)
    }

    pub fn skipped(kind: OperationKind, target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, target, Outcome::Skipped, detail)
    }

    pub fn failed(kind: OperationKind, target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, target, Outcome::Failed, detail)
    }

    fn new(
        kind: OperationKind,
        target: impl Into<String>,
        outcome: Outcome,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            outcome,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }
}

impl std::fmt::Display for OperationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} '{}' {}: {}",
            self.kind, self.target, self.outcome, self.detail
        )
    }
}

/// How the secrets phase ended as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretsPhase {
    /// Secrets were not requested for this run
    NotRequested,
    /// Every declared secret has a result
    Completed,
    /// The phase stopped before any upsert. Holds the reason.
    Aborted(String),
}

/// Counts of a run's results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The summarized results, in the order they were recorded
    pub details: Vec<OperationResult>,
}

impl RunSummary {
    /// Total number of results summarized.
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

/// Reduces a list of results to counts, keeping the results themselves as details.
pub fn summarize(results: &[OperationResult]) -> RunSummary {
    results.iter().fold(RunSummary::default(), |mut summary, result| {
        match result.outcome {
            Outcome::Succeeded => summary.succeeded += 1,
            Outcome::Skipped => summary.skipped += 1,
            Outcome::Failed => summary.failed += 1,
        }
        summary.details.push(result.clone());
        summary
    })
}

/// The audit trail of one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub repository: RepositoryRef,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Every result in the order the operations were declared
    pub results: Vec<OperationResult>,
    pub secrets_phase: SecretsPhase,
}

impl RunReport {
    /// Results of one kind, in recorded order.
    pub fn results_of(&self, kind: OperationKind) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(move |r| r.kind == kind)
    }

    /// Summary over every result of the run.
    pub fn summary(&self) -> RunSummary {
        summarize(&self.results)
    }

    /// Summary over the results of one kind.
    pub fn summary_of(&self, kind: OperationKind) -> RunSummary {
        let results: Vec<OperationResult> = self.results_of(kind).cloned().collect();
        summarize(&results)
    }

    /// A run succeeds when at least one branch was protected.
    ///
    /// Settings and secrets failures never fail a run.
    pub fn is_success(&self) -> bool {
        self.results_of(OperationKind::BranchProtection)
            .any(OperationResult::is_success)
    }
}
