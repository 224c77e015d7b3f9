//! Tests for the provisioning workflow against an in-memory remote.

use super::*;
use crate::encryption::{UnavailableSealer, PLACEHOLDER_PREFIX};
use crate::outcome::{OperationKind, Outcome};
use crate::plan::{BranchPolicy, RepoSettings, SecretSpec};
use crate::test_support::MockProvisioningClient;
use std::time::Duration;
use tracing_test::traced_test;

/// Passes the plaintext through so the remote value can be checked.
struct PassthroughSealer;

impl SecretSealer for PassthroughSealer {
    fn seal(&self, _public_key_base64: &str, plaintext: &[u8]) -> Result<String, Error> {
        Ok(String::from_utf8_lossy(plaintext).into_owned())
    }
}

fn repo() -> RepositoryRef {
    RepositoryRef::from_parts("octo", "tool").unwrap()
}

fn default_branches_plan() -> ProvisioningPlan {
    ProvisioningPlan::new(
        vec![
            BranchPolicy::new("main"),
            BranchPolicy::new("develop"),
            BranchPolicy::new("staging"),
        ],
        Some(RepoSettings::recommended()),
        vec![],
    )
}

fn provisioner(
    mock: &Arc<MockProvisioningClient>,
    plan: ProvisioningPlan,
    options: ProvisionOptions,
) -> Provisioner {
    Provisioner::new(mock.clone(), plan, options)
        .unwrap()
        .with_sealer(Arc::new(PassthroughSealer))
}

fn with_secrets() -> ProvisionOptions {
    ProvisionOptions {
        provision_secrets: true,
        ..Default::default()
    }
}

#[test]
fn test_new_rejects_invalid_plan() {
    let mock = Arc::new(MockProvisioningClient::new());
    let plan = ProvisioningPlan::new(vec![BranchPolicy::new("")], None, vec![]);

    let result = Provisioner::new(mock, plan, ProvisionOptions::default());

    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn test_new_rejects_zero_concurrency() {
    let mock = Arc::new(MockProvisioningClient::new());
    let options = ProvisionOptions {
        max_concurrency: 0,
        ..Default::default()
    };

    let result = Provisioner::new(mock, ProvisioningPlan::default(), options);

    match result {
        Err(Error::Validation(e)) => assert_eq!(e.field, "max_concurrency"),
        _ => panic!("Expected a validation error"),
    }
}

#[tokio::test]
async fn test_inaccessible_repository_aborts_before_any_phase() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main"])
            .with_repository_status(401),
    );

    let result = provisioner(&mock, default_branches_plan(), with_secrets())
        .run(&repo())
        .await;

    match result {
        Err(Error::AccessDenied { repository, reason }) => {
            assert_eq!(repository, "octo/tool");
            assert!(reason.contains("401"));
        }
        other => panic!("Expected AccessDenied, got {other:?}"),
    }
    assert_eq!(mock.calls(), vec!["GET repo octo/tool"]);
}

#[tokio::test]
#[traced_test]
async fn test_access_check_logs_remote_full_name() {
    let mock = Arc::new(MockProvisioningClient::new().with_branches(&["main"]));

    provisioner(&mock, default_branches_plan(), ProvisionOptions::default())
        .run(&repo())
        .await
        .unwrap();

    assert!(logs_contain("Repository is accessible"));
    assert!(logs_contain("octo/tool"));
}

#[tokio::test]
async fn test_skipped_count_equals_absent_branches() {
    let mock = Arc::new(MockProvisioningClient::new().with_branches(&["main"]));

    let report = provisioner(&mock, default_branches_plan(), ProvisionOptions::default())
        .run(&repo())
        .await
        .unwrap();

    let branches = report.summary_of(OperationKind::BranchProtection);
    assert_eq!(branches.skipped, 2);
    assert_eq!(branches.succeeded, 1);
    assert_eq!(mock.count_calls("PUT protection"), 1);
}

#[tokio::test]
async fn test_run_succeeds_when_only_main_exists() {
    let mock = Arc::new(MockProvisioningClient::new().with_branches(&["main"]));

    let report = provisioner(&mock, default_branches_plan(), ProvisionOptions::default())
        .run(&repo())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.secrets_phase, SecretsPhase::NotRequested);
}

#[tokio::test]
async fn test_run_fails_when_no_branch_exists() {
    let mock = Arc::new(MockProvisioningClient::new());

    let report = provisioner(&mock, default_branches_plan(), ProvisionOptions::default())
        .run(&repo())
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.summary_of(OperationKind::BranchProtection).skipped, 3);
    // Settings are still attempted.
    assert_eq!(report.summary_of(OperationKind::RepoSettings).succeeded, 1);
}

#[tokio::test]
async fn test_run_fails_when_every_protection_is_rejected() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main"])
            .with_protection_status("main", 403),
    );
    let plan = ProvisioningPlan::new(vec![BranchPolicy::new("main")], None, vec![]);

    let report = provisioner(&mock, plan, ProvisionOptions::default())
        .run(&repo())
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.results[0].outcome, Outcome::Failed);
}

#[tokio::test]
async fn test_failure_does_not_alter_earlier_results() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main", "develop"])
            .with_protection_status("develop", 500),
    );

    let report = provisioner(&mock, default_branches_plan(), ProvisionOptions::default())
        .run(&repo())
        .await
        .unwrap();

    let outcomes: Vec<(&str, Outcome)> = report
        .results_of(OperationKind::BranchProtection)
        .map(|r| (r.target.as_str(), r.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("main", Outcome::Succeeded),
            ("develop", Outcome::Failed),
            ("staging", Outcome::Skipped),
        ]
    );
    assert!(mock.protections.lock().unwrap().contains_key("main"));
}

#[tokio::test]
async fn test_phases_run_in_order() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main"])
            .with_public_key("kid", "KEY"),
    );
    let plan = ProvisioningPlan::new(
        vec![BranchPolicy::new("main")],
        Some(RepoSettings::recommended()),
        vec![SecretSpec::new("API_KEY", "value")],
    );

    provisioner(&mock, plan, with_secrets())
        .run(&repo())
        .await
        .unwrap();

    assert_eq!(
        mock.calls(),
        vec![
            "GET repo octo/tool",
            "GET branch main",
            "PUT protection main",
            "PATCH settings",
            "GET public-key",
            "PUT secret API_KEY",
        ]
    );
}

#[tokio::test]
async fn test_settings_can_be_disabled() {
    let mock = Arc::new(MockProvisioningClient::new().with_branches(&["main"]));
    let options = ProvisionOptions {
        apply_settings: false,
        ..Default::default()
    };

    let report = provisioner(&mock, default_branches_plan(), options)
        .run(&repo())
        .await
        .unwrap();

    assert_eq!(mock.count_calls("PATCH"), 0);
    assert_eq!(report.results_of(OperationKind::RepoSettings).count(), 0);
}

#[tokio::test]
async fn test_plan_without_settings_records_no_settings_result() {
    let mock = Arc::new(MockProvisioningClient::new().with_branches(&["main"]));
    let plan = ProvisioningPlan::new(vec![BranchPolicy::new("main")], None, vec![]);

    let report = provisioner(&mock, plan, ProvisionOptions::default())
        .run(&repo())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(mock.count_calls("PATCH"), 0);
}

#[tokio::test]
async fn test_settings_failure_is_a_warning_only() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main"])
            .with_settings_status(403),
    );

    let report = provisioner(&mock, default_branches_plan(), ProvisionOptions::default())
        .run(&repo())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.summary_of(OperationKind::RepoSettings).failed, 1);
}

#[tokio::test]
async fn test_key_fetch_failure_leaves_branch_results_unaffected() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main"])
            .with_public_key_status(404),
    );
    let plan = ProvisioningPlan::new(
        vec![BranchPolicy::new("main")],
        None,
        vec![SecretSpec::new("A", "1"), SecretSpec::new("B", "2")],
    );

    let report = provisioner(&mock, plan, with_secrets())
        .run(&repo())
        .await
        .unwrap();

    assert!(report.is_success());
    assert!(matches!(report.secrets_phase, SecretsPhase::Aborted(_)));
    assert_eq!(report.results_of(OperationKind::SecretUpsert).count(), 0);
    assert_eq!(mock.count_calls("PUT secret"), 0);
    assert_eq!(report.results[0].outcome, Outcome::Succeeded);
}

#[tokio::test]
async fn test_duplicate_secret_names_end_as_one_remote_entry() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main"])
            .with_public_key("kid", "KEY"),
    );
    let plan = ProvisioningPlan::new(
        vec![BranchPolicy::new("main")],
        None,
        vec![
            SecretSpec::new("API_KEY", "first"),
            SecretSpec::new("API_KEY", "second"),
        ],
    );

    provisioner(&mock, plan, with_secrets())
        .run(&repo())
        .await
        .unwrap();

    let secrets = mock.secrets.lock().unwrap();
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets["API_KEY"].encrypted_value, "second");
}

#[tokio::test]
async fn test_duplicate_secrets_in_plan_literal_keep_last_value_under_concurrency() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main"])
            .with_public_key("kid", "KEY")
            .with_first_secret_delay(Duration::from_millis(50)),
    );
    let plan = ProvisioningPlan {
        branches: vec![BranchPolicy::new("main")],
        settings: None,
        secrets: vec![
            SecretSpec::new("TOKEN", "first"),
            SecretSpec::new("token", "second"),
        ],
    };
    let options = ProvisionOptions {
        max_concurrency: 2,
        ..with_secrets()
    };

    let report = provisioner(&mock, plan, options).run(&repo()).await.unwrap();

    assert_eq!(report.results_of(OperationKind::SecretUpsert).count(), 1);
    assert_eq!(mock.count_calls("PUT secret"), 1);
    let secrets = mock.secrets.lock().unwrap();
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets["TOKEN"].encrypted_value, "second");
}

#[tokio::test]
async fn test_secrets_not_requested_makes_no_secret_calls() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main"])
            .with_public_key("kid", "KEY"),
    );

    let report = provisioner(&mock, ProvisioningPlan::default(), ProvisionOptions::default())
        .run(&repo())
        .await
        .unwrap();

    assert_eq!(report.secrets_phase, SecretsPhase::NotRequested);
    assert_eq!(mock.count_calls("GET public-key"), 0);
}

#[tokio::test]
async fn test_placeholder_fallback_counts_as_success_with_flag() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main"])
            .with_public_key("kid", "KEY"),
    );
    let plan = ProvisioningPlan::new(
        vec![BranchPolicy::new("main")],
        None,
        vec![SecretSpec::new("API_KEY", "value")],
    );
    let options = ProvisionOptions {
        provision_secrets: true,
        allow_placeholder_secrets: true,
        ..Default::default()
    };

    let report = Provisioner::new(mock.clone(), plan, options)
        .unwrap()
        .with_sealer(Arc::new(UnavailableSealer))
        .run(&repo())
        .await
        .unwrap();

    let secret = report
        .results_of(OperationKind::SecretUpsert)
        .next()
        .unwrap();
    assert_eq!(secret.outcome, Outcome::Succeeded);
    assert!(mock.secrets.lock().unwrap()["API_KEY"]
        .encrypted_value
        .starts_with(PLACEHOLDER_PREFIX));
}

#[tokio::test]
async fn test_concurrent_branches_keep_declaration_order() {
    let mock = Arc::new(
        MockProvisioningClient::new()
            .with_branches(&["main", "develop", "staging"])
            .with_branch_delay("main", Duration::from_millis(60))
            .with_branch_delay("develop", Duration::from_millis(30)),
    );
    let options = ProvisionOptions {
        max_concurrency: 3,
        ..Default::default()
    };

    let report = provisioner(&mock, default_branches_plan(), options)
        .run(&repo())
        .await
        .unwrap();

    let targets: Vec<&str> = report
        .results_of(OperationKind::BranchProtection)
        .map(|r| r.target.as_str())
        .collect();
    assert_eq!(targets, vec!["main", "develop", "staging"]);
    assert!(report
        .results_of(OperationKind::BranchProtection)
        .all(|r| r.outcome == Outcome::Succeeded));

    // The slowest branch was not the first to finish.
    let calls = mock.calls();
    let first_put = calls
        .iter()
        .find(|c| c.starts_with("PUT protection"))
        .unwrap();
    assert_eq!(first_put, "PUT protection staging");
}

#[tokio::test]
async fn test_report_timestamps_are_ordered() {
    let mock = Arc::new(MockProvisioningClient::new().with_branches(&["main"]));

    let report = provisioner(&mock, default_branches_plan(), ProvisionOptions::default())
        .run(&repo())
        .await
        .unwrap();

    assert!(report.started_at <= report.finished_at);
    assert_eq!(report.repository, repo());
}
