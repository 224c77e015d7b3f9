//! Human readable rendering of a provisioning run.

use colored::Colorize;
use repo_guard_core::{OperationKind, OperationResult, Outcome, RunReport, SecretsPhase};

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

/// At least one branch was protected
pub const EXIT_SUCCESS: i32 = 0;

/// The run completed but no branch was protected
pub const EXIT_NO_BRANCH_PROTECTED: i32 = 1;

/// The run could not start or was aborted
pub const EXIT_FATAL: i32 = 2;

/// Maps a completed run to the process exit code.
pub fn exit_code(report: &RunReport) -> i32 {
    if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_NO_BRANCH_PROTECTED
    }
}

fn format_result(result: &OperationResult) -> String {
    let marker = match result.outcome {
        Outcome::Succeeded => "✓".green(),
        Outcome::Skipped => "-".yellow(),
        Outcome::Failed => "✗".red(),
    };
    format!(
        "  {} {} {}: {}\n",
        marker,
        result.kind,
        result.target.bold(),
        result.detail
    )
}

fn has_success(report: &RunReport, kind: OperationKind) -> bool {
    report.results_of(kind).any(OperationResult::is_success)
}

fn manual_fallback(report: &RunReport, section: &str) -> String {
    match report.repository.settings_url(section) {
        Ok(url) => format!(
            "  {} configure manually at {}\n",
            "→".cyan(),
            url.as_str().underline()
        ),
        Err(_) => String::new(),
    }
}

/// Renders the report shown at the end of `repo-guard apply`.
///
/// Lists every result in order, a tally per phase and, for every phase that did not succeed,
/// the settings page where it can be configured by hand.
pub fn format_report(report: &RunReport) -> String {
    let mut output = format!(
        "\n{} {}\n\n",
        "Provisioning report for".bold(),
        report.repository.to_string().bold().bright_cyan()
    );

    for result in &report.results {
        output.push_str(&format_result(result));
    }

    let branches = report.summary_of(OperationKind::BranchProtection);
    output.push_str(&format!(
        "\n{}: {} succeeded, {} skipped, {} failed\n",
        "Branches".bold(),
        branches.succeeded,
        branches.skipped,
        branches.failed
    ));
    if !has_success(report, OperationKind::BranchProtection) {
        output.push_str(&manual_fallback(report, "branches"));
    }

    let settings = report.summary_of(OperationKind::RepoSettings);
    if settings.total() > 0 {
        let state = if settings.succeeded > 0 {
            "applied".green()
        } else if settings.failed > 0 {
            "failed".red()
        } else {
            "skipped".yellow()
        };
        output.push_str(&format!("{}: {}\n", "Settings".bold(), state));
        if settings.succeeded == 0 {
            output.push_str(&manual_fallback(report, ""));
        }
    }

    let secrets = report.summary_of(OperationKind::SecretUpsert);
    match &report.secrets_phase {
        SecretsPhase::NotRequested => {
            output.push_str(&format!("{}: {}\n", "Secrets".bold(), "not requested".dimmed()));
        }
        SecretsPhase::Completed => {
            output.push_str(&format!(
                "{}: {} succeeded, {} failed\n",
                "Secrets".bold(),
                secrets.succeeded,
                secrets.failed
            ));
            if secrets.failed > 0 {
                output.push_str(&manual_fallback(report, "secrets/actions"));
            }
        }
        SecretsPhase::Aborted(reason) => {
            output.push_str(&format!(
                "{}: {} ({})\n",
                "Secrets".bold(),
                "aborted".red(),
                reason
            ));
            output.push_str(&manual_fallback(report, "secrets/actions"));
        }
    }

    let verdict = if report.is_success() {
        "✓ At least one branch is protected".green().bold()
    } else {
        "✗ No branch was protected".red().bold()
    };
    output.push_str(&format!("\n{}\n", verdict));

    output
}
