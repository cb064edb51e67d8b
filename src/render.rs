//! Terminal and JSON rendering of run reports.

use anyhow::Result;
use colored::Colorize;
use provision::{
    MembershipOutcome, NaturalKey, OutcomeCounts, OutcomeStatus, ProvisionError,
    ProvisioningOutcome, ResourceKind, RunReport, Stage,
};
use serde::Serialize;

use crate::ui;

/// Colored marker for an outcome status
pub fn status_symbol(status: OutcomeStatus) -> String {
    match status {
        OutcomeStatus::Created => "✓".green().to_string(),
        OutcomeStatus::AlreadyExists => "•".blue().to_string(),
        OutcomeStatus::CreatedButPolicyFailed => "⚠".yellow().to_string(),
        OutcomeStatus::Failed => "✗".red().to_string(),
    }
}

/// One line describing a finished item
pub fn outcome_line(outcome: &ProvisioningOutcome) -> String {
    let mut line = format!(
        "  {} {} {} {}",
        status_symbol(outcome.status),
        outcome.kind.as_str().dimmed(),
        outcome.key,
        format!("({})", outcome.status).dimmed()
    );
    if let Some(policy) = &outcome.policy
        && outcome.status == OutcomeStatus::Created
    {
        line.push_str(&format!(" {}", format!("[{policy}]").cyan()));
    }
    if let Some(error) = &outcome.error {
        line.push_str(&format!("\n      {}", error.message.dimmed()));
    }
    line
}

/// One line describing a membership attempt
pub fn membership_line(outcome: &MembershipOutcome) -> String {
    match &outcome.error {
        None => format!(
            "    {} {} → {}",
            "+".green(),
            outcome.user,
            outcome.group
        ),
        Some(error) => format!(
            "    {} {} → {} {}",
            "✗".red(),
            outcome.user,
            outcome.group,
            format!("({})", error.message).dimmed()
        ),
    }
}

/// Compact counts for a stage or a run
pub fn counts_line(counts: &OutcomeCounts) -> String {
    let mut parts = vec![
        format!("{} created", counts.created),
        format!("{} already existed", counts.already_exists),
    ];
    if counts.created_but_policy_failed > 0 {
        parts.push(format!(
            "{} created without policy",
            counts.created_but_policy_failed
        ));
    }
    parts.push(format!("{} failed", counts.failed));
    parts.join(", ")
}

/// Print the end-of-run summary
pub fn print_summary(report: &RunReport) {
    ui::header("Summary");

    for stage in &report.stages {
        let label = format!("{:<8}", stage.stage.label());
        println!("  {} {}", label.bold(), counts_line(&stage.counts));
        if stage.stage == Stage::Groups && !stage.memberships.is_empty() {
            let failed = stage.memberships.len() - stage.members_added();
            println!(
                "  {:<8} {} added, {} failed",
                "Members".bold(),
                stage.members_added(),
                failed
            );
        }
    }

    let problems: Vec<_> = report
        .outcomes()
        .filter(|o| o.status.is_problem())
        .collect();
    if !problems.is_empty() {
        ui::section("Needs attention");
        for outcome in problems {
            println!("{}", outcome_line(outcome));
        }
    }

    let totals = report.totals();
    println!();
    if report.is_success() {
        ui::success(&format!(
            "Site provisioned: {}",
            counts_line(&totals)
        ));
    } else {
        ui::warn(&format!(
            "Site partially provisioned: {}",
            counts_line(&totals)
        ));
    }
}

#[derive(Serialize)]
struct Abort<'a> {
    stage: Stage,
    kind: ResourceKind,
    key: &'a NaturalKey,
    message: &'a str,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    aborted: Option<Abort<'a>>,
    totals: OutcomeCounts,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Render a report (or the partial report of an aborted run) as JSON
pub fn to_json(report: &RunReport, error: Option<&ProvisionError>) -> Result<String> {
    let aborted = error.map(|err| match err {
        ProvisionError::Aborted {
            stage,
            kind,
            key,
            message,
            ..
        } => Abort {
            stage: *stage,
            kind: *kind,
            key,
            message,
        },
    });
    let json = JsonReport {
        success: aborted.is_none() && report.is_success(),
        aborted,
        totals: report.totals(),
        report,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}
