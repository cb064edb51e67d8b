use anyhow::{Result, bail};
use colored::Colorize;
use provision::{Manifest, ManifestIssue, ResourceSpec, Severity, Stage};

use crate::Context;
use crate::cli::ManifestCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: &ManifestCommand) -> Result<()> {
    let manifest = ctx.config.load_manifest()?;
    match cmd {
        ManifestCommand::Show => {
            show(ctx, &manifest);
            Ok(())
        }
        ManifestCommand::Validate => validate(ctx, &manifest),
    }
}

fn show(ctx: &Context, manifest: &Manifest) {
    ui::header("Site Manifest");
    ui::kv("Source", &ctx.config.manifest.describe());
    ui::kv("Resources", &manifest.len().to_string());

    for stage in Stage::ORDER {
        let specs = manifest.specs(stage);
        if specs.is_empty() {
            continue;
        }
        ui::section(&format!("{} ({})", stage.label(), specs.len()));
        for spec in &specs {
            println!("  {}", spec_line(spec));
        }
    }
}

fn spec_line(spec: &ResourceSpec) -> String {
    let mut line = format!("{} {}", spec.kind.as_str().dimmed(), spec.key);
    let attributes = &spec.attributes;
    if attributes.is_admin {
        line.push_str(&format!(" {}", "admin".yellow()));
    }
    if let Some(email) = &attributes.email {
        line.push_str(&format!(" <{email}>"));
    }
    if let Some(members) = &attributes.members {
        line.push_str(&format!(" members: {}", members.join(", ")));
    }
    if let Some(parent) = &attributes.parent {
        line.push_str(&format!(" under '{parent}'"));
    }
    if let Some(policy) = &spec.policy {
        line.push_str(&format!(" {}", format!("[{policy}]").cyan()));
    }
    line
}

fn validate(ctx: &Context, manifest: &Manifest) -> Result<()> {
    let issues = manifest.validate();
    let errors = issues.iter().filter(|i| i.is_error()).count();
    let warnings = issues.len() - errors;

    ui::header("Manifest Validation");
    ui::kv("Source", &ctx.config.manifest.describe());
    println!();

    for issue in &issues {
        print_issue(issue);
    }

    if errors > 0 {
        bail!(
            "Manifest is invalid: {}, {}",
            ui::plural(errors, "error", "errors"),
            ui::plural(warnings, "warning", "warnings")
        );
    }
    if warnings > 0 {
        ui::warn(&format!(
            "Manifest is valid with {}",
            ui::plural(warnings, "warning", "warnings")
        ));
    } else {
        ui::success(&format!(
            "Manifest is valid ({})",
            ui::plural(manifest.len(), "resource", "resources")
        ));
    }
    Ok(())
}

fn print_issue(issue: &ManifestIssue) {
    match issue.severity {
        Severity::Error => println!("  {} {}", "✗".red(), issue),
        Severity::Warning => println!("  {} {}", "⚠".yellow(), issue),
    }
}
