use anyhow::{Result, bail};
use colored::Colorize;
use dialoguer::Confirm;
use provision::{ManifestIssue, Orchestrator, ProvisionError, RunOptions, UserEntry};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::commands;
use crate::progress::StageProgress;
use crate::render;
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let manifest = ctx.config.load_manifest()?;
    let errors: Vec<_> = manifest
        .validate()
        .into_iter()
        .filter(ManifestIssue::is_error)
        .collect();
    if !errors.is_empty() {
        for issue in &errors {
            ui::error(&issue.to_string());
        }
        bail!(
            "Manifest has {}; run 'siteseed manifest validate'",
            ui::plural(errors.len(), "error", "errors")
        );
    }

    let (client, site) = commands::client(&ctx.config, args.mock)?;
    let options = run_options(ctx, args);
    let interactive = !args.json && !ctx.quiet;

    if interactive {
        ui::header("Provisioning");
        ui::kv("Site", &site);
        ui::kv("Manifest", &ctx.config.manifest.describe());
        ui::kv("Resources", &manifest.len().to_string());
        ui::kv("Delay", &format!("{} ms", options.delay.as_millis()));
    }

    if !client.supports_user_creation() && !manifest.users.is_empty() {
        if interactive {
            print_user_checklist(&manifest.users);
        }
        if !confirm(args.yes, "Have these accounts been created?")? {
            ui::info("Nothing provisioned");
            return Ok(());
        }
    }

    if !args.mock
        && !confirm(
            args.yes,
            &format!(
                "Provision {} on {site}?",
                ui::plural(manifest.len(), "resource", "resources")
            ),
        )?
    {
        ui::info("Nothing provisioned");
        return Ok(());
    }

    let mut progress = if interactive {
        StageProgress::new()
    } else {
        StageProgress::hidden()
    };
    let result = Orchestrator::new(client.as_ref(), options).run(&manifest, &mut progress);
    drop(progress);

    match result {
        Ok(report) => {
            if args.json {
                println!("{}", render::to_json(&report, None)?);
            } else if !ctx.quiet {
                render::print_summary(&report);
            }
            if !report.is_success() {
                let failed = report.failed_keys().len();
                let policy_failed = report.totals().created_but_policy_failed;
                bail!(
                    "{} failed, {} created without their policy",
                    ui::plural(failed, "item", "items"),
                    policy_failed
                );
            }
            Ok(())
        }
        Err(err) => {
            let partial = err.partial_report();
            if args.json {
                println!("{}", render::to_json(partial, Some(&err))?);
            } else if !ctx.quiet {
                render::print_summary(partial);
            }
            Err(abort_error(err))
        }
    }
}

fn run_options(ctx: &Context, args: &ApplyArgs) -> RunOptions {
    match args.delay_ms {
        Some(ms) => RunOptions::default().with_delay(std::time::Duration::from_millis(ms)),
        // The in-memory site has no rate limit
        None if args.mock => RunOptions::immediate(),
        None => RunOptions::default().with_delay(ctx.config.delay),
    }
}

fn abort_error(err: ProvisionError) -> anyhow::Error {
    let advice = "Check the site URL, the account email and the API token, then run apply again";
    anyhow::anyhow!("{err}\n  {advice}")
}

fn confirm(yes: bool, prompt: &str) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !console::Term::stderr().is_term() {
        bail!("Confirmation required; pass --yes to run non-interactively");
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Accounts the operator must create by hand before the users stage
fn print_user_checklist(users: &[UserEntry]) {
    ui::section("Create these accounts in the Atlassian admin console");
    ui::dim("Confluence Cloud does not allow creating users through the API");
    println!();
    for user in users {
        let role = if user.admin {
            "admin".yellow().to_string()
        } else {
            "standard".dimmed().to_string()
        };
        println!(
            "  {} {} {:<22} {:<22} {}",
            "☐".dimmed(),
            format!("{:<12}", user.username).bold(),
            user.email.as_deref().unwrap_or("-"),
            user.display_name.as_deref().unwrap_or("-"),
            role
        );
    }
    println!();
}
