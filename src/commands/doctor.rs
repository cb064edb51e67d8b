use anyhow::Result;
use colored::Colorize;
use confluence::{ConfluenceClient, ENV_API_TOKEN, ENV_EMAIL, ENV_URL};

use crate::Context;
use crate::config::{Config, ManifestSource, Settings};
use crate::paths;
use crate::ui;

struct Issue {
    category: &'static str,
    summary: String,
    detail: Option<String>,
    fix: Option<String>,
    fix_cmd: Option<String>,
}

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("Site Health Check");

    let mut issues: Vec<Issue> = Vec::new();

    // Check 1: Settings file and credentials
    check_settings(&ctx.config, &mut issues);
    let connection_ready = check_credentials(&ctx.config, &mut issues);

    // Check 2: Manifest
    check_manifest(&ctx.config, ctx.verbose > 0, &mut issues);

    // Check 3: Connectivity
    if connection_ready {
        check_connectivity(&ctx.config, &mut issues);
    }

    println!();
    if issues.is_empty() {
        ui::success("Ready to provision!");
    } else {
        print_issue_summary(&issues);
    }

    Ok(())
}

fn print_issue_summary(issues: &[Issue]) {
    let count = issues.len();
    let label = if count == 1 { "Issue" } else { "Issues" };
    ui::header(&format!("{count} {label} Found"));

    for (i, issue) in issues.iter().enumerate() {
        let num = i + 1;
        println!(
            "  {}  {} {}",
            format!("{num}.").bold(),
            issue.summary,
            format!("[{}]", issue.category).dimmed()
        );
        if let Some(detail) = &issue.detail {
            for line in detail.lines() {
                println!("      {}", line.dimmed());
            }
        }
        if let Some(fix) = &issue.fix {
            println!("      {} {}", "Fix:".cyan(), fix);
        }
        if let Some(cmd) = &issue.fix_cmd {
            println!("      {} {}", "$".dimmed(), cmd.bold());
        }
        println!();
    }
}

fn check_settings(config: &Config, issues: &mut Vec<Issue>) {
    ui::section("Settings");

    let path = match &config.settings_path {
        Some(path) => path.clone(),
        None => match paths::settings_file() {
            Ok(path) => path,
            Err(e) => {
                println!("  {} config directory {}", "✗".red(), "(unknown)".red());
                issues.push(Issue {
                    category: "Settings",
                    summary: "Could not determine config directory".into(),
                    detail: Some(format!("{e}")),
                    fix: Some(format!("Ensure $HOME is set or set {}", paths::ENV_CONFIG_DIR)),
                    fix_cmd: None,
                });
                return;
            }
        },
    };

    if !path.exists() {
        println!(
            "  {} {} {}",
            "○".dimmed(),
            path.display(),
            "(not present, using defaults)".dimmed()
        );
        return;
    }

    match Settings::load_from(&path) {
        Ok(_) => println!("  {} {}", "✓".green(), path.display()),
        Err(e) => {
            let root_cause = format!("{:#}", e.root_cause());
            println!(
                "  {} {} {}",
                "⚠".yellow(),
                path.display(),
                format!("(parse error: {root_cause})").yellow()
            );
            issues.push(Issue {
                category: "Settings",
                summary: "config.toml has invalid format".into(),
                detail: Some(format!("{e:#}")),
                fix: Some(format!("Edit {} and fix the issue", path.display())),
                fix_cmd: Some(format!("$EDITOR {}", path.display())),
            });
        }
    }
}

/// Returns whether every connection setting is present
fn check_credentials(config: &Config, issues: &mut Vec<Issue>) -> bool {
    ui::section("Connection");

    let settings = [
        ("Site URL", ENV_URL, config.url.as_deref(), "--url", false),
        ("Email", ENV_EMAIL, config.email.as_deref(), "--email", false),
        ("API token", ENV_API_TOKEN, config.token.as_deref(), "--token", true),
    ];

    let mut ready = true;
    for (label, var, value, flag, secret) in settings {
        match value {
            Some(value) => {
                let shown = if secret { "********" } else { value };
                println!("  {} {} - {}", "✓".green(), label, shown.dimmed());
            }
            None => {
                ready = false;
                println!("  {} {} {}", "✗".red(), label, "(missing)".red());
                issues.push(Issue {
                    category: "Connection",
                    summary: format!("{label} is not set"),
                    detail: None,
                    fix: Some(format!("Export {var} or pass {flag}")),
                    fix_cmd: Some(format!("export {var}=...")),
                });
            }
        }
    }

    if ready && let Err(e) = config.client_config() {
        ready = false;
        issues.push(Issue {
            category: "Connection",
            summary: e.to_string(),
            detail: None,
            fix: Some(e.advice().to_string()),
            fix_cmd: None,
        });
    }
    ready
}

fn check_manifest(config: &Config, verbose: bool, issues: &mut Vec<Issue>) {
    ui::section("Manifest");

    let manifest = match config.load_manifest() {
        Ok(manifest) => manifest,
        Err(e) => {
            println!("  {} {}", "✗".red(), config.manifest.describe());
            let fix_cmd = match &config.manifest {
                ManifestSource::File(path) => Some(format!("$EDITOR {}", path.display())),
                ManifestSource::BuiltIn => None,
            };
            issues.push(Issue {
                category: "Manifest",
                summary: "Manifest could not be loaded".into(),
                detail: Some(format!("{e:#}")),
                fix: Some("Fix the manifest or pass --manifest".into()),
                fix_cmd,
            });
            return;
        }
    };

    let problems = manifest.validate();
    let errors: Vec<_> = problems.iter().filter(|i| i.is_error()).collect();
    let warnings = problems.len() - errors.len();
    if errors.is_empty() {
        println!(
            "  {} {} - {}",
            "✓".green(),
            config.manifest.describe(),
            ui::plural(manifest.len(), "resource", "resources").dimmed()
        );
    } else {
        println!("  {} {}", "✗".red(), config.manifest.describe());
        issues.push(Issue {
            category: "Manifest",
            summary: format!("Manifest has {}", ui::plural(errors.len(), "error", "errors")),
            detail: Some(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            fix: Some("Fix the listed entries".into()),
            fix_cmd: Some("siteseed manifest validate".into()),
        });
    }
    if warnings > 0 && verbose {
        for warning in problems.iter().filter(|i| !i.is_error()) {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    } else if warnings > 0 {
        ui::dim(&format!(
            "{} (see 'siteseed manifest validate')",
            ui::plural(warnings, "warning", "warnings")
        ));
    }
}

fn check_connectivity(config: &Config, issues: &mut Vec<Issue>) {
    ui::section("Connectivity");

    let client = match config.client_config() {
        Ok(client_config) => ConfluenceClient::new(client_config),
        Err(_) => return,
    };

    if let Err(e) = client.probe() {
        println!("  {} {} {}", "✗".red(), client.config().base_url, "(unreachable)".red());
        issues.push(Issue {
            category: "Connectivity",
            summary: format!("Site did not accept the request: {e}"),
            detail: e.status().map(|s| format!("HTTP status {s}")),
            fix: Some(e.advice().to_string()),
            fix_cmd: None,
        });
        return;
    }
    println!("  {} {}", "✓".green(), client.config().base_url);

    match client.current_user() {
        Ok(user) => {
            let name = user
                .display_name
                .or(user.email)
                .or(user.account_id)
                .unwrap_or_else(|| "unknown account".to_string());
            println!("  {} authenticated as {}", "✓".green(), name.bold());
        }
        Err(e) => {
            println!("  {} current user {}", "⚠".yellow(), "(unavailable)".yellow());
            log::debug!("user/current failed: {e}");
        }
    }
    ui::info("Confluence Cloud users cannot be created through the API; apply verifies them");
}
