use anyhow::{Result, anyhow};
use colored::Colorize;
use provision::{PermissionEntry, Policy, PolicyContext, TargetType};

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, name: Option<&str>) -> Result<()> {
    let manifest = ctx.config.load_manifest()?;
    let policy_ctx = PolicyContext {
        admin: manifest.admin(),
        group: manifest.default_group(),
        target: TargetType::Space,
    };

    let policies = match name {
        Some(name) => vec![name.parse::<Policy>().map_err(|e| {
            let known: Vec<_> = Policy::ALL.iter().map(|p| p.as_str()).collect();
            anyhow!("{e}; known policies: {}", known.join(", "))
        })?],
        None => Policy::ALL.to_vec(),
    };

    ui::header("Permission Policies");
    ui::kv("Admin", policy_ctx.admin.unwrap_or("(none)"));
    ui::kv("Group", policy_ctx.group.unwrap_or("(none)"));

    for policy in policies {
        ui::section(policy.as_str());
        ui::dim(policy.description());
        match policy.resolve(&policy_ctx) {
            Ok(entries) => {
                for line in entry_lines(&entries) {
                    println!("    {line}");
                }
            }
            Err(err) => println!("    {} {}", "✗".red(), err),
        }
    }
    Ok(())
}

fn entry_lines(entries: &[PermissionEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| {
            format!(
                "{:<6} {:<16} {}",
                e.subject_type.as_str(),
                e.subject_id,
                e.operation.as_str()
            )
        })
        .collect()
}
