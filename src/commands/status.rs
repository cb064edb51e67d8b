use anyhow::{Result, bail};
use colored::Colorize;
use provision::{ErrorKind, NaturalKey, ResourceClient, ResourceKind, ResourceSpec, Stage};
use serde::Serialize;

use crate::Context;
use crate::cli::StatusArgs;
use crate::commands;
use crate::ui;

/// Remote state of one manifest resource
#[derive(Debug, Serialize)]
struct ResourceStatus {
    kind: ResourceKind,
    key: NaturalKey,
    present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(ctx: &Context, args: &StatusArgs) -> Result<()> {
    let manifest = ctx.config.load_manifest()?;
    let (client, site) = commands::client(&ctx.config, args.mock)?;

    let statuses = check(client.as_ref(), &manifest.resource_specs())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    ui::header(&format!("Site Status: {site}"));
    for stage in Stage::ORDER {
        let rows: Vec<_> = statuses
            .iter()
            .filter(|s| s.kind.stage() == stage)
            .collect();
        if rows.is_empty() {
            continue;
        }
        ui::section(stage.label());
        for status in rows {
            print_row(status);
        }
    }

    let present = statuses.iter().filter(|s| s.present).count();
    println!();
    if present == statuses.len() {
        ui::success(&format!("All {} resources exist", statuses.len()));
    } else {
        ui::info(&format!(
            "{present} of {} resources exist; run 'siteseed apply' to create the rest",
            statuses.len()
        ));
    }
    Ok(())
}

/// Look up every resource; only transport failures stop the check
fn check(client: &dyn ResourceClient, specs: &[ResourceSpec]) -> Result<Vec<ResourceStatus>> {
    let mut statuses = Vec::with_capacity(specs.len());
    for spec in specs {
        let status = match client.lookup(spec.kind, &spec.key) {
            Ok(handle) => ResourceStatus {
                kind: spec.kind,
                key: spec.key.clone(),
                present: true,
                id: Some(handle.id),
                error: None,
            },
            Err(err) if err.kind == ErrorKind::FatalTransport => {
                bail!("Lookup of {} '{}' failed: {err}", spec.kind, spec.key)
            }
            Err(err) => ResourceStatus {
                kind: spec.kind,
                key: spec.key.clone(),
                present: false,
                id: None,
                error: (err.kind != ErrorKind::NotFound).then(|| err.to_string()),
            },
        };
        log::debug!("{} '{}': present={}", spec.kind, spec.key, status.present);
        statuses.push(status);
    }
    Ok(statuses)
}

fn print_row(status: &ResourceStatus) {
    let key = ui::truncate(&status.key.to_string(), 50);
    match (&status.error, status.present) {
        (_, true) => println!(
            "  {} {} {}",
            "✓".green(),
            key,
            format!("({})", status.id.as_deref().unwrap_or("-")).dimmed()
        ),
        (None, false) => println!("  {} {} {}", "○".dimmed(), key, "missing".yellow()),
        (Some(error), false) => println!("  {} {} {}", "✗".red(), key, error.dimmed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision::{ClientError, MockClient, MockOp};

    #[test]
    fn test_check_present_and_missing() {
        let client = MockClient::new()
            .with_existing_user("PepikM")
            .with_existing_space("TEAM")
            .with_existing_page("TEAM", "Team Guidelines");
        let specs = vec![
            ResourceSpec::user("PepikM", None, None, true),
            ResourceSpec::user("user1", None, None, false),
            ResourceSpec::space("TEAM", "Team Space", None),
            ResourceSpec::page("TEAM", "Team Guidelines", ""),
            ResourceSpec::blog_post("TEAM", "Team Update", ""),
        ];

        let statuses = check(&client, &specs).unwrap();
        let present: Vec<_> = statuses.iter().map(|s| s.present).collect();
        assert_eq!(present, [true, false, true, true, false]);
        assert!(statuses.iter().all(|s| s.error.is_none()));
        assert_eq!(statuses[2].id.as_deref(), Some("TEAM"));
        assert_eq!(client.calls().iter().filter(|c| c.op.is_mutation()).count(), 0);
    }

    #[test]
    fn test_check_records_lookup_errors() {
        let client = MockClient::new();
        client.fail(
            MockOp::Lookup(ResourceKind::Group),
            "standard-users",
            ClientError::permanent("HTTP 403"),
        );
        let statuses = check(&client, &[ResourceSpec::group("standard-users")]).unwrap();
        assert!(!statuses[0].present);
        assert!(statuses[0].error.as_deref().unwrap().contains("403"));
    }

    #[test]
    fn test_check_stops_on_fatal() {
        let client = MockClient::new();
        client.fail(
            MockOp::Lookup(ResourceKind::Space),
            "TEAM",
            ClientError::fatal("HTTP 401"),
        );
        let specs = [ResourceSpec::space("TEAM", "Team Space", None)];
        assert!(check(&client, &specs).is_err());
    }

    #[test]
    fn test_status_json_shape() {
        let status = ResourceStatus {
            kind: ResourceKind::Page,
            key: NaturalKey::in_space("TEAM", "Team Guidelines"),
            present: false,
            id: None,
            error: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["kind"], "page");
        assert_eq!(json["key"]["space"], "TEAM");
        assert_eq!(json["present"], false);
        assert!(json.get("id").is_none());
    }
}
