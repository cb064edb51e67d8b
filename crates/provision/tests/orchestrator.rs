//! Integration tests for the provisioning orchestrator.
//!
//! Every scenario runs a manifest against the in-memory client, with no
//! inter-call delay unless the delay itself is under test.

use provision::{
    ClientError, FailureKind, Manifest, MembershipOutcome, MockClient, MockOp,
    NaturalKey, NoProgress, Operation, Orchestrator, OutcomeStatus, ProgressCallback,
    ProvisionError, ProvisioningOutcome, ResourceKind, RunOptions, RunReport, Stage, StageReport,
    SubjectType,
};
use std::time::{Duration, Instant};

const SITE: &str = r#"
[[users]]
username = "PepikM"
email = "admin@example.com"
display_name = "Administrator User"
admin = true

[[users]]
username = "user1"
email = "user1@example.com"

[[users]]
username = "user2"
email = "user2@example.com"

[[users]]
username = "user3"
email = "user3@example.com"

[[users]]
username = "User 4"
email = "user4@example.com"

[[groups]]
name = "standard-users"

[[spaces]]
key = "PUBLIC"
name = "Public Space"
policy = "public_read"

[[pages]]
space = "PUBLIC"
title = "Welcome to Our Confluence Site"
body = "<h1>Welcome</h1>"
policy = "public_read"
"#;

const LAYERED: &str = r#"
[[users]]
username = "admin"
admin = true

[[users]]
username = "alice"

[[groups]]
name = "team"

[[spaces]]
key = "TEAM"
name = "Team Space"
policy = "group_based"

[[spaces]]
key = "SECRET"
name = "Secret Space"
policy = "restricted_access"

[[pages]]
space = "TEAM"
title = "Guidelines"
policy = "group_based"

[[pages]]
space = "TEAM"
title = "Onboarding"
parent = "Guidelines"

[[blog_posts]]
space = "TEAM"
title = "Status"
policy = "collaborative"

[[blog_posts]]
space = "SECRET"
title = "Alert"
policy = "restricted_access"
"#;

fn manifest(toml: &str) -> Manifest {
    Manifest::from_toml_str(toml).unwrap()
}

fn run(client: &MockClient, manifest: &Manifest) -> RunReport {
    Orchestrator::new(client, RunOptions::immediate())
        .run(manifest, &mut NoProgress)
        .unwrap()
}

fn outcome<'a>(
    report: &'a RunReport,
    kind: ResourceKind,
    key: &NaturalKey,
) -> &'a ProvisioningOutcome {
    report.outcome(kind, key).unwrap()
}

fn statuses(report: &RunReport) -> Vec<OutcomeStatus> {
    report.outcomes().map(|o| o.status).collect()
}

#[test]
fn test_end_to_end_clean_remote() {
    let client = MockClient::new();
    let manifest = manifest(SITE);
    let report = run(&client, &manifest);

    let users = report.stage(Stage::Users).unwrap();
    assert_eq!(users.counts.created, 5);

    let groups = report.stage(Stage::Groups).unwrap();
    assert_eq!(groups.counts.created, 1);
    assert_eq!(groups.memberships.len(), 4);
    assert_eq!(groups.members_added(), 4);

    let space = outcome(&report, ResourceKind::Space, &NaturalKey::name("PUBLIC"));
    assert_eq!(space.status, OutcomeStatus::Created);
    assert_eq!(space.permissions.len(), 1);
    assert_eq!(space.permissions[0].subject_type, SubjectType::User);
    assert_eq!(space.permissions[0].subject_id, "PepikM");
    assert_eq!(space.permissions[0].operation, Operation::Write);

    let page_key = NaturalKey::in_space("PUBLIC", "Welcome to Our Confluence Site");
    let page = outcome(&report, ResourceKind::Page, &page_key);
    assert_eq!(page.status, OutcomeStatus::Created);
    assert_eq!(page.permissions.len(), 1);
    assert_eq!(page.permissions[0].operation, Operation::Write);

    let page_id = page.handle.as_ref().unwrap().id.clone();
    assert_eq!(client.permissions_for(&page_id), page.permissions);
    assert_eq!(client.permissions_for("PUBLIC"), space.permissions);

    assert_eq!(report.totals().failed, 0);
    assert!(report.is_success());
}

#[test]
fn test_every_item_yields_one_outcome() {
    let client = MockClient::new();
    for toml in [SITE, LAYERED] {
        let manifest = manifest(toml);
        let report = run(&client, &manifest);
        assert_eq!(report.len(), manifest.len());
        assert_eq!(report.totals().total(), manifest.len());
    }
}

#[test]
fn test_second_run_is_idempotent() {
    let client = MockClient::new();
    let manifest = manifest(LAYERED);

    let first = run(&client, &manifest);
    assert!(first.is_success());
    assert!(first.outcomes().all(|o| o.status == OutcomeStatus::Created));

    client.clear_calls();
    let second = run(&client, &manifest);

    assert!(second.outcomes().all(|o| o.status == OutcomeStatus::AlreadyExists));
    for (a, b) in first.outcomes().zip(second.outcomes()) {
        assert_eq!(a.key, b.key);
        assert_eq!(a.handle, b.handle);
    }

    // Policies are only applied right after creation
    assert_eq!(client.count(MockOp::ApplyPermissions), 0);
    assert!(second.is_success());
}

#[test]
fn test_stages_run_in_order() {
    let client = MockClient::new();
    let manifest = manifest(LAYERED);
    run(&client, &manifest);

    let mutations: Vec<MockOp> = client
        .calls()
        .into_iter()
        .map(|c| c.op)
        .filter(|op| op.is_mutation())
        .collect();
    let last = |op: MockOp| mutations.iter().rposition(|o| *o == op).unwrap();
    let first = |op: MockOp| mutations.iter().position(|o| *o == op).unwrap();

    assert!(last(MockOp::EnsureUser) < first(MockOp::EnsureGroup));
    assert!(last(MockOp::AddMember) < first(MockOp::EnsureSpace));
    assert!(last(MockOp::EnsureSpace) < first(MockOp::EnsurePage));
    assert!(last(MockOp::EnsurePage) < first(MockOp::EnsureBlogPost));

    let stages: Vec<Stage> = run(&MockClient::new(), &manifest)
        .stages
        .iter()
        .map(|s| s.stage)
        .collect();
    assert_eq!(stages, Stage::ORDER.to_vec());
}

#[test]
fn test_admin_excluded_from_default_membership() {
    let client = MockClient::new();
    run(&client, &manifest(SITE));

    assert_eq!(
        client.members("standard-users"),
        vec!["user1", "user2", "user3", "User 4"]
    );
}

#[test]
fn test_admin_exclusion_reads_flag_not_name() {
    let client = MockClient::new();
    let manifest = manifest(
        r#"
[[users]]
username = "PepikM"

[[users]]
username = "boss"
admin = true

[[groups]]
name = "g"
"#,
    );
    run(&client, &manifest);
    assert_eq!(client.members("g"), vec!["PepikM"]);
}

#[test]
fn test_explicit_members_used_verbatim() {
    let client = MockClient::new();
    let manifest = manifest(
        r#"
[[users]]
username = "admin"
admin = true

[[users]]
username = "alice"

[[groups]]
name = "admins"
members = ["admin"]
"#,
    );
    let report = run(&client, &manifest);

    assert_eq!(client.members("admins"), vec!["admin"]);
    assert_eq!(report.stage(Stage::Groups).unwrap().memberships.len(), 1);
}

#[test]
fn test_membership_failure_is_recorded() {
    let client = MockClient::new();
    client.fail(MockOp::AddMember, "standard-users/user2", ClientError::permanent("denied"));
    let report = run(&client, &manifest(SITE));

    let groups = report.stage(Stage::Groups).unwrap();
    assert_eq!(groups.members_added(), 3);
    let failed: Vec<&MembershipOutcome> =
        groups.memberships.iter().filter(|m| !m.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].user, "user2");
    assert!(!report.is_success());
    assert_eq!(report.totals().failed, 0);
}

#[test]
fn test_failed_group_skips_membership() {
    let client = MockClient::new();
    client.fail(MockOp::EnsureGroup, "standard-users", ClientError::permanent("quota"));
    let report = run(&client, &manifest(SITE));

    let group = outcome(&report, ResourceKind::Group, &NaturalKey::name("standard-users"));
    assert_eq!(group.status, OutcomeStatus::Failed);
    assert_eq!(client.count(MockOp::AddMember), 0);
    assert!(report.stage(Stage::Groups).unwrap().memberships.is_empty());
}

#[test]
fn test_existing_group_still_gets_members() {
    let client = MockClient::new().with_existing_group("standard-users");
    let report = run(&client, &manifest(SITE));

    let group = outcome(&report, ResourceKind::Group, &NaturalKey::name("standard-users"));
    assert_eq!(group.status, OutcomeStatus::AlreadyExists);
    assert_eq!(client.members("standard-users").len(), 4);
}

#[test]
fn test_partial_failure_continues_stage() {
    let client = MockClient::new();
    let manifest = manifest(
        r#"
[[spaces]]
key = "S"
name = "S"

[[pages]]
space = "S"
title = "P1"

[[pages]]
space = "S"
title = "P2"

[[pages]]
space = "S"
title = "P3"

[[pages]]
space = "S"
title = "P4"

[[pages]]
space = "S"
title = "P5"
"#,
    );
    client.fail(MockOp::EnsurePage, "S/P2", ClientError::permanent("invalid body"));

    let report = run(&client, &manifest);
    let content = report.stage(Stage::Content).unwrap();

    let statuses: Vec<OutcomeStatus> = content.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            OutcomeStatus::Created,
            OutcomeStatus::Failed,
            OutcomeStatus::Created,
            OutcomeStatus::Created,
            OutcomeStatus::Created,
        ]
    );
    assert_eq!(
        content.outcomes[1].error.as_ref().unwrap().kind,
        FailureKind::Permanent
    );
    assert_eq!(
        report.failed_keys(),
        vec![(ResourceKind::Page, NaturalKey::in_space("S", "P2"))]
    );
}

#[test]
fn test_fatal_transport_aborts_with_partial_report() {
    let client = MockClient::new();
    let manifest = manifest(
        r#"
[[users]]
username = "admin"
admin = true

[[spaces]]
key = "A"
name = "A"

[[spaces]]
key = "B"
name = "B"

[[spaces]]
key = "C"
name = "C"
"#,
    );
    client.fail(MockOp::EnsureSpace, "B", ClientError::fatal("401 Unauthorized"));

    let err = Orchestrator::new(&client, RunOptions::immediate())
        .run(&manifest, &mut NoProgress)
        .unwrap_err();

    let ProvisionError::Aborted {
        stage,
        kind,
        key,
        message,
        ..
    } = &err;
    assert_eq!(*stage, Stage::Spaces);
    assert_eq!(*kind, ResourceKind::Space);
    assert_eq!(*key, NaturalKey::name("B"));
    assert!(message.contains("401"));

    let partial = err.partial_report();
    assert_eq!(partial.stages.len(), 3);
    let spaces = partial.stage(Stage::Spaces).unwrap();
    assert_eq!(spaces.outcomes.len(), 2);
    assert_eq!(spaces.outcomes[0].status, OutcomeStatus::Created);
    assert_eq!(spaces.outcomes[1].status, OutcomeStatus::Failed);
    assert_eq!(
        spaces.outcomes[1].error.as_ref().unwrap().kind,
        FailureKind::FatalTransport
    );
    assert!(partial.stage(Stage::Content).is_none());

    assert_eq!(client.spaces(), vec!["A"]);
    assert_eq!(client.count(MockOp::EnsureSpace), 2);
}

#[test]
fn test_fatal_policy_failure_keeps_created_resource() {
    let client = MockClient::new();
    let manifest = manifest(
        r#"
[[users]]
username = "admin"
admin = true

[[spaces]]
key = "A"
name = "A"
policy = "admin_only"

[[spaces]]
key = "B"
name = "B"
"#,
    );
    client.fail(MockOp::ApplyPermissions, "A", ClientError::fatal("401 Unauthorized"));

    let err = Orchestrator::new(&client, RunOptions::immediate())
        .run(&manifest, &mut NoProgress)
        .unwrap_err();

    let ProvisionError::Aborted { key, .. } = &err;
    assert_eq!(*key, NaturalKey::name("A"));

    let space = outcome(err.partial_report(), ResourceKind::Space, &NaturalKey::name("A"));
    assert_eq!(space.status, OutcomeStatus::CreatedButPolicyFailed);
    assert_eq!(space.handle.as_ref().unwrap().id, "A");
    assert_eq!(
        space.error.as_ref().unwrap().kind,
        FailureKind::FatalTransport
    );
    assert!(space.permissions.is_empty());

    assert_eq!(client.spaces(), vec!["A"]);
    assert_eq!(client.count(MockOp::EnsureSpace), 1);
}

#[test]
fn test_delay_follows_each_mutation() {
    let client = MockClient::new();
    let manifest = manifest(
        r#"
[[spaces]]
key = "A"
name = "A"

[[spaces]]
key = "B"
name = "B"
"#,
    );
    let options = RunOptions::immediate().with_delay(Duration::from_millis(50));

    let started = Instant::now();
    let report = Orchestrator::new(&client, options)
        .run(&manifest, &mut NoProgress)
        .unwrap();
    assert!(report.is_success());
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_no_delay_after_lookups_or_failures() {
    let client = MockClient::new()
        .without_user_creation()
        .with_existing_user("user1");
    let manifest = manifest(
        r#"
[[users]]
username = "user1"

[[users]]
username = "user2"

[[spaces]]
key = "A"
name = "A"
"#,
    );
    client.fail(MockOp::EnsureSpace, "A", ClientError::permanent("400 Bad Request"));
    let options = RunOptions {
        retry_transient: false,
        ..RunOptions::immediate().with_delay(Duration::from_secs(2))
    };

    let started = Instant::now();
    let report = Orchestrator::new(&client, options)
        .run(&manifest, &mut NoProgress)
        .unwrap();
    assert_eq!(report.totals().failed, 2);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_transient_failure_retried_once() {
    let client = MockClient::new();
    let manifest = manifest("[[spaces]]\nkey = \"A\"\nname = \"A\"\n");
    client.fail_times(MockOp::EnsureSpace, "A", ClientError::transient("429"), 1);

    let report = run(&client, &manifest);
    assert_eq!(statuses(&report), vec![OutcomeStatus::Created]);
    assert_eq!(client.count(MockOp::EnsureSpace), 2);
}

#[test]
fn test_transient_failure_not_retried_twice() {
    let client = MockClient::new();
    let manifest = manifest("[[spaces]]\nkey = \"A\"\nname = \"A\"\n");
    client.fail_times(MockOp::EnsureSpace, "A", ClientError::transient("503"), 2);

    let report = run(&client, &manifest);
    let space = outcome(&report, ResourceKind::Space, &NaturalKey::name("A"));
    assert_eq!(space.status, OutcomeStatus::Failed);
    assert_eq!(space.error.as_ref().unwrap().kind, FailureKind::Transient);
    assert_eq!(client.count(MockOp::EnsureSpace), 2);
}

#[test]
fn test_retry_can_be_disabled() {
    let client = MockClient::new();
    let manifest = manifest("[[spaces]]\nkey = \"A\"\nname = \"A\"\n");
    client.fail_times(MockOp::EnsureSpace, "A", ClientError::transient("503"), 1);

    let options = RunOptions {
        retry_transient: false,
        ..RunOptions::immediate()
    };
    let report = Orchestrator::new(&client, options)
        .run(&manifest, &mut NoProgress)
        .unwrap();
    assert_eq!(statuses(&report), vec![OutcomeStatus::Failed]);
    assert_eq!(client.count(MockOp::EnsureSpace), 1);
}

#[test]
fn test_missing_policy_subject_keeps_handle() {
    let client = MockClient::new();
    let manifest = manifest(
        r#"
[[users]]
username = "admin"
admin = true

[[spaces]]
key = "TEAM"
name = "Team"
policy = "group_based"
"#,
    );
    let report = run(&client, &manifest);

    let space = outcome(&report, ResourceKind::Space, &NaturalKey::name("TEAM"));
    assert_eq!(space.status, OutcomeStatus::CreatedButPolicyFailed);
    assert!(space.handle.is_some());
    assert_eq!(space.error.as_ref().unwrap().kind, FailureKind::MissingSubject);
    assert_eq!(client.count(MockOp::ApplyPermissions), 0);
}

#[test]
fn test_unknown_policy_is_policy_failure() {
    let client = MockClient::new();
    let manifest = manifest(
        r#"
[[spaces]]
key = "TEAM"
name = "Team"
policy = "everyone_everything"
"#,
    );
    let report = run(&client, &manifest);

    let space = outcome(&report, ResourceKind::Space, &NaturalKey::name("TEAM"));
    assert_eq!(space.status, OutcomeStatus::CreatedButPolicyFailed);
    assert_eq!(space.error.as_ref().unwrap().kind, FailureKind::UnknownPolicy);
    assert_eq!(client.spaces(), vec!["TEAM"]);
}

#[test]
fn test_permission_call_failure_is_policy_failure() {
    let client = MockClient::new();
    client.fail(MockOp::ApplyPermissions, "PUBLIC", ClientError::permanent("forbidden"));
    let report = run(&client, &manifest(SITE));

    let space = outcome(&report, ResourceKind::Space, &NaturalKey::name("PUBLIC"));
    assert_eq!(space.status, OutcomeStatus::CreatedButPolicyFailed);
    assert!(space.permissions.is_empty());

    // The page in the space is still created
    let page_key = NaturalKey::in_space("PUBLIC", "Welcome to Our Confluence Site");
    assert_eq!(
        outcome(&report, ResourceKind::Page, &page_key).status,
        OutcomeStatus::Created
    );
}

#[test]
fn test_policy_not_applied_to_existing_resources() {
    let client = MockClient::new().with_existing_space("PUBLIC");
    let report = run(&client, &manifest(SITE));

    let space = outcome(&report, ResourceKind::Space, &NaturalKey::name("PUBLIC"));
    assert_eq!(space.status, OutcomeStatus::AlreadyExists);
    assert!(space.permissions.is_empty());
    assert!(client.permissions_for("PUBLIC").is_empty());
}

#[test]
fn test_group_based_policy_grants_group() {
    let client = MockClient::new();
    let report = run(&client, &manifest(LAYERED));

    let page = outcome(
        &report,
        ResourceKind::Page,
        &NaturalKey::in_space("TEAM", "Guidelines"),
    );
    assert_eq!(page.permissions.len(), 2);
    assert!(page
        .permissions
        .iter()
        .all(|p| p.subject_type == SubjectType::Group && p.subject_id == "team"));

    let secret = outcome(&report, ResourceKind::Space, &NaturalKey::name("SECRET"));
    assert_eq!(secret.permissions.len(), 3);
    assert_eq!(secret.permissions[2].operation, Operation::Admin);
}

#[test]
fn test_lookup_failure_after_already_exists() {
    let client = MockClient::new().with_existing_space("PUBLIC");
    client.fail(
        MockOp::Lookup(ResourceKind::Space),
        "PUBLIC",
        ClientError::permanent("forbidden"),
    );
    let report = run(&client, &manifest(SITE));

    let space = outcome(&report, ResourceKind::Space, &NaturalKey::name("PUBLIC"));
    assert_eq!(space.status, OutcomeStatus::Failed);
    assert!(space.handle.is_none());
}

#[test]
fn test_verify_only_users() {
    let client = MockClient::new()
        .without_user_creation()
        .with_existing_user("PepikM")
        .with_existing_user("user1");
    let manifest = manifest(
        r#"
[[users]]
username = "PepikM"
admin = true

[[users]]
username = "user1"

[[users]]
username = "user2"

[[groups]]
name = "standard-users"
"#,
    );
    let report = run(&client, &manifest);

    let users = report.stage(Stage::Users).unwrap();
    let statuses: Vec<OutcomeStatus> = users.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            OutcomeStatus::AlreadyExists,
            OutcomeStatus::AlreadyExists,
            OutcomeStatus::Failed,
        ]
    );
    assert_eq!(
        users.outcomes[2].error.as_ref().unwrap().kind,
        FailureKind::NotFound
    );
    assert_eq!(client.count(MockOp::EnsureUser), 0);

    // Only verified users join the group
    assert_eq!(client.members("standard-users"), vec!["user1"]);
}

#[test]
fn test_content_in_unknown_space_is_not_created() {
    let client = MockClient::new();
    let manifest = manifest(
        r#"
[[pages]]
space = "NOPE"
title = "Orphan"
"#,
    );
    let report = run(&client, &manifest);

    let page = outcome(&report, ResourceKind::Page, &NaturalKey::in_space("NOPE", "Orphan"));
    assert_eq!(page.status, OutcomeStatus::Failed);
    assert_eq!(page.error.as_ref().unwrap().kind, FailureKind::NotFound);
    assert_eq!(client.count(MockOp::EnsurePage), 0);
    assert_eq!(client.count(MockOp::Lookup(ResourceKind::Space)), 1);
}

#[test]
fn test_content_in_remote_space_outside_manifest() {
    let client = MockClient::new().with_existing_space("EXT");
    let manifest = manifest(
        r#"
[[blog_posts]]
space = "EXT"
title = "News"
"#,
    );
    let report = run(&client, &manifest);
    assert_eq!(statuses(&report), vec![OutcomeStatus::Created]);
}

#[test]
fn test_content_skipped_when_space_failed() {
    let client = MockClient::new();
    client.fail(MockOp::EnsureSpace, "TEAM", ClientError::permanent("bad key"));
    let report = run(&client, &manifest(LAYERED));

    for title in ["Guidelines", "Onboarding"] {
        let page = outcome(&report, ResourceKind::Page, &NaturalKey::in_space("TEAM", title));
        assert_eq!(page.status, OutcomeStatus::Failed);
    }
    let alert = outcome(
        &report,
        ResourceKind::BlogPost,
        &NaturalKey::in_space("SECRET", "Alert"),
    );
    assert_eq!(alert.status, OutcomeStatus::Created);
    assert_eq!(client.count(MockOp::EnsurePage), 0);
}

#[test]
fn test_child_page_attached_to_parent() {
    let client = MockClient::new();
    run(&client, &manifest(LAYERED));

    let parent_id = client.content_id(ResourceKind::Page, "TEAM", "Guidelines");
    assert!(parent_id.is_some());
    assert_eq!(client.parent_of("TEAM", "Onboarding"), parent_id);
}

#[test]
fn test_child_page_with_missing_parent() {
    let client = MockClient::new();
    let manifest = manifest(
        r#"
[[spaces]]
key = "S"
name = "S"

[[pages]]
space = "S"
title = "Child"
parent = "Ghost"
"#,
    );
    let report = run(&client, &manifest);

    let child = outcome(&report, ResourceKind::Page, &NaturalKey::in_space("S", "Child"));
    assert_eq!(child.status, OutcomeStatus::Failed);
    assert_eq!(child.error.as_ref().unwrap().kind, FailureKind::NotFound);
    assert_eq!(client.count(MockOp::EnsurePage), 0);
}

#[test]
fn test_existing_user_is_not_failure() {
    let client = MockClient::new().with_existing_user("user1");
    let report = run(&client, &manifest(SITE));

    let user = outcome(&report, ResourceKind::User, &NaturalKey::name("user1"));
    assert_eq!(user.status, OutcomeStatus::AlreadyExists);
    assert!(user.error.is_none());
    assert!(report.is_success());
}

#[derive(Default)]
struct Recorder {
    stages: Vec<(Stage, usize)>,
    items: usize,
    completed: usize,
    memberships: usize,
    finished: Vec<Stage>,
}

impl ProgressCallback for Recorder {
    fn on_stage_start(&mut self, stage: Stage, count: usize) {
        self.stages.push((stage, count));
    }

    fn on_item_start(&mut self, _kind: ResourceKind, _key: &NaturalKey) {
        self.items += 1;
    }

    fn on_item_complete(&mut self, _outcome: &ProvisioningOutcome) {
        self.completed += 1;
    }

    fn on_membership(&mut self, _outcome: &MembershipOutcome) {
        self.memberships += 1;
    }

    fn on_stage_complete(&mut self, report: &StageReport) {
        self.finished.push(report.stage);
    }
}

#[test]
fn test_progress_callbacks() {
    let client = MockClient::new();
    let manifest = manifest(SITE);
    let mut recorder = Recorder::default();

    Orchestrator::new(&client, RunOptions::immediate())
        .run(&manifest, &mut recorder)
        .unwrap();

    assert_eq!(
        recorder.stages,
        vec![
            (Stage::Users, 5),
            (Stage::Groups, 1),
            (Stage::Spaces, 1),
            (Stage::Content, 1),
        ]
    );
    assert_eq!(recorder.items, manifest.len());
    assert_eq!(recorder.completed, manifest.len());
    assert_eq!(recorder.memberships, 4);
    assert_eq!(recorder.finished, Stage::ORDER.to_vec());
}

#[test]
fn test_report_serializes_to_json() {
    let client = MockClient::new();
    let report = run(&client, &manifest(SITE));

    let json = serde_json::to_value(&report).unwrap();
    let stages = json["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 4);
    assert_eq!(stages[0]["stage"], "users");
    assert_eq!(stages[0]["outcomes"][0]["status"], "created");
    assert_eq!(stages[0]["outcomes"][0]["key"], "PepikM");
    assert_eq!(stages[1]["memberships"].as_array().unwrap().len(), 4);
    assert_eq!(stages[3]["outcomes"][0]["key"]["space"], "PUBLIC");
}
