//! Run report: per-item outcomes aggregated by stage

use crate::error::{ClientError, ErrorKind, PolicyError};
use crate::policy::PermissionEntry;
use crate::types::{NaturalKey, ResourceHandle, ResourceKind, ResourceSpec, Stage};
use serde::Serialize;
use std::fmt;

/// Final status of one manifest item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Resource was created and its policy (if any) applied
    Created,
    /// Resource was already present and has been resolved
    AlreadyExists,
    /// Resource was created but its permissions could not be applied
    CreatedButPolicyFailed,
    /// Resource could not be created or resolved
    Failed,
}

impl OutcomeStatus {
    /// Check if the resource exists remotely after this outcome
    pub fn is_present(self) -> bool {
        !matches!(self, Self::Failed)
    }

    /// Check if the outcome needs attention
    pub fn is_problem(self) -> bool {
        matches!(self, Self::Failed | Self::CreatedButPolicyFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "already exists",
            Self::CreatedButPolicyFailed => "created, policy failed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a recorded failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AlreadyExists,
    NotFound,
    Transient,
    Permanent,
    FatalTransport,
    UnknownPolicy,
    MissingSubject,
}

impl From<ErrorKind> for FailureKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::AlreadyExists => Self::AlreadyExists,
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::Transient => Self::Transient,
            ErrorKind::Permanent => Self::Permanent,
            ErrorKind::FatalTransport => Self::FatalTransport,
        }
    }
}

/// Error detail attached to an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ClientError> for ErrorDetail {
    fn from(err: &ClientError) -> Self {
        Self {
            kind: err.kind.into(),
            message: err.message.clone(),
        }
    }
}

impl From<&PolicyError> for ErrorDetail {
    fn from(err: &PolicyError) -> Self {
        let kind = match err {
            PolicyError::UnknownPolicy(_) => FailureKind::UnknownPolicy,
            PolicyError::MissingSubject { .. } => FailureKind::MissingSubject,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of provisioning one manifest item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningOutcome {
    pub kind: ResourceKind,
    pub key: NaturalKey,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<ResourceHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Permission entries applied after creation
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<PermissionEntry>,
}

impl ProvisioningOutcome {
    fn new(spec: &ResourceSpec, status: OutcomeStatus) -> Self {
        Self {
            kind: spec.kind,
            key: spec.key.clone(),
            status,
            handle: None,
            error: None,
            policy: spec.policy.clone(),
            permissions: Vec::new(),
        }
    }

    pub fn created(spec: &ResourceSpec, handle: ResourceHandle) -> Self {
        Self {
            handle: Some(handle),
            ..Self::new(spec, OutcomeStatus::Created)
        }
    }

    pub fn already_exists(spec: &ResourceSpec, handle: ResourceHandle) -> Self {
        Self {
            handle: Some(handle),
            ..Self::new(spec, OutcomeStatus::AlreadyExists)
        }
    }

    pub fn policy_failed(spec: &ResourceSpec, handle: ResourceHandle, error: ErrorDetail) -> Self {
        Self {
            handle: Some(handle),
            error: Some(error),
            ..Self::new(spec, OutcomeStatus::CreatedButPolicyFailed)
        }
    }

    pub fn failed(spec: &ResourceSpec, error: ErrorDetail) -> Self {
        Self {
            error: Some(error),
            ..Self::new(spec, OutcomeStatus::Failed)
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<PermissionEntry>) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Outcome of adding one user to a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipOutcome {
    pub group: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl MembershipOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub created: usize,
    pub already_exists: usize,
    pub created_but_policy_failed: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    /// Add an outcome status to the counts
    pub fn add(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Created => self.created += 1,
            OutcomeStatus::AlreadyExists => self.already_exists += 1,
            OutcomeStatus::CreatedButPolicyFailed => self.created_but_policy_failed += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }

    /// Merge another set of counts into this one
    pub fn merge(&mut self, other: &Self) {
        self.created += other.created;
        self.already_exists += other.already_exists;
        self.created_but_policy_failed += other.created_but_policy_failed;
        self.failed += other.failed;
    }

    /// Total number of items counted
    pub fn total(&self) -> usize {
        self.created + self.already_exists + self.created_but_policy_failed + self.failed
    }

    /// Check if every item ended fully provisioned
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.created_but_policy_failed == 0
    }
}

/// Outcomes of one stage, in processing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub counts: OutcomeCounts,
    pub outcomes: Vec<ProvisioningOutcome>,
    /// Group membership results (Groups stage only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub memberships: Vec<MembershipOutcome>,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            counts: OutcomeCounts::default(),
            outcomes: Vec::new(),
            memberships: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: ProvisioningOutcome) {
        self.counts.add(outcome.status);
        self.outcomes.push(outcome);
    }

    pub fn push_membership(&mut self, outcome: MembershipOutcome) {
        self.memberships.push(outcome);
    }

    /// Number of successful `add_member` calls
    pub fn members_added(&self) -> usize {
        self.memberships.iter().filter(|m| m.is_success()).count()
    }

    pub fn is_success(&self) -> bool {
        self.counts.is_success() && self.memberships.iter().all(MembershipOutcome::is_success)
    }
}

/// Summary of a provisioning run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub stages: Vec<StageReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_stage(&mut self, stage: StageReport) {
        self.stages.push(stage);
    }

    /// Report for one stage, if it ran
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// All outcomes, in the order they were recorded
    pub fn outcomes(&self) -> impl Iterator<Item = &ProvisioningOutcome> {
        self.stages.iter().flat_map(|s| s.outcomes.iter())
    }

    /// All membership outcomes
    pub fn memberships(&self) -> impl Iterator<Item = &MembershipOutcome> {
        self.stages.iter().flat_map(|s| s.memberships.iter())
    }

    /// Outcome for a specific resource
    pub fn outcome(&self, kind: ResourceKind, key: &NaturalKey) -> Option<&ProvisioningOutcome> {
        self.outcomes().find(|o| o.kind == kind && &o.key == key)
    }

    /// Counts across all stages
    pub fn totals(&self) -> OutcomeCounts {
        let mut totals = OutcomeCounts::default();
        for stage in &self.stages {
            totals.merge(&stage.counts);
        }
        totals
    }

    /// Number of recorded outcomes
    pub fn len(&self) -> usize {
        self.stages.iter().map(|s| s.outcomes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Natural keys of items that ended `Failed`
    pub fn failed_keys(&self) -> Vec<(ResourceKind, NaturalKey)> {
        self.outcomes()
            .filter(|o| o.status == OutcomeStatus::Failed)
            .map(|o| (o.kind, o.key.clone()))
            .collect()
    }

    /// Check if every item and membership fully succeeded
    pub fn is_success(&self) -> bool {
        self.stages.iter().all(StageReport::is_success)
    }
}
