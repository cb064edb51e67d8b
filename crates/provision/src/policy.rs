//! Permission policy mapping
//!
//! A policy is a named intent ("admin only", "public read") that resolves to
//! a concrete list of [`PermissionEntry`] values. The set of policies is
//! closed; resolution is pure and depends only on the policy name and the
//! run-scoped identities in [`PolicyContext`].
//!
//! | policy            | entries                                   |
//! |-------------------|-------------------------------------------|
//! | admin_only        | admin: read, admin: write                 |
//! | restricted_access | admin: read, admin: write, admin: admin   |
//! | collaborative     | admin: read, admin: write                 |
//! | group_based       | group: read, group: write                 |
//! | public_read       | admin: write                              |
//!
//! `public_read` and `collaborative` carry no read-for-all entry. They rely
//! on the service granting read access when no explicit read restriction
//! exists.

use crate::error::PolicyError;
use crate::types::TargetType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who a permission entry grants to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    User,
    Group,
    Anonymous,
}

impl SubjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Anonymous => "anonymous",
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation granted by a permission entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
    Admin,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single access-control entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub subject_type: SubjectType,
    pub subject_id: String,
    pub operation: Operation,
    pub target_type: TargetType,
    /// Always false for the built-in policies
    pub anonymous_access: bool,
}

impl fmt::Display for PermissionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} on {}",
            self.subject_type, self.subject_id, self.operation, self.target_type
        )
    }
}

/// Run-scoped identities a policy can grant to
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// Username of the administrator
    pub admin: Option<&'a str>,
    /// Name of the default group
    pub group: Option<&'a str>,
    pub target: TargetType,
}

/// Role a policy grants to, before it is bound to an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grantee {
    Admin,
    Group,
}

/// The closed set of named permission policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    AdminOnly,
    RestrictedAccess,
    Collaborative,
    GroupBased,
    PublicRead,
}

impl Policy {
    pub const ALL: [Self; 5] = [
        Self::AdminOnly,
        Self::RestrictedAccess,
        Self::Collaborative,
        Self::GroupBased,
        Self::PublicRead,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdminOnly => "admin_only",
            Self::RestrictedAccess => "restricted_access",
            Self::Collaborative => "collaborative",
            Self::GroupBased => "group_based",
            Self::PublicRead => "public_read",
        }
    }

    /// One-line summary of the intent
    pub fn description(self) -> &'static str {
        match self {
            Self::AdminOnly => "Only the administrator can view and edit",
            Self::RestrictedAccess => "Administrator can view, edit and administer",
            Self::Collaborative => "Administrator can view and edit",
            Self::GroupBased => "Default group members can view and edit",
            Self::PublicRead => "Everyone can view, only the administrator can edit",
        }
    }

    fn grants(self) -> &'static [(Grantee, Operation)] {
        match self {
            Self::AdminOnly | Self::Collaborative => {
                &[(Grantee::Admin, Operation::Read), (Grantee::Admin, Operation::Write)]
            }
            Self::RestrictedAccess => &[
                (Grantee::Admin, Operation::Read),
                (Grantee::Admin, Operation::Write),
                (Grantee::Admin, Operation::Admin),
            ],
            Self::GroupBased => {
                &[(Grantee::Group, Operation::Read), (Grantee::Group, Operation::Write)]
            }
            Self::PublicRead => &[(Grantee::Admin, Operation::Write)],
        }
    }

    /// Bind this policy to concrete identities
    pub fn resolve(self, ctx: &PolicyContext<'_>) -> Result<Vec<PermissionEntry>, PolicyError> {
        self.grants()
            .iter()
            .map(|&(grantee, operation)| {
                let (subject_type, subject_id, role) = match grantee {
                    Grantee::Admin => (SubjectType::User, ctx.admin, "admin"),
                    Grantee::Group => (SubjectType::Group, ctx.group, "group"),
                };
                let subject_id = subject_id.ok_or_else(|| PolicyError::MissingSubject {
                    policy: self.as_str().to_string(),
                    subject: role,
                })?;
                Ok(PermissionEntry {
                    subject_type,
                    subject_id: subject_id.to_string(),
                    operation,
                    target_type: ctx.target,
                    anonymous_access: false,
                })
            })
            .collect()
    }
}

impl FromStr for Policy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PolicyError::UnknownPolicy(s.to_string()))
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a policy by name
pub fn resolve(policy: &str, ctx: &PolicyContext<'_>) -> Result<Vec<PermissionEntry>, PolicyError> {
    policy.parse::<Policy>()?.resolve(ctx)
}
