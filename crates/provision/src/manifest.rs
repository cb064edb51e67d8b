//! Desired-state manifest
//!
//! A manifest is a TOML document listing the resources to provision:
//!
//! ```toml
//! [[users]]
//! username = "PepikM"
//! email = "admin@example.com"
//! admin = true
//!
//! [[groups]]
//! name = "standard-users"
//!
//! [[spaces]]
//! key = "TEAM"
//! name = "Team Space"
//! policy = "group_based"
//!
//! [[pages]]
//! space = "TEAM"
//! title = "Team Guidelines"
//! body = "<h1>Team Guidelines</h1>"
//! policy = "group_based"
//! ```

use crate::error::ManifestError;
use crate::policy::Policy;
use crate::types::{ResourceKind, ResourceSpec, Stage};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserEntry {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Marks the administrator; excluded from default group membership
    #[serde(default)]
    pub admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpaceEntry {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageEntry {
    pub space: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Title of the parent page in the same space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlogPostEntry {
    pub space: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

/// Static description of the desired remote state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub users: Vec<UserEntry>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
    #[serde(default)]
    pub spaces: Vec<SpaceEntry>,
    #[serde(default)]
    pub pages: Vec<PageEntry>,
    #[serde(default)]
    pub blog_posts: Vec<BlogPostEntry>,
}

impl Manifest {
    /// Parse a manifest from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a manifest from a TOML file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Resource specs for one stage, in manifest order
    ///
    /// The content stage yields every page before any blog post.
    pub fn specs(&self, stage: Stage) -> Vec<ResourceSpec> {
        match stage {
            Stage::Users => self.users.iter().map(UserEntry::to_spec).collect(),
            Stage::Groups => self.groups.iter().map(GroupEntry::to_spec).collect(),
            Stage::Spaces => self.spaces.iter().map(SpaceEntry::to_spec).collect(),
            Stage::Content => self
                .pages
                .iter()
                .map(PageEntry::to_spec)
                .chain(self.blog_posts.iter().map(BlogPostEntry::to_spec))
                .collect(),
        }
    }

    /// All resource specs in provisioning order
    pub fn resource_specs(&self) -> Vec<ResourceSpec> {
        Stage::ORDER.into_iter().flat_map(|s| self.specs(s)).collect()
    }

    /// Number of manifest items
    pub fn len(&self) -> usize {
        self.users.len()
            + self.groups.len()
            + self.spaces.len()
            + self.pages.len()
            + self.blog_posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Username of the administrator (the first user marked `admin`)
    pub fn admin(&self) -> Option<&str> {
        self.users
            .iter()
            .find(|u| u.admin)
            .map(|u| u.username.as_str())
    }

    /// Name of the default group (the first group declared)
    pub fn default_group(&self) -> Option<&str> {
        self.groups.first().map(|g| g.name.as_str())
    }

    /// Check structural rules and report every problem found
    pub fn validate(&self) -> Vec<ManifestIssue> {
        let mut issues = Vec::new();

        check_unique(
            &mut issues,
            ResourceKind::User,
            self.users.iter().map(|u| u.username.clone()),
        );
        check_unique(
            &mut issues,
            ResourceKind::Group,
            self.groups.iter().map(|g| g.name.clone()),
        );
        check_unique(
            &mut issues,
            ResourceKind::Space,
            self.spaces.iter().map(|s| s.key.clone()),
        );
        check_unique(
            &mut issues,
            ResourceKind::Page,
            self.pages.iter().map(|p| format!("{}/{}", p.space, p.title)),
        );
        check_unique(
            &mut issues,
            ResourceKind::BlogPost,
            self.blog_posts
                .iter()
                .map(|b| format!("{}/{}", b.space, b.title)),
        );

        let admins: Vec<&str> = self
            .users
            .iter()
            .filter(|u| u.admin)
            .map(|u| u.username.as_str())
            .collect();
        if admins.len() > 1 {
            issues.push(ManifestIssue::error(
                ResourceKind::User,
                admins.join(", "),
                "more than one user is marked admin",
            ));
        }

        let usernames: HashSet<&str> = self.users.iter().map(|u| u.username.as_str()).collect();
        for group in &self.groups {
            for member in group.members.iter().flatten() {
                if !usernames.contains(member.as_str()) {
                    issues.push(ManifestIssue::warning(
                        ResourceKind::Group,
                        &group.name,
                        format!("member '{member}' is not declared and must already exist"),
                    ));
                }
            }
        }

        let spaces: HashSet<&str> = self.spaces.iter().map(|s| s.key.as_str()).collect();
        let content = self
            .pages
            .iter()
            .map(|p| (ResourceKind::Page, p.space.as_str(), p.title.as_str()))
            .chain(
                self.blog_posts
                    .iter()
                    .map(|b| (ResourceKind::BlogPost, b.space.as_str(), b.title.as_str())),
            );
        for (kind, space, title) in content {
            if !spaces.contains(space) {
                issues.push(ManifestIssue::warning(
                    kind,
                    format!("{space}/{title}"),
                    format!("space '{space}' is not declared and must already exist"),
                ));
            }
        }

        for (index, page) in self.pages.iter().enumerate() {
            let Some(parent) = &page.parent else { continue };
            let key = format!("{}/{}", page.space, page.title);
            if parent == &page.title {
                issues.push(ManifestIssue::error(
                    ResourceKind::Page,
                    key,
                    "page is its own parent",
                ));
                continue;
            }
            let position = self
                .pages
                .iter()
                .position(|p| p.space == page.space && &p.title == parent);
            match position {
                Some(pos) if pos > index => issues.push(ManifestIssue::error(
                    ResourceKind::Page,
                    key,
                    format!("parent '{parent}' is declared after this page"),
                )),
                Some(_) => {}
                None => issues.push(ManifestIssue::warning(
                    ResourceKind::Page,
                    key,
                    format!("parent '{parent}' is not declared and must already exist"),
                )),
            }
        }

        self.check_policies(&mut issues);
        issues
    }

    fn check_policies(&self, issues: &mut Vec<ManifestIssue>) {
        for spec in self.resource_specs() {
            let Some(name) = &spec.policy else { continue };
            if spec.kind.target_type().is_none() {
                issues.push(ManifestIssue::warning(
                    spec.kind,
                    spec.key.to_string(),
                    format!("policy '{name}' is ignored for {} entries", spec.kind),
                ));
                continue;
            }
            match name.parse::<Policy>() {
                Ok(Policy::GroupBased) if self.default_group().is_none() => {
                    issues.push(ManifestIssue::error(
                        spec.kind,
                        spec.key.to_string(),
                        format!("policy '{name}' needs a group, but none is declared"),
                    ));
                }
                Ok(Policy::GroupBased) => {}
                Ok(_) if self.admin().is_none() => {
                    issues.push(ManifestIssue::error(
                        spec.kind,
                        spec.key.to_string(),
                        format!("policy '{name}' needs an admin user, but none is declared"),
                    ));
                }
                Ok(_) => {}
                Err(err) => {
                    issues.push(ManifestIssue::error(spec.kind, spec.key.to_string(), err));
                }
            }
        }
    }
}

fn check_unique(
    issues: &mut Vec<ManifestIssue>,
    kind: ResourceKind,
    keys: impl Iterator<Item = String>,
) {
    let mut seen = HashSet::new();
    for key in keys {
        if key.trim().is_empty() {
            issues.push(ManifestIssue::error(kind, key, "key is empty"));
        } else if !seen.insert(key.clone()) {
            issues.push(ManifestIssue::error(kind, key, "declared more than once"));
        }
    }
}

impl UserEntry {
    pub fn to_spec(&self) -> ResourceSpec {
        let mut spec = ResourceSpec::user(
            &self.username,
            self.email.clone(),
            self.display_name.clone(),
            self.admin,
        );
        spec.policy.clone_from(&self.policy);
        spec
    }
}

impl GroupEntry {
    pub fn to_spec(&self) -> ResourceSpec {
        let mut spec = ResourceSpec::group(&self.name);
        spec.attributes.members.clone_from(&self.members);
        spec.policy.clone_from(&self.policy);
        spec
    }
}

impl SpaceEntry {
    pub fn to_spec(&self) -> ResourceSpec {
        let mut spec = ResourceSpec::space(&self.key, &self.name, self.description.clone());
        spec.policy.clone_from(&self.policy);
        spec
    }
}

impl PageEntry {
    pub fn to_spec(&self) -> ResourceSpec {
        let mut spec = ResourceSpec::page(&self.space, &self.title, &self.body);
        spec.attributes.parent.clone_from(&self.parent);
        spec.policy.clone_from(&self.policy);
        spec
    }
}

impl BlogPostEntry {
    pub fn to_spec(&self) -> ResourceSpec {
        let mut spec = ResourceSpec::blog_post(&self.space, &self.title, &self.body);
        spec.policy.clone_from(&self.policy);
        spec
    }
}

/// How serious a manifest problem is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The run would fail or misbehave for this item
    Error,
    /// The item depends on remote state outside the manifest
    Warning,
}

/// A problem found by [`Manifest::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestIssue {
    pub severity: Severity,
    pub kind: ResourceKind,
    pub key: String,
    pub message: String,
}

impl ManifestIssue {
    fn error(kind: ResourceKind, key: impl Into<String>, message: impl ToString) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            key: key.into(),
            message: message.to_string(),
        }
    }

    fn warning(kind: ResourceKind, key: impl Into<String>, message: impl ToString) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.kind, self.key, self.message)
    }
}
