//! Core types for provisioning

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Kind of remote resource managed by the provisioner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Group,
    Space,
    Page,
    BlogPost,
}

impl ResourceKind {
    /// All kinds, in provisioning order
    pub const ALL: [Self; 5] = [Self::User, Self::Group, Self::Space, Self::Page, Self::BlogPost];

    /// Stage this kind is provisioned in
    pub fn stage(self) -> Stage {
        match self {
            Self::User => Stage::Users,
            Self::Group => Stage::Groups,
            Self::Space => Stage::Spaces,
            Self::Page | Self::BlogPost => Stage::Content,
        }
    }

    /// Permission target for this kind, if permissions can be applied to it
    pub fn target_type(self) -> Option<TargetType> {
        match self {
            Self::Space => Some(TargetType::Space),
            Self::Page | Self::BlogPost => Some(TargetType::Content),
            Self::User | Self::Group => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Space => "space",
            Self::Page => "page",
            Self::BlogPost => "blog_post",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four ordered provisioning phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Users,
    Groups,
    Spaces,
    Content,
}

impl Stage {
    /// Stages in execution order
    pub const ORDER: [Self; 4] = [Self::Users, Self::Groups, Self::Spaces, Self::Content];

    /// Resource kinds handled by this stage, in processing order
    pub fn kinds(self) -> &'static [ResourceKind] {
        match self {
            Self::Users => &[ResourceKind::User],
            Self::Groups => &[ResourceKind::Group],
            Self::Spaces => &[ResourceKind::Space],
            Self::Content => &[ResourceKind::Page, ResourceKind::BlogPost],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Groups => "groups",
            Self::Spaces => "spaces",
            Self::Content => "content",
        }
    }

    /// Title-cased label for display
    pub fn label(self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Groups => "Groups",
            Self::Spaces => "Spaces",
            Self::Content => "Content",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-meaningful identifier used for idempotency lookups
///
/// Users, groups and spaces are named; pages and blog posts are identified
/// by their title within a space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NaturalKey {
    Name(String),
    InSpace { space: String, title: String },
}

impl NaturalKey {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn in_space(space: impl Into<String>, title: impl Into<String>) -> Self {
        Self::InSpace {
            space: space.into(),
            title: title.into(),
        }
    }

    /// The name, or the title for content keys
    pub fn as_str(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::InSpace { title, .. } => title,
        }
    }

    /// Containing space key, for content keys
    pub fn space(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::InSpace { space, .. } => Some(space),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::InSpace { space, title } => write!(f, "{space}/{title}"),
        }
    }
}

/// Descriptive attributes of a desired resource
///
/// Which fields are meaningful depends on the kind: `email` and `is_admin`
/// for users, `members` for groups, `description` for spaces, `body` and
/// `parent` for content. `display_name` is the user's display name or the
/// space name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Parent page title, within the same space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Explicit group members; when absent every provisioned non-admin user joins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
}

/// Immutable description of a desired remote resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub key: NaturalKey,
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

impl ResourceSpec {
    pub fn user(
        username: impl Into<String>,
        email: Option<String>,
        display_name: Option<String>,
        is_admin: bool,
    ) -> Self {
        Self {
            kind: ResourceKind::User,
            key: NaturalKey::name(username),
            attributes: Attributes {
                display_name,
                email,
                is_admin,
                ..Attributes::default()
            },
            policy: None,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Group,
            key: NaturalKey::name(name),
            attributes: Attributes::default(),
            policy: None,
        }
    }

    pub fn space(
        key: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            kind: ResourceKind::Space,
            key: NaturalKey::name(key),
            attributes: Attributes {
                display_name: Some(name.into()),
                description,
                ..Attributes::default()
            },
            policy: None,
        }
    }

    pub fn page(
        space: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::content(ResourceKind::Page, space, title, body)
    }

    pub fn blog_post(
        space: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::content(ResourceKind::BlogPost, space, title, body)
    }

    fn content(
        kind: ResourceKind,
        space: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            key: NaturalKey::in_space(space, title),
            attributes: Attributes {
                body: Some(body.into()),
                ..Attributes::default()
            },
            policy: None,
        }
    }

    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.attributes.parent = Some(parent.into());
        self
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.members = Some(members.into_iter().map(Into::into).collect());
        self
    }

    /// Name (or content title) part of the natural key
    pub fn name(&self) -> &str {
        self.key.as_str()
    }
}

/// Result of a successful creation or lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Opaque identifier assigned by the remote service
    pub id: String,
    pub key: NaturalKey,
    pub kind: ResourceKind,
}

impl ResourceHandle {
    pub fn new(kind: ResourceKind, key: NaturalKey, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key,
            kind,
        }
    }
}

/// What a permission entry applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Space,
    Content,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Space => "space",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for a provisioning run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Pause after every successful mutating call
    pub delay: Duration,
    /// Retry a transient failure once, after `delay`
    pub retry_transient: bool,
}

impl RunOptions {
    /// Options with no inter-call delay
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            retry_transient: true,
        }
    }
}
