//! Client and progress traits
//!
//! These traits allow the provision crate to be used without
//! depending on a specific remote service or terminal UI.

use crate::error::ClientError;
use crate::policy::PermissionEntry;
use crate::report::{MembershipOutcome, ProvisioningOutcome, StageReport};
use crate::types::{Attributes, NaturalKey, ResourceHandle, ResourceKind, Stage, TargetType};

/// Uniform interface over the remote collaboration service
///
/// Every operation is synchronous and reports failures through a
/// classified [`ClientError`]. Implementations must return
/// [`crate::ErrorKind::AlreadyExists`] when asked to create something that
/// is already there, so the orchestrator can resolve it with [`lookup`].
///
/// [`lookup`]: ResourceClient::lookup
pub trait ResourceClient: Send + Sync {
    /// Whether `ensure_user` can create accounts
    ///
    /// When false, the Users stage only verifies that accounts exist.
    fn supports_user_creation(&self) -> bool;

    /// Create a user account
    fn ensure_user(
        &self,
        username: &str,
        attributes: &Attributes,
    ) -> Result<ResourceHandle, ClientError>;

    /// Create a group
    fn ensure_group(&self, name: &str) -> Result<ResourceHandle, ClientError>;

    /// Add a user to a group; adding an existing member succeeds
    fn add_member(&self, group: &str, username: &str) -> Result<(), ClientError>;

    /// Create a space
    fn ensure_space(
        &self,
        key: &str,
        attributes: &Attributes,
    ) -> Result<ResourceHandle, ClientError>;

    /// Attach permission entries to a space or content item
    fn apply_permissions(
        &self,
        target: TargetType,
        target_id: &str,
        entries: &[PermissionEntry],
    ) -> Result<(), ClientError>;

    /// Create a page in a space, optionally under a parent page
    fn ensure_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> Result<ResourceHandle, ClientError>;

    /// Create a blog post in a space
    fn ensure_blog_post(
        &self,
        space: &str,
        title: &str,
        body: &str,
    ) -> Result<ResourceHandle, ClientError>;

    /// Find an existing resource by natural key
    ///
    /// Returns a `NotFound` error when nothing matches.
    fn lookup(&self, kind: ResourceKind, key: &NaturalKey) -> Result<ResourceHandle, ClientError>;
}

impl<C: ResourceClient + ?Sized> ResourceClient for &C {
    fn supports_user_creation(&self) -> bool {
        (**self).supports_user_creation()
    }

    fn ensure_user(
        &self,
        username: &str,
        attributes: &Attributes,
    ) -> Result<ResourceHandle, ClientError> {
        (**self).ensure_user(username, attributes)
    }

    fn ensure_group(&self, name: &str) -> Result<ResourceHandle, ClientError> {
        (**self).ensure_group(name)
    }

    fn add_member(&self, group: &str, username: &str) -> Result<(), ClientError> {
        (**self).add_member(group, username)
    }

    fn ensure_space(
        &self,
        key: &str,
        attributes: &Attributes,
    ) -> Result<ResourceHandle, ClientError> {
        (**self).ensure_space(key, attributes)
    }

    fn apply_permissions(
        &self,
        target: TargetType,
        target_id: &str,
        entries: &[PermissionEntry],
    ) -> Result<(), ClientError> {
        (**self).apply_permissions(target, target_id, entries)
    }

    fn ensure_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> Result<ResourceHandle, ClientError> {
        (**self).ensure_page(space, title, body, parent_id)
    }

    fn ensure_blog_post(
        &self,
        space: &str,
        title: &str,
        body: &str,
    ) -> Result<ResourceHandle, ClientError> {
        (**self).ensure_blog_post(space, title, body)
    }

    fn lookup(&self, kind: ResourceKind, key: &NaturalKey) -> Result<ResourceHandle, ClientError> {
        (**self).lookup(kind, key)
    }
}

/// Progress callback for provisioning runs
///
/// Implement this trait to receive progress updates during a run.
pub trait ProgressCallback: Send {
    /// Called when a stage starts, with the number of items it holds
    fn on_stage_start(&mut self, stage: Stage, count: usize);

    /// Called before an item is provisioned
    fn on_item_start(&mut self, kind: ResourceKind, key: &NaturalKey);

    /// Called when an item reaches its final status
    fn on_item_complete(&mut self, outcome: &ProvisioningOutcome);

    /// Called after each group membership attempt
    fn on_membership(&mut self, _outcome: &MembershipOutcome) {}

    /// Called when a stage completes
    fn on_stage_complete(&mut self, report: &StageReport);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_stage_start(&mut self, _stage: Stage, _count: usize) {}
    fn on_item_start(&mut self, _kind: ResourceKind, _key: &NaturalKey) {}
    fn on_item_complete(&mut self, _outcome: &ProvisioningOutcome) {}
    fn on_stage_complete(&mut self, _report: &StageReport) {}
}
