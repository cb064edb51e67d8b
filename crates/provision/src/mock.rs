//! In-memory resource client
//!
//! [`MockClient`] behaves like a small, well-mannered remote service: it
//! reports `AlreadyExists` for duplicate creations, `NotFound` for missing
//! references, records every call, and can be told to fail specific calls.
//! It backs the orchestrator tests and the CLI's offline mode.
//!
//! ```
//! use provision::{ClientError, MockClient, MockOp, ResourceClient};
//!
//! let mock = MockClient::new();
//! mock.fail(MockOp::EnsureGroup, "ops", ClientError::permanent("quota"));
//!
//! assert!(mock.ensure_group("ops").is_err());
//! assert!(mock.ensure_group("dev").is_ok());
//! assert_eq!(mock.calls().len(), 2);
//! ```

use crate::context::ResourceClient;
use crate::error::ClientError;
use crate::policy::{PermissionEntry, SubjectType};
use crate::types::{Attributes, NaturalKey, ResourceHandle, ResourceKind, TargetType};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Client operation, as recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    EnsureUser,
    EnsureGroup,
    AddMember,
    EnsureSpace,
    ApplyPermissions,
    EnsurePage,
    EnsureBlogPost,
    Lookup(ResourceKind),
}

impl MockOp {
    /// Whether the operation changes remote state
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Lookup(_))
    }
}

/// One recorded client call
///
/// `target` is the username, group name, space key, content id (for
/// permissions), `group/user` (for memberships) or `SPACE/title` (for
/// content and content lookups).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub op: MockOp,
    pub target: String,
}

impl fmt::Display for MockCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.op, self.target)
    }
}

#[derive(Debug)]
struct Injected {
    op: MockOp,
    target: String,
    error: ClientError,
    /// Remaining failures; `None` fails forever
    remaining: Option<usize>,
}

#[derive(Debug, Clone)]
struct Content {
    id: String,
    parent: Option<String>,
}

#[derive(Debug)]
struct MockState {
    user_creation: bool,
    next_id: u64,
    users: BTreeMap<String, String>,
    groups: BTreeMap<String, String>,
    spaces: BTreeMap<String, String>,
    content: HashMap<(ResourceKind, String, String), Content>,
    members: BTreeMap<String, Vec<String>>,
    permissions: HashMap<String, Vec<PermissionEntry>>,
    failures: Vec<Injected>,
    calls: Vec<MockCall>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            user_creation: true,
            next_id: 1,
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
            spaces: BTreeMap::new(),
            content: HashMap::new(),
            members: BTreeMap::new(),
            permissions: HashMap::new(),
            failures: Vec::new(),
            calls: Vec::new(),
        }
    }
}

impl MockState {
    fn id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Log the call and return an injected failure, if one matches
    fn enter(&mut self, op: MockOp, target: String) -> Result<(), ClientError> {
        let injected = self
            .failures
            .iter_mut()
            .find(|f| f.op == op && f.target == target && f.remaining != Some(0));
        let result = match injected {
            Some(failure) => {
                if let Some(remaining) = failure.remaining.as_mut() {
                    *remaining -= 1;
                }
                Err(failure.error.clone())
            }
            None => Ok(()),
        };
        self.calls.push(MockCall { op, target });
        result
    }

    fn content_exists(&self, id: &str) -> bool {
        self.content.values().any(|c| c.id == id)
    }
}

/// In-memory [`ResourceClient`] with a call log and failure injection
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    /// Create an empty mock service that can create users
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Behave like a service where accounts are created by an operator
    #[must_use]
    pub fn without_user_creation(self) -> Self {
        self.state().user_creation = false;
        self
    }

    /// Seed an existing user account
    #[must_use]
    pub fn with_existing_user(self, username: &str) -> Self {
        {
            let mut state = self.state();
            let id = state.id("user");
            state.users.insert(username.to_string(), id);
        }
        self
    }

    /// Seed an existing group
    #[must_use]
    pub fn with_existing_group(self, name: &str) -> Self {
        {
            let mut state = self.state();
            let id = state.id("group");
            state.groups.insert(name.to_string(), id);
        }
        self
    }

    /// Seed an existing space
    #[must_use]
    pub fn with_existing_space(self, key: &str) -> Self {
        self.state().spaces.insert(key.to_string(), key.to_string());
        self
    }

    /// Seed an existing page
    #[must_use]
    pub fn with_existing_page(self, space: &str, title: &str) -> Self {
        {
            let mut state = self.state();
            let id = state.id("content");
            state.content.insert(
                (ResourceKind::Page, space.to_string(), title.to_string()),
                Content { id, parent: None },
            );
        }
        self
    }

    /// Fail every matching call with `error`
    pub fn fail(&self, op: MockOp, target: &str, error: ClientError) {
        self.inject(op, target, error, None);
    }

    /// Fail the next `times` matching calls with `error`
    pub fn fail_times(&self, op: MockOp, target: &str, error: ClientError, times: usize) {
        self.inject(op, target, error, Some(times));
    }

    fn inject(&self, op: MockOp, target: &str, error: ClientError, remaining: Option<usize>) {
        self.state().failures.push(Injected {
            op,
            target: target.to_string(),
            error,
            remaining,
        });
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Number of calls of one operation
    pub fn count(&self, op: MockOp) -> usize {
        self.state().calls.iter().filter(|c| c.op == op).count()
    }

    /// Forget the call log, keeping remote state
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Usernames of existing accounts
    pub fn users(&self) -> Vec<String> {
        self.state().users.keys().cloned().collect()
    }

    /// Names of existing groups
    pub fn groups(&self) -> Vec<String> {
        self.state().groups.keys().cloned().collect()
    }

    /// Keys of existing spaces
    pub fn spaces(&self) -> Vec<String> {
        self.state().spaces.keys().cloned().collect()
    }

    /// Members of a group, in the order they were added
    pub fn members(&self, group: &str) -> Vec<String> {
        self.state().members.get(group).cloned().unwrap_or_default()
    }

    /// Permission entries applied to a space key or content id
    pub fn permissions_for(&self, target_id: &str) -> Vec<PermissionEntry> {
        self.state()
            .permissions
            .get(target_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Id of a content item
    pub fn content_id(&self, kind: ResourceKind, space: &str, title: &str) -> Option<String> {
        self.state()
            .content
            .get(&(kind, space.to_string(), title.to_string()))
            .map(|c| c.id.clone())
    }

    /// Parent id of a page
    pub fn parent_of(&self, space: &str, title: &str) -> Option<String> {
        self.state()
            .content
            .get(&(ResourceKind::Page, space.to_string(), title.to_string()))
            .and_then(|c| c.parent.clone())
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_content(
        &self,
        kind: ResourceKind,
        space: &str,
        title: &str,
        parent_id: Option<&str>,
    ) -> Result<ResourceHandle, ClientError> {
        let op = if kind == ResourceKind::Page {
            MockOp::EnsurePage
        } else {
            MockOp::EnsureBlogPost
        };
        let mut state = self.state();
        state.enter(op, format!("{space}/{title}"))?;

        if !state.spaces.contains_key(space) {
            return Err(ClientError::not_found(format!("no space with key '{space}'")));
        }
        if let Some(parent) = parent_id {
            if !state.content_exists(parent) {
                return Err(ClientError::not_found(format!("no content with id '{parent}'")));
            }
        }
        let key = (kind, space.to_string(), title.to_string());
        if state.content.contains_key(&key) {
            return Err(ClientError::already_exists(format!(
                "a {kind} with the same TITLE already exists in space '{space}'"
            )));
        }

        let id = state.id("content");
        state.content.insert(
            key,
            Content {
                id: id.clone(),
                parent: parent_id.map(str::to_string),
            },
        );
        Ok(ResourceHandle::new(kind, NaturalKey::in_space(space, title), id))
    }
}

impl ResourceClient for MockClient {
    fn supports_user_creation(&self) -> bool {
        self.state().user_creation
    }

    fn ensure_user(
        &self,
        username: &str,
        _attributes: &Attributes,
    ) -> Result<ResourceHandle, ClientError> {
        let mut state = self.state();
        state.enter(MockOp::EnsureUser, username.to_string())?;

        if !state.user_creation {
            return Err(ClientError::permanent("user creation is not supported"));
        }
        if state.users.contains_key(username) {
            return Err(ClientError::already_exists(format!(
                "user '{username}' already exists"
            )));
        }
        let id = state.id("user");
        state.users.insert(username.to_string(), id.clone());
        Ok(ResourceHandle::new(ResourceKind::User, NaturalKey::name(username), id))
    }

    fn ensure_group(&self, name: &str) -> Result<ResourceHandle, ClientError> {
        let mut state = self.state();
        state.enter(MockOp::EnsureGroup, name.to_string())?;

        if state.groups.contains_key(name) {
            return Err(ClientError::already_exists(format!("group '{name}' already exists")));
        }
        let id = state.id("group");
        state.groups.insert(name.to_string(), id.clone());
        Ok(ResourceHandle::new(ResourceKind::Group, NaturalKey::name(name), id))
    }

    fn add_member(&self, group: &str, username: &str) -> Result<(), ClientError> {
        let mut state = self.state();
        state.enter(MockOp::AddMember, format!("{group}/{username}"))?;

        if !state.groups.contains_key(group) {
            return Err(ClientError::not_found(format!("no group named '{group}'")));
        }
        if !state.users.contains_key(username) {
            return Err(ClientError::not_found(format!("no user named '{username}'")));
        }
        let members = state.members.entry(group.to_string()).or_default();
        if !members.iter().any(|m| m == username) {
            members.push(username.to_string());
        }
        Ok(())
    }

    fn ensure_space(
        &self,
        key: &str,
        _attributes: &Attributes,
    ) -> Result<ResourceHandle, ClientError> {
        let mut state = self.state();
        state.enter(MockOp::EnsureSpace, key.to_string())?;

        if state.spaces.contains_key(key) {
            return Err(ClientError::already_exists(format!(
                "A space with key {key} already exists"
            )));
        }
        state.spaces.insert(key.to_string(), key.to_string());
        Ok(ResourceHandle::new(ResourceKind::Space, NaturalKey::name(key), key))
    }

    fn apply_permissions(
        &self,
        target: TargetType,
        target_id: &str,
        entries: &[PermissionEntry],
    ) -> Result<(), ClientError> {
        let mut state = self.state();
        state.enter(MockOp::ApplyPermissions, target_id.to_string())?;

        let exists = match target {
            TargetType::Space => state.spaces.contains_key(target_id),
            TargetType::Content => state.content_exists(target_id),
        };
        if !exists {
            return Err(ClientError::not_found(format!("no {target} with id '{target_id}'")));
        }
        for entry in entries {
            let known = match entry.subject_type {
                SubjectType::User => state.users.contains_key(&entry.subject_id),
                SubjectType::Group => state.groups.contains_key(&entry.subject_id),
                SubjectType::Anonymous => true,
            };
            if !known {
                return Err(ClientError::not_found(format!(
                    "unknown {} '{}'",
                    entry.subject_type, entry.subject_id
                )));
            }
        }

        state
            .permissions
            .entry(target_id.to_string())
            .or_default()
            .extend_from_slice(entries);
        Ok(())
    }

    fn ensure_page(
        &self,
        space: &str,
        title: &str,
        _body: &str,
        parent_id: Option<&str>,
    ) -> Result<ResourceHandle, ClientError> {
        self.ensure_content(ResourceKind::Page, space, title, parent_id)
    }

    fn ensure_blog_post(
        &self,
        space: &str,
        title: &str,
        _body: &str,
    ) -> Result<ResourceHandle, ClientError> {
        self.ensure_content(ResourceKind::BlogPost, space, title, None)
    }

    fn lookup(&self, kind: ResourceKind, key: &NaturalKey) -> Result<ResourceHandle, ClientError> {
        let mut state = self.state();
        state.enter(MockOp::Lookup(kind), key.to_string())?;

        let id = match (kind, key) {
            (ResourceKind::User, NaturalKey::Name(name)) => state.users.get(name).cloned(),
            (ResourceKind::Group, NaturalKey::Name(name)) => state.groups.get(name).cloned(),
            (ResourceKind::Space, NaturalKey::Name(name)) => state.spaces.get(name).cloned(),
            (ResourceKind::Page | ResourceKind::BlogPost, NaturalKey::InSpace { space, title }) => {
                state
                    .content
                    .get(&(kind, space.clone(), title.clone()))
                    .map(|c| c.id.clone())
            }
            _ => None,
        };
        id.map(|id| ResourceHandle::new(kind, key.clone(), id))
            .ok_or_else(|| ClientError::not_found(format!("no {kind} '{key}'")))
    }
}
