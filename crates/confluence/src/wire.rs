//! REST request and response bodies.

use provision::{Operation, PermissionEntry, SubjectType};
use serde::{Deserialize, Serialize};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct GroupRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct MemberRequest<'a> {
    pub username: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct StorageValue<'a> {
    pub value: &'a str,
    pub representation: &'static str,
}

impl<'a> StorageValue<'a> {
    pub fn storage(value: &'a str) -> Self {
        Self {
            value,
            representation: "storage",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SpaceRequest<'a> {
    pub key: &'a str,
    pub name: &'a str,
    pub description: StorageValue<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpaceRef<'a> {
    pub key: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdRef<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContentBody<'a> {
    pub storage: StorageValue<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContentRequest<'a> {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub title: &'a str,
    pub space: SpaceRef<'a>,
    pub body: ContentBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ancestors: Option<Vec<IdRef<'a>>>,
}

impl<'a> ContentRequest<'a> {
    pub fn new(content_type: &'static str, space: &'a str, title: &'a str, body: &'a str) -> Self {
        Self {
            content_type,
            title,
            space: SpaceRef { key: space },
            body: ContentBody {
                storage: StorageValue::storage(body),
            },
            ancestors: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<&'a str>) -> Self {
        self.ancestors = parent_id.map(|id| vec![IdRef { id }]);
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PermissionsRequest<'a> {
    pub permissions: Vec<WirePermission<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireSubject<'a> {
    #[serde(rename = "type")]
    pub subject_type: &'static str,
    pub identifier: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireOperation {
    pub key: &'static str,
    pub target: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePermission<'a> {
    pub subject: WireSubject<'a>,
    pub operation: WireOperation,
    pub anonymous_access: bool,
}

impl<'a> From<&'a PermissionEntry> for WirePermission<'a> {
    fn from(entry: &'a PermissionEntry) -> Self {
        Self {
            subject: WireSubject {
                subject_type: entry.subject_type.as_str(),
                identifier: &entry.subject_id,
            },
            operation: WireOperation {
                key: operation_key(entry.operation),
                target: entry.target_type.as_str(),
            },
            anonymous_access: entry.anonymous_access
                || entry.subject_type == SubjectType::Anonymous,
        }
    }
}

/// Confluence operation key for a permission operation
pub(crate) fn operation_key(operation: Operation) -> &'static str {
    match operation {
        Operation::Read => "read",
        Operation::Write => "create",
        Operation::Admin => "administer",
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Body of a created or fetched group, space or content item.
///
/// Spaces carry a numeric `id`, content a string one.
#[derive(Debug, Deserialize)]
pub(crate) struct Entity {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Entity {
    /// Remote id as a string, if present
    pub fn id(&self) -> Option<String> {
        match self.id.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentSearch {
    #[serde(default)]
    pub results: Vec<ContentResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentResult {
    pub id: String,
    pub title: String,
}

/// A user account.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Atlassian account id.
    #[serde(default)]
    pub account_id: Option<String>,
    /// Legacy username, when the site still exposes it.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Email, when visible to the caller.
    #[serde(default)]
    pub email: Option<String>,
}

/// Error body returned by the REST API.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Human-readable message from an error response body
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().chars().take(500).collect())
}
