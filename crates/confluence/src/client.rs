//! Blocking REST client.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::wire::{
    self, ContentRequest, ContentSearch, Entity, GroupRequest, MemberRequest, PermissionsRequest,
    SpaceRequest, StorageValue, User, WirePermission,
};
use log::debug;
use provision::{
    Attributes, ClientError, NaturalKey, PermissionEntry, ResourceClient, ResourceHandle,
    ResourceKind, TargetType,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use urlencoding::encode;

type HttpResult = std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>;

/// Confluence Cloud client.
///
/// Implements [`ResourceClient`] over the `/wiki/rest/api` endpoints.
/// Confluence Cloud has no API for creating user accounts, so the users
/// stage runs in verification mode against this client.
///
/// # Example
///
/// ```no_run
/// use confluence::{ClientConfig, ConfluenceClient};
///
/// let config = ClientConfig::from_env()?;
/// let client = ConfluenceClient::new(config);
/// client.probe()?;
/// # Ok::<(), confluence::Error>(())
/// ```
pub struct ConfluenceClient {
    agent: ureq::Agent,
    config: ClientConfig,
    authorization: String,
}

impl ConfluenceClient {
    /// Create a client for the configured site.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            authorization: config.authorization(),
            config,
        }
    }

    /// Create a client from the `CONFLUENCE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] when a variable is absent.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    /// Get the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check that the site is reachable and the credentials are accepted.
    ///
    /// # Errors
    ///
    /// Returns the classified request failure.
    pub fn probe(&self) -> Result<()> {
        self.get("space", &[("limit", "1")]).map(|_| ())
    }

    /// Fetch the account the client authenticates as.
    ///
    /// # Errors
    ///
    /// Returns the classified request failure.
    pub fn current_user(&self) -> Result<User> {
        let endpoint = "user/current";
        let body = self.get(endpoint, &[])?;
        decode(endpoint, &body)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = self.config.api_url(endpoint);
        debug!("GET {url} {query:?}");

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        finish(endpoint, request.call())
    }

    fn post<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<String> {
        let url = self.config.api_url(endpoint);
        debug!("POST {url}");

        let result = self
            .agent
            .post(&url)
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json")
            .send_json(body);
        finish(endpoint, result)
    }

    fn create_content(
        &self,
        kind: ResourceKind,
        request: &ContentRequest<'_>,
    ) -> Result<ResourceHandle> {
        let endpoint = "content";
        let body = self.post(endpoint, request)?;
        let entity: Entity = decode(endpoint, &body)?;
        let id = entity.id().ok_or_else(|| Error::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: "created content has no id".to_string(),
        })?;
        Ok(ResourceHandle::new(
            kind,
            NaturalKey::in_space(request.space.key, request.title),
            id,
        ))
    }

    fn find_content(&self, kind: ResourceKind, space: &str, title: &str) -> Result<ResourceHandle> {
        let endpoint = "content";
        let content_type = content_type(kind);
        let body = self.get(
            endpoint,
            &[("spaceKey", space), ("title", title), ("type", content_type)],
        )?;
        let search: ContentSearch = decode(endpoint, &body)?;
        search
            .results
            .into_iter()
            .find(|r| r.title == title)
            .map(|r| ResourceHandle::new(kind, NaturalKey::in_space(space, title), r.id))
            .ok_or_else(|| Error::Status {
                status: 404,
                endpoint: endpoint.to_string(),
                message: format!("no {content_type} titled '{title}' in space {space}"),
            })
    }
}

impl ResourceClient for ConfluenceClient {
    fn supports_user_creation(&self) -> bool {
        false
    }

    fn ensure_user(
        &self,
        username: &str,
        _attributes: &Attributes,
    ) -> std::result::Result<ResourceHandle, ClientError> {
        Err(ClientError::permanent(format!(
            "cannot create user '{username}': Confluence Cloud accounts are managed \
             in the Atlassian admin console"
        )))
    }

    fn ensure_group(&self, name: &str) -> std::result::Result<ResourceHandle, ClientError> {
        let endpoint = "group";
        let body = self.post(endpoint, &GroupRequest { name })?;
        let entity: Entity = decode(endpoint, &body)?;
        let id = entity.id().unwrap_or_else(|| name.to_string());
        Ok(ResourceHandle::new(ResourceKind::Group, NaturalKey::name(name), id))
    }

    fn add_member(&self, group: &str, username: &str) -> std::result::Result<(), ClientError> {
        let endpoint = format!("group/{}/member", encode(group));
        self.post(&endpoint, &MemberRequest { username })?;
        Ok(())
    }

    fn ensure_space(
        &self,
        key: &str,
        attributes: &Attributes,
    ) -> std::result::Result<ResourceHandle, ClientError> {
        let endpoint = "space";
        let request = SpaceRequest {
            key,
            name: attributes.display_name.as_deref().unwrap_or(key),
            description: StorageValue::storage(attributes.description.as_deref().unwrap_or("")),
        };
        let body = self.post(endpoint, &request)?;
        let entity: Entity = decode(endpoint, &body)?;
        let key = entity.key.as_deref().unwrap_or(key);
        // Spaces are addressed by key, not by numeric id
        Ok(ResourceHandle::new(ResourceKind::Space, NaturalKey::name(key), key))
    }

    fn apply_permissions(
        &self,
        target: TargetType,
        target_id: &str,
        entries: &[PermissionEntry],
    ) -> std::result::Result<(), ClientError> {
        if entries.is_empty() {
            return Ok(());
        }
        let endpoint = match target {
            TargetType::Space => format!("space/{}/permission", encode(target_id)),
            TargetType::Content => format!("content/{}/permission", encode(target_id)),
        };
        let request = PermissionsRequest {
            permissions: entries.iter().map(WirePermission::from).collect(),
        };
        self.post(&endpoint, &request)?;
        Ok(())
    }

    fn ensure_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> std::result::Result<ResourceHandle, ClientError> {
        let request = ContentRequest::new("page", space, title, body).with_parent(parent_id);
        Ok(self.create_content(ResourceKind::Page, &request)?)
    }

    fn ensure_blog_post(
        &self,
        space: &str,
        title: &str,
        body: &str,
    ) -> std::result::Result<ResourceHandle, ClientError> {
        let request = ContentRequest::new("blogpost", space, title, body);
        Ok(self.create_content(ResourceKind::BlogPost, &request)?)
    }

    fn lookup(
        &self,
        kind: ResourceKind,
        key: &NaturalKey,
    ) -> std::result::Result<ResourceHandle, ClientError> {
        let handle = match (kind, key) {
            (ResourceKind::User, NaturalKey::Name(username)) => {
                let endpoint = "user";
                let body = self.get(endpoint, &[("username", username.as_str())])?;
                let user: User = decode(endpoint, &body)?;
                let id = user.account_id.unwrap_or_else(|| username.clone());
                ResourceHandle::new(kind, key.clone(), id)
            }
            (ResourceKind::Group, NaturalKey::Name(name)) => {
                let endpoint = format!("group/{}", encode(name));
                let body = self.get(&endpoint, &[])?;
                let entity: Entity = decode(&endpoint, &body)?;
                let id = entity
                    .id()
                    .or(entity.name)
                    .unwrap_or_else(|| name.clone());
                ResourceHandle::new(kind, key.clone(), id)
            }
            (ResourceKind::Space, NaturalKey::Name(space)) => {
                self.get(&format!("space/{}", encode(space)), &[])?;
                ResourceHandle::new(kind, key.clone(), space.clone())
            }
            (ResourceKind::Page | ResourceKind::BlogPost, NaturalKey::InSpace { space, title }) => {
                self.find_content(kind, space, title)?
            }
            _ => {
                return Err(ClientError::permanent(format!(
                    "'{key}' is not a valid {kind} key"
                )));
            }
        };
        Ok(handle)
    }
}

fn content_type(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::BlogPost => "blogpost",
        _ => "page",
    }
}

/// Read the response body, turning non-2xx statuses into errors.
fn finish(endpoint: &str, result: HttpResult) -> Result<String> {
    let mut response = result.map_err(|e| Error::transport(endpoint, e))?;
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| Error::transport(endpoint, e))?;

    if (200..300).contains(&status) {
        return Ok(body);
    }
    let err = Error::Status {
        status,
        endpoint: endpoint.to_string(),
        message: wire::error_message(&body),
    };
    debug!("{err}");
    Err(err)
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T> {
    // Some endpoints answer 2xx with an empty body
    let body = if body.trim().is_empty() { "{}" } else { body };
    serde_json::from_str(body).map_err(|e| Error::InvalidResponse {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
