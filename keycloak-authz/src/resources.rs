//! Protected resource sets
//!
//! A resource represents a domain entity (a space, for example) that needs
//! access control. Its id is assigned by the server on creation.
//!
//! # Example
//!
//! ```no_run
//! use keycloak_authz::{AuthzResource, Keycloak, RequestContext};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Keycloak::new()?;
//! let ctx = RequestContext::new();
//! let resource_set = "https://sso.example.io/auth/realms/fabric8/authz/protection/resource_set";
//!
//! let resource = AuthzResource::new("space-1234", "space")
//!     .uri("/spaces/1234")
//!     .scopes(["read:space", "admin:space"]);
//! let id = client.resources().create(&ctx, resource_set, &resource, "pat").await?;
//! client.resources().delete(&ctx, resource_set, &id, "pat").await?;
//! # Ok(())
//! # }
//! ```

use crate::client::{join_url, require_id, Keycloak};
use crate::context::RequestContext;
use crate::error::AuthzError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A protected resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzResource {
    /// Server-assigned id; `None` until created
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    /// Unique resource name, used in entitlement requests
    pub name: String,

    /// Resource type
    #[serde(rename = "type", default)]
    pub resource_type: String,

    /// Resource URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Scopes the resource can be accessed with
    #[serde(default, deserialize_with = "scopes::deserialize")]
    pub scopes: BTreeSet<String>,
}

impl AuthzResource {
    /// A resource with a name and type and nothing else
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            resource_type: resource_type.into(),
            uri: None,
            scopes: BTreeSet::new(),
        }
    }

    /// Set the resource URI
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Add scopes
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }
}

/// Scopes arrive either as names or as `{"name": ...}` objects
mod scopes {
    use serde::{Deserialize, Deserializer};
    use std::collections::BTreeSet;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scope {
        Name(String),
        Object { name: String },
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let scopes = Option::<Vec<Scope>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(scopes
            .into_iter()
            .map(|s| match s {
                Scope::Name(name) | Scope::Object { name } => name,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    #[serde(rename = "_id", alias = "id")]
    id: Option<String>,
}

/// Resource sets API handle
pub struct Resources<'a> {
    pub(crate) client: &'a Keycloak,
}

impl<'a> Resources<'a> {
    /// Create a resource and return the id the server assigned
    ///
    /// Any `id` already set on `resource` is not sent.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        resource_set_endpoint: &str,
        resource: &AuthzResource,
        pat: &str,
    ) -> Result<String, AuthzError> {
        let body = AuthzResource {
            id: None,
            ..resource.clone()
        };
        let request = self
            .client
            .authorized(reqwest::Method::POST, resource_set_endpoint, pat)?
            .json(&body);
        let raw = self.client.fetch(ctx, request).await?.success()?;

        let created: Option<CreatedResource> = if raw.body.trim().is_empty() {
            None
        } else {
            Some(raw.json()?)
        };

        created
            .and_then(|c| c.id)
            .filter(|id| !id.is_empty())
            .or_else(|| raw.location_id())
            .ok_or_else(|| {
                AuthzError::InvalidResponse("Create resource response has no id".to_string())
            })
    }

    /// Load a resource by id
    pub async fn get(
        &self,
        ctx: &RequestContext,
        resource_set_endpoint: &str,
        id: &str,
        pat: &str,
    ) -> Result<AuthzResource, AuthzError> {
        let url = join_url(resource_set_endpoint, &[require_id(id, "Resource")?])?;
        let request = self.client.authorized(reqwest::Method::GET, &url, pat)?;
        self.client.execute(ctx, request).await
    }

    /// List the ids of all resources
    pub async fn list(
        &self,
        ctx: &RequestContext,
        resource_set_endpoint: &str,
        pat: &str,
    ) -> Result<Vec<String>, AuthzError> {
        let request = self
            .client
            .authorized(reqwest::Method::GET, resource_set_endpoint, pat)?;
        self.client.execute(ctx, request).await
    }

    /// Delete a resource
    ///
    /// Fails with [`AuthzError::NotFound`] when the id does not exist.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        resource_set_endpoint: &str,
        id: &str,
        pat: &str,
    ) -> Result<(), AuthzError> {
        let url = join_url(resource_set_endpoint, &[require_id(id, "Resource")?])?;
        let request = self.client.authorized(reqwest::Method::DELETE, &url, pat)?;
        self.client.execute_empty(ctx, request).await
    }
}
