//! Resource permissions
//!
//! A permission binds resources to policies. Keycloak stores permissions on
//! the policy endpoint with type `resource`, so the URLs are shared with
//! [`crate::policies`].

use crate::client::Keycloak;
use crate::codec::json_string_list;
use crate::context::RequestContext;
use crate::error::AuthzError;
use crate::policies::{create_record, delete_record, expect_type, policy_url, update_record};
use crate::policies::{DecisionStrategy, Logic};
use serde::{Deserialize, Serialize};

/// Permission type for resource-based permissions
pub const PERMISSION_TYPE_RESOURCE: &str = "resource";

/// Configuration of a resource permission
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionConfig {
    /// Resources the permission protects
    #[serde(rename = "resources", with = "json_string_list", default)]
    pub resource_ids: Vec<String>,

    /// Policies applied to those resources
    #[serde(rename = "applyPolicies", with = "json_string_list", default)]
    pub policy_ids: Vec<String>,
}

/// A permission record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Server-assigned id; `None` until created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(rename = "type")]
    pub permission_type: String,

    #[serde(default)]
    pub logic: Logic,

    #[serde(default)]
    pub decision_strategy: DecisionStrategy,

    #[serde(default)]
    pub config: PermissionConfig,
}

impl Permission {
    /// A positive, unanimous resource permission
    pub fn resource<R, P, S>(name: impl Into<String>, resource_ids: R, policy_ids: P) -> Self
    where
        R: IntoIterator<Item = S>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            name: name.into(),
            permission_type: PERMISSION_TYPE_RESOURCE.to_string(),
            logic: Logic::Positive,
            decision_strategy: DecisionStrategy::Unanimous,
            config: PermissionConfig {
                resource_ids: resource_ids.into_iter().map(Into::into).collect(),
                policy_ids: policy_ids.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn logic(mut self, logic: Logic) -> Self {
        self.logic = logic;
        self
    }

    pub fn decision_strategy(mut self, strategy: DecisionStrategy) -> Self {
        self.decision_strategy = strategy;
        self
    }
}

/// Permissions API handle
pub struct Permissions<'a> {
    pub(crate) client: &'a Keycloak,
}

impl<'a> Permissions<'a> {
    /// Create a permission and return the id the server assigned
    ///
    /// Referenced resources and policies must already exist; the server
    /// rejects unknown ids with [`AuthzError::BadParameter`].
    pub async fn create(
        &self,
        ctx: &RequestContext,
        clients_endpoint: &str,
        client_id: &str,
        permission: &Permission,
        pat: &str,
    ) -> Result<String, AuthzError> {
        let body = Permission {
            id: None,
            ..permission.clone()
        };
        create_record(self.client, ctx, clients_endpoint, client_id, &body, pat).await
    }

    /// Load a resource permission by id
    ///
    /// A user policy under the same id is reported as [`AuthzError::NotFound`].
    pub async fn get(
        &self,
        ctx: &RequestContext,
        clients_endpoint: &str,
        client_id: &str,
        id: &str,
        pat: &str,
    ) -> Result<Permission, AuthzError> {
        let url = policy_url(clients_endpoint, client_id, Some(id))?;
        let request = self.client.authorized(reqwest::Method::GET, &url, pat)?;
        let permission: Permission = self.client.execute(ctx, request).await?;
        expect_type(id, &permission.permission_type, PERMISSION_TYPE_RESOURCE)?;
        Ok(permission)
    }

    /// Replace the permission identified by `permission.id`
    pub async fn update(
        &self,
        ctx: &RequestContext,
        clients_endpoint: &str,
        client_id: &str,
        permission: &Permission,
        pat: &str,
    ) -> Result<(), AuthzError> {
        update_record(
            self.client,
            ctx,
            clients_endpoint,
            client_id,
            permission.id.as_deref(),
            permission,
            pat,
        )
        .await
    }

    /// Delete a permission
    ///
    /// Fails with [`AuthzError::NotFound`] when the id does not exist.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        clients_endpoint: &str,
        client_id: &str,
        id: &str,
        pat: &str,
    ) -> Result<(), AuthzError> {
        delete_record(self.client, ctx, clients_endpoint, client_id, id, pat).await
    }
}
