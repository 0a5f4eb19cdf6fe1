//! User policies
//!
//! A policy names a set of users. Permissions attach policies to resources.
//! `logic` and `decision_strategy` are passed through to the server as-is;
//! this crate never evaluates them.
//!
//! # Example
//!
//! ```no_run
//! use keycloak_authz::{Keycloak, Policy, RequestContext};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Keycloak::new()?;
//! let ctx = RequestContext::new();
//! let clients = "https://sso.example.io/auth/admin/realms/fabric8/clients";
//!
//! let policy = Policy::users("space-1234-collaborators", ["user-a", "user-b"]);
//! let id = client.policies().create(&ctx, clients, "client-id", &policy, "pat").await?;
//!
//! let mut stored = client.policies().get(&ctx, clients, "client-id", &id, "pat").await?;
//! stored.config.user_ids = vec!["user-b".to_string()];
//! client.policies().update(&ctx, clients, "client-id", &stored, "pat").await?;
//! # Ok(())
//! # }
//! ```

use crate::client::{join_url, require_id, Keycloak};
use crate::codec::json_string_list;
use crate::context::RequestContext;
use crate::error::AuthzError;
use serde::{Deserialize, Serialize};

/// Policy type for explicit user lists
pub const POLICY_TYPE_USER: &str = "user";

// ============================================================================
// Shared Enumerations
// ============================================================================

/// Whether a matching policy grants or denies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Logic {
    #[default]
    Positive,
    Negative,
}

/// How the server combines several policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStrategy {
    /// Every policy must grant
    #[default]
    Unanimous,
    /// One granting policy is enough
    Affirmative,
    /// More grants than denies
    Consensus,
}

// ============================================================================
// Policy
// ============================================================================

/// Configuration of a user policy
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Users the policy matches, in order
    #[serde(rename = "users", with = "json_string_list", default)]
    pub user_ids: Vec<String>,
}

/// A policy record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Server-assigned id; `None` until created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(rename = "type")]
    pub policy_type: String,

    #[serde(default)]
    pub logic: Logic,

    #[serde(default)]
    pub decision_strategy: DecisionStrategy,

    #[serde(default)]
    pub config: PolicyConfig,
}

impl Policy {
    /// A positive, unanimous user policy
    pub fn users<I, S>(name: impl Into<String>, user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            name: name.into(),
            policy_type: POLICY_TYPE_USER.to_string(),
            logic: Logic::Positive,
            decision_strategy: DecisionStrategy::Unanimous,
            config: PolicyConfig {
                user_ids: user_ids.into_iter().map(Into::into).collect(),
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

/// Summary returned by list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct PolicySummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub policy_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Created {
    pub id: Option<String>,
}

/// `{clients}/{client_id}/authz/resource-server/policy[/{id}]`
pub(crate) fn policy_url(
    clients_endpoint: &str,
    client_id: &str,
    id: Option<&str>,
) -> Result<String, AuthzError> {
    let mut segments = vec![
        require_id(client_id, "Client")?,
        "authz",
        "resource-server",
        "policy",
    ];
    if let Some(id) = id {
        segments.push(require_id(id, "Policy")?);
    }
    join_url(clients_endpoint, &segments)
}

/// Check the `type` of a record loaded by id
pub(crate) fn expect_type(id: &str, actual: &str, expected: &str) -> Result<(), AuthzError> {
    if actual != expected {
        return Err(AuthzError::NotFound(format!(
            "No {} record with id {} (found type {:?})",
            expected, id, actual
        )));
    }
    Ok(())
}

/// Create any policy-shaped record and return its server id
pub(crate) async fn create_record<T: Serialize>(
    client: &Keycloak,
    ctx: &RequestContext,
    clients_endpoint: &str,
    client_id: &str,
    record: &T,
    pat: &str,
) -> Result<String, AuthzError> {
    let url = policy_url(clients_endpoint, client_id, None)?;
    let request = client
        .authorized(reqwest::Method::POST, &url, pat)?
        .json(record);
    let created: Created = client.execute(ctx, request).await?;

    created
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AuthzError::InvalidResponse("Create policy response has no id".to_string()))
}

/// Replace a policy-shaped record
pub(crate) async fn update_record<T: Serialize>(
    client: &Keycloak,
    ctx: &RequestContext,
    clients_endpoint: &str,
    client_id: &str,
    id: Option<&str>,
    record: &T,
    pat: &str,
) -> Result<(), AuthzError> {
    let url = policy_url(clients_endpoint, client_id, Some(id.unwrap_or_default()))?;
    let request = client
        .authorized(reqwest::Method::PUT, &url, pat)?
        .json(record);
    client.execute_empty(ctx, request).await
}

/// Delete a policy-shaped record
pub(crate) async fn delete_record(
    client: &Keycloak,
    ctx: &RequestContext,
    clients_endpoint: &str,
    client_id: &str,
    id: &str,
    pat: &str,
) -> Result<(), AuthzError> {
    let url = policy_url(clients_endpoint, client_id, Some(id))?;
    let request = client.authorized(reqwest::Method::DELETE, &url, pat)?;
    client.execute_empty(ctx, request).await
}

// ============================================================================
// Policies API
// ============================================================================

/// Policies API handle
pub struct Policies<'a> {
    pub(crate) client: &'a Keycloak,
}

impl<'a> Policies<'a> {
    /// Create a policy and return the id the server assigned
    pub async fn create(
        &self,
        ctx: &RequestContext,
        clients_endpoint: &str,
        client_id: &str,
        policy: &Policy,
        pat: &str,
    ) -> Result<String, AuthzError> {
        let body = Policy {
            id: None,
            ..policy.clone()
        };
        create_record(self.client, ctx, clients_endpoint, client_id, &body, pat).await
    }

    /// Load a user policy by id
    ///
    /// Fails with [`AuthzError::NotFound`] when the id does not exist or
    /// names a record of another type, such as a permission.
    pub async fn get(
        &self,
        ctx: &RequestContext,
        clients_endpoint: &str,
        client_id: &str,
        id: &str,
        pat: &str,
    ) -> Result<Policy, AuthzError> {
        let url = policy_url(clients_endpoint, client_id, Some(id))?;
        let request = self.client.authorized(reqwest::Method::GET, &url, pat)?;
        let policy: Policy = self.client.execute(ctx, request).await?;
        expect_type(id, &policy.policy_type, POLICY_TYPE_USER)?;
        Ok(policy)
    }

    /// Replace the policy identified by `policy.id`
    pub async fn update(
        &self,
        ctx: &RequestContext,
        clients_endpoint: &str,
        client_id: &str,
        policy: &Policy,
        pat: &str,
    ) -> Result<(), AuthzError> {
        update_record(
            self.client,
            ctx,
            clients_endpoint,
            client_id,
            policy.id.as_deref(),
            policy,
            pat,
        )
        .await
    }

    /// Delete a policy
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

    /// List up to `max` policies, excluding permissions
    pub async fn list(
        &self,
        ctx: &RequestContext,
        clients_endpoint: &str,
        client_id: &str,
        max: u32,
        pat: &str,
    ) -> Result<Vec<PolicySummary>, AuthzError> {
        let url = policy_url(clients_endpoint, client_id, None)?;
        let request = self
            .client
            .authorized(reqwest::Method::GET, &url, pat)?
            .query(&[
                ("first", "0".to_string()),
                ("max", max.to_string()),
                ("permission", "false".to_string()),
            ]);
        self.client.execute(ctx, request).await
    }
}
