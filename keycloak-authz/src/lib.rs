//! Keycloak authorization services client
//!
//! This crate manages fine-grained authorization state on a Keycloak server
//! (protected resources, user policies, resource permissions) and evaluates
//! entitlements for end users against it.
//!
//! Every operation is a single HTTP round trip: no token caching, no local
//! policy evaluation, no internal retries. Each call takes a
//! [`RequestContext`] that can cancel it or give it a deadline.
//!
//! # Quick Start
//!
//! ```no_run
//! // Requires KEYCLOAK_URL, KEYCLOAK_CLIENT_ID and KEYCLOAK_SECRET
//! use keycloak_authz::{
//!     AuthzResource, EntitlementRequest, Keycloak, KeycloakConfig, Permission, Policy,
//!     RequestContext,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = KeycloakConfig::from_env()?;
//! let endpoints = config.endpoints();
//! let client = Keycloak::new()?;
//! let ctx = RequestContext::new();
//!
//! // Protected API token for the service account
//! let pat = client
//!     .tokens()
//!     .service_token(&ctx, &endpoints.token, &config.credentials())
//!     .await?;
//! let pat = pat.access_token();
//!
//! let client_id = client
//!     .clients()
//!     .resolve_client_id(&ctx, &endpoints.clients, &config.client_id, pat)
//!     .await?;
//!
//! // Protect a space and let two users in
//! let resource_id = client
//!     .resources()
//!     .create(&ctx, &endpoints.resource_set, &AuthzResource::new("space-1234", "space"), pat)
//!     .await?;
//! let policy_id = client
//!     .policies()
//!     .create(&ctx, &endpoints.clients, &client_id, &Policy::users("space-1234", ["alice-id", "bob-id"]), pat)
//!     .await?;
//! let permission = Permission::resource("space-1234", [resource_id.as_str()], [policy_id.as_str()]);
//! client
//!     .permissions()
//!     .create(&ctx, &endpoints.clients, &client_id, &permission, pat)
//!     .await?;
//!
//! // Later, with an end-user token
//! let request = EntitlementRequest::for_resources(["space-1234"]);
//! let allowed = client
//!     .entitlements()
//!     .evaluate(&ctx, &endpoints.entitlement, &request, "alice-access-token")
//!     .await
//!     .is_ok();
//! println!("allowed: {}", allowed);
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! All operations return [`AuthzError`]. Use [`AuthzError::kind`] (or the
//! `is_*` helpers) to branch on the outcome:
//!
//! | HTTP status | [`ErrorKind`] |
//! |---|---|
//! | 404 | `NotFound` |
//! | 400, 422 | `BadParameter` |
//! | 401, 403 | `Unauthorized` |
//! | other non-2xx, transport failure, bad body | `Internal` |
//! | context canceled or past deadline | `Canceled` |
//!
//! Token endpoints report every 4xx as `Unauthorized`.

mod client;
mod clients;
pub mod codec;
mod config;
mod context;
mod entitlement;
mod error;
mod permissions;
mod policies;
mod resources;
pub mod retry;
mod tokens;
mod users;

// Client
pub use client::{Keycloak, KeycloakBuilder};

// API handles
pub use clients::{ClientRepresentation, Clients};
pub use entitlement::{Entitlement, EntitlementRequest, Entitlements, ResourceSet};
pub use permissions::{Permission, PermissionConfig, Permissions, PERMISSION_TYPE_RESOURCE};
pub use policies::{
    DecisionStrategy, Logic, Policies, Policy, PolicyConfig, PolicySummary, POLICY_TYPE_USER,
};
pub use resources::{AuthzResource, Resources};
pub use tokens::{parse_token_response, ClientCredentials, Token, Tokens};
pub use users::{UserInfo, Users};

// Configuration and context
pub use config::{Endpoints, KeycloakConfig, DEFAULT_REALM};
pub use context::RequestContext;

// Errors
pub use error::{ApiErrorResponse, AuthzError, ErrorKind};

// Re-exported so callers can build contexts without a direct dependency
pub use tokio_util::sync::CancellationToken;
