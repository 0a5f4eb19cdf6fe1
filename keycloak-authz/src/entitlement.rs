//! Entitlement evaluation
//!
//! Asks the server whether an end user may access a set of named resources.
//! Every call goes to the server; decisions are never cached.
//!
//! # Example
//!
//! ```no_run
//! use keycloak_authz::{EntitlementRequest, Keycloak, RequestContext};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Keycloak::new()?;
//! let ctx = RequestContext::new();
//! let endpoint = "https://sso.example.io/auth/realms/fabric8/authz/entitlement/fabric8-online-platform";
//!
//! let request = EntitlementRequest::for_resources(["space-1234"]);
//! match client.entitlements().evaluate(&ctx, endpoint, &request, "user-token").await {
//!     Ok(_grant) => println!("allowed"),
//!     Err(e) if e.is_unauthorized() => println!("denied"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::Keycloak;
use crate::context::RequestContext;
use crate::error::AuthzError;
use serde::{Deserialize, Serialize};

/// A named resource set in an entitlement request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSet {
    #[serde(rename = "resource_set_name")]
    pub name: String,
}

/// Resources an end user asks to access
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntitlementRequest {
    pub permissions: Vec<ResourceSet>,
}

impl EntitlementRequest {
    pub fn for_resources<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permissions: names
                .into_iter()
                .map(|name| ResourceSet { name: name.into() })
                .collect(),
        }
    }
}

/// An opaque grant (requesting party token)
///
/// Holding one means the server allowed the requested resources at the
/// time of the call.
#[derive(Clone, PartialEq, Eq)]
pub struct Entitlement {
    rpt: String,
}

impl Entitlement {
    /// The requesting party token
    pub fn rpt(&self) -> &str {
        &self.rpt
    }

    pub fn into_rpt(self) -> String {
        self.rpt
    }
}

impl std::fmt::Debug for Entitlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entitlement")
            .field("rpt", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct EntitlementResponse {
    rpt: Option<String>,
}

/// Entitlements API handle
pub struct Entitlements<'a> {
    pub(crate) client: &'a Keycloak,
}

impl<'a> Entitlements<'a> {
    /// Evaluate an entitlement under the end user's token
    ///
    /// `Ok` means allowed. A denial, or a rejected user token, is
    /// [`AuthzError::Unauthorized`] and must be treated as a plain deny.
    pub async fn evaluate(
        &self,
        ctx: &RequestContext,
        entitlement_endpoint: &str,
        request: &EntitlementRequest,
        user_access_token: &str,
    ) -> Result<Entitlement, AuthzError> {
        let http_request = self
            .client
            .authorized(reqwest::Method::POST, entitlement_endpoint, user_access_token)?
            .json(request);
        let response: EntitlementResponse = self.client.execute(ctx, http_request).await?;

        response
            .rpt
            .filter(|rpt| !rpt.is_empty())
            .map(|rpt| Entitlement { rpt })
            .ok_or_else(|| {
                AuthzError::InvalidResponse("Entitlement response has no rpt".to_string())
            })
    }
}
