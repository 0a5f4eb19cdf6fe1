//! User info and existence checks

use crate::client::{join_url, require_id, Keycloak};
use crate::context::RequestContext;
use crate::error::AuthzError;
use serde::Deserialize;

/// Claims returned by the userinfo endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    /// Subject id of the user
    pub sub: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub preferred_username: Option<String>,

    #[serde(default)]
    pub given_name: Option<String>,

    #[serde(default)]
    pub family_name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

/// Users API handle
pub struct Users<'a> {
    pub(crate) client: &'a Keycloak,
}

impl<'a> Users<'a> {
    /// Fetch the claims of the user owning `user_access_token`
    pub async fn user_info(
        &self,
        ctx: &RequestContext,
        userinfo_endpoint: &str,
        user_access_token: &str,
    ) -> Result<UserInfo, AuthzError> {
        let request = self
            .client
            .authorized(reqwest::Method::GET, userinfo_endpoint, user_access_token)?;
        self.client.execute(ctx, request).await
    }

    /// Check that a user id is known to the realm
    ///
    /// Returns `Ok(false)` when the server reports the user missing.
    pub async fn user_exists(
        &self,
        ctx: &RequestContext,
        admin_endpoint: &str,
        subject_id: &str,
        pat: &str,
    ) -> Result<bool, AuthzError> {
        let url = join_url(admin_endpoint, &["users", require_id(subject_id, "User")?])?;
        let request = self.client.authorized(reqwest::Method::GET, &url, pat)?;

        match self.client.execute_empty(ctx, request).await {
            Ok(()) => Ok(true),
            Err(AuthzError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
