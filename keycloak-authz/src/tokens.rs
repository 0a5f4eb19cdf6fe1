//! Token acquisition
//!
//! Each call performs a fresh token request. Tokens are not cached and not
//! refreshed automatically; `expires_in` and `refresh_expires_in` are
//! informational.
//!
//! # Example
//!
//! ```no_run
//! use keycloak_authz::{ClientCredentials, Keycloak, RequestContext};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Keycloak::new()?;
//! let ctx = RequestContext::new();
//! let credentials = ClientCredentials::new("fabric8-online-platform", "secret");
//!
//! let pat = client
//!     .tokens()
//!     .service_token(&ctx, "https://sso.example.io/auth/realms/fabric8/protocol/openid-connect/token", &credentials)
//!     .await?;
//! println!("expires in {:?}s", pat.expires_in);
//! # Ok(())
//! # }
//! ```

use crate::client::Keycloak;
use crate::context::RequestContext;
use crate::error::AuthzError;
use serde::Deserialize;

/// A bearer token issued by the token endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// The access token itself
    pub access_token: String,

    /// Lifetime of the access token in seconds
    pub expires_in: Option<i64>,

    /// Refresh token, if one was issued
    pub refresh_token: Option<String>,

    /// Lifetime of the refresh token in seconds
    pub refresh_expires_in: Option<i64>,

    /// Token type, normally `bearer`
    pub token_type: Option<String>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("refresh_expires_in", &self.refresh_expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Token document as it appears on the wire; every field may be absent
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    refresh_expires_in: Option<i64>,
    token_type: Option<String>,
}

impl Token {
    /// Parse a raw token endpoint response body
    ///
    /// Fails with [`AuthzError::InvalidResponse`] when the body is not a
    /// token document or carries no access token.
    pub fn from_json(body: &str) -> Result<Self, AuthzError> {
        let raw: TokenResponse = serde_json::from_str(body).map_err(|e| {
            AuthzError::InvalidResponse(format!("Failed to parse token response: {}", e))
        })?;

        let access_token = raw
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AuthzError::InvalidResponse("Token response has no access_token".to_string())
            })?;

        Ok(Self {
            access_token,
            expires_in: raw.expires_in,
            refresh_token: raw.refresh_token,
            refresh_expires_in: raw.refresh_expires_in,
            token_type: raw.token_type,
        })
    }

    /// The access token as a string slice
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

/// Parse a raw token endpoint response body
///
/// Shorthand for [`Token::from_json`].
pub fn parse_token_response(body: &str) -> Result<Token, AuthzError> {
    Token::from_json(body)
}

/// Client id and secret of a confidential client
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Tokens API handle
pub struct Tokens<'a> {
    pub(crate) client: &'a Keycloak,
}

impl<'a> Tokens<'a> {
    /// Obtain a protected API token with the client credentials grant
    pub async fn service_token(
        &self,
        ctx: &RequestContext,
        token_endpoint: &str,
        credentials: &ClientCredentials,
    ) -> Result<Token, AuthzError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];
        self.request_token(ctx, token_endpoint, &form).await
    }

    /// Obtain an end-user token with the resource owner password grant
    pub async fn user_token(
        &self,
        ctx: &RequestContext,
        token_endpoint: &str,
        credentials: &ClientCredentials,
        username: &str,
        password: &str,
    ) -> Result<Token, AuthzError> {
        let form = [
            ("grant_type", "password"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("username", username),
            ("password", password),
        ];
        self.request_token(ctx, token_endpoint, &form).await
    }

    /// Exchange a refresh token for a new token
    pub async fn refresh_token(
        &self,
        ctx: &RequestContext,
        token_endpoint: &str,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<Token, AuthzError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.request_token(ctx, token_endpoint, &form).await
    }

    async fn request_token(
        &self,
        ctx: &RequestContext,
        token_endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<Token, AuthzError> {
        let request = self
            .client
            .request(reqwest::Method::POST, token_endpoint)
            .form(form);
        let raw = self.client.fetch(ctx, request).await?;

        if !(200..=299).contains(&raw.status) {
            return Err(AuthzError::from_token_status(raw.status, &raw.body));
        }
        Token::from_json(&raw.body)
    }
}
