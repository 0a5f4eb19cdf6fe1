//! Keycloak authorization client

use crate::clients::Clients;
use crate::context::RequestContext;
use crate::entitlement::Entitlements;
use crate::error::AuthzError;
use crate::permissions::Permissions;
use crate::policies::Policies;
use crate::resources::Resources;
use crate::tokens::Tokens;
use crate::users::Users;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent
const DEFAULT_USER_AGENT: &str = concat!("keycloak-authz/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Client
// ============================================================================

/// Keycloak authorization services client
///
/// Holds only the HTTP connection pool. Endpoints and tokens are passed into
/// each call, so one client can serve any number of concurrent requests.
#[derive(Clone)]
pub struct Keycloak {
    http: reqwest::Client,
}

impl std::fmt::Debug for Keycloak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keycloak").finish_non_exhaustive()
    }
}

impl Keycloak {
    /// Create a client with default settings
    pub fn new() -> Result<Self, AuthzError> {
        Self::builder().build()
    }

    /// Create a builder for more advanced configuration
    pub fn builder() -> KeycloakBuilder {
        KeycloakBuilder::new()
    }

    /// Token acquisition (client credentials, password, refresh grants)
    pub fn tokens(&self) -> Tokens<'_> {
        Tokens { client: self }
    }

    /// Registered client lookup
    pub fn clients(&self) -> Clients<'_> {
        Clients { client: self }
    }

    /// Protected resource sets
    pub fn resources(&self) -> Resources<'_> {
        Resources { client: self }
    }

    /// User policies
    pub fn policies(&self) -> Policies<'_> {
        Policies { client: self }
    }

    /// Resource permissions
    pub fn permissions(&self) -> Permissions<'_> {
        Permissions { client: self }
    }

    /// Entitlement evaluation
    pub fn entitlements(&self) -> Entitlements<'_> {
        Entitlements { client: self }
    }

    /// User info and user existence checks
    pub fn users(&self) -> Users<'_> {
        Users { client: self }
    }

    pub(crate) fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    pub(crate) fn authorized(
        &self,
        method: reqwest::Method,
        url: &str,
        token: &str,
    ) -> Result<reqwest::RequestBuilder, AuthzError> {
        Ok(self
            .request(method, url)
            .header(AUTHORIZATION, bearer(token)?))
    }

    /// Perform one round trip and buffer the whole body
    ///
    /// Send and body read both run under the context, so cancellation also
    /// covers a server that stalls mid-body. There is no retry.
    pub(crate) async fn fetch(
        &self,
        ctx: &RequestContext,
        request: reqwest::RequestBuilder,
    ) -> Result<RawResponse, AuthzError> {
        let request = request
            .build()
            .map_err(|e| AuthzError::Configuration(format!("Failed to build request: {}", e)))?;
        let method = request.method().clone();
        let url = redact_query(request.url());

        log::debug!("{} {}", method, url);

        ctx.run(async {
            let response = self
                .http
                .execute(request)
                .await
                .map_err(AuthzError::from_reqwest_error)?;
            let status = response.status().as_u16();
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .text()
                .await
                .map_err(AuthzError::from_body_error)?;

            log::debug!("{} {} -> {}", method, url, status);

            Ok(RawResponse {
                status,
                location,
                body,
            })
        })
        .await
    }

    /// Round trip expecting a JSON body on success
    pub(crate) async fn execute<T>(
        &self,
        ctx: &RequestContext,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AuthzError>
    where
        T: DeserializeOwned,
    {
        self.fetch(ctx, request).await?.success()?.json()
    }

    /// Round trip where only the status matters
    pub(crate) async fn execute_empty(
        &self,
        ctx: &RequestContext,
        request: reqwest::RequestBuilder,
    ) -> Result<(), AuthzError> {
        self.fetch(ctx, request).await?.success().map(|_| ())
    }
}

// ============================================================================
// Raw Response
// ============================================================================

/// A fully buffered response
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl RawResponse {
    /// Turn a non-2xx status into the matching error
    pub fn success(self) -> Result<Self, AuthzError> {
        if (200..=299).contains(&self.status) {
            Ok(self)
        } else {
            Err(AuthzError::from_status(self.status, &self.body))
        }
    }

    /// Decode the body, reporting failures as [`AuthzError::InvalidResponse`]
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AuthzError> {
        serde_json::from_str(&self.body).map_err(|e| {
            log::warn!("undecodable response body (HTTP {}): {}", self.status, e);
            AuthzError::InvalidResponse(format!("Failed to parse response: {}", e))
        })
    }

    /// Last path segment of the `Location` header
    pub fn location_id(&self) -> Option<String> {
        self.location
            .as_deref()
            .and_then(|loc| loc.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for Keycloak client configuration
///
/// Create with [`Keycloak::builder()`].
pub struct KeycloakBuilder {
    timeout: Option<Duration>,
    user_agent: Option<String>,
    http: Option<reqwest::Client>,
}

impl KeycloakBuilder {
    fn new() -> Self {
        Self {
            timeout: None,
            user_agent: None,
            http: None,
        }
    }

    /// Set the per-request timeout of the HTTP client
    ///
    /// This bounds every call regardless of the [`RequestContext`] deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Use an existing HTTP client (its timeout and user agent win)
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<Keycloak, AuthzError> {
        if let Some(http) = self.http {
            return Ok(Keycloak { http });
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .user_agent(
                self.user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            )
            .build()
            .map_err(|e| {
                AuthzError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Keycloak { http })
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

fn bearer(token: &str) -> Result<HeaderValue, AuthzError> {
    if token.is_empty() {
        return Err(AuthzError::Configuration(
            "Bearer token is empty".to_string(),
        ));
    }
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| AuthzError::Configuration(format!("Invalid bearer token: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Join an endpoint with path segments, escaping each segment
pub(crate) fn join_url(endpoint: &str, segments: &[&str]) -> Result<String, AuthzError> {
    let mut url = url::Url::parse(endpoint)
        .map_err(|e| AuthzError::Configuration(format!("Invalid endpoint {}: {}", endpoint, e)))?;
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            AuthzError::Configuration(format!("Endpoint cannot be a base: {}", endpoint))
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url.into())
}

/// Reject an empty record id
///
/// An empty path segment would turn a by-id call into a call on the
/// collection endpoint.
pub(crate) fn require_id<'a>(id: &'a str, what: &str) -> Result<&'a str, AuthzError> {
    if id.trim().is_empty() {
        return Err(AuthzError::BadParameter(format!("{} id is empty", what)));
    }
    Ok(id)
}

fn redact_query(url: &url::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
