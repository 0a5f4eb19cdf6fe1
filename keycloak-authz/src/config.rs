//! Realm configuration and endpoint derivation

use crate::error::AuthzError;
use crate::tokens::ClientCredentials;

/// Realm used when `KEYCLOAK_REALM` is not set
pub const DEFAULT_REALM: &str = "fabric8";

/// Where the authorization server lives and how this service signs in
#[derive(Clone)]
pub struct KeycloakConfig {
    /// Server root, e.g. `https://sso.openshift.io`
    pub base_url: String,

    /// Realm name
    pub realm: String,

    /// Public client name of this service
    pub client_id: String,

    /// Client secret of this service
    pub client_secret: String,
}

impl std::fmt::Debug for KeycloakConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakConfig")
            .field("base_url", &self.base_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl KeycloakConfig {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            realm: DEFAULT_REALM.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Override the realm
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Read `KEYCLOAK_URL`, `KEYCLOAK_REALM`, `KEYCLOAK_CLIENT_ID` and
    /// `KEYCLOAK_SECRET`
    pub fn from_env() -> Result<Self, AuthzError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AuthzError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| {
                AuthzError::Configuration(format!("{} environment variable not set", key))
            })
        };

        let config = Self::new(
            required("KEYCLOAK_URL")?,
            required("KEYCLOAK_CLIENT_ID")?,
            required("KEYCLOAK_SECRET")?,
        );
        Ok(match lookup("KEYCLOAK_REALM").filter(|v| !v.is_empty()) {
            Some(realm) => config.realm(realm),
            None => config,
        })
    }

    /// Service account credentials for the client credentials grant
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials::new(&self.client_id, &self.client_secret)
    }

    /// Every endpoint of the realm
    pub fn endpoints(&self) -> Endpoints {
        let base = self.base_url.trim_end_matches('/');
        let realm = format!("{}/auth/realms/{}", base, self.realm);
        let admin = format!("{}/auth/admin/realms/{}", base, self.realm);

        Endpoints {
            token: format!("{}/protocol/openid-connect/token", realm),
            userinfo: format!("{}/protocol/openid-connect/userinfo", realm),
            entitlement: format!("{}/authz/entitlement/{}", realm, self.client_id),
            resource_set: format!("{}/authz/protection/resource_set", realm),
            clients: format!("{}/clients", admin),
            admin,
        }
    }
}

/// Endpoints of one realm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token: String,
    pub userinfo: String,
    pub entitlement: String,
    pub resource_set: String,
    pub clients: String,
    pub admin: String,
}
