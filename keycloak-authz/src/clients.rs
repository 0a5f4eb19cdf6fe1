//! Registered client lookup

use crate::client::Keycloak;
use crate::context::RequestContext;
use crate::error::AuthzError;
use serde::Deserialize;

/// A client registered in the realm
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRepresentation {
    /// Internal id, used in every admin URL
    pub id: String,

    /// Public client name
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Clients API handle
pub struct Clients<'a> {
    pub(crate) client: &'a Keycloak,
}

impl<'a> Clients<'a> {
    /// Resolve the internal id of a client from its public name
    ///
    /// The server-side filter is only a hint; the name must match exactly.
    /// Fails with [`AuthzError::NotFound`] when no client carries the name.
    pub async fn resolve_client_id(
        &self,
        ctx: &RequestContext,
        clients_endpoint: &str,
        public_client_id: &str,
        pat: &str,
    ) -> Result<String, AuthzError> {
        let request = self
            .client
            .authorized(reqwest::Method::GET, clients_endpoint, pat)?
            .query(&[("clientId", public_client_id)]);
        let clients: Vec<ClientRepresentation> = self.client.execute(ctx, request).await?;

        clients
            .into_iter()
            .find(|c| c.client_id == public_client_id)
            .map(|c| c.id)
            .ok_or_else(|| {
                AuthzError::NotFound(format!("No client named {:?}", public_client_id))
            })
    }
}

#[cfg(test)]
mod wiremock_tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn resolve(server: &MockServer, name: &str) -> Result<String, AuthzError> {
        Keycloak::new()
            .unwrap()
            .clients()
            .resolve_client_id(
                &RequestContext::new(),
                &format!("{}/admin/realms/fabric8/clients", server.uri()),
                name,
                "pat",
            )
            .await
    }

    #[tokio::test]
    async fn test_resolve_client_id_exact_match() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/realms/fabric8/clients"))
            .and(query_param("clientId", "fabric8-online-platform"))
            .and(header("authorization", "Bearer pat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "11111111-aaaa", "clientId": "fabric8-online-platform-dev"},
                {"id": "65d23f35-c532-4493-a860-39e851abe397", "clientId": "fabric8-online-platform"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let id = resolve(&mock_server, "fabric8-online-platform").await.unwrap();
        assert_eq!(id, "65d23f35-c532-4493-a860-39e851abe397");
    }

    #[tokio::test]
    async fn test_resolve_client_id_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "11111111-aaaa", "clientId": "Fabric8-Online-Platform"}
            ])))
            .mount(&mock_server)
            .await;

        let err = resolve(&mock_server, "fabric8-online-platform")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_client_id_unauthorized() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let err = resolve(&mock_server, "any").await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_resolve_client_id_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "not-a-list"})),
            )
            .mount(&mock_server)
            .await;

        let err = resolve(&mock_server, "any").await.unwrap_err();
        assert!(matches!(err, AuthzError::InvalidResponse(_)));
    }
}
