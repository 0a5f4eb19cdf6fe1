//! Common test utilities shared across test files.
//!
//! [`FakeKeycloak`] is a small in-memory authorization server mounted on a
//! wiremock server. It keeps resources, policies and permissions in memory
//! and answers entitlement requests from that state, so tests can exercise
//! whole flows against it.
#![allow(dead_code)]

use keycloak_authz::{Endpoints, KeycloakConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const CLIENT_NAME: &str = "fabric8-online-platform";
pub const CLIENT_SECRET: &str = "platform-secret";
pub const CLIENT_INTERNAL_ID: &str = "65d23f35-c532-4493-a860-39e851abe397";

pub const PAT: &str = "pat-token";

pub const ALICE: &str = "alice";
pub const ALICE_ID: &str = "0b1e4f7a-0a3c-4d6c-9d0e-alice0000001";
pub const BOB: &str = "bob";
pub const BOB_ID: &str = "7c2d9e41-2b5f-4a8e-8f1c-bob000000002";
pub const PASSWORD: &str = "password";

const REALM: &str = "/auth/realms/fabric8";
const ADMIN: &str = "/auth/admin/realms/fabric8";

#[derive(Default)]
struct State {
    resources: HashMap<String, Value>,
    policies: HashMap<String, Value>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:08}", prefix, self.next_id)
    }
}

/// In-memory Keycloak realm
#[derive(Clone, Default)]
pub struct FakeKeycloak {
    state: Arc<Mutex<State>>,
}

/// A running fake with its endpoints
pub struct Realm {
    pub server: MockServer,
    pub config: KeycloakConfig,
    pub endpoints: Endpoints,
    pub fake: FakeKeycloak,
}

impl Realm {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let fake = FakeKeycloak::default();

        Mock::given(any())
            .respond_with(fake.clone())
            .mount(&server)
            .await;

        let config = KeycloakConfig::new(server.uri(), CLIENT_NAME, CLIENT_SECRET);
        let endpoints = config.endpoints();
        Self {
            server,
            config,
            endpoints,
            fake,
        }
    }
}

impl FakeKeycloak {
    pub fn resource_count(&self) -> usize {
        self.state.lock().unwrap().resources.len()
    }

    pub fn policy_count(&self) -> usize {
        self.state.lock().unwrap().policies.len()
    }

    /// Raw stored policy document, as the server sees it
    pub fn stored_policy(&self, id: &str) -> Option<Value> {
        self.state.lock().unwrap().policies.get(id).cloned()
    }
}

fn bearer(request: &Request) -> Option<&str> {
    request
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn subject_for_token(token: &str) -> Option<&'static str> {
    match token.strip_prefix("user-token-")? {
        ALICE => Some(ALICE_ID),
        BOB => Some(BOB_ID),
        _ => None,
    }
}

fn known_user(id: &str) -> bool {
    id == ALICE_ID || id == BOB_ID
}

fn error(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "errorMessage": message }))
}

fn oauth_error(status: u16, code: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": code,
        "error_description": code
    }))
}

/// Decode a double-encoded id list; only the string form is accepted
fn decode_list(config: &Value, key: &str) -> Option<Vec<String>> {
    match config.get(key) {
        None => Some(Vec::new()),
        Some(Value::String(s)) => serde_json::from_str(s).ok(),
        Some(_) => None,
    }
}

impl Respond for FakeKeycloak {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path().to_string();
        let method = request.method.as_str().to_string();

        if path == format!("{}/protocol/openid-connect/token", REALM) {
            return self.token(request);
        }
        if path == format!("{}/protocol/openid-connect/userinfo", REALM) {
            return match bearer(request).and_then(subject_for_token) {
                Some(sub) => ResponseTemplate::new(200).set_body_json(json!({ "sub": sub })),
                None => oauth_error(401, "invalid_token"),
            };
        }
        if path == format!("{}/authz/entitlement/{}", REALM, CLIENT_NAME) {
            return self.entitlement(request);
        }

        // Everything below needs the service account token
        if bearer(request) != Some(PAT) {
            return oauth_error(401, "unauthorized");
        }

        let resource_set = format!("{}/authz/protection/resource_set", REALM);
        let policy_base = format!(
            "{}/clients/{}/authz/resource-server/policy",
            ADMIN, CLIENT_INTERNAL_ID
        );

        if path == format!("{}/clients", ADMIN) {
            return self.clients(request);
        }
        if let Some(id) = path.strip_prefix(&format!("{}/users/", ADMIN)) {
            return if known_user(id) {
                ResponseTemplate::new(200).set_body_json(json!({ "id": id }))
            } else {
                error(404, "User not found")
            };
        }
        if path == resource_set {
            return match method.as_str() {
                "POST" => self.create_resource(request),
                "GET" => {
                    let state = self.state.lock().unwrap();
                    let ids: Vec<&String> = state.resources.keys().collect();
                    ResponseTemplate::new(200).set_body_json(json!(ids))
                }
                _ => ResponseTemplate::new(405),
            };
        }
        if let Some(id) = path.strip_prefix(&format!("{}/", resource_set)) {
            let mut state = self.state.lock().unwrap();
            return match method.as_str() {
                "GET" => match state.resources.get(id) {
                    Some(doc) => ResponseTemplate::new(200).set_body_json(doc.clone()),
                    None => error(404, "Resource not found"),
                },
                "DELETE" => match state.resources.remove(id) {
                    Some(_) => ResponseTemplate::new(204),
                    None => error(404, "Resource not found"),
                },
                _ => ResponseTemplate::new(405),
            };
        }
        if path == policy_base {
            return match method.as_str() {
                "POST" => self.save_policy(request, None),
                "GET" => {
                    let state = self.state.lock().unwrap();
                    let list: Vec<Value> = state.policies.values().cloned().collect();
                    ResponseTemplate::new(200).set_body_json(json!(list))
                }
                _ => ResponseTemplate::new(405),
            };
        }
        if let Some(id) = path.strip_prefix(&format!("{}/", policy_base)) {
            return match method.as_str() {
                "GET" => match self.state.lock().unwrap().policies.get(id) {
                    Some(doc) => ResponseTemplate::new(200).set_body_json(doc.clone()),
                    None => error(404, "Could not find policy"),
                },
                "PUT" => self.save_policy(request, Some(id)),
                "DELETE" => match self.state.lock().unwrap().policies.remove(id) {
                    Some(_) => ResponseTemplate::new(204),
                    None => error(404, "Could not find policy"),
                },
                _ => ResponseTemplate::new(405),
            };
        }

        error(404, "Unknown endpoint")
    }
}

impl FakeKeycloak {
    fn token(&self, request: &Request) -> ResponseTemplate {
        let form: HashMap<String, String> = url::form_urlencoded::parse(&request.body)
            .into_owned()
            .collect();
        let field = |key: &str| form.get(key).map(String::as_str).unwrap_or_default();

        if field("client_id") != CLIENT_NAME || field("client_secret") != CLIENT_SECRET {
            return oauth_error(401, "unauthorized_client");
        }

        let access_token = match field("grant_type") {
            "client_credentials" => PAT.to_string(),
            "password" => {
                let username = field("username");
                if field("password") != PASSWORD || !matches!(username, ALICE | BOB) {
                    return oauth_error(401, "invalid_grant");
                }
                format!("user-token-{}", username)
            }
            _ => return oauth_error(400, "unsupported_grant_type"),
        };

        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "expires_in": 300,
            "refresh_expires_in": 1800,
            "refresh_token": "refresh",
            "token_type": "bearer",
            "not-before-policy": 0,
            "session_state": "c8c3c1f2"
        }))
    }

    fn clients(&self, request: &Request) -> ResponseTemplate {
        let filter = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "clientId")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();

        // Keycloak filters by substring, so a near match comes back too
        let all = [
            json!({ "id": "1f4c0c0e-broker-client", "clientId": "broker" }),
            json!({ "id": "d2a2a0a4-near-match", "clientId": format!("{}-admin", CLIENT_NAME) }),
            json!({ "id": CLIENT_INTERNAL_ID, "clientId": CLIENT_NAME }),
        ];
        let matching: Vec<&Value> = all
            .iter()
            .filter(|c| {
                c["clientId"]
                    .as_str()
                    .map(|name| name.contains(filter.as_str()))
                    .unwrap_or(false)
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!(matching))
    }

    fn create_resource(&self, request: &Request) -> ResponseTemplate {
        let Ok(mut doc) = serde_json::from_slice::<Value>(&request.body) else {
            return error(400, "Malformed body");
        };
        let name = doc["name"].as_str().unwrap_or_default().to_string();
        if name.is_empty() {
            return error(400, "Resource name is required");
        }
        if doc.get("_id").is_some() || doc.get("id").is_some() {
            return error(400, "Resource id must not be set");
        }

        let mut state = self.state.lock().unwrap();
        if state.resources.values().any(|r| r["name"] == name.as_str()) {
            return error(409, "Resource with name already exists");
        }

        let id = state.next_id("resource");
        let scopes: Vec<Value> = doc["scopes"]
            .as_array()
            .map(|s| {
                s.iter()
                    .filter_map(|v| v.as_str())
                    .map(|name| json!({ "name": name }))
                    .collect()
            })
            .unwrap_or_default();
        doc["_id"] = json!(id);
        doc["scopes"] = json!(scopes);
        state.resources.insert(id, doc.clone());

        ResponseTemplate::new(201).set_body_json(doc)
    }

    fn save_policy(&self, request: &Request, id: Option<&str>) -> ResponseTemplate {
        let Ok(mut doc) = serde_json::from_slice::<Value>(&request.body) else {
            return error(400, "Malformed body");
        };
        if doc["name"].as_str().unwrap_or_default().is_empty() {
            return error(400, "Policy name is required");
        }

        let mut state = self.state.lock().unwrap();
        if let Some(id) = id {
            if !state.policies.contains_key(id) {
                return error(404, "Could not find policy");
            }
        }

        let config = doc["config"].clone();
        match doc["type"].as_str() {
            Some("user") => {
                let Some(users) = decode_list(&config, "users") else {
                    return error(400, "Invalid users config");
                };
                if users.is_empty() || !users.iter().all(|u| known_user(u)) {
                    return error(400, "Unknown user");
                }
            }
            Some("resource") => {
                let (Some(resources), Some(policies)) = (
                    decode_list(&config, "resources"),
                    decode_list(&config, "applyPolicies"),
                ) else {
                    return error(400, "Invalid permission config");
                };
                if !resources.iter().all(|r| state.resources.contains_key(r)) {
                    return error(400, "Unknown resource");
                }
                if !policies.iter().all(|p| state.policies.contains_key(p)) {
                    return error(400, "Unknown policy");
                }
            }
            _ => return error(400, "Unsupported policy type"),
        }

        match id {
            Some(id) => {
                doc["id"] = json!(id);
                state.policies.insert(id.to_string(), doc);
                ResponseTemplate::new(201)
            }
            None => {
                let id = state.next_id("policy");
                doc["id"] = json!(id);
                state.policies.insert(id, doc.clone());
                ResponseTemplate::new(201).set_body_json(doc)
            }
        }
    }

    fn entitlement(&self, request: &Request) -> ResponseTemplate {
        let Some(subject) = bearer(request).and_then(subject_for_token) else {
            return oauth_error(401, "invalid_token");
        };
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return oauth_error(400, "invalid_request");
        };

        let state = self.state.lock().unwrap();
        let policy_grants = |policy_id: &str| {
            state
                .policies
                .get(policy_id)
                .filter(|p| p["type"] == "user")
                .and_then(|p| decode_list(&p["config"], "users"))
                .map(|users| users.iter().any(|u| u == subject))
                .unwrap_or(false)
        };

        let names: Vec<&str> = body["permissions"]
            .as_array()
            .map(|p| p.iter().filter_map(|r| r["resource_set_name"].as_str()).collect())
            .unwrap_or_default();
        if names.is_empty() {
            return oauth_error(400, "invalid_request");
        }

        let allowed = names.iter().all(|name| {
            let Some(resource_id) = state
                .resources
                .iter()
                .find(|(_, r)| r["name"] == *name)
                .map(|(id, _)| id.clone())
            else {
                return false;
            };
            state
                .policies
                .values()
                .filter(|p| p["type"] == "resource")
                .filter(|p| {
                    decode_list(&p["config"], "resources")
                        .map(|ids| ids.contains(&resource_id))
                        .unwrap_or(false)
                })
                .any(|p| {
                    let applied = decode_list(&p["config"], "applyPolicies").unwrap_or_default();
                    !applied.is_empty() && applied.iter().all(|id| policy_grants(id))
                })
        });

        if allowed {
            ResponseTemplate::new(200)
                .set_body_json(json!({ "rpt": format!("rpt-for-{}", subject) }))
        } else {
            oauth_error(403, "not_authorized")
        }
    }
}
