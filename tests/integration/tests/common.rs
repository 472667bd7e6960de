//! Common test utilities and fixtures.

use kc_admin_client::{KeycloakAdmin, TokenSession};
use kc_provision::commands::token_session;
use kc_provision::ProvisionConfig;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Main realm used by every test.
pub const MAIN: &str = "codemie-prod";

/// Broker realm used by every test.
pub const BROKER: &str = "master";

/// Simulated Keycloak plus a configuration pointing at it.
pub struct TestEnv {
    /// Mock admin API.
    pub server: MockServer,
    /// Configuration targeting `server`.
    pub config: ProvisionConfig,
    /// Admin token session.
    pub session: TokenSession,
}

impl TestEnv {
    /// Starts a mock server that issues admin tokens.
    pub async fn new() -> anyhow::Result<Self> {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/realms/master/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "admin-token",
                "expires_in": 300
            })))
            .mount(&server)
            .await;

        let mut config = ProvisionConfig::default();
        config.server.url = server.uri();
        config.admin.username = "provisioner".to_string();
        config.admin.password = Some("pw".to_string());
        config.sdk_client.base_url = Some("https://app.example.com".to_string());
        config.users.pause_ms = 0;
        config.validate()?;

        let session = token_session(&config, reqwest::Client::new())?;
        Ok(Self {
            server,
            config,
            session,
        })
    }

    /// Admin client bound to this environment's session.
    pub fn admin(&self) -> KeycloakAdmin<'_> {
        KeycloakAdmin::new(reqwest::Client::new(), self.server.uri(), &self.session)
    }

    /// Fails the test if any POST, PUT or DELETE reaches the admin API.
    pub async fn forbid_writes(&self) {
        for verb in ["POST", "PUT", "DELETE"] {
            Mock::given(method(verb))
                .and(path_regex("^/admin/"))
                .respond_with(ResponseTemplate::new(500))
                .expect(0)
                .named(format!("unexpected {verb}"))
                .mount(&self.server)
                .await;
        }
    }

    /// Serves `body` for `GET <admin realm path>`.
    pub async fn get(&self, realm: &str, rest: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/admin/realms/{realm}{rest}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Serves the username search in `realm`.
    pub async fn users_search(&self, realm: &str, username: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/admin/realms/{realm}/users")))
            .and(query_param("username", username))
            .and(query_param("exact", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Accepts `POST` to a collection and answers with a `Location` for `id`.
    pub async fn create(&self, realm: &str, collection: &str, id: &str, calls: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/admin/realms/{realm}/{collection}")))
            .respond_with(ResponseTemplate::new(201).insert_header(
                "Location",
                format!(
                    "{}/admin/realms/{realm}/{collection}/{id}",
                    self.server.uri()
                ),
            ))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Accepts `verb` on an admin path with 204, expecting `calls` hits.
    pub async fn accept(&self, verb: &str, realm: &str, rest: &str, calls: u64) {
        Mock::given(method(verb))
            .and(path(format!("/admin/realms/{realm}{rest}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(calls)
            .mount(&self.server)
            .await;
    }
}

/// User representation as Keycloak returns it.
pub fn user(id: &str, username: &str, applications: Option<&str>) -> Value {
    let mut body = json!({
        "id": id,
        "username": username,
        "email": username,
        "enabled": true
    });
    if let Some(value) = applications {
        body["attributes"] = json!({ "applications": [value] });
    }
    body
}

/// The developer realm role.
pub fn developer_role() -> Value {
    json!({ "id": "role-dev", "name": "developer", "composite": false })
}

/// Identity provider list containing `aliases`.
pub fn providers(aliases: &[&str]) -> Value {
    Value::Array(
        aliases
            .iter()
            .map(|a| json!({ "alias": a, "providerId": "keycloak-oidc", "enabled": true }))
            .collect(),
    )
}
