//! Admin API seam and its reqwest implementation.

use async_trait::async_trait;
use reqwest::{header::LOCATION, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::dto::{
    ClientRepresentation, ClientScopeRepresentation, CredentialRepresentation,
    FederatedIdentityRepresentation, IdentityProviderRepresentation, RoleRepresentation,
    UserRepresentation,
};
use crate::error::{AdminError, AdminResult};
use crate::session::TokenSession;

/// The subset of the Keycloak Admin REST API the provisioning tools use.
///
/// Every method maps to exactly one HTTP call. Lookups that must be unique go
/// through [`AdminApi::find_client`] and [`AdminApi::find_user`].
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// `GET /admin/realms/{realm}/clients?clientId=..`
    async fn find_clients(&self, realm: &str, client_id: &str)
        -> AdminResult<Vec<ClientRepresentation>>;

    /// `POST /admin/realms/{realm}/clients`, returning the new internal ID.
    async fn create_client(&self, realm: &str, client: &ClientRepresentation)
        -> AdminResult<String>;

    /// `GET /admin/realms/{realm}/client-scopes`
    async fn client_scopes(&self, realm: &str) -> AdminResult<Vec<ClientScopeRepresentation>>;

    /// `GET /admin/realms/{realm}/clients/{id}/default-client-scopes`
    async fn default_client_scopes(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> AdminResult<Vec<ClientScopeRepresentation>>;

    /// `PUT /admin/realms/{realm}/clients/{id}/default-client-scopes/{scopeId}`
    async fn add_default_client_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        scope_id: &str,
    ) -> AdminResult<()>;

    /// `GET /admin/realms/{realm}/clients/{id}/service-account-user`
    async fn service_account_user(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> AdminResult<UserRepresentation>;

    /// `GET /admin/realms/{realm}/clients/{id}/client-secret`
    async fn client_secret(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> AdminResult<CredentialRepresentation>;

    /// `GET /admin/realms/{realm}/users?username=..&exact=true`
    async fn find_users(&self, realm: &str, username: &str)
        -> AdminResult<Vec<UserRepresentation>>;

    /// `POST /admin/realms/{realm}/users`, returning the new internal ID.
    async fn create_user(&self, realm: &str, user: &UserRepresentation) -> AdminResult<String>;

    /// `GET /admin/realms/{realm}/users/{id}`
    async fn get_user(&self, realm: &str, user_id: &str) -> AdminResult<UserRepresentation>;

    /// `PUT /admin/realms/{realm}/users/{id}`
    async fn update_user(
        &self,
        realm: &str,
        user_id: &str,
        user: &UserRepresentation,
    ) -> AdminResult<()>;

    /// `GET /admin/realms/{realm}/roles/{name}`; `None` on 404.
    async fn realm_role(&self, realm: &str, role_name: &str)
        -> AdminResult<Option<RoleRepresentation>>;

    /// `GET /admin/realms/{realm}/users/{id}/role-mappings/realm`
    async fn user_realm_roles(&self, realm: &str, user_id: &str)
        -> AdminResult<Vec<RoleRepresentation>>;

    /// `POST /admin/realms/{realm}/users/{id}/role-mappings/realm`
    async fn add_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> AdminResult<()>;

    /// `GET /admin/realms/{realm}/identity-provider/instances`
    async fn identity_providers(&self, realm: &str)
        -> AdminResult<Vec<IdentityProviderRepresentation>>;

    /// `GET /admin/realms/{realm}/users/{id}/federated-identity`
    async fn federated_identities(
        &self,
        realm: &str,
        user_id: &str,
    ) -> AdminResult<Vec<FederatedIdentityRepresentation>>;

    /// `POST /admin/realms/{realm}/users/{id}/federated-identity/{alias}`
    async fn add_federated_identity(
        &self,
        realm: &str,
        user_id: &str,
        alias: &str,
        link: &FederatedIdentityRepresentation,
    ) -> AdminResult<()>;

    /// Looks up a client by client ID, expecting at most one exact match.
    async fn find_client(
        &self,
        realm: &str,
        client_id: &str,
    ) -> AdminResult<Option<ClientRepresentation>> {
        let matches = self
            .find_clients(realm, client_id)
            .await?
            .into_iter()
            .filter(|c| c.client_id == client_id)
            .collect();
        single_match(matches, "Client", client_id)
    }

    /// Looks up a user by username, expecting at most one exact match.
    ///
    /// Keycloak stores usernames lower-cased, so the comparison ignores ASCII case.
    async fn find_user(&self, realm: &str, username: &str)
        -> AdminResult<Option<UserRepresentation>> {
        let matches = self
            .find_users(realm, username)
            .await?
            .into_iter()
            .filter(|u| u.username.eq_ignore_ascii_case(username))
            .collect();
        single_match(matches, "User", username)
    }
}

/// Reduces a lookup result to zero or one item; more is an ambiguity error.
pub fn single_match<T>(mut matches: Vec<T>, resource_type: &str, id: &str) -> AdminResult<Option<T>> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        count => Err(AdminError::Ambiguous {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
            count,
        }),
    }
}

/// Admin API client backed by reqwest and a [`TokenSession`].
#[derive(Debug)]
pub struct KeycloakAdmin<'a> {
    http: reqwest::Client,
    base_url: String,
    session: &'a TokenSession,
}

impl<'a> KeycloakAdmin<'a> {
    /// Creates an admin client; `base_url` is the Keycloak server root.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, session: &'a TokenSession) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Gets the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn realm_path(realm: &str, rest: &str) -> String {
        format!("/admin/realms/{}{}", urlencoding::encode(realm), rest)
    }

    async fn request(&self, method: Method, path: &str) -> AdminResult<RequestBuilder> {
        let token = self.session.bearer_token().await?;
        debug!(%method, %path, "admin request");
        Ok(self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AdminResult<T> {
        let response = self.request(Method::GET, path).await?.send().await?;
        handle_response(response).await
    }

    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> AdminResult<Option<T>> {
        let response = self.request(Method::GET, path).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        handle_response(response).await.map(Some)
    }

    async fn post_created<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        resource_type: &str,
    ) -> AdminResult<String> {
        let response = self.request(Method::POST, path).await?.json(body).send().await?;
        let response = check_status(response).await?;
        location_id(&response).ok_or_else(|| AdminError::MissingLocation {
            resource_type: resource_type.to_string(),
        })
    }

    async fn send_empty(&self, builder: RequestBuilder) -> AdminResult<()> {
        check_status(builder.send().await?).await.map(|_| ())
    }
}

#[async_trait]
impl AdminApi for KeycloakAdmin<'_> {
    async fn find_clients(
        &self,
        realm: &str,
        client_id: &str,
    ) -> AdminResult<Vec<ClientRepresentation>> {
        let path = Self::realm_path(
            realm,
            &format!("/clients?clientId={}", urlencoding::encode(client_id)),
        );
        self.get(&path).await
    }

    async fn create_client(
        &self,
        realm: &str,
        client: &ClientRepresentation,
    ) -> AdminResult<String> {
        self.post_created(&Self::realm_path(realm, "/clients"), client, "Client")
            .await
    }

    async fn client_scopes(&self, realm: &str) -> AdminResult<Vec<ClientScopeRepresentation>> {
        self.get(&Self::realm_path(realm, "/client-scopes")).await
    }

    async fn default_client_scopes(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> AdminResult<Vec<ClientScopeRepresentation>> {
        let path = Self::realm_path(
            realm,
            &format!("/clients/{}/default-client-scopes", urlencoding::encode(client_uuid)),
        );
        self.get(&path).await
    }

    async fn add_default_client_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        scope_id: &str,
    ) -> AdminResult<()> {
        let path = Self::realm_path(
            realm,
            &format!(
                "/clients/{}/default-client-scopes/{}",
                urlencoding::encode(client_uuid),
                urlencoding::encode(scope_id)
            ),
        );
        let builder = self.request(Method::PUT, &path).await?;
        self.send_empty(builder).await
    }

    async fn service_account_user(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> AdminResult<UserRepresentation> {
        let path = Self::realm_path(
            realm,
            &format!("/clients/{}/service-account-user", urlencoding::encode(client_uuid)),
        );
        self.get_optional(&path)
            .await?
            .ok_or_else(|| AdminError::not_found("Service account user", client_uuid))
    }

    async fn client_secret(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> AdminResult<CredentialRepresentation> {
        let path = Self::realm_path(
            realm,
            &format!("/clients/{}/client-secret", urlencoding::encode(client_uuid)),
        );
        self.get(&path).await
    }

    async fn find_users(
        &self,
        realm: &str,
        username: &str,
    ) -> AdminResult<Vec<UserRepresentation>> {
        let path = Self::realm_path(
            realm,
            &format!("/users?username={}&exact=true", urlencoding::encode(username)),
        );
        self.get(&path).await
    }

    async fn create_user(&self, realm: &str, user: &UserRepresentation) -> AdminResult<String> {
        self.post_created(&Self::realm_path(realm, "/users"), user, "User")
            .await
    }

    async fn get_user(&self, realm: &str, user_id: &str) -> AdminResult<UserRepresentation> {
        let path = Self::realm_path(realm, &format!("/users/{}", urlencoding::encode(user_id)));
        self.get_optional(&path)
            .await?
            .ok_or_else(|| AdminError::not_found("User", user_id))
    }

    async fn update_user(
        &self,
        realm: &str,
        user_id: &str,
        user: &UserRepresentation,
    ) -> AdminResult<()> {
        let path = Self::realm_path(realm, &format!("/users/{}", urlencoding::encode(user_id)));
        let builder = self.request(Method::PUT, &path).await?.json(user);
        self.send_empty(builder).await
    }

    async fn realm_role(
        &self,
        realm: &str,
        role_name: &str,
    ) -> AdminResult<Option<RoleRepresentation>> {
        let path = Self::realm_path(realm, &format!("/roles/{}", urlencoding::encode(role_name)));
        self.get_optional(&path).await
    }

    async fn user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
    ) -> AdminResult<Vec<RoleRepresentation>> {
        let path = Self::realm_path(
            realm,
            &format!("/users/{}/role-mappings/realm", urlencoding::encode(user_id)),
        );
        self.get(&path).await
    }

    async fn add_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> AdminResult<()> {
        let path = Self::realm_path(
            realm,
            &format!("/users/{}/role-mappings/realm", urlencoding::encode(user_id)),
        );
        let builder = self.request(Method::POST, &path).await?.json(roles);
        self.send_empty(builder).await
    }

    async fn identity_providers(
        &self,
        realm: &str,
    ) -> AdminResult<Vec<IdentityProviderRepresentation>> {
        self.get(&Self::realm_path(realm, "/identity-provider/instances"))
            .await
    }

    async fn federated_identities(
        &self,
        realm: &str,
        user_id: &str,
    ) -> AdminResult<Vec<FederatedIdentityRepresentation>> {
        let path = Self::realm_path(
            realm,
            &format!("/users/{}/federated-identity", urlencoding::encode(user_id)),
        );
        self.get(&path).await
    }

    async fn add_federated_identity(
        &self,
        realm: &str,
        user_id: &str,
        alias: &str,
        link: &FederatedIdentityRepresentation,
    ) -> AdminResult<()> {
        let path = Self::realm_path(
            realm,
            &format!(
                "/users/{}/federated-identity/{}",
                urlencoding::encode(user_id),
                urlencoding::encode(alias)
            ),
        );
        let builder = self.request(Method::POST, &path).await?.json(link);
        self.send_empty(builder).await
    }
}

/// Handles a response with a body.
async fn handle_response<T: DeserializeOwned>(response: Response) -> AdminResult<T> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Turns a non-success response into [`AdminError::Upstream`].
async fn check_status(response: Response) -> AdminResult<Response> {
    let status = response.status();

    if status.is_success() {
        Ok(response)
    } else {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(AdminError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

/// Extracts the trailing path segment of a `Location` header.
fn location_id(response: &Response) -> Option<String> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    id_from_location(location)
}

fn id_from_location(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
}
