//! Representations this tool creates.

use std::collections::HashMap;

use kc_admin_client::dto::{ClientRepresentation, UserRepresentation};

use crate::config::SdkClientConfig;
use crate::naming::DerivedIdentity;

/// Fixed client configuration applied on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientBlueprint {
    /// OAuth client ID.
    pub client_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Application root URL, without trailing slash.
    pub root_url: String,
    /// Public client (no secret) when true, confidential otherwise.
    pub public_client: bool,
    /// Whether the client gets a service account.
    pub service_accounts: bool,
    /// Access token lifespan in seconds.
    pub access_token_lifespan: u32,
    /// Default client scopes.
    pub default_scopes: Vec<String>,
    /// Optional client scopes.
    pub optional_scopes: Vec<String>,
}

impl ClientBlueprint {
    /// The public SDK client.
    #[must_use]
    pub fn sdk(config: &SdkClientConfig, root_url: &str) -> Self {
        Self {
            client_id: config.client_id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            root_url: root_url.to_string(),
            public_client: true,
            service_accounts: false,
            access_token_lifespan: config.access_token_lifespan,
            default_scopes: config.default_scopes.clone(),
            optional_scopes: config.optional_scopes.clone(),
        }
    }

    /// A confidential per-project API client with a service account.
    #[must_use]
    pub fn api(config: &SdkClientConfig, root_url: &str, client_id: &str, project: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            name: client_id.to_string(),
            description: format!("API client for {project}"),
            root_url: root_url.to_string(),
            public_client: false,
            service_accounts: true,
            access_token_lifespan: config.access_token_lifespan,
            default_scopes: config.default_scopes.clone(),
            optional_scopes: config.optional_scopes.clone(),
        }
    }

    /// Redirect URI pattern derived from the root URL.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}/*", self.root_url)
    }

    /// Human-readable client type.
    #[must_use]
    pub const fn client_type(&self) -> &'static str {
        if self.public_client {
            "Public Client (no secret required)"
        } else {
            "Confidential Client (service account)"
        }
    }

    /// Builds the creation body.
    #[must_use]
    pub fn to_representation(&self) -> ClientRepresentation {
        let attributes: HashMap<String, String> = [
            ("access.token.lifespan", self.access_token_lifespan.to_string()),
            ("client_credentials.use_refresh_token", "false".to_string()),
            ("exclude.session.state.from.auth.response", "false".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        ClientRepresentation {
            id: None,
            client_id: self.client_id.clone(),
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            enabled: Some(true),
            root_url: Some(self.root_url.clone()),
            base_url: Some(String::new()),
            admin_url: Some(self.root_url.clone()),
            redirect_uris: vec![self.redirect_uri()],
            web_origins: vec![self.root_url.clone()],
            public_client: Some(self.public_client),
            client_authenticator_type: Some("client-secret".to_string()),
            standard_flow_enabled: Some(true),
            implicit_flow_enabled: Some(false),
            direct_access_grants_enabled: Some(true),
            service_accounts_enabled: Some(self.service_accounts),
            consent_required: Some(false),
            frontchannel_logout: Some(true),
            full_scope_allowed: Some(true),
            protocol: Some("openid-connect".to_string()),
            attributes,
            default_client_scopes: self.default_scopes.clone(),
            optional_client_scopes: self.optional_scopes.clone(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Creation body for a provisioned person: enabled, email not verified.
#[must_use]
pub fn new_user(identity: &DerivedIdentity) -> UserRepresentation {
    UserRepresentation {
        username: identity.username.clone(),
        email: Some(identity.email().to_string()),
        first_name: Some(identity.first_name.clone()),
        last_name: Some(identity.last_name.clone()),
        enabled: Some(true),
        email_verified: Some(false),
        ..Default::default()
    }
}
