//! Identity provider and federated identity representations.

use serde::{Deserialize, Serialize};

/// A link from a local user to the same person at an identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedIdentityRepresentation {
    /// Identity provider alias; returned on reads, implied by the URL on writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_provider: Option<String>,
    /// User ID at the identity provider.
    pub user_id: String,
    /// Username at the identity provider.
    pub user_name: String,
}

/// An identity provider instance configured in a realm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderRepresentation {
    /// Alias, used in broker URLs and federated identity links.
    pub alias: String,
    /// Provider type, e.g. `keycloak-oidc` or `saml`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Whether the provider is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}
