//! Per-project confidential API clients.
//!
//! Creates `api-<project>` with a service account, grants the service account
//! the configured role, and records the project on its profile.

use kc_admin_client::{AdminApi, AdminError};

use crate::blueprint::ClientBlueprint;
use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, ProvisionResult};
use crate::naming::{api_client_name, project_person_name, service_account_email};
use crate::output::{detail, heading, info, success, warning};
use crate::reconcile::{plan_service_account, Action, ServiceAccountProfile};

use super::{ensure_client, ensure_default_scope, ensure_realm_role};

/// What the API client provisioner did.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiClientReport {
    /// OAuth client ID.
    pub client_id: String,
    /// Internal ID of the client.
    pub client_uuid: String,
    /// Whether the client was created by this run.
    pub created: bool,
    /// Whether the scope was attached by this run.
    pub scope_attached: bool,
    /// Internal ID of the service account user.
    pub service_account_id: String,
    /// Whether the role was granted by this run.
    pub role_assigned: bool,
    /// Whether the service account profile was written by this run.
    pub profile_updated: bool,
    /// Client secret, when the server returned one.
    pub secret: Option<String>,
}

impl std::fmt::Debug for ApiClientReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClientReport")
            .field("client_id", &self.client_id)
            .field("client_uuid", &self.client_uuid)
            .field("created", &self.created)
            .field("scope_attached", &self.scope_attached)
            .field("service_account_id", &self.service_account_id)
            .field("role_assigned", &self.role_assigned)
            .field("profile_updated", &self.profile_updated)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Provisions the API client for `project` in the main realm.
///
/// A project given with the client prefix already applied is treated as the
/// bare project name.
pub async fn run_api_client(
    api: &dyn AdminApi,
    config: &ProvisionConfig,
    project: &str,
) -> ProvisionResult<ApiClientReport> {
    let prefix = &config.api_client.prefix;
    let project = project.trim();
    let project = project.strip_prefix(prefix.as_str()).unwrap_or(project);
    if project.is_empty() {
        return Err(ProvisionError::InvalidArgument(
            "project name is empty".to_string(),
        ));
    }

    let realm = &config.realms.main;
    let client_id = api_client_name(prefix, project);
    let blueprint = ClientBlueprint::api(&config.sdk_client, config.base_url()?, &client_id, project);

    heading(&format!("Processing API client '{client_id}'"));

    let (client_uuid, created) = ensure_client(api, realm, &blueprint).await?;
    let scope_attached =
        ensure_default_scope(api, realm, &client_uuid, &config.sdk_client.scope).await?;

    let account = api.service_account_user(realm, &client_uuid).await?;
    let service_account_id = account.id.clone().ok_or_else(|| {
        AdminError::Malformed(format!("service account of '{client_id}' has no id"))
    })?;
    detail("Service account", &account.username);

    let role_assigned =
        ensure_realm_role(api, realm, &service_account_id, &config.api_client.role).await?;

    let (first_name, last_name) = project_person_name(project);
    let profile = ServiceAccountProfile {
        email: service_account_email(&client_id, &config.api_client.email_domain),
        first_name,
        last_name,
        project: project.to_string(),
    };
    let profile_updated = match plan_service_account(&account, &profile) {
        Action::UpdateUser(desired) => {
            api.update_user(realm, &service_account_id, &desired).await?;
            success(&format!("Service account profile updated ({})", profile.email));
            true
        }
        _ => {
            info("Service account profile already up to date");
            false
        }
    };

    let secret = api.client_secret(realm, &client_uuid).await?.value;

    info("API client details:");
    detail("Client ID", &blueprint.client_id);
    detail("Type", blueprint.client_type());
    detail("Root URL", &blueprint.root_url);
    detail("Valid Redirect URIs", &blueprint.redirect_uri());
    detail("Service account email", &profile.email);
    match &secret {
        Some(value) => detail("Client secret", value),
        None => warning("Server returned no client secret"),
    }

    Ok(ApiClientReport {
        client_id,
        client_uuid,
        created,
        scope_attached,
        service_account_id,
        role_assigned,
        profile_updated,
        secret,
    })
}
