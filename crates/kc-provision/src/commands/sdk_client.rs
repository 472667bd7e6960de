//! SDK client reconciliation.

use kc_admin_client::{AdminApi, AdminError};
use tracing::debug;

use crate::blueprint::ClientBlueprint;
use crate::config::ProvisionConfig;
use crate::error::ProvisionResult;
use crate::output::{detail, heading, info, success};
use crate::reconcile::{plan_client, plan_scope, resolve_scope, Action};

/// What the client reconciler did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientReport {
    /// OAuth client ID.
    pub client_id: String,
    /// Internal ID of the client.
    pub client_uuid: String,
    /// Whether the client was created by this run.
    pub created: bool,
    /// Whether the scope was attached by this run.
    pub scope_attached: bool,
}

/// Finds the client or creates it from `blueprint`; returns `(internal id, created)`.
///
/// An existing client is not modified.
pub async fn ensure_client(
    api: &dyn AdminApi,
    realm: &str,
    blueprint: &ClientBlueprint,
) -> ProvisionResult<(String, bool)> {
    let existing = api.find_client(realm, &blueprint.client_id).await?;

    match plan_client(existing.as_ref()) {
        Action::Create => {
            info(&format!(
                "Creating client '{}' in realm '{realm}'...",
                blueprint.client_id
            ));
            let id = api
                .create_client(realm, &blueprint.to_representation())
                .await?;
            success(&format!("Client '{}' created ({id})", blueprint.client_id));
            Ok((id, true))
        }
        _ => {
            let id = existing
                .and_then(|c| c.id)
                .ok_or_else(|| {
                    AdminError::Malformed(format!("client '{}' has no id", blueprint.client_id))
                })?;
            info(&format!(
                "Client '{}' already exists ({id}); leaving its settings unchanged",
                blueprint.client_id
            ));
            Ok((id, false))
        }
    }
}

/// Attaches the named, pre-existing realm scope as a default scope of the client.
///
/// Returns whether the scope was attached by this call.
pub async fn ensure_default_scope(
    api: &dyn AdminApi,
    realm: &str,
    client_uuid: &str,
    scope_name: &str,
) -> ProvisionResult<bool> {
    let scope = resolve_scope(&api.client_scopes(realm).await?, scope_name)?;
    let assigned = api.default_client_scopes(realm, client_uuid).await?;

    match plan_scope(&assigned, &scope) {
        Action::AttachScope {
            scope_id,
            scope_name,
        } => {
            api.add_default_client_scope(realm, client_uuid, &scope_id)
                .await?;
            success(&format!("Client scope '{scope_name}' attached as default scope"));
            Ok(true)
        }
        _ => {
            debug!(scope = %scope_name, client = %client_uuid, "default scope already attached");
            info(&format!("Client scope '{scope_name}' already attached"));
            Ok(false)
        }
    }
}

/// Reconciles the SDK client in the main realm.
pub async fn run_sdk_client(
    api: &dyn AdminApi,
    config: &ProvisionConfig,
) -> ProvisionResult<ClientReport> {
    let blueprint = ClientBlueprint::sdk(&config.sdk_client, config.base_url()?);
    let realm = &config.realms.main;

    heading(&format!("Processing SDK client '{}'", blueprint.client_id));

    let (client_uuid, created) = ensure_client(api, realm, &blueprint).await?;
    let scope_attached =
        ensure_default_scope(api, realm, &client_uuid, &config.sdk_client.scope).await?;

    print_details(&blueprint);

    Ok(ClientReport {
        client_id: blueprint.client_id,
        client_uuid,
        created,
        scope_attached,
    })
}

fn print_details(blueprint: &ClientBlueprint) {
    info("SDK client details:");
    detail("Client ID", &blueprint.client_id);
    detail("Name", &blueprint.name);
    detail("Description", &blueprint.description);
    detail("Type", blueprint.client_type());
    detail("Root URL", &blueprint.root_url);
    detail("Valid Redirect URIs", &blueprint.redirect_uri());
    detail("Web Origins", &blueprint.root_url);
}
