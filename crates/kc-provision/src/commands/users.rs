//! Brokered user provisioning.
//!
//! For each person: find or create the user in the broker realm, then in the
//! main realm; in the main realm grant the role, merge the project into the
//! `applications` attribute and link the user to its broker-realm twin.

use std::time::Duration;

use kc_admin_client::{AdminApi, AdminError};
use tabled::Tabled;
use tracing::{debug, warn};

use crate::blueprint::new_user;
use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, ProvisionResult};
use crate::naming::{derive_identity, BatchNames, DerivedIdentity};
use crate::output::{detail, error, heading, info, success, table, warning};
use crate::reconcile::{
    plan_applications, plan_identity_link, plan_role, plan_user, require_identity_provider,
    Action,
};

use super::RunStatus;

/// What happened to one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserReport {
    /// Username in both realms.
    pub username: String,
    /// Internal ID in the broker realm.
    pub broker_user_id: String,
    /// Internal ID in the main realm.
    pub main_user_id: String,
    /// Created in the broker realm by this run.
    pub created_in_broker: bool,
    /// Created in the main realm by this run.
    pub created_in_main: bool,
    /// Role granted by this run.
    pub role_assigned: bool,
    /// New `applications` value, when it was written.
    pub applications: Option<String>,
    /// Main-realm link to the broker created by this run.
    pub broker_linked: bool,
    /// Broker-realm upstream link created by this run.
    pub upstream_linked: bool,
}

/// Result for one display name of a batch.
#[derive(Debug)]
pub struct UserOutcome {
    /// Display name as given.
    pub display_name: String,
    /// Success report or the error that stopped this user.
    pub result: ProvisionResult<UserReport>,
}

/// Result of a whole batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-user outcomes in input order.
    pub outcomes: Vec<UserOutcome>,
    /// Empty segments skipped while parsing.
    pub skipped: usize,
    /// Names never attempted because a fatal error stopped the batch.
    pub not_attempted: Vec<String>,
}

impl BatchReport {
    /// Number of users provisioned successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of users that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Whether a fatal error stopped the batch early.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.result.as_ref().is_err_and(ProvisionError::is_fatal))
    }

    /// Overall status of the batch.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        if self.aborted() {
            RunStatus::Fatal
        } else if self.failed() > 0 {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        }
    }

    /// Prints the final summary table and counts.
    pub fn print_summary(&self, domain: &str) {
        heading("FINAL REPORT");

        let rows: Vec<SummaryRow> = self
            .outcomes
            .iter()
            .map(SummaryRow::from)
            .chain(self.not_attempted.iter().map(|name| SummaryRow {
                name: name.clone(),
                username: String::new(),
                status: "not attempted".to_string(),
                detail: "batch aborted".to_string(),
            }))
            .collect();
        table(&rows);

        success(&format!("Successfully processed: {}", self.succeeded()));
        if self.failed() > 0 {
            error(&format!("Errors: {}", self.failed()));
        }
        if self.skipped > 0 {
            warning(&format!("Empty names skipped: {}", self.skipped));
        }
        info(&format!(
            "Total: {}",
            self.outcomes.len() + self.not_attempted.len()
        ));
        info(&format!("Domain used: {domain}"));
    }
}

/// One line of the final report.
#[derive(Debug, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&UserOutcome> for SummaryRow {
    fn from(outcome: &UserOutcome) -> Self {
        match &outcome.result {
            Ok(report) => {
                let mut changes = Vec::new();
                if report.created_in_broker || report.created_in_main {
                    changes.push("created");
                }
                if report.role_assigned {
                    changes.push("role");
                }
                if report.applications.is_some() {
                    changes.push("applications");
                }
                if report.broker_linked || report.upstream_linked {
                    changes.push("linked");
                }
                Self {
                    name: outcome.display_name.clone(),
                    username: report.username.clone(),
                    status: "ok".to_string(),
                    detail: if changes.is_empty() {
                        "up to date".to_string()
                    } else {
                        changes.join(", ")
                    },
                }
            }
            Err(e) => Self {
                name: outcome.display_name.clone(),
                username: String::new(),
                status: "failed".to_string(),
                detail: e.to_string(),
            },
        }
    }
}

/// Grants the realm role `role_name` to the user unless already held.
///
/// Returns whether the role was assigned by this call.
pub async fn ensure_realm_role(
    api: &dyn AdminApi,
    realm: &str,
    user_id: &str,
    role_name: &str,
) -> ProvisionResult<bool> {
    let role = api.realm_role(realm, role_name).await?.ok_or_else(|| {
        AdminError::not_found("Realm role", format!("{role_name} (realm {realm})"))
    })?;
    let held = api.user_realm_roles(realm, user_id).await?;

    match plan_role(&held, &role) {
        Action::AssignRole(role) => {
            api.add_user_realm_roles(realm, user_id, std::slice::from_ref(&role))
                .await?;
            success(&format!("Role '{}' assigned", role.name));
            Ok(true)
        }
        _ => {
            info(&format!("Role '{role_name}' already assigned"));
            Ok(false)
        }
    }
}

/// Provisions people for one project.
pub struct UserProvisioner<'a> {
    api: &'a dyn AdminApi,
    config: &'a ProvisionConfig,
    project: String,
    domain: String,
}

impl<'a> UserProvisioner<'a> {
    /// Creates a provisioner; `domain` must already be normalised.
    pub fn new(
        api: &'a dyn AdminApi,
        config: &'a ProvisionConfig,
        project: impl Into<String>,
        domain: impl Into<String>,
    ) -> ProvisionResult<Self> {
        let project = project.into();
        if project.trim().is_empty() {
            return Err(ProvisionError::InvalidArgument(
                "project identifier is empty".to_string(),
            ));
        }
        Ok(Self {
            api,
            config,
            project,
            domain: domain.into(),
        })
    }

    /// Email domain in use.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Processes every name in order. A failing user does not stop the batch;
    /// a fatal error (the session can no longer authenticate) does.
    pub async fn run_batch(&self, batch: &BatchNames) -> BatchReport {
        let mut report = BatchReport {
            skipped: batch.skipped,
            ..BatchReport::default()
        };
        if batch.skipped > 0 {
            warning(&format!(
                "Skipped {} empty name(s) in the user list",
                batch.skipped
            ));
        }

        let total = batch.names.len();
        for (index, name) in batch.names.iter().enumerate() {
            heading(&format!("Processing user {}/{total}: {name}", index + 1));

            let result = self.provision(name).await;
            match &result {
                Ok(_) => success(&format!("User '{name}' provisioned")),
                Err(e) => error(&format!("User '{name}' failed: {e}")),
            }
            let fatal = result.as_ref().is_err_and(ProvisionError::is_fatal);
            report.outcomes.push(UserOutcome {
                display_name: name.clone(),
                result,
            });

            if fatal {
                warn!("fatal error, stopping batch");
                report.not_attempted = batch.names[index + 1..].to_vec();
                break;
            }

            if index + 1 < total && self.config.users.pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.users.pause_ms)).await;
            }
        }

        report
    }

    /// Provisions one person in both realms.
    pub async fn provision(&self, display_name: &str) -> ProvisionResult<UserReport> {
        let identity = derive_identity(display_name, &self.domain)?;
        let broker_realm = &self.config.realms.broker;
        let main_realm = &self.config.realms.main;

        detail("Username", &identity.username);
        detail("First name", &identity.first_name);
        detail("Last name", &identity.last_name);
        detail("Project", &self.project);

        let (broker_user_id, created_in_broker) = self.ensure_user(broker_realm, &identity).await?;
        let (main_user_id, created_in_main) = self.ensure_user(main_realm, &identity).await?;

        let role_assigned =
            ensure_realm_role(self.api, main_realm, &main_user_id, &self.config.users.role).await?;
        let applications = self
            .ensure_applications(main_realm, &main_user_id, &identity)
            .await?;

        let broker_linked = self
            .ensure_link(
                main_realm,
                &main_user_id,
                &self.config.users.broker_alias,
                &broker_user_id,
                &identity.username,
            )
            .await?;

        let upstream_linked = match &self.config.users.upstream_alias {
            Some(alias) => {
                self.ensure_link(
                    broker_realm,
                    &broker_user_id,
                    alias,
                    &identity.federated_user_id,
                    &identity.username,
                )
                .await?
            }
            None => false,
        };

        Ok(UserReport {
            username: identity.username,
            broker_user_id,
            main_user_id,
            created_in_broker,
            created_in_main,
            role_assigned,
            applications,
            broker_linked,
            upstream_linked,
        })
    }

    /// Finds the user by username or creates it; returns `(id, created)`.
    async fn ensure_user(
        &self,
        realm: &str,
        identity: &DerivedIdentity,
    ) -> ProvisionResult<(String, bool)> {
        let existing = self.api.find_user(realm, &identity.username).await?;

        match plan_user(existing.as_ref()) {
            Action::Create => {
                let id = self.api.create_user(realm, &new_user(identity)).await?;
                success(&format!("User created in realm '{realm}' ({id})"));
                Ok((id, true))
            }
            _ => {
                let id = existing.and_then(|u| u.id).ok_or_else(|| {
                    AdminError::Malformed(format!("user '{}' has no id", identity.username))
                })?;
                info(&format!("User already exists in realm '{realm}' ({id})"));
                Ok((id, false))
            }
        }
    }

    /// Merges the project into `applications`; returns the new value if written.
    async fn ensure_applications(
        &self,
        realm: &str,
        user_id: &str,
        identity: &DerivedIdentity,
    ) -> ProvisionResult<Option<String>> {
        let mut user = self.api.get_user(realm, user_id).await?;

        match plan_applications(&user, identity.email(), &self.project) {
            Action::MergeAttribute { key, value } => {
                user.set_attribute(key.as_str(), value.as_str());
                self.api.update_user(realm, user_id, &user).await?;
                success(&format!("Attribute '{key}' set to '{value}'"));
                Ok(Some(value))
            }
            _ => {
                info(&format!("Project '{}' already in applications", self.project));
                Ok(None)
            }
        }
    }

    /// Links `user_id` to `alias` unless a link to that provider exists.
    async fn ensure_link(
        &self,
        realm: &str,
        user_id: &str,
        alias: &str,
        remote_user_id: &str,
        remote_username: &str,
    ) -> ProvisionResult<bool> {
        require_identity_provider(&self.api.identity_providers(realm).await?, realm, alias)?;
        let links = self.api.federated_identities(realm, user_id).await?;

        match plan_identity_link(&links, alias, remote_user_id, remote_username) {
            Action::LinkIdentity { alias, link } => {
                self.api
                    .add_federated_identity(realm, user_id, &alias, &link)
                    .await?;
                success(&format!(
                    "Identity provider link '{alias}' created in realm '{realm}'"
                ));
                Ok(true)
            }
            _ => {
                debug!(%realm, %alias, "identity link already present");
                info(&format!(
                    "Identity provider link '{alias}' already exists in realm '{realm}'"
                ));
                Ok(false)
            }
        }
    }
}
