//! Pure reconcile planners.
//!
//! Each planner looks at what Keycloak currently holds and returns the single
//! [`Action`] that brings it to the desired state. Planners never perform I/O;
//! the command modules execute the returned action through the admin API.

use kc_admin_client::dto::{
    ClientRepresentation, ClientScopeRepresentation, FederatedIdentityRepresentation,
    IdentityProviderRepresentation, RoleRepresentation, UserRepresentation,
};
use kc_admin_client::{AdminError, AdminResult};

use crate::applications::{merge_applications, merge_list, APPLICATIONS, APPLICATIONS_ADMIN};

/// What to do to reach the desired state.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Already in the desired state.
    NoOp,
    /// The object does not exist and must be created.
    Create,
    /// Attach a client scope as a default scope.
    AttachScope {
        /// Scope ID.
        scope_id: String,
        /// Scope name, for reporting.
        scope_name: String,
    },
    /// Grant a realm role.
    AssignRole(RoleRepresentation),
    /// Write a merged attribute value.
    MergeAttribute {
        /// Attribute key.
        key: String,
        /// New single value.
        value: String,
    },
    /// Create a federated identity link.
    LinkIdentity {
        /// Identity provider alias.
        alias: String,
        /// Link body.
        link: FederatedIdentityRepresentation,
    },
    /// Replace the user representation.
    UpdateUser(Box<UserRepresentation>),
}

impl Action {
    /// Whether executing this action changes server state.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

/// Create a client only when none exists; existing clients are left as they are.
#[must_use]
pub const fn plan_client(existing: Option<&ClientRepresentation>) -> Action {
    match existing {
        Some(_) => Action::NoOp,
        None => Action::Create,
    }
}

/// Create a user only when none exists; existing users are reused unchanged.
#[must_use]
pub const fn plan_user(existing: Option<&UserRepresentation>) -> Action {
    match existing {
        Some(_) => Action::NoOp,
        None => Action::Create,
    }
}

/// Finds a realm client scope by name; it must already exist.
pub fn resolve_scope(
    scopes: &[ClientScopeRepresentation],
    name: &str,
) -> AdminResult<ClientScopeRepresentation> {
    scopes
        .iter()
        .find(|s| s.name == name)
        .cloned()
        .ok_or_else(|| AdminError::not_found("Client scope", name))
}

/// Attach `scope` unless it is already among the client's default scopes.
#[must_use]
pub fn plan_scope(
    assigned: &[ClientScopeRepresentation],
    scope: &ClientScopeRepresentation,
) -> Action {
    if assigned
        .iter()
        .any(|s| s.id == scope.id || s.name == scope.name)
    {
        Action::NoOp
    } else {
        Action::AttachScope {
            scope_id: scope.id.clone(),
            scope_name: scope.name.clone(),
        }
    }
}

/// Grant `role` unless the user already holds it directly.
#[must_use]
pub fn plan_role(held: &[RoleRepresentation], role: &RoleRepresentation) -> Action {
    let already = held.iter().any(|r| match (&r.id, &role.id) {
        (Some(a), Some(b)) => a == b,
        _ => r.name == role.name,
    });

    if already {
        Action::NoOp
    } else {
        Action::AssignRole(role.clone())
    }
}

/// Merge `project` into the user's `applications` attribute.
#[must_use]
pub fn plan_applications(user: &UserRepresentation, email: &str, project: &str) -> Action {
    let current = user.joined_attribute(APPLICATIONS);
    let merged = merge_applications(current.as_deref(), email, project);

    if current.as_deref() == Some(merged.as_str()) {
        Action::NoOp
    } else {
        Action::MergeAttribute {
            key: APPLICATIONS.to_string(),
            value: merged,
        }
    }
}

/// Checks that an identity provider with `alias` is configured.
pub fn require_identity_provider(
    providers: &[IdentityProviderRepresentation],
    realm: &str,
    alias: &str,
) -> AdminResult<()> {
    if providers.iter().any(|p| p.alias == alias) {
        Ok(())
    } else {
        Err(AdminError::not_found(
            "Identity provider",
            format!("{alias} (realm {realm})"),
        ))
    }
}

/// Link the user to `alias` unless a link to that provider exists.
///
/// An existing link is kept even if it points at a different remote user.
#[must_use]
pub fn plan_identity_link(
    links: &[FederatedIdentityRepresentation],
    alias: &str,
    remote_user_id: &str,
    remote_username: &str,
) -> Action {
    if links
        .iter()
        .any(|l| l.identity_provider.as_deref() == Some(alias))
    {
        return Action::NoOp;
    }

    Action::LinkIdentity {
        alias: alias.to_string(),
        link: FederatedIdentityRepresentation {
            identity_provider: None,
            user_id: remote_user_id.to_string(),
            user_name: remote_username.to_string(),
        },
    }
}

/// Desired profile of an API client's service account user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccountProfile {
    /// Email address.
    pub email: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Project merged into `applications` and `applications_admin`.
    pub project: String,
}

/// Bring a service account's profile and project attributes in line with `profile`.
///
/// Returns one [`Action::UpdateUser`] carrying the full representation, or
/// [`Action::NoOp`] when nothing differs.
#[must_use]
pub fn plan_service_account(
    current: &UserRepresentation,
    profile: &ServiceAccountProfile,
) -> Action {
    let mut desired = current.clone();
    desired.email = Some(profile.email.clone());
    desired.first_name = Some(profile.first_name.clone());
    desired.last_name = Some(profile.last_name.clone());
    desired.email_verified = Some(true);

    for key in [APPLICATIONS, APPLICATIONS_ADMIN] {
        let existing = current.joined_attribute(key);
        if existing.as_deref().map_or(true, |v| !v.split(',').any(|t| t == profile.project)) {
            desired.set_attribute(key, merge_list(existing.as_deref(), &profile.project));
        }
    }

    if desired == *current {
        Action::NoOp
    } else {
        Action::UpdateUser(Box::new(desired))
    }
}
