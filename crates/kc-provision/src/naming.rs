//! Username, email and client-name derivation.
//!
//! Everything here is pure: the same display name and domain always produce the
//! same username, which is what makes re-runs find the users they created.

use kc_admin_client::{AdminError, AdminResult};

/// Names and identifiers derived from one person's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedIdentity {
    /// Display name with whitespace collapsed.
    pub display_name: String,
    /// First token of the display name.
    pub first_name: String,
    /// Remaining tokens, space-joined; empty for single-word names.
    pub last_name: String,
    /// Username, also used as email.
    pub username: String,
    /// Case-preserving identifier used for upstream identity links.
    pub federated_user_id: String,
}

impl DerivedIdentity {
    /// Email address; identical to the username.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.username
    }
}

/// Splits a display name into first name and last name.
///
/// The first whitespace-separated token is the first name; all remaining tokens,
/// joined by single spaces, form the last name.
pub fn split_display_name(display_name: &str) -> AdminResult<(String, String)> {
    let mut tokens = display_name.split_whitespace();
    let first = tokens
        .next()
        .ok_or_else(|| AdminError::Validation("display name is empty".to_string()))?;
    let last = tokens.collect::<Vec<_>>().join(" ");
    Ok((first.to_string(), last))
}

/// Derives the username for a display name: `first_last` lower-cased, plus `domain`.
///
/// `derive("Jon Von Doe", "@x.com")` is `"jon_von_doe@x.com"`.
pub fn derive(display_name: &str, domain: &str) -> AdminResult<String> {
    let (first, last) = split_display_name(display_name)?;
    Ok(compose(&first, &last, domain, true))
}

/// Derives every identifier needed to provision one person.
pub fn derive_identity(display_name: &str, domain: &str) -> AdminResult<DerivedIdentity> {
    let (first_name, last_name) = split_display_name(display_name)?;
    let username = compose(&first_name, &last_name, domain, true);
    let federated_user_id = compose(&first_name, &last_name, domain, false);
    let display_name = if last_name.is_empty() {
        first_name.clone()
    } else {
        format!("{first_name} {last_name}")
    };

    Ok(DerivedIdentity {
        display_name,
        first_name,
        last_name,
        username,
        federated_user_id,
    })
}

fn compose(first: &str, last: &str, domain: &str, lowercase: bool) -> String {
    let underscored = |part: &str| {
        let joined = part.split_whitespace().collect::<Vec<_>>().join("_");
        if lowercase {
            joined.to_lowercase()
        } else {
            joined
        }
    };

    let mut local = underscored(first);
    if !last.is_empty() {
        local.push('_');
        local.push_str(&underscored(last));
    }
    local + domain
}

/// Normalises an email domain to start with `@`; case is kept as given.
#[must_use]
pub fn normalize_email_domain(domain: &str) -> String {
    let domain = domain.trim();
    if domain.starts_with('@') {
        domain.to_string()
    } else {
        format!("@{domain}")
    }
}

/// Display names parsed from one comma-separated argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchNames {
    /// Trimmed, non-empty names in input order.
    pub names: Vec<String>,
    /// Number of segments that were empty after trimming.
    pub skipped: usize,
}

/// Splits a comma-separated list of display names.
///
/// Segments are trimmed; empty segments are counted in [`BatchNames::skipped`]
/// rather than rejected.
#[must_use]
pub fn parse_batch(input: &str) -> BatchNames {
    input
        .split(',')
        .map(str::trim)
        .fold(BatchNames::default(), |mut batch, name| {
            if name.is_empty() {
                batch.skipped += 1;
            } else {
                batch.names.push(name.to_string());
            }
            batch
        })
}

/// Client ID for a project's API client; an already-prefixed name is kept.
#[must_use]
pub fn api_client_name(prefix: &str, project: &str) -> String {
    let project = project.trim();
    if project.starts_with(prefix) {
        project.to_string()
    } else {
        format!("{prefix}{project}")
    }
}

/// First and last name for a project's service account.
///
/// Hyphenated names split at the first hyphen; single words are duplicated.
#[must_use]
pub fn project_person_name(project: &str) -> (String, String) {
    match project.split_once('-') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (project.to_string(), project.to_string()),
    }
}

/// Email of a client's service account user.
#[must_use]
pub fn service_account_email(client_name: &str, domain: &str) -> String {
    format!(
        "service-account-{client_name}{}",
        normalize_email_domain(domain)
    )
}
