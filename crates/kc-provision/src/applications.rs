//! The `applications` user attribute.
//!
//! The attribute is a comma-joined ordered list. For people it starts with the
//! user's email followed by project identifiers. Merging only ever appends.

/// Attribute key holding the project list.
pub const APPLICATIONS: &str = "applications";

/// Attribute key holding the projects a service account administers.
pub const APPLICATIONS_ADMIN: &str = "applications_admin";

/// Merges `project` into a person's `applications` value.
///
/// Without an existing value the result is `email,project`. Otherwise `project`
/// is appended unless some token already equals it exactly (case-sensitive, no
/// trimming). Existing tokens are never reordered or dropped.
#[must_use]
pub fn merge_applications(existing: Option<&str>, email: &str, project: &str) -> String {
    match existing.filter(|v| !v.is_empty()) {
        None => format!("{email},{project}"),
        Some(current) => merge_list(Some(current), project),
    }
}

/// Appends `value` to a comma-joined list unless it is already one of its tokens.
#[must_use]
pub fn merge_list(existing: Option<&str>, value: &str) -> String {
    match existing.filter(|v| !v.is_empty()) {
        None => value.to_string(),
        Some(current) if current.split(',').any(|token| token == value) => current.to_string(),
        Some(current) => format!("{current},{value}"),
    }
}
