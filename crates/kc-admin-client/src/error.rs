//! Admin client error types.

use thiserror::Error;

/// Errors raised while talking to the Keycloak Admin REST API.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The token endpoint rejected the credentials or could not be reached.
    #[error("authentication against realm '{realm}' failed: {reason}")]
    Authentication {
        /// Realm the token was requested from.
        realm: String,
        /// Upstream HTTP status, if a response was received.
        status: Option<u16>,
        /// Human-readable reason.
        reason: String,
    },

    /// A required pre-existing object is missing.
    #[error("{resource_type} not found: {id}")]
    NotFound {
        /// Type of resource.
        resource_type: String,
        /// Resource identifier.
        id: String,
    },

    /// A lookup that must be unique returned several matches.
    #[error("{resource_type} lookup for '{id}' is ambiguous: {count} matches")]
    Ambiguous {
        /// Type of resource.
        resource_type: String,
        /// Lookup key.
        id: String,
        /// Number of matches returned.
        count: usize,
    },

    /// Input rejected before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Any other non-success admin API response.
    #[error("admin API error: {status} - {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// A create call succeeded but did not say where the new object lives.
    #[error("{resource_type} created but response carried no Location header")]
    MissingLocation {
        /// Type of resource.
        resource_type: String,
    },

    /// A response was well-formed JSON but lacked a required field.
    #[error("malformed admin response: {0}")]
    Malformed(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdminError {
    /// Creates a not-found error.
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Returns true when no further admin call can succeed with this session.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

/// Admin client result type.
pub type AdminResult<T> = Result<T, AdminError>;
