//! Provisioning error types.

use kc_admin_client::AdminError;
use thiserror::Error;

/// Provisioning error type.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Admin API error.
    #[error(transparent)]
    Admin(#[from] AdminError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ProvisionError {
    /// Returns true when the whole run must stop, not just the current item.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Admin(e) => e.is_fatal(),
            Self::Config(_) | Self::InvalidArgument(_) | Self::Io(_) | Self::Http(_) => true,
        }
    }
}

/// Provisioning result type.
pub type ProvisionResult<T> = Result<T, ProvisionError>;
