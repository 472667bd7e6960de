//! Command implementations.
//!
//! Each command drives the admin API through `&dyn AdminApi`, so the same code
//! runs against a live server and against the simulated one in tests.

pub mod api_client;
pub mod sdk_client;
pub mod users;

pub use api_client::{run_api_client, ApiClientReport};
pub use sdk_client::{ensure_client, ensure_default_scope, run_sdk_client, ClientReport};
pub use users::{ensure_realm_role, BatchReport, UserOutcome, UserProvisioner, UserReport};

use std::time::Duration;

use kc_admin_client::{AdminCredentials, TokenSession};

use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, ProvisionResult};

/// Builds the HTTP client with configured timeouts and TLS policy.
pub fn http_client(config: &ProvisionConfig) -> ProvisionResult<reqwest::Client> {
    if config.server.insecure {
        tracing::warn!("TLS certificate verification is disabled");
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.server.timeout_secs))
        .connect_timeout(Duration::from_secs(config.server.connect_timeout_secs))
        .danger_accept_invalid_certs(config.server.insecure)
        .user_agent(concat!("kc-provision/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Creates the admin token session described by `config`.
pub fn token_session(
    config: &ProvisionConfig,
    http: reqwest::Client,
) -> ProvisionResult<TokenSession> {
    let password = config
        .admin
        .password
        .clone()
        .ok_or_else(|| ProvisionError::Config("admin password is required".to_string()))?;

    Ok(TokenSession::new(
        http,
        config.server_url(),
        AdminCredentials {
            realm: config.admin.realm.clone(),
            client_id: config.admin.client_id.clone(),
            username: config.admin.username.clone(),
            password,
        },
    ))
}

/// How a run ended, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Everything succeeded.
    Success,
    /// Unrecoverable error; nothing or only part of the work was attempted.
    Fatal,
    /// A batch completed but some items failed.
    PartialFailure,
}

impl RunStatus {
    /// Process exit code.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Fatal => 1,
            Self::PartialFailure => 2,
        }
    }
}
