//! CLI argument parsing.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, Parser};
use tracing_subscriber::EnvFilter;

use crate::config::ProvisionConfig;
use crate::error::ProvisionResult;
use crate::output::prompt_password;

/// Flags shared by every provisioning tool.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Configuration file (defaults to ~/.keycloak/provision.toml when present).
    #[arg(short, long, env = "KC_PROVISION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keycloak server URL (overrides config).
    #[arg(short, long, env = "KC_SERVER_URL")]
    pub server: Option<String>,

    /// Skip TLS certificate verification (self-signed deployments only).
    #[arg(long)]
    pub insecure: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Loads configuration, applies these flags, and validates the result.
    ///
    /// A missing admin password is prompted for when stdin is a terminal.
    pub fn load_config(&self) -> ProvisionResult<ProvisionConfig> {
        let mut config = ProvisionConfig::load(self.config.as_deref())?;
        self.apply(&mut config);

        if config.admin.password.is_none() && std::io::stdin().is_terminal() {
            let prompt = format!("Password for '{}': ", config.admin.username);
            config.admin.password = Some(prompt_password(&prompt)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Applies flag overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut ProvisionConfig) {
        if let Some(server) = self.server.as_ref().filter(|s| !s.is_empty()) {
            config.server.url.clone_from(server);
        }
        if self.insecure {
            config.server.insecure = true;
        }
    }
}

/// Creates or finds the public SDK client and attaches its default scope.
#[derive(Debug, Parser)]
#[command(name = "kc-sdk-client")]
#[command(author, version, about, long_about = None)]
pub struct SdkClientCli {
    /// Shared options.
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Provisions brokered users in the broker and main realms.
#[derive(Debug, Parser)]
#[command(name = "kc-user-provisioner")]
#[command(author, version, about, long_about = None)]
pub struct UserProvisionerCli {
    /// Project identifier added to each user's applications attribute.
    pub project: String,

    /// Comma-separated display names, e.g. "Jon Doe, Jane Smith".
    pub names: String,

    /// Email domain appended to usernames (defaults to EMAIL_DOMAIN or config).
    pub email_domain: Option<String>,

    /// Shared options.
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Creates or finds a project's confidential API client and its service account.
#[derive(Debug, Parser)]
#[command(name = "kc-api-client")]
#[command(author, version, about, long_about = None)]
pub struct ApiClientCli {
    /// Project name; the client ID is the configured prefix plus this name.
    pub project: String,

    /// Shared options.
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Installs the tracing subscriber; `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "kc_provision=debug,kc_admin_client=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
