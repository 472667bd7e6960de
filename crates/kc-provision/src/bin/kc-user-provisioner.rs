//! Provisions brokered users for a project in the broker and main realms.

use std::process::ExitCode;

use clap::Parser;
use kc_admin_client::KeycloakAdmin;
use kc_provision::{
    cli::{init_tracing, UserProvisionerCli},
    commands::{http_client, token_session, RunStatus, UserProvisioner},
    naming::{normalize_email_domain, parse_batch},
    output::{detail, error, heading},
    ProvisionError, ProvisionResult,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = UserProvisionerCli::parse();
    init_tracing(cli.common.verbose);

    let status = match run(&cli).await {
        Ok(status) => status,
        Err(e) => {
            error(&e.to_string());
            RunStatus::Fatal
        }
    };
    ExitCode::from(status.exit_code())
}

async fn run(cli: &UserProvisionerCli) -> ProvisionResult<RunStatus> {
    let batch = parse_batch(&cli.names);
    if batch.names.is_empty() {
        return Err(ProvisionError::InvalidArgument(
            "no user names given".to_string(),
        ));
    }

    let config = cli.common.load_config()?;
    let domain = cli
        .email_domain
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map_or_else(|| config.email_domain(), normalize_email_domain);

    heading("User provisioning");
    detail("Server", config.server_url());
    detail("Broker realm", &config.realms.broker);
    detail("Main realm", &config.realms.main);
    detail("Project", &cli.project);
    detail("Email domain", &domain);
    detail("Users", &batch.names.len().to_string());

    let http = http_client(&config)?;
    let session = token_session(&config, http.clone())?;
    session.authenticate().await?;

    let api = KeycloakAdmin::new(http, config.server_url(), &session);
    let provisioner = UserProvisioner::new(&api, &config, cli.project.as_str(), domain)?;
    let report = provisioner.run_batch(&batch).await;

    report.print_summary(provisioner.domain());
    Ok(report.status())
}
