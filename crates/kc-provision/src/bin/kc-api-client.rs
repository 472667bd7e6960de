//! Provisions a project's confidential API client and its service account.

use std::process::ExitCode;

use clap::Parser;
use kc_admin_client::KeycloakAdmin;
use kc_provision::{
    cli::{init_tracing, ApiClientCli},
    commands::{http_client, run_api_client, token_session, RunStatus},
    output::{error, success},
    ProvisionResult,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = ApiClientCli::parse();
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

async fn run(cli: &ApiClientCli) -> ProvisionResult<RunStatus> {
    let config = cli.common.load_config()?;
    let http = http_client(&config)?;
    let session = token_session(&config, http.clone())?;
    session.authenticate().await?;

    let api = KeycloakAdmin::new(http, config.server_url(), &session);
    let report = run_api_client(&api, &config, &cli.project).await?;

    success(&format!("API client '{}' is ready", report.client_id));
    Ok(RunStatus::Success)
}
