//! Creates or finds the public SDK client and attaches its default scope.

use std::process::ExitCode;

use clap::Parser;
use kc_admin_client::KeycloakAdmin;
use kc_provision::{
    cli::{init_tracing, SdkClientCli},
    commands::{http_client, run_sdk_client, token_session, RunStatus},
    output::{error, success},
    ProvisionResult,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = SdkClientCli::parse();
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

async fn run(cli: &SdkClientCli) -> ProvisionResult<RunStatus> {
    let config = cli.common.load_config()?;
    let http = http_client(&config)?;
    let session = token_session(&config, http.clone())?;
    session.authenticate().await?;

    let api = KeycloakAdmin::new(http, config.server_url(), &session);
    let report = run_sdk_client(&api, &config).await?;

    success(&format!(
        "SDK client '{}' is configured in realm '{}'",
        report.client_id, config.realms.main
    ));
    Ok(RunStatus::Success)
}
