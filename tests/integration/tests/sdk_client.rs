//! SDK client provisioning tests.

use kc_admin_client::AdminError;
use kc_provision::commands::run_sdk_client;
use kc_provision::ProvisionError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{TestEnv, MAIN};

async fn mount_scopes(env: &TestEnv) {
    env.get(
        MAIN,
        "/client-scopes",
        json!([
            { "id": "scope-profile", "name": "profile", "protocol": "openid-connect" },
            { "id": "scope-codemie", "name": "codemie", "protocol": "openid-connect" }
        ]),
    )
    .await;
}

async fn mount_client_search(env: &TestEnv, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/admin/realms/{MAIN}/clients")))
        .and(query_param("clientId", "codemie-sdk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&env.server)
        .await;
}

/// Tests that a fresh realm gets the public client and its default scope.
#[tokio::test]
async fn test_creates_client_and_attaches_scope() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    mount_client_search(&env, json!([])).await;
    mount_scopes(&env).await;

    Mock::given(method("POST"))
        .and(path(format!("/admin/realms/{MAIN}/clients")))
        .and(body_partial_json(json!({
            "clientId": "codemie-sdk",
            "publicClient": true,
            "rootUrl": "https://app.example.com",
            "redirectUris": ["https://app.example.com/*"],
            "webOrigins": ["https://app.example.com"],
            "attributes": { "access.token.lifespan": "300" }
        })))
        .respond_with(ResponseTemplate::new(201).insert_header(
            "Location",
            format!("{}/admin/realms/{MAIN}/clients/c-1", env.server.uri()),
        ))
        .expect(1)
        .mount(&env.server)
        .await;
    env.get(MAIN, "/clients/c-1/default-client-scopes", json!([]))
        .await;
    env.accept("PUT", MAIN, "/clients/c-1/default-client-scopes/scope-codemie", 1)
        .await;

    let report = run_sdk_client(&env.admin(), &env.config).await?;

    assert_eq!(report.client_id, "codemie-sdk");
    assert_eq!(report.client_uuid, "c-1");
    assert!(report.created);
    assert!(report.scope_attached);
    Ok(())
}

/// Tests that a second run against a configured realm writes nothing.
#[tokio::test]
async fn test_rerun_is_read_only() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.forbid_writes().await;
    mount_client_search(
        &env,
        json!([{ "id": "c-1", "clientId": "codemie-sdk", "publicClient": true }]),
    )
    .await;
    mount_scopes(&env).await;
    env.get(
        MAIN,
        "/clients/c-1/default-client-scopes",
        json!([{ "id": "scope-codemie", "name": "codemie" }]),
    )
    .await;

    let report = run_sdk_client(&env.admin(), &env.config).await?;

    assert!(!report.created);
    assert!(!report.scope_attached);
    Ok(())
}

/// Tests that an existing client missing the scope only gets the scope attached.
#[tokio::test]
async fn test_existing_client_gets_missing_scope() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    mount_client_search(
        &env,
        json!([{ "id": "c-1", "clientId": "codemie-sdk", "publicClient": false }]),
    )
    .await;
    mount_scopes(&env).await;
    env.get(
        MAIN,
        "/clients/c-1/default-client-scopes",
        json!([{ "id": "scope-profile", "name": "profile" }]),
    )
    .await;
    env.create(MAIN, "clients", "unused", 0).await;
    env.accept("PUT", MAIN, "/clients/c-1/default-client-scopes/scope-codemie", 1)
        .await;

    let report = run_sdk_client(&env.admin(), &env.config).await?;

    assert!(!report.created);
    assert!(report.scope_attached);
    Ok(())
}

/// Tests that a scope absent from the realm is reported, not created.
#[tokio::test]
async fn test_missing_scope_is_not_found() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.forbid_writes().await;
    mount_client_search(&env, json!([{ "id": "c-1", "clientId": "codemie-sdk" }])).await;
    env.get(
        MAIN,
        "/client-scopes",
        json!([{ "id": "scope-profile", "name": "profile" }]),
    )
    .await;

    let err = run_sdk_client(&env.admin(), &env.config)
        .await
        .expect_err("scope lookup should fail");

    assert!(matches!(
        err,
        ProvisionError::Admin(AdminError::NotFound { ref resource_type, ref id })
            if resource_type == "Client scope" && id == "codemie"
    ));
    Ok(())
}

/// Tests that two clients with the same client ID stop the run.
#[tokio::test]
async fn test_duplicate_clients_are_ambiguous() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.forbid_writes().await;
    mount_client_search(
        &env,
        json!([
            { "id": "c-1", "clientId": "codemie-sdk" },
            { "id": "c-2", "clientId": "codemie-sdk" }
        ]),
    )
    .await;

    let err = run_sdk_client(&env.admin(), &env.config)
        .await
        .expect_err("lookup should be ambiguous");

    assert!(matches!(
        err,
        ProvisionError::Admin(AdminError::Ambiguous { count: 2, .. })
    ));
    Ok(())
}
