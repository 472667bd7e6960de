//! Brokered user provisioning tests.

use kc_admin_client::AdminError;
use kc_provision::commands::{RunStatus, UserProvisioner};
use kc_provision::naming::parse_batch;
use kc_provision::ProvisionError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{developer_role, providers, user, TestEnv, BROKER, MAIN};

const DOMAIN: &str = "@domain.com";

/// Mounts a person who is already fully provisioned for `applications`.
async fn mount_provisioned(
    env: &TestEnv,
    username: &str,
    broker_id: &str,
    main_id: &str,
    applications: &str,
) {
    env.users_search(BROKER, username, json!([user(broker_id, username, None)]))
        .await;
    env.users_search(
        MAIN,
        username,
        json!([user(main_id, username, Some(applications))]),
    )
    .await;
    env.get(
        MAIN,
        &format!("/users/{main_id}/role-mappings/realm"),
        json!([developer_role()]),
    )
    .await;
    env.get(
        MAIN,
        &format!("/users/{main_id}"),
        user(main_id, username, Some(applications)),
    )
    .await;
    env.get(
        MAIN,
        &format!("/users/{main_id}/federated-identity"),
        json!([{ "identityProvider": "broker", "userId": broker_id, "userName": username }]),
    )
    .await;
}

async fn mount_realm_basics(env: &TestEnv) {
    env.get(MAIN, "/roles/developer", developer_role()).await;
    env.get(MAIN, "/identity-provider/instances", providers(&["broker"]))
        .await;
}

/// Tests that a new person is created in both realms, granted the role,
/// tagged with the project, and linked to the broker.
#[tokio::test]
async fn test_provisions_new_user_in_both_realms() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    mount_realm_basics(&env).await;

    env.users_search(BROKER, "jon_doe@domain.com", json!([])).await;
    env.users_search(MAIN, "jon_doe@domain.com", json!([])).await;
    Mock::given(method("POST"))
        .and(path(format!("/admin/realms/{BROKER}/users")))
        .and(body_partial_json(json!({
            "username": "jon_doe@domain.com",
            "email": "jon_doe@domain.com",
            "firstName": "Jon",
            "lastName": "Doe",
            "enabled": true,
            "emailVerified": false
        })))
        .respond_with(ResponseTemplate::new(201).insert_header(
            "Location",
            format!("{}/admin/realms/{BROKER}/users/u-b1", env.server.uri()),
        ))
        .expect(1)
        .mount(&env.server)
        .await;
    env.create(MAIN, "users", "u-m1", 1).await;

    env.get(MAIN, "/users/u-m1/role-mappings/realm", json!([])).await;
    Mock::given(method("POST"))
        .and(path(format!("/admin/realms/{MAIN}/users/u-m1/role-mappings/realm")))
        .and(body_partial_json(json!([{ "id": "role-dev", "name": "developer" }])))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&env.server)
        .await;

    env.get(MAIN, "/users/u-m1", user("u-m1", "jon_doe@domain.com", None))
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/admin/realms/{MAIN}/users/u-m1")))
        .and(body_partial_json(json!({
            "attributes": { "applications": ["jon_doe@domain.com,proj1"] }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&env.server)
        .await;

    env.get(MAIN, "/users/u-m1/federated-identity", json!([])).await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/admin/realms/{MAIN}/users/u-m1/federated-identity/broker"
        )))
        .and(body_partial_json(json!({
            "userId": "u-b1",
            "userName": "jon_doe@domain.com"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&env.server)
        .await;

    let admin = env.admin();
    let provisioner = UserProvisioner::new(&admin, &env.config, "proj1", DOMAIN)?;
    let report = provisioner.provision("Jon Doe").await?;

    assert_eq!(report.username, "jon_doe@domain.com");
    assert_eq!(report.broker_user_id, "u-b1");
    assert_eq!(report.main_user_id, "u-m1");
    assert!(report.created_in_broker && report.created_in_main);
    assert!(report.role_assigned);
    assert_eq!(report.applications.as_deref(), Some("jon_doe@domain.com,proj1"));
    assert!(report.broker_linked);
    assert!(!report.upstream_linked);
    Ok(())
}

/// Tests that re-running for the same project makes no mutating call.
#[tokio::test]
async fn test_rerun_same_project_is_read_only() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.forbid_writes().await;
    mount_realm_basics(&env).await;
    mount_provisioned(
        &env,
        "jon_doe@domain.com",
        "u-b1",
        "u-m1",
        "jon_doe@domain.com,proj1",
    )
    .await;

    let admin = env.admin();
    let provisioner = UserProvisioner::new(&admin, &env.config, "proj1", DOMAIN)?;
    let report = provisioner.provision("Jon Doe").await?;

    assert!(!report.created_in_broker && !report.created_in_main);
    assert!(!report.role_assigned);
    assert_eq!(report.applications, None);
    assert!(!report.broker_linked);
    Ok(())
}

/// Tests that a second project only extends the applications attribute.
#[tokio::test]
async fn test_new_project_extends_applications_only() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    mount_realm_basics(&env).await;
    mount_provisioned(
        &env,
        "jon_doe@domain.com",
        "u-b1",
        "u-m1",
        "jon_doe@domain.com,proj1",
    )
    .await;

    env.create(BROKER, "users", "unused", 0).await;
    env.create(MAIN, "users", "unused", 0).await;
    env.accept("POST", MAIN, "/users/u-m1/role-mappings/realm", 0)
        .await;
    env.accept("POST", MAIN, "/users/u-m1/federated-identity/broker", 0)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/admin/realms/{MAIN}/users/u-m1")))
        .and(body_partial_json(json!({
            "attributes": { "applications": ["jon_doe@domain.com,proj1,proj2"] }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&env.server)
        .await;

    let admin = env.admin();
    let provisioner = UserProvisioner::new(&admin, &env.config, "proj2", DOMAIN)?;
    let report = provisioner.provision("Jon Doe").await?;

    assert_eq!(
        report.applications.as_deref(),
        Some("jon_doe@domain.com,proj1,proj2")
    );
    assert!(!report.broker_linked && !report.role_assigned);
    Ok(())
}

/// Tests that one failing person does not stop the rest of the batch.
#[tokio::test]
async fn test_batch_continues_past_failures() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.forbid_writes().await;
    mount_realm_basics(&env).await;
    mount_provisioned(&env, "jon_doe@domain.com", "u-b1", "u-m1", "jon_doe@domain.com,proj1")
        .await;
    mount_provisioned(&env, "jane_doe@domain.com", "u-b3", "u-m3", "jane_doe@domain.com,proj1")
        .await;
    env.users_search(
        BROKER,
        "john_smith@domain.com",
        json!([
            user("u-b2", "john_smith@domain.com", None),
            user("u-b2x", "John_Smith@domain.com", None)
        ]),
    )
    .await;

    let batch = parse_batch("Jon Doe, John Smith,  , Jane Doe");
    assert_eq!(batch.names, ["Jon Doe", "John Smith", "Jane Doe"]);

    let admin = env.admin();
    let provisioner = UserProvisioner::new(&admin, &env.config, "proj1", DOMAIN)?;
    let report = provisioner.run_batch(&batch).await;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert!(report.not_attempted.is_empty());
    assert!(matches!(
        report.outcomes[1].result,
        Err(ProvisionError::Admin(AdminError::Ambiguous { count: 2, .. }))
    ));
    assert_eq!(report.status(), RunStatus::PartialFailure);
    assert_eq!(report.status().exit_code(), 2);
    Ok(())
}

/// Tests that a rejected admin login stops the batch before anyone else is tried.
#[tokio::test]
async fn test_authentication_failure_aborts_batch() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.forbid_writes().await;
    Mock::given(method("POST"))
        .and(path("/realms/master/protocol/openid-connect/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .with_priority(1)
        .mount(&env.server)
        .await;

    let admin = env.admin();
    let provisioner = UserProvisioner::new(&admin, &env.config, "proj1", DOMAIN)?;
    let report = provisioner
        .run_batch(&parse_batch("Jon Doe, Jane Doe"))
        .await;

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.not_attempted, ["Jane Doe"]);
    assert!(report.aborted());
    assert_eq!(report.status(), RunStatus::Fatal);
    Ok(())
}

/// Tests that a missing broker identity provider is reported and nothing is linked.
#[tokio::test]
async fn test_missing_identity_provider_is_not_found() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.forbid_writes().await;
    env.get(MAIN, "/roles/developer", developer_role()).await;
    env.get(MAIN, "/identity-provider/instances", providers(&["google"]))
        .await;
    mount_provisioned(
        &env,
        "jon_doe@domain.com",
        "u-b1",
        "u-m1",
        "jon_doe@domain.com,proj1",
    )
    .await;

    let admin = env.admin();
    let provisioner = UserProvisioner::new(&admin, &env.config, "proj1", DOMAIN)?;
    let err = provisioner
        .provision("Jon Doe")
        .await
        .expect_err("link should fail");

    assert!(matches!(
        err,
        ProvisionError::Admin(AdminError::NotFound { ref resource_type, .. })
            if resource_type == "Identity provider"
    ));
    Ok(())
}

/// Tests that a missing realm role is reported instead of created.
#[tokio::test]
async fn test_missing_role_is_not_found() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.forbid_writes().await;
    Mock::given(method("GET"))
        .and(path(format!("/admin/realms/{MAIN}/roles/developer")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&env.server)
        .await;
    mount_provisioned(
        &env,
        "jon_doe@domain.com",
        "u-b1",
        "u-m1",
        "jon_doe@domain.com,proj1",
    )
    .await;

    let admin = env.admin();
    let provisioner = UserProvisioner::new(&admin, &env.config, "proj1", DOMAIN)?;
    let err = provisioner
        .provision("Jon Doe")
        .await
        .expect_err("role lookup should fail");

    assert!(matches!(
        err,
        ProvisionError::Admin(AdminError::NotFound { ref resource_type, .. })
            if resource_type == "Realm role"
    ));
    Ok(())
}

/// Tests the optional upstream link from the broker-realm user.
#[tokio::test]
async fn test_links_broker_user_upstream() -> anyhow::Result<()> {
    let mut env = TestEnv::new().await?;
    env.config.users.upstream_alias = Some("corp-sso".to_string());
    mount_realm_basics(&env).await;
    mount_provisioned(
        &env,
        "jon_doe@domain.com",
        "u-b1",
        "u-m1",
        "jon_doe@domain.com,proj1",
    )
    .await;

    env.get(BROKER, "/identity-provider/instances", providers(&["corp-sso"]))
        .await;
    env.get(BROKER, "/users/u-b1/federated-identity", json!([])).await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/admin/realms/{BROKER}/users/u-b1/federated-identity/corp-sso"
        )))
        .and(body_partial_json(json!({
            "userId": "Jon_Doe@domain.com",
            "userName": "jon_doe@domain.com"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&env.server)
        .await;

    let admin = env.admin();
    let provisioner = UserProvisioner::new(&admin, &env.config, "proj1", DOMAIN)?;
    let report = provisioner.provision("Jon Doe").await?;

    assert!(!report.broker_linked);
    assert!(report.upstream_linked);
    Ok(())
}
