use std::sync::Arc;

use idp_broker::{GatewayError, GatewayOptions, IdentityGateway};
use idp_broker_core::{MemoryTenantStore, TenantIdentityConfig, UserMetadata};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{bearer_token, body_json, body_partial_json, method, path, query_param},
};

async fn try_start_mock() -> Option<MockServer> {
    tokio::spawn(async { MockServer::start().await }).await.ok()
}

async fn gateway_for(server: &MockServer) -> IdentityGateway {
    let store = MemoryTenantStore::new().with_tenant(
        "acme",
        TenantIdentityConfig::new(
            server.uri(),
            "c1",
            "s1",
            format!("{}/api/v2/", server.uri()),
        ),
    );
    let gateway =
        IdentityGateway::new(Arc::new(store), GatewayOptions::default()).expect("gateway");
    gateway.init("acme").await.expect("init");
    gateway
}

async fn mount_management_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_json(json!({
            "client_id": "c1",
            "client_secret": "s1",
            "audience": format!("{}/api/v2/", server.uri()),
            "grant_type": "client_credentials",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mgmt-token",
            "token_type": "Bearer",
            "expires_in": 86400
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn exchanges_code_with_json_grant() {
    let Some(server) = try_start_mock().await else {
        eprintln!("skipping exchanges_code_with_json_grant: mock server unavailable");
        return;
    };
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_json(json!({
            "client_id": "c1",
            "client_secret": "s1",
            "audience": format!("{}/api/v2/", server.uri()),
            "grant_type": "authorization_code",
            "code": "abc",
            "redirect_uri": "http://localhost:3000/api/auth/callback",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at",
            "id_token": "it",
            "expires_in": 86400,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let tokens = gateway.exchange_code_for_token("abc").await.expect("tokens");
    assert_eq!(tokens.access_token, "at");
    assert_eq!(tokens.id_token.as_deref(), Some("it"));
    assert_eq!(tokens.refresh_token, None);
    assert_eq!(tokens.expires_in, Some(86400));
}

#[tokio::test]
async fn failed_exchange_surfaces_description_without_retry() {
    let Some(server) = try_start_mock().await else {
        eprintln!(
            "skipping failed_exchange_surfaces_description_without_retry: mock server unavailable"
        );
        return;
    };
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid authorization code"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway
        .exchange_code_for_token("stale")
        .await
        .expect_err("rejected");
    let message = err.to_string();
    assert!(message.starts_with("failed to exchange code for token"), "{message}");
    assert!(message.contains("Invalid authorization code"), "{message}");
}

#[tokio::test]
async fn management_token_is_fetched_for_every_call() {
    let Some(server) = try_start_mock().await else {
        eprintln!("skipping management_token_is_fetched_for_every_call: mock server unavailable");
        return;
    };
    mount_management_token(&server, 2).await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/users/user-1"))
        .and(bearer_token("mgmt-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    assert!(gateway.delete_user("user-1").await.expect("first delete"));
    assert!(gateway.delete_user("user-1").await.expect("second delete"));
}

#[tokio::test]
async fn creates_user_in_configured_connection() {
    let Some(server) = try_start_mock().await else {
        eprintln!("skipping creates_user_in_configured_connection: mock server unavailable");
        return;
    };
    mount_management_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/users"))
        .and(bearer_token("mgmt-token"))
        .and(body_json(json!({
            "email": "ada@example.com",
            "password": "Sup3r-secret",
            "connection": "Username-Password-Authentication",
            "user_metadata": {"firstName": "Ada"},
            "email_verified": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "user_id": "auth0|42",
            "email": "ada@example.com",
            "email_verified": false,
            "created_at": "2026-01-01T00:00:00.000Z",
            "identities": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let mut metadata = UserMetadata::new();
    metadata.insert("firstName".into(), json!("Ada"));
    let user = gateway
        .create_user("ada@example.com", "Sup3r-secret", &metadata)
        .await
        .expect("user");
    assert_eq!(user.user_id.as_deref(), Some("auth0|42"));
    assert!(user.extra.contains_key("identities"));
}

#[tokio::test]
async fn duplicate_user_propagates_provider_message() {
    let Some(server) = try_start_mock().await else {
        eprintln!("skipping duplicate_user_propagates_provider_message: mock server unavailable");
        return;
    };
    mount_management_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "statusCode": 409,
            "error": "Conflict",
            "message": "The user already exists."
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway
        .create_user("ada@example.com", "pw", &UserMetadata::new())
        .await
        .expect_err("conflict");
    assert!(err.to_string().contains("The user already exists."), "{err}");
    assert!(err.provider_rejection().is_some());
}

#[tokio::test]
async fn missing_user_maps_to_not_found() {
    let Some(server) = try_start_mock().await else {
        eprintln!("skipping missing_user_maps_to_not_found: mock server unavailable");
        return;
    };
    mount_management_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "statusCode": 404,
            "error": "Not Found",
            "message": "The user does not exist."
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway.get_user("ghost").await.expect_err("missing");
    assert!(matches!(err, GatewayError::NotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn change_password_patches_user() {
    let Some(server) = try_start_mock().await else {
        eprintln!("skipping change_password_patches_user: mock server unavailable");
        return;
    };
    mount_management_token(&server, 1).await;
    Mock::given(method("PATCH"))
        .and(path("/api/v2/users/user-1"))
        .and(body_json(json!({"password": "n3w-Passw0rd"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_id": "user-1",
            "email": "ada@example.com",
            "updated_at": "2026-02-01T00:00:00.000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let user = gateway
        .change_password("user-1", "n3w-Passw0rd")
        .await
        .expect("updated");
    assert_eq!(user.updated_at.as_deref(), Some("2026-02-01T00:00:00.000Z"));
}

#[tokio::test]
async fn searches_users_by_email() {
    let Some(server) = try_start_mock().await else {
        eprintln!("skipping searches_users_by_email: mock server unavailable");
        return;
    };
    mount_management_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users"))
        .and(query_param("q", "email:\"ada@example.com\""))
        .and(query_param("search_engine", "v3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"user_id": "auth0|1", "email": "ada@example.com"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let users = gateway
        .find_users_by_email("ada@example.com")
        .await
        .expect("users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user_id.as_deref(), Some("auth0|1"));
}

#[tokio::test]
async fn password_reset_email_job_uses_email_as_user_id() {
    let Some(server) = try_start_mock().await else {
        eprintln!(
            "skipping password_reset_email_job_uses_email_as_user_id: mock server unavailable"
        );
        return;
    };
    mount_management_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/jobs/send-verification-email"))
        .and(bearer_token("mgmt-token"))
        .and(body_json(json!({"client_id": "c1", "user_id": "ada@example.com"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "type": "verification_email",
            "status": "pending",
            "id": "job_1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    assert!(
        gateway
            .send_password_reset_email("ada@example.com")
            .await
            .expect("queued")
    );
}

#[tokio::test]
async fn password_change_ticket_carries_connection_and_ttl() {
    let Some(server) = try_start_mock().await else {
        eprintln!(
            "skipping password_change_ticket_carries_connection_and_ttl: mock server unavailable"
        );
        return;
    };
    mount_management_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/tickets/password-change"))
        .and(body_partial_json(json!({
            "client_id": "c1",
            "email": "ada@example.com",
            "connection_id": "con_1",
            "ttl_sec": 3600
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ticket": "https://t.example.com/lo/reset?ticket=xyz"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let ticket = gateway
        .create_password_change_ticket("ada@example.com", "con_1", 3600)
        .await
        .expect("ticket");
    assert_eq!(ticket["ticket"], "https://t.example.com/lo/reset?ticket=xyz");
}

#[tokio::test]
async fn user_info_is_fetched_with_the_caller_token() {
    let Some(server) = try_start_mock().await else {
        eprintln!("skipping user_info_is_fetched_with_the_caller_token: mock server unavailable");
        return;
    };
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(bearer_token("user-at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "auth0|1",
            "email": "ada@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let info = gateway.get_user_info("user-at").await.expect("user info");
    assert_eq!(info["sub"], "auth0|1");
}

#[tokio::test]
async fn management_token_failure_is_reported_with_context() {
    let Some(server) = try_start_mock().await else {
        eprintln!(
            "skipping management_token_failure_is_reported_with_context: mock server unavailable"
        );
        return;
    };
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "access_denied",
            "error_description": "Unauthorized"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway.get_management_token().await.expect_err("denied");
    assert_eq!(
        err.to_string(),
        "failed to obtain management token: provider returned 401 Unauthorized: Unauthorized"
    );

    let err = gateway.get_user("user-1").await.expect_err("denied");
    assert!(
        err.to_string()
            .starts_with("failed to get user: failed to obtain management token"),
        "{err}"
    );
    assert!(err.provider_rejection().is_none());
}
