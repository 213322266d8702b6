use idp_broker_core::{
    FileTenantStore, LoadError, MemoryTenantStore, RequiredField, TenantIdentityConfig,
    load_validated,
};
use tempfile::tempdir;

#[tokio::test]
async fn memory_store_record_loads_and_validates() {
    let store = MemoryTenantStore::new().with_tenant(
        "printHub",
        TenantIdentityConfig::new("t.example.com", "c1", "s1", "https://t.example.com/api/v2"),
    );

    let config = load_validated(&store, "printHub").await.expect("config");
    assert_eq!(config.authorization_url(), "https://t.example.com/authorize");
    assert_eq!(config.users_endpoint(), "https://t.example.com/api/v2/users");
    assert_eq!(store.reads(), 1);
}

#[tokio::test]
async fn incomplete_file_record_reports_missing_field() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("partial.json"),
        r#"{"domain":"t.example.com","clientId":"c1","managementApiEndpoint":"https://t.example.com/api/v2/"}"#,
    )
    .expect("write");

    let store = FileTenantStore::new(dir.path());
    let err = load_validated(&store, "partial").await.expect_err("invalid");
    match err {
        LoadError::Validation(err) => assert_eq!(err.missing_field, RequiredField::ClientSecret),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn absent_record_is_a_fetch_error() {
    let store = MemoryTenantStore::new();
    let err = load_validated(&store, "nobody").await.expect_err("absent");
    assert!(matches!(err, LoadError::Fetch(_)));
}
