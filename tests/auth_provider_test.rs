use anyhow::Result;
use bc_admin_provider::core::KeyValueStore;
use bc_admin_provider::domain::model::BackendResponse;
use bc_admin_provider::{AuthProvider, DryRunBackend, MemoryStore, ProviderConfig, ProviderError};
use serde_json::json;

type Provider = AuthProvider<DryRunBackend, MemoryStore, ProviderConfig>;

fn provider_with(backend: DryRunBackend, store: MemoryStore) -> Provider {
    AuthProvider::new(backend, store, ProviderConfig::new("admin"))
}

fn admin_attributes() -> BackendResponse {
    BackendResponse::ok(json!({"attributes": {"react-admin-role": "admin", "team": "red"}}))
}

/// 測試登入成功：讀取角色屬性並寫入本地儲存
#[tokio::test]
async fn test_login_caches_permission() -> Result<()> {
    let backend = DryRunBackend::new();
    backend.push_response("getAttributes", admin_attributes());
    let store = MemoryStore::new();
    let mut provider = provider_with(backend.clone(), store.clone());

    provider
        .execute(
            "AUTH_LOGIN",
            json!({"username": "admin@example.com", "password": "secret"}),
        )
        .await?;

    assert!(provider.session().logged_in);
    assert_eq!(provider.session().permission.as_deref(), Some("admin"));
    assert_eq!(store.get("admin.permission").await?, Some("admin".to_string()));

    let auth_call = &backend.calls_to("authenticateEmailPassword")[0];
    assert_eq!(auth_call.payload["email"], json!("admin@example.com"));
    assert_eq!(auth_call.payload["forceCreate"], json!(false));
    Ok(())
}

#[tokio::test]
async fn test_login_modes() -> Result<()> {
    let backend = DryRunBackend::new();
    let mut provider = provider_with(backend.clone(), MemoryStore::new());

    provider
        .execute(
            "AUTH_LOGIN",
            json!({"username": "player-1", "password": "pw", "mode": "universal"}),
        )
        .await?;
    provider
        .execute(
            "AUTH_LOGIN",
            json!({
                "username": "player-1",
                "password": "token",
                "mode": "external",
                "provider": "okta"
            }),
        )
        .await?;

    assert_eq!(backend.calls_to("authenticateUniversal").len(), 1);
    assert_eq!(
        backend.calls_to("authenticateExternal")[0].payload["externalAuthName"],
        json!("okta")
    );

    let err = provider
        .execute(
            "AUTH_LOGIN",
            json!({"username": "player-1", "password": "token", "mode": "external"}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::ValidationError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_failed_login_rejects_with_status() {
    let backend = DryRunBackend::new();
    backend.push_response(
        "authenticateEmailPassword",
        BackendResponse::error(403, "Bad password"),
    );
    let mut provider = provider_with(backend.clone(), MemoryStore::new());

    let err = provider
        .execute("AUTH_LOGIN", json!({"username": "a@b.c", "password": "nope"}))
        .await
        .unwrap_err();

    assert_eq!(err.status(), 403);
    assert_eq!(err.rejection()["message"], json!("Bad password"));
    assert!(!provider.session().logged_in);
    assert!(backend.calls_to("getAttributes").is_empty());
}

/// 測試重新登入被拒 (401) 時清除登入狀態
#[tokio::test]
async fn test_rejected_relogin_clears_login_flag() -> Result<()> {
    let backend = DryRunBackend::new();
    let mut provider = provider_with(backend.clone(), MemoryStore::new());
    provider
        .execute("AUTH_LOGIN", json!({"username": "a@b.c", "password": "pw"}))
        .await?;
    assert!(provider.session().logged_in);

    backend.push_response(
        "authenticateEmailPassword",
        BackendResponse::error(401, "expired"),
    );
    let err = provider
        .execute("AUTH_LOGIN", json!({"username": "a@b.c", "password": "pw"}))
        .await
        .unwrap_err();

    assert_eq!(err.status(), 401);
    assert!(!provider.session().logged_in);
    Ok(())
}

#[tokio::test]
async fn test_unauthorized_attribute_read_fails_login() {
    let backend = DryRunBackend::new();
    backend.push_response("getAttributes", BackendResponse::error(403, "forbidden"));
    let mut provider = provider_with(backend, MemoryStore::new());

    let err = provider
        .execute("AUTH_LOGIN", json!({"username": "a@b.c", "password": "pw"}))
        .await
        .unwrap_err();

    assert_eq!(err.status(), 403);
    assert!(!provider.session().logged_in);
}

#[tokio::test]
async fn test_attribute_failure_does_not_fail_login() -> Result<()> {
    let backend = DryRunBackend::new();
    backend.push_response("getAttributes", BackendResponse::error(500, "boom"));
    let mut provider = provider_with(backend, MemoryStore::new());

    provider
        .execute("AUTH_LOGIN", json!({"username": "a@b.c", "password": "pw"}))
        .await?;

    assert!(provider.session().logged_in);
    assert_eq!(provider.session().permission, None);
    Ok(())
}

/// 測試 401 / 403 會清除登入狀態
#[tokio::test]
async fn test_auth_error_clears_login_flag() -> Result<()> {
    let backend = DryRunBackend::new();
    let mut provider = provider_with(backend, MemoryStore::new());
    provider
        .execute("AUTH_LOGIN", json!({"username": "a@b.c", "password": "pw"}))
        .await?;
    assert!(provider.session().logged_in);

    provider.execute("AUTH_ERROR", json!({"status": 500})).await?;
    assert!(provider.session().logged_in);

    for status in [401, 403] {
        provider
            .execute("AUTH_LOGIN", json!({"username": "a@b.c", "password": "pw"}))
            .await?;
        let err = provider
            .execute("AUTH_ERROR", json!({"status": status}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized { .. }));
        assert!(!provider.session().logged_in);
    }
    Ok(())
}

#[tokio::test]
async fn test_check_when_logged_in_skips_backend() -> Result<()> {
    let backend = DryRunBackend::new();
    let mut provider = provider_with(backend.clone(), MemoryStore::new());
    provider
        .execute("AUTH_LOGIN", json!({"username": "a@b.c", "password": "pw"}))
        .await?;
    let calls_before = backend.calls().len();

    provider.execute("AUTH_CHECK", json!({})).await?;

    assert_eq!(backend.calls().len(), calls_before);
    assert!(backend.calls_to("restoreSession").is_empty());
    Ok(())
}

/// 測試以本地儲存的 sessionId 還原連線
#[tokio::test]
async fn test_check_restores_stored_session() -> Result<()> {
    let backend = DryRunBackend::new();
    backend.push_response("getAttributes", admin_attributes());
    let store = MemoryStore::with_entries([("admin.sessionId", "s-123")]).await;
    let mut provider = provider_with(backend.clone(), store);

    provider.execute("AUTH_CHECK", json!({})).await?;

    assert_eq!(backend.calls_to("restoreSession").len(), 1);
    assert!(provider.session().logged_in);
    assert_eq!(provider.session().permission.as_deref(), Some("admin"));
    Ok(())
}

#[tokio::test]
async fn test_check_with_empty_stored_session_rejects() {
    let backend = DryRunBackend::new();
    let store = MemoryStore::with_entries([("admin.sessionId", "")]).await;
    let mut provider = provider_with(backend.clone(), store);

    let err = provider.execute("AUTH_CHECK", json!({})).await.unwrap_err();

    assert!(matches!(err, ProviderError::NotAuthenticated));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_check_restore_failure_rejects() {
    let backend = DryRunBackend::new().with_authenticated(true);
    backend.push_response("restoreSession", BackendResponse::error(403, "Session expired"));
    let mut provider = provider_with(backend, MemoryStore::new());

    let err = provider.execute("AUTH_CHECK", json!({})).await.unwrap_err();

    assert_eq!(err.status(), 403);
    assert!(!provider.session().logged_in);
}

#[tokio::test]
async fn test_check_without_session_rejects() {
    let backend = DryRunBackend::new();
    let mut provider = provider_with(backend.clone(), MemoryStore::new());

    let err = provider.execute("AUTH_CHECK", json!({})).await.unwrap_err();

    assert!(matches!(err, ProviderError::NotAuthenticated));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_get_permissions_reads_store() -> Result<()> {
    let store = MemoryStore::with_entries([("admin.permission", "editor")]).await;
    let mut provider = provider_with(DryRunBackend::new(), store);

    let permission = provider.execute("AUTH_GET_PERMISSIONS", json!({})).await?;

    assert_eq!(permission.as_deref(), Some("editor"));
    assert_eq!(provider.session().permission.as_deref(), Some("editor"));
    Ok(())
}

#[tokio::test]
async fn test_logout_clears_session_and_permission() -> Result<()> {
    let backend = DryRunBackend::new();
    backend.push_response("getAttributes", admin_attributes());
    let store = MemoryStore::new();
    let mut provider = provider_with(backend, store.clone());
    provider
        .execute("AUTH_LOGIN", json!({"username": "a@b.c", "password": "pw"}))
        .await?;

    provider.execute("AUTH_LOGOUT", json!({})).await?;

    assert!(!provider.session().logged_in);
    assert_eq!(store.get("admin.permission").await?, None);
    assert_eq!(provider.execute("AUTH_GET_PERMISSIONS", json!({})).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_unknown_auth_request_is_rejected() {
    let mut provider = provider_with(DryRunBackend::new(), MemoryStore::new());

    assert!(matches!(
        provider.execute("AUTH_REFRESH", json!({})).await,
        Err(ProviderError::UnsupportedRequest { .. })
    ));
}
