use crate::domain::model::{
    AuthMode, BackendResponse, Credentials, EntityScope, EntityUpdate, ListQuery, NewEntity,
    PageQuery,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Authentication half of the backend SDK.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> BackendResponse;
    async fn restore_session(&self) -> BackendResponse;
    fn is_authenticated(&self) -> bool;
    async fn get_attributes(&self) -> BackendResponse;
}

/// Entity storage half of the backend SDK.
#[async_trait]
pub trait EntityBackend: Send + Sync {
    async fn get_page(&self, scope: EntityScope, query: &PageQuery) -> BackendResponse;
    async fn get_list(&self, scope: EntityScope, query: &ListQuery) -> BackendResponse;
    async fn create_entity(&self, scope: EntityScope, entity: &NewEntity) -> BackendResponse;
    async fn update_entity(&self, scope: EntityScope, update: &EntityUpdate) -> BackendResponse;
    async fn delete_entity(&self, scope: EntityScope, entity_id: &str, version: i64)
        -> BackendResponse;
}

#[async_trait]
pub trait ScriptBackend: Send + Sync {
    async fn run_script(&self, name: &str, params: &serde_json::Value) -> BackendResponse;
}

/// Persistent local key-value storage (the browser's localStorage in the admin UI).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
    fn set(&self, key: &str, value: &str)
        -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn wrapper_name(&self) -> &str;
    fn role_attribute(&self) -> &str;
    fn default_auth_mode(&self) -> AuthMode;
    fn indexed_id_resources(&self) -> &[String];
    fn default_time_to_live(&self) -> i64;
    fn default_acl(&self) -> serde_json::Value;

    fn uses_indexed_id(&self, resource: &str) -> bool {
        self.indexed_id_resources().iter().any(|r| r == resource)
    }
}
