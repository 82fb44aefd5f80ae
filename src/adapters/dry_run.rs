use crate::domain::model::{
    AuthMode, BackendResponse, Credentials, EntityScope, EntityUpdate, ListQuery, NewEntity,
    PageQuery,
};
use crate::domain::ports::{AuthBackend, EntityBackend, ScriptBackend};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// One call as it reached the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendCall {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub payload: Value,
}

/// Backend that records every call and answers without any network traffic.
///
/// Replies queued with [`DryRunBackend::push_response`] are handed out first, in order,
/// per operation name. Without a queued reply the backend answers with a plausible
/// success payload (empty pages, echoed entities).
#[derive(Debug, Clone, Default)]
pub struct DryRunBackend {
    calls: Arc<Mutex<Vec<BackendCall>>>,
    responses: Arc<Mutex<HashMap<String, VecDeque<BackendResponse>>>>,
    authenticated: Arc<AtomicBool>,
    next_id: Arc<AtomicU64>,
}

impl DryRunBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authenticated(self, authenticated: bool) -> Self {
        self.authenticated.store(authenticated, Ordering::SeqCst);
        self
    }

    pub fn push_response(&self, operation: &str, response: BackendResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(operation.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == operation)
            .collect()
    }

    fn record(
        &self,
        operation: &str,
        scope: Option<EntityScope>,
        payload: Value,
        fallback: impl FnOnce(&Value) -> BackendResponse,
    ) -> BackendResponse {
        tracing::debug!("dry-run {} {}", operation, payload);

        let queued = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(operation)
            .and_then(VecDeque::pop_front);
        let response = queued.unwrap_or_else(|| fallback(&payload));

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(BackendCall {
                operation: operation.to_string(),
                scope: scope.map(|s| s.to_string()),
                payload,
            });
        response
    }

    fn next_entity_id(&self) -> String {
        format!("dry-run-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl AuthBackend for DryRunBackend {
    async fn authenticate(&self, credentials: &Credentials) -> BackendResponse {
        let (operation, payload) = match &credentials.mode {
            AuthMode::EmailPassword => (
                "authenticateEmailPassword",
                json!({"email": credentials.username, "forceCreate": false}),
            ),
            AuthMode::Universal => (
                "authenticateUniversal",
                json!({"userId": credentials.username, "forceCreate": false}),
            ),
            AuthMode::External { provider } => (
                "authenticateExternal",
                json!({
                    "userId": credentials.username,
                    "externalAuthName": provider,
                    "forceCreate": false
                }),
            ),
        };
        // the secret never lands in the call log
        let response = self.record(operation, None, payload, |_| {
            BackendResponse::ok(json!({"profileId": "dry-run-profile"}))
        });
        if response.is_success() {
            self.authenticated.store(true, Ordering::SeqCst);
        }
        response
    }

    async fn restore_session(&self) -> BackendResponse {
        self.record("restoreSession", None, Value::Null, |_| {
            BackendResponse::ok(json!({"profileId": "dry-run-profile"}))
        })
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn get_attributes(&self) -> BackendResponse {
        self.record("getAttributes", None, Value::Null, |_| {
            BackendResponse::ok(json!({"attributes": {}}))
        })
    }
}

#[async_trait]
impl EntityBackend for DryRunBackend {
    async fn get_page(&self, scope: EntityScope, query: &PageQuery) -> BackendResponse {
        let payload = serde_json::to_value(query).unwrap_or(Value::Null);
        self.record("getPage", Some(scope), payload, |_| {
            BackendResponse::ok(json!({"results": {"items": [], "count": 0}}))
        })
    }

    async fn get_list(&self, scope: EntityScope, query: &ListQuery) -> BackendResponse {
        let payload = serde_json::to_value(query).unwrap_or(Value::Null);
        self.record("getList", Some(scope), payload, |_| {
            BackendResponse::ok(json!({"entityList": []}))
        })
    }

    async fn create_entity(&self, scope: EntityScope, entity: &NewEntity) -> BackendResponse {
        let operation = if entity.indexed_id.is_some() {
            "createEntityWithIndexedId"
        } else {
            "createEntity"
        };
        let entity_id = self.next_entity_id();
        let payload = serde_json::to_value(entity).unwrap_or(Value::Null);
        self.record(operation, Some(scope), payload, |_| {
            let mut created = json!({
                "entityId": entity_id,
                "entityType": entity.entity_type,
                "version": 1,
                "acl": entity.acl,
                "timeToLive": entity.time_to_live,
                "data": entity.data,
            });
            if let Some(indexed_id) = &entity.indexed_id {
                created["entityIndexedId"] = json!(indexed_id);
            }
            BackendResponse::ok(created)
        })
    }

    async fn update_entity(&self, scope: EntityScope, update: &EntityUpdate) -> BackendResponse {
        let payload = serde_json::to_value(update).unwrap_or(Value::Null);
        self.record("updateEntity", Some(scope), payload, |_| {
            BackendResponse::ok(json!({
                "entityId": update.entity_id,
                "entityType": update.entity_type,
                "version": update.version.max(0) + 1,
            }))
        })
    }

    async fn delete_entity(
        &self,
        scope: EntityScope,
        entity_id: &str,
        version: i64,
    ) -> BackendResponse {
        let payload = json!({"entityId": entity_id, "version": version});
        self.record("deleteEntity", Some(scope), payload, |_| {
            BackendResponse::ok(json!({}))
        })
    }
}

#[async_trait]
impl ScriptBackend for DryRunBackend {
    async fn run_script(&self, name: &str, params: &Value) -> BackendResponse {
        let payload = json!({"scriptName": name, "scriptData": params});
        self.record("runScript", None, payload, |_| {
            BackendResponse::ok(json!({"success": true, "response": {}}))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[tokio::test]
    async fn test_queued_response_wins_over_default() {
        let backend = DryRunBackend::new();
        backend.push_response("deleteEntity", BackendResponse::error(404, "gone"));

        let first = backend.delete_entity(EntityScope::Global, "a", 1).await;
        let second = backend.delete_entity(EntityScope::Global, "b", 1).await;

        assert_eq!(first.status, 404);
        assert_eq!(second.status, 200);
        assert_eq!(backend.calls_to("deleteEntity").len(), 2);
        assert_eq!(
            backend.calls()[0].payload,
            json!({"entityId": "a", "version": 1})
        );
    }

    #[test]
    fn test_poisoned_lock_keeps_recording() {
        let backend = DryRunBackend::new();
        let poisoner = backend.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.calls.lock().unwrap();
            panic!("poison the call log");
        })
        .join();
        assert!(backend.calls.is_poisoned());

        backend.push_response("deleteEntity", BackendResponse::error(409, "stale"));
        let response =
            tokio_test::block_on(backend.delete_entity(EntityScope::Global, "a", 2));

        assert_eq!(response.status, 409);
        assert_eq!(backend.calls_to("deleteEntity").len(), 1);
    }

    #[tokio::test]
    async fn test_create_echoes_entity() {
        let backend = DryRunBackend::new();
        let mut data = Map::new();
        data.insert("name".to_string(), json!("Alfred"));

        let response = backend
            .create_entity(
                EntityScope::User,
                &NewEntity {
                    entity_type: "butlers".to_string(),
                    indexed_id: None,
                    time_to_live: -1,
                    acl: json!({"other": 1}),
                    data,
                },
            )
            .await;

        let created = response.data.unwrap();
        assert_eq!(created["entityId"], json!("dry-run-1"));
        assert_eq!(created["data"]["name"], json!("Alfred"));
        assert_eq!(backend.calls()[0].scope.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn test_successful_login_marks_authenticated() {
        let backend = DryRunBackend::new();
        assert!(!backend.is_authenticated());

        backend
            .authenticate(&Credentials {
                username: "bruce".to_string(),
                password: "secret".to_string(),
                mode: AuthMode::Universal,
            })
            .await;

        assert!(backend.is_authenticated());
        let call = &backend.calls()[0];
        assert_eq!(call.operation, "authenticateUniversal");
        assert!(!call.payload.to_string().contains("secret"));
    }
}
