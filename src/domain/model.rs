use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Reserved key under which a UI record carries the entity metadata.
pub const ENTITY_KEY: &str = "_entity";

/// Entity metadata: everything the backend stores next to the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_indexed_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    /// Metadata keys this crate does not interpret, kept for round-tripping.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A record as stored by the backend entity service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// A record in the flat shape the admin UI works with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_opt_id"
    )]
    pub id: Option<String>,
    #[serde(rename = "_entity", default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityMeta>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Which entity service a resource lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityScope {
    Global,
    User,
}

impl fmt::Display for EntityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityScope::Global => write!(f, "global"),
            EntityScope::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    EmailPassword,
    Universal,
    /// The password slot carries the token issued by the named external provider.
    External { provider: String },
}

impl AuthMode {
    /// Parses `email`, `universal` or `external`; the external mode needs a provider name.
    pub fn from_name(name: &str, provider: Option<&str>) -> crate::utils::error::Result<Self> {
        match name {
            "email" => Ok(AuthMode::EmailPassword),
            "universal" => Ok(AuthMode::Universal),
            "external" => match provider {
                Some(provider) if !provider.trim().is_empty() => Ok(AuthMode::External {
                    provider: provider.to_string(),
                }),
                _ => Err(crate::utils::error::ProviderError::validation(
                    "external authentication needs a provider name",
                )),
            },
            other => Err(crate::utils::error::ProviderError::validation(format!(
                "unknown authentication mode '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub mode: AuthMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl From<String> for SortOrder {
    fn from(value: String) -> Self {
        if value == "ASC" {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(String::deserialize(deserializer)?.into())
    }
}

impl SortOrder {
    pub fn direction(self) -> i64 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

/// Paged query context for the entity service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub pagination: PageRequest,
    pub search_criteria: Map<String, Value>,
    pub sort_criteria: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub rows_per_page: u64,
    pub page_number: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(rename = "where")]
    pub where_clause: Map<String, Value>,
    pub order_by: Map<String, Value>,
    pub max_return: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntity {
    pub entity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_id: Option<String>,
    pub time_to_live: i64,
    pub acl: Value,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpdate {
    pub entity_id: String,
    pub entity_type: String,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Value>,
    pub data: Map<String, Value>,
}

/// What the backend hands to its completion callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl BackendResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: 200,
            data: Some(data),
            status_message: None,
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            data: None,
            status_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Unwraps the payload of a 200 reply, anything else becomes a backend error.
    pub fn into_result(self) -> crate::utils::error::Result<Value> {
        if self.is_success() {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(crate::utils::error::ProviderError::Backend {
                status: self.status,
                message: self.status_message.unwrap_or_default(),
            })
        }
    }
}

/// Admin UIs send identifiers as strings or numbers.
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    id_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier: {}", value)))
}

pub fn deserialize_opt_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    id_to_string(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier: {}", value)))
}

pub fn deserialize_ids<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .iter()
        .map(|value| {
            id_to_string(value)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier: {}", value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_keeps_unknown_metadata() {
        let entity: Entity = serde_json::from_value(json!({
            "entityId": "e-1",
            "entityType": "posts",
            "version": 3,
            "_serverTime": 1700000000000i64,
            "data": {"title": "Hello"}
        }))
        .unwrap();

        assert_eq!(entity.meta.entity_id.as_deref(), Some("e-1"));
        assert_eq!(entity.meta.version, Some(3));
        assert_eq!(entity.meta.extra.get("_serverTime"), Some(&json!(1700000000000i64)));
        assert!(!entity.meta.extra.contains_key("data"));
        assert_eq!(entity.data.get("title"), Some(&json!("Hello")));
    }

    #[test]
    fn test_ui_record_accepts_numeric_id() {
        let record: UiRecord = serde_json::from_value(json!({
            "id": 42,
            "name": "Bruce Wayne"
        }))
        .unwrap();

        assert_eq!(record.id.as_deref(), Some("42"));
        assert!(record.entity.is_none());
        assert_eq!(record.fields.get("name"), Some(&json!("Bruce Wayne")));
        assert!(!record.fields.contains_key("id"));
    }

    #[test]
    fn test_sort_order_from_string() {
        assert_eq!(SortOrder::from("ASC".to_string()).direction(), 1);
        assert_eq!(SortOrder::from("DESC".to_string()).direction(), -1);
        assert_eq!(SortOrder::from("asc".to_string()).direction(), -1);
    }

    #[test]
    fn test_backend_response_into_result() {
        assert_eq!(
            BackendResponse::ok(json!({"a": 1})).into_result().unwrap(),
            json!({"a": 1})
        );

        let err = BackendResponse::error(404, "missing").into_result().unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.rejection()["message"], json!("missing"));
    }
}
