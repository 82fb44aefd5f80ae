use crate::domain::model::Sort;
use serde_json::{json, Map, Value};

/// Prefix addressing entity metadata instead of the payload.
pub const METADATA_PREFIX: &str = "_entity.";

/// Prefix of filter values that should become a pattern match.
pub const REGEX_MARKER: &str = "$regex:";

/// Metadata fields the entity service can sort on.
pub const SORTABLE_METADATA_FIELDS: [&str; 7] = [
    "entityId",
    "ownerId",
    "entityType",
    "entityIndexedId",
    "timeToLive",
    "createdAt",
    "updatedAt",
];

/// Where a UI field name lands in the entity document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Metadata(String),
    Payload(String),
    Operator(String),
}

impl FieldPath {
    pub fn resolve(field: &str, use_indexed_id: bool) -> Self {
        if field == "id" {
            return FieldPath::Metadata(id_field(use_indexed_id).to_string());
        }
        if let Some(meta) = field.strip_prefix(METADATA_PREFIX) {
            return FieldPath::Metadata(meta.to_string());
        }
        if field.starts_with('$') {
            return FieldPath::Operator(field.to_string());
        }
        FieldPath::Payload(field.to_string())
    }

    pub fn query_key(&self) -> String {
        match self {
            FieldPath::Metadata(name) | FieldPath::Operator(name) => name.clone(),
            FieldPath::Payload(name) => format!("data.{}", name),
        }
    }
}

/// Metadata field backing the UI `id`.
pub fn id_field(use_indexed_id: bool) -> &'static str {
    if use_indexed_id {
        "entityIndexedId"
    } else {
        "entityId"
    }
}

pub fn sort_criteria(sort: Option<&Sort>, use_indexed_id: bool) -> Map<String, Value> {
    let mut criteria = Map::new();
    let Some(sort) = sort else {
        return criteria;
    };

    let path = FieldPath::resolve(&sort.field, use_indexed_id);
    match &path {
        FieldPath::Metadata(name) if !SORTABLE_METADATA_FIELDS.contains(&name.as_str()) => {
            tracing::warn!("Ignoring sort on non-sortable metadata field '{}'", name);
        }
        FieldPath::Operator(name) => {
            tracing::warn!("Ignoring sort on operator '{}'", name);
        }
        _ => {
            criteria.insert(path.query_key(), json!(sort.order.direction()));
        }
    }
    criteria
}

pub fn filter_criteria(filter: &Map<String, Value>, use_indexed_id: bool) -> Map<String, Value> {
    let mut criteria = Map::new();

    for (field, value) in filter {
        let path = FieldPath::resolve(field, use_indexed_id);
        let value = match &path {
            FieldPath::Operator(_) => translate_operand(value, use_indexed_id),
            _ => value.clone(),
        };
        criteria.insert(path.query_key(), pattern_match(value));
    }

    criteria
}

// Operator operands hold nested criteria that need the same field rewriting.
fn translate_operand(value: &Value, use_indexed_id: bool) -> Value {
    match value {
        Value::Object(nested) => Value::Object(filter_criteria(nested, use_indexed_id)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(nested) => Value::Object(filter_criteria(nested, use_indexed_id)),
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn pattern_match(value: Value) -> Value {
    match value {
        Value::String(s) => match s.strip_prefix(REGEX_MARKER) {
            Some(pattern) => json!({ "$regex": pattern }),
            None => Value::String(s),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SortOrder;

    fn sort(field: &str, order: SortOrder) -> Sort {
        Sort {
            field: field.to_string(),
            order,
        }
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_sort_by_id_resolves_identifier_field() {
        let by_id = sort("id", SortOrder::Desc);

        assert_eq!(
            Value::Object(sort_criteria(Some(&by_id), false)),
            json!({"entityId": -1})
        );
        assert_eq!(
            Value::Object(sort_criteria(Some(&by_id), true)),
            json!({"entityIndexedId": -1})
        );
    }

    #[test]
    fn test_sort_by_payload_and_metadata_fields() {
        assert_eq!(
            Value::Object(sort_criteria(Some(&sort("title", SortOrder::Asc)), false)),
            json!({"data.title": 1})
        );
        assert_eq!(
            Value::Object(sort_criteria(
                Some(&sort("_entity.createdAt", SortOrder::Desc)),
                false
            )),
            json!({"createdAt": -1})
        );
    }

    #[test]
    fn test_sort_on_unlisted_metadata_is_dropped() {
        assert!(sort_criteria(Some(&sort("_entity.acl", SortOrder::Asc)), false).is_empty());
        assert!(sort_criteria(Some(&sort("_entity.version", SortOrder::Asc)), false).is_empty());
        assert!(sort_criteria(None, false).is_empty());
    }

    #[test]
    fn test_filter_field_rewriting() {
        let filter = as_map(json!({
            "id": "abc",
            "city": "Gotham",
            "_entity.ownerId": "owner-1"
        }));

        assert_eq!(
            Value::Object(filter_criteria(&filter, false)),
            json!({
                "entityId": "abc",
                "data.city": "Gotham",
                "ownerId": "owner-1"
            })
        );
        assert_eq!(
            filter_criteria(&filter, true).get("entityIndexedId"),
            Some(&json!("abc"))
        );
    }

    #[test]
    fn test_regex_marker_becomes_pattern_match() {
        let filter = as_map(json!({"name": "$regex:^Bru.*:x"}));

        assert_eq!(
            Value::Object(filter_criteria(&filter, false)),
            json!({"data.name": {"$regex": "^Bru.*:x"}})
        );
    }

    #[test]
    fn test_plain_string_stays_equality_match() {
        let filter = as_map(json!({"name": "regex:Bruce"}));
        assert_eq!(
            filter_criteria(&filter, false).get("data.name"),
            Some(&json!("regex:Bruce"))
        );
    }

    #[test]
    fn test_operator_operands_are_translated_recursively() {
        let filter = as_map(json!({
            "$or": [
                {"name": "$regex:Bru"},
                {"_entity.ownerId": "owner-1"},
                "untouched"
            ],
            "$and": {"id": "abc"}
        }));

        assert_eq!(
            Value::Object(filter_criteria(&filter, false)),
            json!({
                "$or": [
                    {"data.name": {"$regex": "Bru"}},
                    {"ownerId": "owner-1"},
                    "untouched"
                ],
                "$and": {"entityId": "abc"}
            })
        );
    }

    #[test]
    fn test_nested_payload_operators_pass_through() {
        let filter = as_map(json!({"level": {"$gt": 3}}));
        assert_eq!(
            filter_criteria(&filter, false).get("data.level"),
            Some(&json!({"$gt": 3}))
        );
    }
}
