//! Conversion between backend entities and admin UI records.
//!
//! An entity such as
//!
//! ```text
//! { entityId: "f247…", ownerId: "d247…", entityType: "heroes", version: 1,
//!   data: { name: "Bruce Wayne", city: "Gotham" } }
//! ```
//!
//! is presented to the admin UI as
//!
//! ```text
//! { id: "f247…", name: "Bruce Wayne", city: "Gotham",
//!   _entity: { entityId: "f247…", ownerId: "d247…", entityType: "heroes", version: 1 } }
//! ```
//!
//! `id` is the indexed id instead of the entity id for resources configured that way.

use crate::domain::model::{Entity, UiRecord, ENTITY_KEY};
use crate::utils::error::{ProviderError, Result};
use serde_json::Value;

pub fn entity_to_record(entity: Entity, use_indexed_id: bool) -> UiRecord {
    let Entity { meta, mut data } = entity;

    let id = if use_indexed_id {
        meta.entity_indexed_id.clone()
    } else {
        meta.entity_id.clone()
    };

    // id and _entity are reserved on the UI side
    data.remove("id");
    data.remove(ENTITY_KEY);

    UiRecord {
        id,
        entity: Some(meta),
        fields: data,
    }
}

pub fn entities_to_records<F>(entities: Vec<Entity>, use_indexed_id: F) -> Vec<UiRecord>
where
    F: Fn(&Entity) -> bool,
{
    entities
        .into_iter()
        .map(|entity| {
            let indexed = use_indexed_id(&entity);
            entity_to_record(entity, indexed)
        })
        .collect()
}

/// Rebuilds the entity behind a record. The `id` alias is dropped, it is never payload.
pub fn record_to_entity(record: UiRecord) -> Result<Entity> {
    let meta = record.entity.ok_or_else(|| {
        ProviderError::validation(format!("record has no {} metadata", ENTITY_KEY))
    })?;

    Ok(Entity {
        meta,
        data: record.fields,
    })
}

/// Parses an entity from a backend payload.
pub fn parse_entity(value: Value) -> Result<Entity> {
    Ok(serde_json::from_value(value)?)
}

pub fn parse_entities(value: Option<&Value>) -> Result<Vec<Entity>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(items) => Ok(serde_json::from_value(items.clone())?),
    }
}
