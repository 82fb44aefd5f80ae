use crate::core::criteria::{filter_criteria, id_field, sort_criteria};
use crate::core::mapping::{
    entities_to_records, entity_to_record, parse_entities, parse_entity, record_to_entity,
};
use crate::domain::model::{
    deserialize_id, deserialize_ids, deserialize_opt_id, Entity, EntityScope, EntityUpdate,
    ListQuery, NewEntity, PageQuery, PageRequest, Pagination, Sort, UiRecord,
};
use crate::domain::ports::{ConfigProvider, EntityBackend, ScriptBackend};
use crate::utils::error::{ProviderError, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListParams {
    pub pagination: Pagination,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default)]
    pub filter: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetOneParams {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateParams {
    pub data: UiRecord,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParams {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    pub data: UiRecord,
    #[serde(default)]
    pub previous_data: Option<UiRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub previous_data: Option<UiRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManyParams {
    #[serde(deserialize_with = "deserialize_ids")]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManyReferenceParams {
    pub target: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub pagination: Pagination,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default)]
    pub filter: Map<String, Value>,
}

/// Data requests the admin UI can issue.
#[derive(Debug, Clone, PartialEq)]
pub enum DataRequest {
    GetList(ListParams),
    GetOne(GetOneParams),
    Create(CreateParams),
    Update(UpdateParams),
    Delete(DeleteParams),
    GetMany(ManyParams),
    DeleteMany(ManyParams),
    GetManyReference(ManyReferenceParams),
    UpdateMany(Value),
    RunScript(Value),
}

impl DataRequest {
    pub fn from_kind(kind: &str, params: Value) -> Result<Self> {
        let request = match kind {
            "GET_LIST" => DataRequest::GetList(serde_json::from_value(params)?),
            "GET_ONE" => DataRequest::GetOne(serde_json::from_value(params)?),
            "CREATE" => DataRequest::Create(serde_json::from_value(params)?),
            "UPDATE" => DataRequest::Update(serde_json::from_value(params)?),
            "DELETE" => DataRequest::Delete(serde_json::from_value(params)?),
            "GET_MANY" => DataRequest::GetMany(serde_json::from_value(params)?),
            "DELETE_MANY" => DataRequest::DeleteMany(serde_json::from_value(params)?),
            "GET_MANY_REFERENCE" => DataRequest::GetManyReference(serde_json::from_value(params)?),
            "UPDATE_MANY" => DataRequest::UpdateMany(params),
            "RUN_SCRIPT" => DataRequest::RunScript(params),
            other => {
                return Err(ProviderError::UnsupportedRequest {
                    kind: other.to_string(),
                })
            }
        };
        Ok(request)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DataRequest::GetList(_) => "GET_LIST",
            DataRequest::GetOne(_) => "GET_ONE",
            DataRequest::Create(_) => "CREATE",
            DataRequest::Update(_) => "UPDATE",
            DataRequest::Delete(_) => "DELETE",
            DataRequest::GetMany(_) => "GET_MANY",
            DataRequest::DeleteMany(_) => "DELETE_MANY",
            DataRequest::GetManyReference(_) => "GET_MANY_REFERENCE",
            DataRequest::UpdateMany(_) => "UPDATE_MANY",
            DataRequest::RunScript(_) => "RUN_SCRIPT",
        }
    }
}

/// Responses in the shapes the admin UI expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataResponse {
    List { data: Vec<UiRecord>, total: u64 },
    One { data: UiRecord },
    Many { data: Vec<UiRecord> },
    Ids { data: Vec<String> },
    Script(Value),
}

impl DataResponse {
    pub fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A resource name split into entity type and entity service (`posts@user`, `posts@global`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub entity_type: String,
    pub scope: EntityScope,
}

impl ResourceRef {
    pub fn parse(resource: &str) -> Self {
        if let Some(entity_type) = resource.strip_suffix("@user") {
            return Self {
                entity_type: entity_type.to_string(),
                scope: EntityScope::User,
            };
        }
        let entity_type = resource.strip_suffix("@global").unwrap_or(resource);
        Self {
            entity_type: entity_type.to_string(),
            scope: EntityScope::Global,
        }
    }
}

pub struct DataProvider<B, C> {
    backend: B,
    config: C,
}

impl<B, C> DataProvider<B, C>
where
    B: EntityBackend + ScriptBackend,
    C: ConfigProvider,
{
    pub fn new(backend: B, config: C) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Entry point taking the raw request kind string and JSON params.
    pub async fn execute(&self, kind: &str, resource: &str, params: Value) -> Result<DataResponse> {
        let request = DataRequest::from_kind(kind, params)?;
        self.handle(resource, request).await
    }

    pub async fn handle(&self, resource: &str, request: DataRequest) -> Result<DataResponse> {
        let resource = ResourceRef::parse(resource);
        tracing::debug!(
            "===> {} for {} ({} entities)",
            request.kind(),
            resource.entity_type,
            resource.scope
        );

        match request {
            DataRequest::GetList(params) => self.get_list(&resource, params).await,
            DataRequest::GetOne(params) => self.get_one(&resource, params).await,
            DataRequest::Create(params) => self.create(&resource, params).await,
            DataRequest::Update(params) => self.update(&resource, params).await,
            DataRequest::Delete(params) => self.delete(&resource, params).await,
            DataRequest::GetMany(params) => self.get_many(&resource, params).await,
            DataRequest::DeleteMany(params) => self.delete_many(&resource, params).await,
            DataRequest::GetManyReference(params) => {
                self.get_many_reference(&resource, params).await
            }
            DataRequest::UpdateMany(_) => Err(ProviderError::Unsupported {
                message: "UPDATE_MANY is not supported by the entity service".to_string(),
            }),
            DataRequest::RunScript(params) => self.run_script(&resource, params).await,
        }
    }

    pub async fn get_list(&self, resource: &ResourceRef, params: ListParams) -> Result<DataResponse> {
        let indexed = self.uses_indexed_id(resource);

        let mut search_criteria = Map::new();
        search_criteria.insert("entityType".to_string(), json!(resource.entity_type));
        search_criteria.extend(filter_criteria(&params.filter, indexed));

        let query = PageQuery {
            pagination: PageRequest {
                rows_per_page: params.pagination.per_page,
                page_number: params.pagination.page,
            },
            search_criteria,
            sort_criteria: sort_criteria(params.sort.as_ref(), indexed),
        };
        tracing::debug!("==> GET_LIST with {}", serde_json::to_string(&query)?);

        let payload = self
            .backend
            .get_page(resource.scope, &query)
            .await
            .into_result()?;

        let results = payload.get("results");
        let entities = parse_entities(results.and_then(|r| r.get("items")))?;
        let total = results
            .and_then(|r| r.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(entities.len() as u64);

        tracing::debug!("==> GET_LIST got {} of {} records", entities.len(), total);
        Ok(DataResponse::List {
            data: self.to_records(entities, indexed),
            total,
        })
    }

    pub async fn get_one(&self, resource: &ResourceRef, params: GetOneParams) -> Result<DataResponse> {
        let indexed = self.uses_indexed_id(resource);

        let mut where_clause = Map::new();
        where_clause.insert("entityType".to_string(), json!(resource.entity_type));
        where_clause.insert(id_field(indexed).to_string(), json!(params.id));

        let query = ListQuery {
            where_clause,
            order_by: Map::new(),
            max_return: 1,
        };
        let entities = self.list_entities(resource, &query).await?;

        match entities.into_iter().next() {
            Some(entity) => Ok(DataResponse::One {
                data: entity_to_record(entity, indexed),
            }),
            None => Err(ProviderError::NotFound {
                resource: resource.entity_type.clone(),
                id: params.id,
            }),
        }
    }

    pub async fn create(&self, resource: &ResourceRef, params: CreateParams) -> Result<DataResponse> {
        let indexed = self.uses_indexed_id(resource);
        let UiRecord { id, entity, fields } = params.data;

        let time_to_live = entity
            .as_ref()
            .and_then(|meta| meta.time_to_live)
            .unwrap_or_else(|| self.config.default_time_to_live());
        let acl = entity
            .as_ref()
            .and_then(|meta| meta.acl.clone())
            .unwrap_or_else(|| self.config.default_acl());

        let indexed_id = if indexed {
            Some(id.ok_or_else(|| {
                ProviderError::validation(format!(
                    "{} records need an id to use as indexed id",
                    resource.entity_type
                ))
            })?)
        } else {
            entity.and_then(|meta| meta.entity_indexed_id)
        };

        if indexed_id.is_some() && resource.scope == EntityScope::User {
            return Err(ProviderError::Unsupported {
                message: "user entities cannot be created with an indexed id".to_string(),
            });
        }

        let new_entity = NewEntity {
            entity_type: resource.entity_type.clone(),
            indexed_id,
            time_to_live,
            acl,
            data: fields,
        };

        let payload = self
            .backend
            .create_entity(resource.scope, &new_entity)
            .await
            .into_result()?;

        let mut created = parse_entity(payload)?;
        if created.data.is_empty() {
            created.data = new_entity.data;
        }
        Ok(DataResponse::One {
            data: entity_to_record(created, indexed),
        })
    }

    pub async fn update(&self, resource: &ResourceRef, params: UpdateParams) -> Result<DataResponse> {
        let indexed = self.uses_indexed_id(resource);
        let entity = record_to_entity(params.data)?;

        let entity_id = entity.meta.entity_id.clone().ok_or_else(|| {
            ProviderError::validation("record metadata has no entityId to update")
        })?;

        let update = EntityUpdate {
            entity_id,
            entity_type: entity
                .meta
                .entity_type
                .clone()
                .unwrap_or_else(|| resource.entity_type.clone()),
            version: entity.meta.version.ok_or_else(|| {
                ProviderError::validation("record metadata has no version to update")
            })?,
            acl: entity.meta.acl.clone(),
            data: entity.data,
        };

        let payload = self
            .backend
            .update_entity(resource.scope, &update)
            .await
            .into_result()?;

        // the reply carries fresh metadata, the payload is the one just written
        let has_meta = payload.as_object().is_some_and(|map| !map.is_empty());
        let meta = if has_meta {
            parse_entity(payload)?.meta
        } else {
            entity.meta
        };
        let updated = Entity {
            meta,
            data: update.data,
        };

        let mut record = entity_to_record(updated, indexed);
        if record.id.is_none() {
            record.id = params.id;
        }
        Ok(DataResponse::One { data: record })
    }

    pub async fn delete(&self, resource: &ResourceRef, params: DeleteParams) -> Result<DataResponse> {
        let meta = params
            .previous_data
            .as_ref()
            .and_then(|record| record.entity.as_ref());

        let (entity_id, version) = match meta {
            Some(meta) => (
                meta.entity_id.clone().unwrap_or_else(|| params.id.clone()),
                meta.version.unwrap_or(-1),
            ),
            None if self.uses_indexed_id(resource) => {
                return Err(ProviderError::validation(format!(
                    "deleting {} by indexed id needs the previous record",
                    resource.entity_type
                )));
            }
            None => (params.id.clone(), -1),
        };

        self.backend
            .delete_entity(resource.scope, &entity_id, version)
            .await
            .into_result()?;

        let data = params.previous_data.unwrap_or_else(|| UiRecord {
            id: Some(params.id),
            ..Default::default()
        });
        Ok(DataResponse::One { data })
    }

    pub async fn get_many(&self, resource: &ResourceRef, params: ManyParams) -> Result<DataResponse> {
        let indexed = self.uses_indexed_id(resource);
        let id_field = id_field(indexed);

        let mut where_clause = Map::new();
        where_clause.insert("entityType".to_string(), json!(resource.entity_type));
        where_clause.insert(id_field.to_string(), json!({ "$in": params.ids }));

        let mut order_by = Map::new();
        order_by.insert(id_field.to_string(), json!(1));

        let query = ListQuery {
            where_clause,
            order_by,
            max_return: params.ids.len() as u64,
        };
        tracing::debug!("==> GET_MANY with {}", serde_json::to_string(&query)?);

        let entities = self.list_entities(resource, &query).await?;
        Ok(DataResponse::Many {
            data: self.to_records(entities, indexed),
        })
    }

    pub async fn delete_many(&self, resource: &ResourceRef, params: ManyParams) -> Result<DataResponse> {
        if self.uses_indexed_id(resource) {
            return Err(ProviderError::Backend {
                status: 500,
                message: "Cannot delete resources using entityIndexedId".to_string(),
            });
        }

        let scope = resource.scope;
        try_join_all(params.ids.iter().map(|id| async move {
            self.backend
                .delete_entity(scope, id, -1)
                .await
                .into_result()
                .map(|_| ())
        }))
        .await?;

        Ok(DataResponse::Ids { data: params.ids })
    }

    pub async fn get_many_reference(
        &self,
        resource: &ResourceRef,
        params: ManyReferenceParams,
    ) -> Result<DataResponse> {
        let mut filter = params.filter;
        filter.insert(params.target, json!(params.id));

        self.get_list(
            resource,
            ListParams {
                pagination: params.pagination,
                sort: params.sort,
                filter,
            },
        )
        .await
    }

    pub async fn run_script(&self, resource: &ResourceRef, params: Value) -> Result<DataResponse> {
        let response = self
            .backend
            .run_script(&resource.entity_type, &params)
            .await;
        tracing::debug!(
            "==> RUN_SCRIPT {} answered with status {}",
            resource.entity_type,
            response.status
        );
        Ok(DataResponse::Script(response.into_result()?))
    }

    async fn list_entities(&self, resource: &ResourceRef, query: &ListQuery) -> Result<Vec<Entity>> {
        let payload = self
            .backend
            .get_list(resource.scope, query)
            .await
            .into_result()?;
        parse_entities(payload.get("entityList"))
    }

    fn uses_indexed_id(&self, resource: &ResourceRef) -> bool {
        self.config.uses_indexed_id(&resource.entity_type)
    }

    fn to_records(&self, entities: Vec<Entity>, default_indexed: bool) -> Vec<UiRecord> {
        entities_to_records(entities, |entity| {
            entity
                .meta
                .entity_type
                .as_deref()
                .map(|entity_type| self.config.uses_indexed_id(entity_type))
                .unwrap_or(default_indexed)
        })
    }
}
