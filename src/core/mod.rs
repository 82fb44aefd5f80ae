pub mod auth_provider;
pub mod criteria;
pub mod data_provider;
pub mod mapping;

pub use crate::domain::model::{Entity, EntityMeta, UiRecord};
pub use crate::domain::ports::{
    AuthBackend, ConfigProvider, EntityBackend, KeyValueStore, ScriptBackend,
};
pub use crate::utils::error::Result;
