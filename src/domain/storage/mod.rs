//! Storage domain - Generic storage abstraction layer

mod entity;
mod repository;

pub(crate) use entity::entity_id;
pub use entity::{StorageEntity, StorageKey};
pub use repository::Storage;
