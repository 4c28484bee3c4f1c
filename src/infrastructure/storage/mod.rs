//! Storage backends and id allocation

mod factory;
mod in_memory;
mod postgres;
mod sequence;

pub use factory::{StorageBackend, StorageFactory, StorageType};
pub use in_memory::InMemoryStorage;
pub use postgres::{PostgresConfig, PostgresStorage};
pub use sequence::IdSequence;
