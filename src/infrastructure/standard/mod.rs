//! Company standard persistence

mod storage_repository;

pub use storage_repository::StorageStandardRepository;
