//! Id allocation for storage-backed repositories

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::storage::{Storage, StorageEntity};
use crate::domain::DomainError;

/// Monotonic id sequence seeded from the highest stored key
///
/// The first allocation reads `max_key` from storage; later ones count up in
/// memory, so one sequence must own all inserts into its table.
#[derive(Debug, Default)]
pub struct IdSequence {
    last: Mutex<Option<i64>>,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id for the given storage
    pub async fn next<E>(&self, storage: &Arc<dyn Storage<E>>) -> Result<i64, DomainError>
    where
        E: StorageEntity + 'static,
    {
        self.allocate(1, || storage.max_key()).await
    }

    /// Allocate `count` consecutive ids, returning the first
    ///
    /// `seed` supplies the highest id already in use and is only awaited on
    /// the first allocation.
    pub async fn allocate<F, Fut>(&self, count: usize, seed: F) -> Result<i64, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<i64, DomainError>>,
    {
        let mut last = self.last.lock().await;
        let current = match *last {
            Some(value) => value,
            None => seed().await?,
        };

        *last = Some(current + count as i64);
        Ok(current + 1)
    }
}
