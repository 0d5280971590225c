//! Глобальный реестр пулов по имени. Живет все время процесса, удаления нет.

use super::{
    errors::{PoolError, Result},
    pool::WorkerPool,
};
use dashmap::{mapref::entry::Entry, DashMap};
use once_cell::sync::Lazy;


static POOLS: Lazy<DashMap<String, WorkerPool>> = Lazy::new(DashMap::new);

/// Зарегистрировать пул под его именем. Существующая запись не перезаписывается.
pub fn register_pool(pool: &WorkerPool) -> Result<()> {
    match POOLS.entry(pool.name().to_owned()) {
        Entry::Occupied(_) => Err(PoolError::AlreadyRegistered(pool.name().to_owned())),
        Entry::Vacant(slot) => {
            slot.insert(pool.clone());
            tracing::debug!(pool = %pool.name(), "pool registered");
            Ok(())
        }
    }
}

pub fn get_pool(name: &str) -> Option<WorkerPool> {
    POOLS.get(name).map(|entry| entry.value().clone())
}
