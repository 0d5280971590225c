//! Пул воркеров с динамическим масштабированием
//!
//! # Features
//! - Неограниченная FIFO очередь, `go` никогда не блокируется
//! - Воркеры стартуют по требованию (до `capacity`) и завершаются на пустой очереди
//! - Переиспользование записей задач и воркеров через free list
//! - Перехват паник задач с логированием и опциональным handler
//! - Глобальный реестр пулов по имени

pub mod context;
pub mod errors;
pub mod logging;
pub mod model;
pub mod pool;
pub mod recycle;
pub mod registry;
mod task;
mod worker;

pub use context::TaskContext;
pub use errors::{PoolError, TaskPanic};
pub use pool::{Config, PanicHandler, WorkerPool, WorkerPoolInner};
pub use registry::{get_pool, register_pool};
pub use task::Job;
