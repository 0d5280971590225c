use super::{
    context::TaskContext,
    errors::{install_backtrace_hook, PoolError, Result, TaskPanic},
    model::PoolMetrics,
    recycle::Recycler,
    task::{Job, TaskRecord},
    worker::WorkerRecord,
};
use std::{
    collections::VecDeque,
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use parking_lot::{Mutex, RwLock};
use tokio::{
    runtime::Handle,
    sync::Notify,
    time::{Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;


/// Конфигурация пула
#[derive(Debug, Clone)]
pub struct Config {
    /// Имя пула, ключ в реестре. Если не задано, генерируется UUID.
    pub name: Option<String>,
    /// Максимальное число одновременно живых воркеров.
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: None,
            capacity: num_cpus::get(),
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        Self {
            name: None,
            capacity: num_cpus::get(),
        }
    }

    pub fn io_bound() -> Self {
        Self {
            name: None,
            capacity: num_cpus::get() * 2, // Для I/O-bound задач
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}


pub type WorkerPool = Arc<WorkerPoolInner>;

pub type PanicHandler = Arc<dyn Fn(&TaskContext, &TaskPanic) + Send + Sync + 'static>;

/// Пул с динамическим числом воркеров.
///
/// Очередь задач не ограничена, `go` никогда не блокируется. Воркер стартует при
/// отправке задачи, если живых воркеров меньше `capacity`, и завершается, как только
/// находит очередь пустой. Проверка `capacity` не атомарна с инкрементом, поэтому
/// при гонке двух `go` на границе может ненадолго появиться лишний воркер.
pub struct WorkerPoolInner {
    pub(crate) name: String,
    capacity: usize,
    pub(crate) tasks: AtomicUsize,
    pub(crate) workers: AtomicUsize,
    pub(crate) queue: Mutex<VecDeque<Box<TaskRecord>>>,
    pub(crate) panic_handler: RwLock<Option<PanicHandler>>,
    pub(crate) task_recycler: Recycler<TaskRecord>,
    pub(crate) worker_recycler: Recycler<WorkerRecord>,
    pub(crate) idle_notify: Notify,
    total_submitted: AtomicUsize,
    pub(crate) completed_tasks: AtomicUsize,
    pub(crate) panicked_tasks: AtomicUsize,
    runtime: Handle,
}

impl WorkerPoolInner {
    pub fn new(capacity: usize) -> Result<WorkerPool> {
        let config = Config {
            capacity,
            ..Default::default()
        };
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<WorkerPool> {
        if config.capacity == 0 {
            return Err(PoolError::InvalidCapacity(config.capacity));
        }
        let runtime = Handle::try_current().map_err(|_| PoolError::NoRuntime)?;
        let name = config.name.unwrap_or_else(|| Uuid::new_v4().to_string());
        install_backtrace_hook();

        Ok(Arc::new(WorkerPoolInner {
            name,
            capacity: config.capacity,
            tasks: AtomicUsize::new(0),
            workers: AtomicUsize::new(0),
            queue: Mutex::new(VecDeque::new()),
            panic_handler: RwLock::new(None),
            task_recycler: Recycler::new(),
            worker_recycler: Recycler::new(),
            idle_notify: Notify::new(),
            total_submitted: AtomicUsize::new(0),
            completed_tasks: AtomicUsize::new(0),
            panicked_tasks: AtomicUsize::new(0),
            runtime,
        }))
    }

    /// Выполнить замыкание на воркере пула. Замыкание может блокироваться сколько угодно:
    /// оно уходит в `spawn_blocking`, а воркер ждет его, удерживая один слот `capacity`.
    pub fn go<F>(self: &Arc<Self>, ctx: TaskContext, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(ctx, Job::Blocking(Box::new(f)));
    }

    /// Выполнить future на воркере пула.
    pub fn go_async<Fut>(self: &Arc<Self>, ctx: TaskContext, fut: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.submit(ctx, Job::Async(Box::pin(fut)));
    }

    fn submit(self: &Arc<Self>, ctx: TaskContext, job: Job) {
        let mut task = self.task_recycler.get();
        task.fill(ctx, job);

        // Считаем задачу до постановки в очередь: счетчик не может быть меньше длины очереди.
        self.tasks.fetch_add(1, Ordering::AcqRel);
        self.total_submitted.fetch_add(1, Ordering::Relaxed);
        self.queue.lock().push_back(task);

        if self.worker_count() < self.capacity {
            self.workers.fetch_add(1, Ordering::AcqRel);

            let mut worker = self.worker_recycler.get();
            worker.pool = Some(self.clone());
            self.runtime.spawn(worker.run());
        }
    }

    /// Заменить panic handler. Предполагается вызов до первой задачи.
    pub fn set_panic_handler<F>(&self, f: F)
    where
        F: Fn(&TaskContext, &TaskPanic) + Send + Sync + 'static,
    {
        *self.panic_handler.write() = Some(Arc::new(f));
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Задачи, отправленные, но еще не завершенные (в очереди и выполняющиеся).
    #[inline]
    pub fn task_count(&self) -> usize {
        self.tasks.load(Ordering::Acquire)
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers.load(Ordering::Acquire)
    }

    #[inline]
    fn is_idle(&self) -> bool {
        self.worker_count() == 0 && self.task_count() == 0
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            name: self.name.clone(),
            capacity: self.capacity,
            pending_tasks: self.task_count(),
            live_workers: self.worker_count(),
            total_submitted: self.total_submitted.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            panicked_tasks: self.panicked_tasks.load(Ordering::Relaxed),
        }
    }

    /// Дождаться, пока все задачи выполнятся и все воркеры завершатся.
    pub async fn join_all(&self) {
        loop {
            let notified = self.idle_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    pub async fn join_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.join_all()).await.is_ok()
    }

    /// Периодический снимок метрик, пока пул занят.
    /// Тики простаивающего пула пропускаются; после опустошения пула callback
    /// получает один итоговый снимок с нулевыми счетчиками.
    /// ВАЖНО: Вызовите token.cancel() для остановки мониторинга и освобождения памяти
    pub fn start_monitoring<F>(self: &Arc<Self>, interval: Duration, callback: F) -> CancellationToken
    where
        F: Fn(PoolMetrics) + Send + 'static,
    {
        let pool = Arc::clone(self);
        let token = CancellationToken::new();
        let token_clone = token.clone();

        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut was_busy = false;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let busy = !pool.is_idle();
                        if busy || was_busy {
                            callback(pool.metrics());
                        }
                        was_busy = busy;
                    }
                    _ = token_clone.cancelled() => {
                        drop(pool);
                        break;
                    }
                }
            }
        });

        token
    }

    /// Остановить мониторинг и дропнуть все ссылки
    pub fn stop_monitoring(token: CancellationToken) {
        token.cancel();
    }
}

impl std::fmt::Debug for WorkerPoolInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("tasks", &self.task_count())
            .field("workers", &self.worker_count())
            .finish()
    }
}
