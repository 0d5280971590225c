use super::{
    errors::TaskPanic,
    pool::WorkerPool,
    recycle::Recycle,
    task::{Job, TaskRecord},
};
use std::{
    panic::AssertUnwindSafe,
    sync::atomic::Ordering,
};
use futures::FutureExt;


/// Запись воркера: ссылка на пул, который он сейчас обслуживает.
#[derive(Default)]
pub(crate) struct WorkerRecord {
    pub(crate) pool: Option<WorkerPool>,
}

impl Recycle for WorkerRecord {
    fn reset(&mut self) {
        self.pool = None;
    }
}

impl WorkerRecord {
    /// Цикл воркера: берет задачи из головы очереди, пока она не опустеет,
    /// затем уменьшает счетчик воркеров под локом очереди и завершается.
    pub(crate) async fn run(self: Box<Self>) {
        let pool = match &self.pool {
            Some(pool) => pool.clone(),
            None => return,
        };
        tracing::trace!(pool = %pool.name, "worker started");

        let last = loop {
            let task = {
                let mut queue = pool.queue.lock();
                match queue.pop_front() {
                    Some(task) => task,
                    None => {
                        let prev = pool.workers.fetch_sub(1, Ordering::AcqRel);
                        break prev == 1;
                    }
                }
            };
            run_task(&pool, task).await;
        };

        tracing::trace!(pool = %pool.name, "worker retired");
        pool.worker_recycler.put(self);

        if last {
            pool.idle_notify.notify_waiters();
        }
    }
}

async fn run_task(pool: &WorkerPool, mut task: Box<TaskRecord>) {
    if let Some(job) = task.job.take() {
        if let Err(panic) = execute(job).await {
            pool.panicked_tasks.fetch_add(1, Ordering::Relaxed);
            report_panic(pool, &task, panic);
        }
    }

    pool.completed_tasks.fetch_add(1, Ordering::Relaxed);
    pool.tasks.fetch_sub(1, Ordering::AcqRel);
    pool.task_recycler.put(task);
}

/// Граница перехвата паники. `TaskPanic` создается на потоке, где упала задача.
async fn execute(job: Job) -> Result<(), TaskPanic> {
    match job {
        Job::Blocking(f) => match tokio::task::spawn_blocking(move || TaskPanic::catch(f)).await {
            Ok(res) => res,
            Err(join_err) if join_err.is_panic() => Err(TaskPanic::new(join_err.into_panic())),
            Err(join_err) => {
                // рантайм останавливается, задача не была запущена
                tracing::debug!(error = %join_err, "blocking task cancelled");
                Ok(())
            }
        },
        Job::Async(fut) => AssertUnwindSafe(fut).catch_unwind().await.map_err(TaskPanic::new),
    }
}

fn report_panic(pool: &WorkerPool, task: &TaskRecord, panic: TaskPanic) {
    tracing::error!(
        pool = %pool.name,
        trace_id = %task.ctx.trace_id(),
        panic = %panic,
        backtrace = %panic.backtrace(),
        "worker panic in pool"
    );

    let handler = pool.panic_handler.read().clone();
    if let Some(handler) = handler {
        // Паника внутри handler не должна убить воркер: счетчик воркеров тогда не вернется к нулю.
        let res = std::panic::catch_unwind(AssertUnwindSafe(|| handler(&task.ctx, &panic)));
        if let Err(payload) = res {
            let nested = TaskPanic::new(payload);
            tracing::error!(
                pool = %pool.name,
                trace_id = %task.ctx.trace_id(),
                panic = %nested,
                "panic handler panicked"
            );
        }
    }
}
