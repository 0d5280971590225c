use super::{
    context::TaskContext,
    recycle::Recycle,
};
use std::{
    future::Future,
    pin::Pin,
};


/// Тело задачи. Замыкания выполняются в blocking-пуле tokio, чтобы долгая
/// блокирующая задача занимала слот пула, а не поток рантайма.
pub enum Job {
    Blocking(Box<dyn FnOnce() + Send + 'static>),
    Async(Pin<Box<dyn Future<Output = ()> + Send + 'static>>),
}


/// Запись задачи в очереди пула. Принадлежит либо очереди, либо воркеру,
/// который ее выполняет, и после выполнения возвращается в recycler.
#[derive(Default)]
pub(crate) struct TaskRecord {
    pub(crate) ctx: TaskContext,
    pub(crate) job: Option<Job>,
}

impl TaskRecord {
    #[inline]
    pub(crate) fn fill(&mut self, ctx: TaskContext, job: Job) {
        self.ctx = ctx;
        self.job = Some(job);
    }
}

impl Recycle for TaskRecord {
    fn reset(&mut self) {
        self.ctx = TaskContext::default();
        self.job = None;
    }
}
