use tokio_util::sync::CancellationToken;
use uuid::Uuid;


/// Контекст задачи: trace id и токен отмены.
/// Пул не смотрит на отмену, только передает контекст в логирование и panic handler.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    trace_id: Option<String>,
    cancel_token: CancellationToken,
}

impl TaskContext {
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_trace_id(self) -> Self {
        self.with_trace_id_value(Uuid::new_v4().to_string())
    }

    pub fn with_trace_id_value(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    /// Дочерний контекст: тот же trace id, дочерний токен отмены.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            cancel_token: self.cancel_token.child_token(),
        }
    }

    /// Без trace id каждый вызов генерирует новый.
    pub fn trace_id(&self) -> String {
        match &self.trace_id {
            Some(id) => id.clone(),
            None => Uuid::new_v4().to_string(),
        }
    }

    #[inline]
    pub fn has_trace_id(&self) -> bool {
        self.trace_id.is_some()
    }

    #[inline]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    #[inline]
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_has_no_trace_id() {
        let ctx = TaskContext::background();
        assert!(!ctx.has_trace_id());
        assert_ne!(ctx.trace_id(), ctx.trace_id());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn trace_id_is_stable_once_set() {
        let ctx = TaskContext::background().with_trace_id();
        assert!(ctx.has_trace_id());
        assert_eq!(ctx.trace_id(), ctx.trace_id());
        assert!(Uuid::parse_str(&ctx.trace_id()).is_ok());

        let ctx = TaskContext::background().with_trace_id_value("req-1");
        assert_eq!(ctx.trace_id(), "req-1");
    }

    #[test]
    fn child_follows_parent_cancellation() {
        let parent = TaskContext::background().with_trace_id_value("req-2");
        let child = parent.child();
        assert_eq!(child.trace_id(), "req-2");

        child.cancel();
        assert!(!parent.is_cancelled());

        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }
}
