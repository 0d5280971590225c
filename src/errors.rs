use std::{
    any::Any,
    backtrace::Backtrace,
    cell::RefCell,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Once,
};
use thiserror::Error;


#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PoolError {
    #[error("pool capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),
    #[error("no tokio runtime available to run pool workers")]
    NoRuntime,
    #[error("name: {0} already registered")]
    AlreadyRegistered(String),
}

pub type Result<T> = std::result::Result<T, PoolError>;


thread_local! {
    static PANIC_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static BACKTRACE_HOOK: Once = Once::new();

/// Один раз на процесс добавляет к текущему panic hook снимок стека в момент паники.
/// `TaskPanic::new` забирает его на том же потоке, сразу после `catch_unwind`.
pub(crate) fn install_backtrace_hook() {
    BACKTRACE_HOOK.call_once(|| {
        let prev = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let _ = PANIC_BACKTRACE.try_with(|slot| {
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    *slot = Some(Backtrace::force_capture());
                }
            });
            prev(info);
        }));
    });
}

fn take_panic_backtrace() -> Option<Backtrace> {
    PANIC_BACKTRACE
        .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
        .ok()
        .flatten()
}


/// Значение, пойманное границей перехвата паники вокруг задачи.
pub struct TaskPanic {
    payload: Box<dyn Any + Send + 'static>,
    backtrace: Backtrace,
}

impl TaskPanic {
    /// Должен вызываться на потоке, где случилась паника: тогда backtrace указывает
    /// на место паники. Без hook остается снимок текущего стека.
    pub fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self {
            payload,
            backtrace: take_panic_backtrace().unwrap_or_else(Backtrace::force_capture),
        }
    }

    pub(crate) fn catch<F>(f: F) -> std::result::Result<(), TaskPanic>
    where
        F: FnOnce(),
    {
        panic::catch_unwind(AssertUnwindSafe(f)).map_err(TaskPanic::new)
    }

    pub fn message(&self) -> &str {
        if let Some(s) = self.payload.downcast_ref::<&'static str>() {
            *s
        } else if let Some(s) = self.payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "Box<dyn Any>"
        }
    }

    #[inline]
    pub fn payload(&self) -> &(dyn Any + Send + 'static) {
        &*self.payload
    }

    #[inline]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn into_payload(self) -> Box<dyn Any + Send + 'static> {
        self.payload
    }
}

impl fmt::Debug for TaskPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPanic")
            .field("message", &self.message())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TaskPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_from_str_payload() {
        let p = TaskPanic::new(Box::new("boom"));
        assert_eq!(p.message(), "boom");
        assert_eq!(p.to_string(), "boom");
    }

    #[test]
    fn message_from_string_payload() {
        let p = TaskPanic::new(Box::new(format!("bad value {}", 7)));
        assert_eq!(p.message(), "bad value 7");
    }

    #[test]
    fn message_from_opaque_payload() {
        let p = TaskPanic::new(Box::new(42_u32));
        assert_eq!(p.message(), "Box<dyn Any>");
        assert_eq!(p.payload().downcast_ref::<u32>(), Some(&42));
    }

    #[inline(never)]
    fn explode_in_marked_frame() {
        panic!("marked");
    }

    #[test]
    fn backtrace_points_at_panic_site() {
        install_backtrace_hook();
        let p = TaskPanic::catch(explode_in_marked_frame).unwrap_err();
        assert_eq!(p.message(), "marked");
        assert!(p.backtrace().to_string().contains("explode_in_marked_frame"));
    }

    #[test]
    fn catch_passes_normal_completion() {
        assert!(TaskPanic::catch(|| {}).is_ok());
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            PoolError::AlreadyRegistered("db".into()).to_string(),
            "name: db already registered"
        );
        assert_eq!(
            PoolError::InvalidCapacity(0).to_string(),
            "pool capacity must be at least 1, got 0"
        );
    }
}
