use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::error;

use crate::error::BoxError;

lazy_static::lazy_static! {
  static ref NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(0);
}

/// Which factory hook produced an error event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FactoryOp {
  Create,
  Destroy,
  Reset,
}

impl fmt::Display for FactoryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FactoryOp::Create => f.write_str("create"),
      FactoryOp::Destroy => f.write_str("destroy"),
      FactoryOp::Reset => f.write_str("reset"),
    }
  }
}

/// Identifies a handler registered with
/// [`Pool::on_error`](crate::Pool::on_error).
pub type HandlerId = u64;

type ErrorHandler = Arc<dyn Fn(FactoryOp, &BoxError) + Send + Sync + 'static>;

/// Registry of factory-error event handlers.
pub(crate) struct ErrorHandlers {
  pool_name: Arc<String>,
  handlers: DashMap<HandlerId, ErrorHandler>,
}

impl ErrorHandlers {
  pub(crate) fn new(pool_name: Arc<String>) -> Self {
    ErrorHandlers {
      pool_name,
      handlers: DashMap::new(),
    }
  }

  pub(crate) fn add(
    &self,
    handler: impl Fn(FactoryOp, &BoxError) + Send + Sync + 'static,
  ) -> HandlerId {
    let id = NEXT_HANDLER_ID.fetch_add(1, AtomicOrdering::Relaxed);
    self.handlers.insert(id, Arc::new(handler));
    id
  }

  pub(crate) fn remove(&self, id: HandlerId) {
    self.handlers.remove(&id);
  }

  /// Dispatches `(op, err)` to every handler, containing handler panics.
  pub(crate) fn emit(&self, op: FactoryOp, err: &BoxError) {
    let handlers: Vec<ErrorHandler> = self
      .handlers
      .iter()
      .map(|entry| entry.value().clone())
      .collect();
    for handler in handlers {
      if catch_unwind(AssertUnwindSafe(|| handler(op, err))).is_err() {
        error!(pool = %self.pool_name, action = %op, "error handler panicked");
      }
    }
  }
}

impl fmt::Debug for ErrorHandlers {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ErrorHandlers")
      .field("pool_name", &self.pool_name)
      .field("handler_count", &self.handlers.len())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicUsize;

  fn boxed(msg: &str) -> BoxError {
    msg.to_string().into()
  }

  #[test]
  fn emit_reaches_every_handler() {
    let handlers = ErrorHandlers::new(Arc::new("test".to_string()));
    let seen = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
      let seen = seen.clone();
      handlers.add(move |op, err| {
        assert_eq!(op, FactoryOp::Create);
        assert_eq!(err.to_string(), "boom");
        seen.fetch_add(1, AtomicOrdering::SeqCst);
      });
    }

    handlers.emit(FactoryOp::Create, &boxed("boom"));
    assert_eq!(seen.load(AtomicOrdering::SeqCst), 3);
  }

  #[test]
  fn removed_handler_stays_silent() {
    let handlers = ErrorHandlers::new(Arc::new("test".to_string()));
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_clone = seen.clone();
    let id = handlers.add(move |_, _| {
      seen_clone.fetch_add(1, AtomicOrdering::SeqCst);
    });

    handlers.remove(id);
    handlers.emit(FactoryOp::Destroy, &boxed("gone"));
    assert_eq!(seen.load(AtomicOrdering::SeqCst), 0);
  }

  #[test]
  fn panicking_handler_does_not_stop_dispatch() {
    let handlers = ErrorHandlers::new(Arc::new("test".to_string()));
    handlers.add(|_, _| panic!("handler bug"));
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_clone = seen.clone();
    handlers.add(move |_, _| {
      seen_clone.fetch_add(1, AtomicOrdering::SeqCst);
    });

    handlers.emit(FactoryOp::Reset, &boxed("discarded"));
    assert_eq!(seen.load(AtomicOrdering::SeqCst), 1);
  }
}
