use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::PoolError;

lazy_static::lazy_static! {
  static ref NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(0);
}

/// Identifies a callback registered with [`Canceler::on_cancel`].
pub type SubscriptionId = u64;

type CancelCallback = Box<dyn FnOnce(Option<PoolError>) + Send + 'static>;

struct CancelState {
  canceled: bool,
  err: Option<PoolError>,
  subscribers: Vec<(SubscriptionId, CancelCallback)>,
}

/// A one-shot cancellation signal.
///
/// A `Canceler` can be cancelled exactly once, optionally with an error that
/// later observers can read back through [`Canceler::err`]. Interested parties
/// either register a one-shot callback ([`Canceler::on_cancel`], removable via
/// [`Canceler::off`]) or await [`Canceler::cancelled`].
#[derive(Clone)]
pub struct Canceler {
  inner: Arc<CancelerInner>,
}

struct CancelerInner {
  token: CancellationToken,
  state: Mutex<CancelState>,
}

impl Canceler {
  pub fn new() -> Self {
    Canceler {
      inner: Arc::new(CancelerInner {
        token: CancellationToken::new(),
        state: Mutex::new(CancelState {
          canceled: false,
          err: None,
          subscribers: Vec::new(),
        }),
      }),
    }
  }

  /// Returns `true` once [`Canceler::cancel`] has run.
  pub fn is_canceled(&self) -> bool {
    self.inner.state.lock().unwrap().canceled
  }

  /// The error supplied to [`Canceler::cancel`], if any.
  pub fn err(&self) -> Option<PoolError> {
    self.inner.state.lock().unwrap().err.clone()
  }

  /// Fires the signal. The first call wins; later calls are no-ops.
  ///
  /// Registered callbacks run synchronously on the calling thread, each
  /// receiving a clone of `err`.
  pub fn cancel(&self, err: Option<PoolError>) {
    let subscribers = {
      let mut state = self.inner.state.lock().unwrap();
      if state.canceled {
        return;
      }
      state.canceled = true;
      state.err = err.clone();
      std::mem::take(&mut state.subscribers)
    };
    self.inner.token.cancel();
    trace!(subscribers = subscribers.len(), "cancel signal fired");
    for (_, callback) in subscribers {
      callback(err.clone());
    }
  }

  /// Registers a one-shot callback invoked when the signal fires.
  ///
  /// If the signal already fired, `callback` runs immediately (with the stored
  /// error) and the returned id refers to nothing.
  pub fn on_cancel(
    &self,
    callback: impl FnOnce(Option<PoolError>) + Send + 'static,
  ) -> SubscriptionId {
    let id = NEXT_SUBSCRIPTION_ID.fetch_add(1, AtomicOrdering::Relaxed);
    let mut state = self.inner.state.lock().unwrap();
    if state.canceled {
      let err = state.err.clone();
      drop(state);
      callback(err);
    } else {
      state.subscribers.push((id, Box::new(callback)));
    }
    id
  }

  /// Removes a callback registered with [`Canceler::on_cancel`].
  ///
  /// A no-op if the callback already ran or was removed.
  pub fn off(&self, id: SubscriptionId) {
    let mut state = self.inner.state.lock().unwrap();
    state.subscribers.retain(|(sub_id, _)| *sub_id != id);
  }

  /// Resolves once the signal fires; pends forever on a signal that never
  /// does.
  pub async fn cancelled(&self) {
    self.inner.token.cancelled().await;
  }
}

impl Default for Canceler {
  fn default() -> Self {
    Canceler::new()
  }
}

impl std::fmt::Debug for Canceler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.inner.state.lock().unwrap();
    f.debug_struct("Canceler")
      .field("canceled", &state.canceled)
      .field("err", &state.err)
      .field("subscribers", &state.subscribers.len())
      .finish()
  }
}

/// Per-request context handed to [`Pool::get`](crate::Pool::get).
///
/// A context without a canceler describes a request that cannot be cancelled.
#[derive(Clone, Debug, Default)]
pub struct Context {
  canceler: Option<Canceler>,
}

impl Context {
  /// A context with no cancellation signal.
  pub fn new() -> Self {
    Context { canceler: None }
  }

  /// A context driven by `canceler`.
  pub fn with_canceler(canceler: Canceler) -> Self {
    Context {
      canceler: Some(canceler),
    }
  }

  pub fn canceler(&self) -> Option<&Canceler> {
    self.canceler.as_ref()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicUsize;

  #[test]
  fn cancel_fires_subscribers_once() {
    let canceler = Canceler::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_clone = fired.clone();
    canceler.on_cancel(move |_| {
      fired_clone.fetch_add(1, AtomicOrdering::SeqCst);
    });

    assert!(!canceler.is_canceled());
    canceler.cancel(None);
    canceler.cancel(None);

    assert!(canceler.is_canceled());
    assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);
  }

  #[test]
  fn cancel_stores_and_delivers_error() {
    let canceler = Canceler::new();
    let seen = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();
    canceler.on_cancel(move |err| {
      *seen_clone.lock().unwrap() = err;
    });

    canceler.cancel(Some(PoolError::Canceled("deadline exceeded".into())));

    assert_eq!(
      canceler.err(),
      Some(PoolError::Canceled("deadline exceeded".into()))
    );
    assert_eq!(
      *seen.lock().unwrap(),
      Some(PoolError::Canceled("deadline exceeded".into()))
    );
  }

  #[test]
  fn off_removes_subscriber() {
    let canceler = Canceler::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_clone = fired.clone();
    let id = canceler.on_cancel(move |_| {
      fired_clone.fetch_add(1, AtomicOrdering::SeqCst);
    });

    canceler.off(id);
    canceler.cancel(None);

    assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);
  }

  #[test]
  fn subscribe_after_cancel_fires_immediately() {
    let canceler = Canceler::new();
    canceler.cancel(Some(PoolError::canceled()));

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_clone = fired.clone();
    canceler.on_cancel(move |err| {
      assert!(err.is_some_and(|e| e.is_canceled()));
      fired_clone.fetch_add(1, AtomicOrdering::SeqCst);
    });

    assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);
  }

  #[tokio::test]
  async fn cancelled_future_resolves_on_cancel() {
    let canceler = Canceler::new();
    let watcher = canceler.clone();
    let handle = tokio::spawn(async move {
      watcher.cancelled().await;
    });

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    canceler.cancel(None);
    handle.await.unwrap();
  }

  #[test]
  fn context_exposes_canceler() {
    assert!(Context::new().canceler().is_none());
    let canceler = Canceler::new();
    let ctx = Context::with_canceler(canceler.clone());
    canceler.cancel(None);
    assert!(ctx.canceler().unwrap().is_canceled());
  }
}
