use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll, Waker};

use crate::cancel::{Canceler, Context, SubscriptionId};
use crate::error::PoolError;

struct PromiseState<T> {
  outcome: Option<Result<T, PoolError>>,
  settled: bool,
  taken: bool,
  waker: Option<Waker>,
  subscription: Option<(Canceler, SubscriptionId)>,
}

struct Shared<T> {
  state: Mutex<PromiseState<T>>,
}

/// A future whose producer side is directly invocable.
///
/// Clones share one settle-once cell: the first [`Promise::resolve`] or
/// [`Promise::reject`] wins and every later settle attempt is a no-op. The
/// settled value is delivered to the first awaiter; any clone polled after
/// that observes [`PoolError::ResultUnavailable`].
///
/// [`Promise::with_context`] additionally binds the promise to a context's
/// canceler: cancellation rejects the promise with a tagged cancellation
/// error, and the canceler subscription is dropped as soon as the promise
/// settles by any path.
pub struct Promise<T> {
  shared: Arc<Shared<T>>,
}

impl<T> Promise<T> {
  pub fn new() -> Self {
    Promise {
      shared: Arc::new(Shared {
        state: Mutex::new(PromiseState {
          outcome: None,
          settled: false,
          taken: false,
          waker: None,
          subscription: None,
        }),
      }),
    }
  }

  /// A promise that auto-rejects when `ctx`'s canceler fires.
  ///
  /// The rejection error is the canceler's stored error if present, otherwise
  /// `cancel_err`, otherwise a generic tagged cancellation. A context whose
  /// canceler already fired yields an immediately rejected promise.
  pub fn with_context(ctx: &Context, cancel_err: Option<PoolError>) -> Self
  where
    T: Send + 'static,
  {
    let promise = Promise::new();
    let Some(canceler) = ctx.canceler() else {
      return promise;
    };

    if canceler.is_canceled() {
      let err = canceler
        .err()
        .or(cancel_err)
        .unwrap_or_else(PoolError::canceled);
      promise.reject(err);
      return promise;
    }

    let weak = Arc::downgrade(&promise.shared);
    let id = canceler.on_cancel(move |err| {
      if let Some(shared) = weak.upgrade() {
        let promise = Promise { shared };
        promise.reject(err.or(cancel_err).unwrap_or_else(PoolError::canceled));
      }
    });

    // The canceler may have fired between the check above and registration,
    // in which case the callback already rejected the promise.
    let mut state = promise.shared.state.lock().unwrap();
    if state.settled {
      drop(state);
      canceler.off(id);
    } else {
      state.subscription = Some((canceler.clone(), id));
      drop(state);
    }
    promise
  }

  /// Settles the promise with `value`.
  ///
  /// Hands `value` back if the promise was already settled.
  pub fn resolve(&self, value: T) -> Result<(), T> {
    match self.settle(Ok(value)) {
      None => Ok(()),
      Some(Ok(value)) => Err(value),
      Some(Err(_)) => Ok(()),
    }
  }

  /// Settles the promise with `err`. Returns `false` if already settled.
  pub fn reject(&self, err: PoolError) -> bool {
    self.settle(Err(err)).is_none()
  }

  pub fn is_settled(&self) -> bool {
    self.shared.state.lock().unwrap().settled
  }

  fn settle(&self, outcome: Result<T, PoolError>) -> Option<Result<T, PoolError>> {
    let (waker, subscription) = {
      let mut state = self.shared.state.lock().unwrap();
      if state.settled {
        return Some(outcome);
      }
      state.settled = true;
      state.outcome = Some(outcome);
      (state.waker.take(), state.subscription.take())
    };
    if let Some((canceler, id)) = subscription {
      canceler.off(id);
    }
    if let Some(waker) = waker {
      waker.wake();
    }
    None
  }
}

impl<T> Clone for Promise<T> {
  fn clone(&self) -> Self {
    Promise {
      shared: self.shared.clone(),
    }
  }
}

impl<T> Default for Promise<T> {
  fn default() -> Self {
    Promise::new()
  }
}

impl<T> Future for Promise<T> {
  type Output = Result<T, PoolError>;

  fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
    let mut state = self.shared.state.lock().unwrap();
    if let Some(outcome) = state.outcome.take() {
      state.taken = true;
      return Poll::Ready(outcome);
    }
    if state.taken {
      return Poll::Ready(Err(PoolError::ResultUnavailable));
    }
    match &mut state.waker {
      Some(waker) if waker.will_wake(cx.waker()) => {}
      slot => *slot = Some(cx.waker().clone()),
    }
    Poll::Pending
  }
}

impl<T> std::fmt::Debug for Promise<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.shared.state.lock().unwrap();
    f.debug_struct("Promise")
      .field("settled", &state.settled)
      .field("taken", &state.taken)
      .finish()
  }
}
