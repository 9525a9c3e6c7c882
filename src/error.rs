use std::time::Duration;

use thiserror::Error;

/// Boxed error type produced by [`Factory`](crate::Factory) implementations.
///
/// Factory failures never reach `get`/`release` callers directly; they are
/// routed through the pool's error event channel.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the `pool_warden` pool and its helper primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
  /// The request was cancelled by its context before an item was available.
  #[error("request canceled: {0}")]
  Canceled(String),

  /// The pool is shutting down and cannot serve new requests.
  #[error("pool is closing")]
  Closing,

  /// The pool has fully shut down.
  #[error("pool is closed")]
  Closed,

  /// A bounded wait ran out of time before the inner future settled.
  #[error("timed out after {0:?}")]
  TimedOut(Duration),

  /// `set_options` was handed a disallowed value; no state was changed.
  #[error("invalid pool option: {0}")]
  InvalidOption(String),

  /// The settled value of a promise was already taken by another awaiter.
  #[error("promise result already taken")]
  ResultUnavailable,
}

impl PoolError {
  /// Returns `true` if this error marks a cancellation.
  pub fn is_canceled(&self) -> bool {
    matches!(self, PoolError::Canceled(_))
  }

  pub(crate) fn canceled() -> Self {
    PoolError::Canceled("context canceled".to_string())
  }
}

/// Free-function form of [`PoolError::is_canceled`].
pub fn is_canceled(err: &PoolError) -> bool {
  err.is_canceled()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canceled_is_tagged() {
    assert!(is_canceled(&PoolError::canceled()));
    assert!(PoolError::Canceled("deadline".into()).is_canceled());
    assert!(!PoolError::Closing.is_canceled());
    assert!(!PoolError::Closed.is_canceled());
    assert!(!PoolError::TimedOut(Duration::from_millis(5)).is_canceled());
  }

  #[test]
  fn display_names_the_cause() {
    let err = PoolError::InvalidOption("max_open must not be zero".into());
    assert!(err.to_string().contains("max_open"));
    assert_eq!(PoolError::Closing.to_string(), "pool is closing");
  }
}
