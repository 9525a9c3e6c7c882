use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::cancel::{Canceler, Context};
use crate::error::PoolError;

/// A bound for [`limit`] and [`wait`]: how long an operation may be observed.
#[derive(Clone, Debug)]
pub enum Limit {
  /// A relative time budget. Zero rejects/resolves immediately.
  Timeout(Duration),
  /// An absolute deadline, converted to a remaining duration at use time.
  Deadline(Instant),
  /// A cancellation signal.
  Token(Canceler),
  /// No bound; produced from a context that carries no canceler.
  Unbounded,
}

impl From<Duration> for Limit {
  fn from(timeout: Duration) -> Self {
    Limit::Timeout(timeout)
  }
}

impl From<Instant> for Limit {
  fn from(deadline: Instant) -> Self {
    Limit::Deadline(deadline)
  }
}

impl From<Canceler> for Limit {
  fn from(canceler: Canceler) -> Self {
    Limit::Token(canceler)
  }
}

impl From<&Context> for Limit {
  fn from(ctx: &Context) -> Self {
    match ctx.canceler() {
      Some(canceler) => Limit::Token(canceler.clone()),
      None => Limit::Unbounded,
    }
  }
}

/// Races `fut` against `bound`.
///
/// Resolves with the future's output, or fails with [`PoolError::TimedOut`]
/// (time bounds) or a tagged cancellation error (token bounds), whichever
/// settles first. A zero/elapsed time bound fails without polling `fut`; an
/// already-fired token fails likewise.
///
/// Losing the race stops *observing* `fut`, dropping it. When the underlying
/// work must keep running regardless, pass a handle to it (a
/// [`Promise`](crate::Promise) clone, a `JoinHandle`) rather than the work
/// itself.
pub async fn limit<F: Future>(fut: F, bound: impl Into<Limit>) -> Result<F::Output, PoolError> {
  match bound.into() {
    Limit::Timeout(timeout) => bounded(fut, timeout).await,
    Limit::Deadline(deadline) => {
      bounded(fut, deadline.saturating_duration_since(Instant::now())).await
    }
    Limit::Token(canceler) => {
      if canceler.is_canceled() {
        return Err(cancel_error(&canceler));
      }
      tokio::select! {
        biased;
        out = fut => Ok(out),
        _ = canceler.cancelled() => Err(cancel_error(&canceler)),
      }
    }
    Limit::Unbounded => Ok(fut.await),
  }
}

/// Resolves once `bound` passes.
///
/// Zero durations, elapsed deadlines, already-fired tokens, and unbounded
/// contexts resolve immediately; a token bound otherwise resolves when the
/// token fires.
pub async fn wait(bound: impl Into<Limit>) {
  match bound.into() {
    Limit::Timeout(timeout) => {
      if !timeout.is_zero() {
        sleep(timeout).await;
      }
    }
    Limit::Deadline(deadline) => {
      let remaining = deadline.saturating_duration_since(Instant::now());
      if !remaining.is_zero() {
        sleep(remaining).await;
      }
    }
    Limit::Token(canceler) => {
      if !canceler.is_canceled() {
        canceler.cancelled().await;
      }
    }
    Limit::Unbounded => {}
  }
}

async fn bounded<F: Future>(fut: F, timeout: Duration) -> Result<F::Output, PoolError> {
  if timeout.is_zero() {
    return Err(PoolError::TimedOut(timeout));
  }
  tokio::select! {
    biased;
    out = fut => Ok(out),
    _ = sleep(timeout) => Err(PoolError::TimedOut(timeout)),
  }
}

fn cancel_error(canceler: &Canceler) -> PoolError {
  canceler.err().unwrap_or_else(PoolError::canceled)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::promise::Promise;
  use futures::FutureExt;

  #[tokio::test]
  async fn value_wins_the_race() {
    let out = limit(async { 5 }, Duration::from_secs(1)).await;
    assert_eq!(out, Ok(5));
  }

  #[tokio::test]
  async fn zero_timeout_rejects_without_polling() {
    let promise: Promise<i32> = Promise::new();
    let out = limit(promise, Duration::ZERO).now_or_never().unwrap();
    assert_eq!(out, Err(PoolError::TimedOut(Duration::ZERO)));
  }

  #[tokio::test]
  async fn pending_future_times_out() {
    let promise: Promise<i32> = Promise::new();
    let out = limit(promise, Duration::from_millis(20)).await;
    assert_eq!(out, Err(PoolError::TimedOut(Duration::from_millis(20))));
  }

  #[tokio::test]
  async fn elapsed_deadline_rejects_immediately() {
    let promise: Promise<i32> = Promise::new();
    let out = limit(promise, Instant::now()).now_or_never().unwrap();
    assert!(matches!(out, Err(PoolError::TimedOut(_))));
  }

  #[tokio::test]
  async fn token_cancellation_rejects_with_tag() {
    let canceler = Canceler::new();
    let promise: Promise<i32> = Promise::new();

    let racer = canceler.clone();
    let watcher = tokio::spawn(async move { limit(promise, racer).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    canceler.cancel(None);

    let out = watcher.await.unwrap();
    assert!(out.unwrap_err().is_canceled());
  }

  #[tokio::test]
  async fn fired_token_rejects_with_stored_error() {
    let canceler = Canceler::new();
    canceler.cancel(Some(PoolError::Canceled("deadline exceeded".into())));

    let promise: Promise<i32> = Promise::new();
    let out = limit(promise, canceler).now_or_never().unwrap();
    assert_eq!(out, Err(PoolError::Canceled("deadline exceeded".into())));
  }

  #[tokio::test]
  async fn late_resolution_goes_unobserved() {
    let promise: Promise<i32> = Promise::new();
    let handle = promise.clone();
    let out = limit(promise, Duration::from_millis(10)).await;
    assert!(matches!(out, Err(PoolError::TimedOut(_))));

    // The producer side still settles; the race just stopped watching.
    handle.resolve(3).unwrap();
  }

  #[tokio::test]
  async fn wait_resolves_immediately_on_degenerate_bounds() {
    wait(Duration::ZERO).now_or_never().unwrap();
    wait(Instant::now()).now_or_never().unwrap();
    wait(&Context::new()).now_or_never().unwrap();

    let canceler = Canceler::new();
    canceler.cancel(None);
    wait(canceler).now_or_never().unwrap();
  }

  #[tokio::test]
  async fn wait_on_token_resolves_when_it_fires() {
    let canceler = Canceler::new();
    let waiter = canceler.clone();
    let handle = tokio::spawn(async move { wait(waiter).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    canceler.cancel(None);
    handle.await.unwrap();
  }

  #[tokio::test]
  async fn wait_sleeps_for_the_duration() {
    let started = Instant::now();
    wait(Duration::from_millis(30)).await;
    assert!(started.elapsed() >= Duration::from_millis(25));
  }
}
