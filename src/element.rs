use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::factory::Factory;
use crate::options::PoolOptions;
use crate::pool::PoolInner;

lazy_static::lazy_static! {
  static ref NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(0);
}

/// Which cap an element ran over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExpiredReason {
  Lifetime,
  IdleTime,
}

/// A factory item paired with its lifecycle timestamps.
///
/// `idled_at` is set while the element sits in the idle stack and cleared
/// while it is lent out.
pub(crate) struct Element<T> {
  pub(crate) id: u64,
  pub(crate) item: Arc<T>,
  pub(crate) created_at: Instant,
  pub(crate) idled_at: Option<Instant>,
}

impl<T> Element<T> {
  pub(crate) fn new(item: T) -> Self {
    Element {
      id: NEXT_ELEMENT_ID.fetch_add(1, AtomicOrdering::Relaxed),
      item: Arc::new(item),
      created_at: Instant::now(),
      idled_at: None,
    }
  }

  /// The cap this element has outlived, if any. Idle time only applies while
  /// the element is pooled.
  pub(crate) fn expired_by(&self, now: Instant, options: &PoolOptions) -> Option<ExpiredReason> {
    if let Some(max_lifetime) = options.max_lifetime {
      if now.duration_since(self.created_at) > max_lifetime {
        return Some(ExpiredReason::Lifetime);
      }
    }
    if let Some(max_idle_time) = options.max_idle_time {
      if let Some(idled_at) = self.idled_at {
        if now.duration_since(idled_at) > max_idle_time {
          return Some(ExpiredReason::IdleTime);
        }
      }
    }
    None
  }

  /// The smaller of the remaining lifetime and idle budgets, or `None` when
  /// both caps are off. A budget already overrun yields zero.
  pub(crate) fn ttl(&self, now: Instant, options: &PoolOptions) -> Option<Duration> {
    let mut best: Option<Duration> = None;
    if let Some(max_lifetime) = options.max_lifetime {
      let remaining = max_lifetime.saturating_sub(now.duration_since(self.created_at));
      best = Some(remaining);
    }
    if let Some(max_idle_time) = options.max_idle_time {
      if let Some(idled_at) = self.idled_at {
        let remaining = max_idle_time.saturating_sub(now.duration_since(idled_at));
        best = Some(match best {
          Some(current) => current.min(remaining),
          None => remaining,
        });
      }
    }
    best
  }
}

/// A resource on loan from a [`Pool`](crate::Pool).
///
/// Dereferences to the factory item. The loan ends through
/// [`Pool::release`](crate::Pool::release) or by dropping the handle; both
/// route through the same release path. The item belongs to this handle's
/// holder until then.
pub struct Pooled<F: Factory> {
  item: Option<Arc<F::Item>>,
  id: u64,
  pool: Weak<PoolInner<F>>,
}

impl<F: Factory> Pooled<F> {
  pub(crate) fn new(item: Arc<F::Item>, id: u64, pool: Weak<PoolInner<F>>) -> Self {
    Pooled {
      item: Some(item),
      id,
      pool,
    }
  }

  /// A reference to the borrowed item.
  pub fn item(&self) -> &F::Item {
    self.item.as_ref().expect("item taken only on release")
  }

  /// Tears the handle apart without running its drop-return.
  pub(crate) fn dismantle(mut self) -> (u64, Arc<F::Item>, Weak<PoolInner<F>>) {
    let item = self.item.take().expect("item taken only on release");
    (self.id, item, std::mem::take(&mut self.pool))
  }
}

impl<F: Factory> PartialEq for Pooled<F> {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl<F: Factory> Deref for Pooled<F> {
  type Target = F::Item;

  fn deref(&self) -> &Self::Target {
    self.item()
  }
}

impl<F: Factory> Drop for Pooled<F> {
  fn drop(&mut self) {
    if let Some(item) = self.item.take() {
      match self.pool.upgrade() {
        Some(inner) => inner.release_parts(self.id, item),
        None => trace!(element = self.id, "pool gone; dropping borrowed item"),
      }
    }
  }
}

impl<F: Factory> fmt::Debug for Pooled<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pooled").field("id", &self.id).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn options(max_lifetime: Option<Duration>, max_idle_time: Option<Duration>) -> PoolOptions {
    PoolOptions {
      max_lifetime,
      max_idle_time,
      ..PoolOptions::default()
    }
  }

  #[test]
  fn uncapped_element_never_expires() {
    let element = Element::new(());
    let later = Instant::now() + Duration::from_secs(3600);
    assert_eq!(element.expired_by(later, &options(None, None)), None);
    assert_eq!(element.ttl(later, &options(None, None)), None);
  }

  #[test]
  fn lifetime_cap_expires_by_age() {
    let element = Element::new(());
    let opts = options(Some(Duration::from_millis(50)), None);
    let now = element.created_at;

    assert_eq!(element.expired_by(now + Duration::from_millis(10), &opts), None);
    assert_eq!(
      element.expired_by(now + Duration::from_millis(60), &opts),
      Some(ExpiredReason::Lifetime)
    );
  }

  #[test]
  fn idle_cap_only_applies_while_pooled() {
    let mut element = Element::new(());
    let opts = options(None, Some(Duration::from_millis(20)));
    let now = element.created_at;

    // Lent out: no idle timestamp, no idle expiry.
    assert_eq!(element.expired_by(now + Duration::from_secs(10), &opts), None);

    element.idled_at = Some(now);
    assert_eq!(
      element.expired_by(now + Duration::from_millis(30), &opts),
      Some(ExpiredReason::IdleTime)
    );
  }

  #[test]
  fn ttl_is_the_nearest_budget() {
    let mut element = Element::new(());
    let now = element.created_at;
    element.idled_at = Some(now);

    let opts = options(Some(Duration::from_millis(100)), Some(Duration::from_millis(40)));
    assert_eq!(
      element.ttl(now + Duration::from_millis(10), &opts),
      Some(Duration::from_millis(30))
    );

    let opts = options(Some(Duration::from_millis(35)), Some(Duration::from_millis(40)));
    assert_eq!(
      element.ttl(now + Duration::from_millis(10), &opts),
      Some(Duration::from_millis(25))
    );
  }

  #[test]
  fn overrun_budget_clamps_to_zero() {
    let element = Element::new(());
    let opts = options(Some(Duration::from_millis(5)), None);
    assert_eq!(
      element.ttl(element.created_at + Duration::from_millis(50), &opts),
      Some(Duration::ZERO)
    );
  }
}
