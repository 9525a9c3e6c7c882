use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;

/// Builds, tears down, and refurbishes the resources a pool lends out.
///
/// The pool owns the factory exclusively: callers must never invoke `create`
/// or `destroy` themselves. Failures from any hook are reported through the
/// pool's error event channel, never to `get`/`release` callers.
#[async_trait]
pub trait Factory: Send + Sync + 'static {
  /// The resource type lent out by the pool.
  type Item: Send + Sync + 'static;

  /// Produces a fresh resource or fails.
  async fn create(&self) -> Result<Self::Item, BoxError>;

  /// Releases the resource's underlying state.
  ///
  /// By the time this runs the pool holds no other reference to the item. A
  /// failure is reported as an event, but the item still counts as destroyed;
  /// the implementation remains responsible for freeing what it can.
  async fn destroy(&self, item: Arc<Self::Item>) -> Result<(), BoxError>;

  /// Synchronous refurbishment hook, run on every release.
  ///
  /// An error (or panic) discards the item instead of pooling it. The default
  /// accepts every item.
  fn reset(&self, item: &Self::Item) -> Result<(), BoxError> {
    let _ = item;
    Ok(())
  }
}
