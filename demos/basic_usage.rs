use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pool_warden::{async_trait, BoxError, Factory, Pool, PoolOptions};
use tokio::runtime::Handle;
use tracing::info;

struct Session {
  id: usize,
}

struct SessionFactory {
  next_id: AtomicUsize,
}

#[async_trait]
impl Factory for SessionFactory {
  type Item = Session;

  async fn create(&self) -> Result<Session, BoxError> {
    // Stand-in for a handshake or connection setup.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
    info!("opened session {}", id);
    Ok(Session { id })
  }

  async fn destroy(&self, item: Arc<Session>) -> Result<(), BoxError> {
    info!("closed session {}", item.id);
    Ok(())
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Basic Usage Example ---");

  let pool = Pool::new(
    SessionFactory {
      next_id: AtomicUsize::new(0),
    },
    PoolOptions {
      max_open: Some(2),
      max_idle: Some(2),
      ..PoolOptions::default()
    },
    Handle::current(),
    "basic_usage_pool",
  );

  // Two borrowers run concurrently; the third request waits its turn.
  let first = pool.get(None).await.expect("first session");
  let second = pool.get(None).await.expect("second session");
  info!("borrowed sessions {} and {}", first.id, second.id);

  let queued = pool.get(None);
  info!("third request queued (waiters: {})", pool.stats().wait_count);

  pool.release(first);
  let third = queued.await.expect("third session");
  info!("third request served by recycled session {}", third.id);

  pool.release(second);
  pool.release(third);

  let stats = pool.stats();
  info!(
    "open: {}, idle: {}, waited a total of {:?}",
    stats.count, stats.idle_count, stats.wait_duration
  );

  pool.close().await;
  info!("--- Basic Usage Example End ---");
}
