use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pool_warden::{
  async_trait, limit, BoxError, Canceler, Context, Factory, Pool, PoolError, PoolOptions,
};
use tokio::runtime::Handle;
use tracing::info;

struct Conn {
  id: usize,
}

struct ConnFactory {
  next_id: AtomicUsize,
}

#[async_trait]
impl Factory for ConnFactory {
  type Item = Conn;

  async fn create(&self) -> Result<Conn, BoxError> {
    Ok(Conn {
      id: self.next_id.fetch_add(1, Ordering::SeqCst),
    })
  }

  async fn destroy(&self, _item: Arc<Conn>) -> Result<(), BoxError> {
    Ok(())
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Request Cancellation Example ---");

  let pool = Pool::new(
    ConnFactory {
      next_id: AtomicUsize::new(0),
    },
    PoolOptions {
      max_open: Some(1),
      ..PoolOptions::default()
    },
    Handle::current(),
    "cancellation_pool",
  );

  // Occupy the only slot so further requests queue.
  let held = pool.get(None).await.expect("first connection");
  info!("holding connection {}", held.id);

  // A queued request abandoned by its caller: cancel it directly.
  let canceler = Canceler::new();
  let ctx = Context::with_canceler(canceler.clone());
  let queued = pool.get(Some(&ctx));

  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!("caller gave up; cancelling its request");
    canceler.cancel(None);
  });

  match queued.await {
    Ok(conn) => info!("unexpectedly got connection {}", conn.id),
    Err(err) => info!(
      "request failed: {} (cancellation: {})",
      err,
      err.is_canceled()
    ),
  }

  // The same shape with a time budget: race the request against a deadline
  // and detach it when the budget runs out.
  let canceler = Canceler::new();
  let ctx = Context::with_canceler(canceler.clone());
  match limit(pool.get(Some(&ctx)), Duration::from_millis(200)).await {
    Ok(_) => info!("request served within budget"),
    Err(PoolError::TimedOut(budget)) => {
      info!("request missed its {:?} budget; detaching it", budget);
      canceler.cancel(None);
    }
    Err(err) => info!("request failed: {}", err),
  }

  info!("waiters left: {}", pool.stats().wait_count);

  pool.release(held);
  pool.close().await;
  info!("--- Request Cancellation Example End ---");
}
