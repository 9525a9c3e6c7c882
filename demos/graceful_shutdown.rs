use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pool_warden::{async_trait, BoxError, Canceler, Factory, Pool, PoolOptions};
use tokio::runtime::Handle;
use tracing::info;

struct Worker {
  id: usize,
  stop: Canceler,
}

struct WorkerFactory {
  next_id: AtomicUsize,
}

#[async_trait]
impl Factory for WorkerFactory {
  type Item = Worker;

  async fn create(&self) -> Result<Worker, BoxError> {
    Ok(Worker {
      id: self.next_id.fetch_add(1, Ordering::SeqCst),
      stop: Canceler::new(),
    })
  }

  async fn destroy(&self, item: Arc<Worker>) -> Result<(), BoxError> {
    info!("worker {} torn down", item.id);
    Ok(())
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Graceful Shutdown Example ---");

  let pool = Pool::new(
    WorkerFactory {
      next_id: AtomicUsize::new(0),
    },
    PoolOptions {
      max_open: Some(3),
      ..PoolOptions::default()
    },
    Handle::current(),
    "shutdown_pool",
  );

  // Three borrowers, each looping until its worker is told to stop.
  let mut borrowers = Vec::new();
  for n in 0..3 {
    let pool = pool.clone();
    borrowers.push(tokio::spawn(async move {
      let worker = pool.get(None).await.expect("worker");
      info!("borrower {} using worker {}", n, worker.id);
      worker.stop.cancelled().await;
      info!("borrower {} releasing worker {}", n, worker.id);
      pool.release(worker);
    }));
  }

  tokio::time::sleep(Duration::from_millis(100)).await;
  info!("initiating close; signalling in-use workers to stop");

  // close_with only signals: shutdown completes once every borrower has
  // released its worker.
  pool
    .close_with(|worker| {
      worker.stop.cancel(None);
    })
    .await;

  for borrower in borrowers {
    borrower.await.expect("borrower task");
  }

  let stats = pool.stats();
  info!("pool drained: open={}, idle={}", stats.count, stats.idle_count);
  info!("--- Graceful Shutdown Example End ---");
}
