//! A Tokio-based asynchronous resource pool with lifecycle limits, FIFO
//! waiters, LIFO reuse, and cooperative cancellation.
//!
//! A [`Pool`] multiplexes a bounded set of expensive resources (connections,
//! sessions, compiled artifacts) built by a caller-supplied [`Factory`].
//! Requests queue in FIFO order and can be cancelled mid-wait through a
//! [`Context`]; idle resources are reused in LIFO order and reclaimed by
//! timed sweeps once they outlive `max_lifetime` or `max_idle_time`;
//! [`Pool::close`] drains everything and resolves once the pool quiesces.
//!
//! The pool is built on two small primitives that are also part of the public
//! surface: [`Promise`], a future whose `resolve`/`reject` sides are directly
//! invocable, and [`limit`]/[`wait`], which bound a pending operation by a
//! duration, a deadline, or a [`Canceler`].
//!
//! ```no_run
//! use pool_warden::{Factory, Pool, PoolOptions, BoxError};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Connector;
//!
//! #[async_trait]
//! impl Factory for Connector {
//!   type Item = String;
//!
//!   async fn create(&self) -> Result<String, BoxError> {
//!     Ok("connection".to_string())
//!   }
//!
//!   async fn destroy(&self, _item: Arc<String>) -> Result<(), BoxError> {
//!     Ok(())
//!   }
//! }
//!
//! # async fn run() {
//! let pool = Pool::new(
//!   Connector,
//!   PoolOptions { max_open: Some(8), ..PoolOptions::default() },
//!   tokio::runtime::Handle::current(),
//!   "connections",
//! );
//! let conn = pool.get(None).await.unwrap();
//! println!("using {}", *conn);
//! pool.release(conn);
//! pool.close().await;
//! # }
//! ```

mod cancel;
mod element;
mod error;
mod events;
mod factory;
mod limit;
mod options;
mod pool;
mod promise;

pub use async_trait::async_trait;

pub use cancel::{Canceler, Context, SubscriptionId};
pub use element::Pooled;
pub use error::{is_canceled, BoxError, PoolError};
pub use events::{FactoryOp, HandlerId};
pub use factory::Factory;
pub use limit::{limit, wait, Limit};
pub use options::{OptionsUpdate, PoolOptions};
pub use pool::{Pool, PoolStats};
