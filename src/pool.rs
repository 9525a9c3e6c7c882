use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::runtime::Handle as TokioHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::cancel::{Canceler, Context, SubscriptionId};
use crate::element::{Element, ExpiredReason, Pooled};
use crate::error::{BoxError, PoolError};
use crate::events::{ErrorHandlers, FactoryOp, HandlerId};
use crate::factory::Factory;
use crate::options::{OptionsUpdate, PoolOptions};
use crate::promise::Promise;

lazy_static::lazy_static! {
  static ref NEXT_WAITER_ID: AtomicU64 = AtomicU64::new(0);
}

/// Consecutive factory `create` failures tolerated before the pool closes
/// itself.
const MAX_CONSECUTIVE_CREATE_FAILURES: u32 = 10;

/// Upper bound on how far out a sweep is ever scheduled.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// A point-in-time view of pool counters and caps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolStats {
  pub max_open: Option<usize>,
  pub max_idle: Option<usize>,
  pub max_lifetime: Option<Duration>,
  pub max_idle_time: Option<Duration>,
  /// Lent-out plus pooled elements.
  pub count: usize,
  pub in_use_count: usize,
  pub idle_count: usize,
  pub wait_count: usize,
  /// Total time waiters spent queued, across completed waits.
  pub wait_duration: Duration,
  pub max_idle_closed: u64,
  pub max_idle_time_closed: u64,
  pub max_lifetime_closed: u64,
}

struct Waiter<F: Factory> {
  id: u64,
  promise: Promise<Pooled<F>>,
  enqueued_at: Instant,
  subscription: Option<(Canceler, SubscriptionId)>,
}

struct SweepTimer {
  deadline: tokio::time::Instant,
  handle: JoinHandle<()>,
}

struct PoolState<F: Factory> {
  options: PoolOptions,
  /// LIFO stack; the oldest idle element sits at index 0.
  idle: Vec<Element<F::Item>>,
  active: HashMap<u64, Element<F::Item>>,
  /// FIFO queue of pending requests.
  wait_queue: VecDeque<Waiter<F>>,
  creating: usize,
  destroying: usize,
  create_failures: u32,
  growing: bool,
  closing: bool,
  closed: bool,
  sweep: Option<SweepTimer>,
  wait_duration: Duration,
  max_idle_closed: u64,
  max_idle_time_closed: u64,
  max_lifetime_closed: u64,
}

pub(crate) struct PoolInner<F: Factory> {
  name: Arc<String>,
  factory: F,
  handle: TokioHandle,
  state: Mutex<PoolState<F>>,
  handlers: ErrorHandlers,
  closed_done: CancellationToken,
}

/// An asynchronous pool of factory-built resources.
///
/// Requests are served oldest-first; idle resources are reused newest-first
/// so older ones age toward expiry. Creation is bounded by `max_open`, idle
/// retention by `max_idle`/`max_idle_time`/`max_lifetime`, and shutdown is
/// serialized through [`Pool::close`].
///
/// `Pool` is a cheap shared handle; clones operate on the same pool.
pub struct Pool<F: Factory> {
  inner: Arc<PoolInner<F>>,
}

impl<F: Factory> Pool<F> {
  /// Builds a pool around `factory`.
  ///
  /// Background work (creation, destruction, sweeps) is spawned on `handle`.
  /// `name` attributes this pool's log records.
  pub fn new(factory: F, options: PoolOptions, handle: TokioHandle, name: &str) -> Self {
    let name = Arc::new(name.to_string());
    let inner = Arc::new(PoolInner {
      name: name.clone(),
      factory,
      handle,
      state: Mutex::new(PoolState {
        options,
        idle: Vec::new(),
        active: HashMap::new(),
        wait_queue: VecDeque::new(),
        creating: 0,
        destroying: 0,
        create_failures: 0,
        growing: false,
        closing: false,
        closed: false,
        sweep: None,
        wait_duration: Duration::ZERO,
        max_idle_closed: 0,
        max_idle_time_closed: 0,
        max_lifetime_closed: 0,
      }),
      handlers: ErrorHandlers::new(name.clone()),
      closed_done: CancellationToken::new(),
    });
    info!(pool = %name, "pool created");
    Pool { inner }
  }

  pub fn name(&self) -> &str {
    &self.inner.name
  }

  /// Requests an item.
  ///
  /// The returned promise resolves with a [`Pooled`] handle, or rejects with
  /// [`PoolError::Closed`], [`PoolError::Closing`], or a tagged cancellation
  /// error from `ctx`. Rejections for a closed/closing pool or an
  /// already-cancelled context are settled before this method returns.
  pub fn get(&self, ctx: Option<&Context>) -> Promise<Pooled<F>> {
    self.inner.get(ctx)
  }

  /// Ends the loan on `handle`.
  ///
  /// A handle from another pool, like any item the pool cannot trace back to
  /// a live loan, is scheduled for destruction rather than pooled.
  pub fn release(&self, handle: Pooled<F>) {
    let (id, item, origin) = handle.dismantle();
    if std::ptr::eq(origin.as_ptr(), Arc::as_ptr(&self.inner)) {
      self.inner.release_parts(id, item);
    } else {
      debug!(pool = %self.inner.name, element = id, "releasing foreign item; destroying");
      let mut state = self.inner.state.lock().unwrap();
      self.inner.spawn_destroy(&mut state, item);
    }
  }

  /// Shuts the pool down and waits for it to quiesce.
  ///
  /// Pending waiters are rejected with [`PoolError::Closing`], idle elements
  /// are destroyed, and the future resolves once in-flight creates, destroys,
  /// and outstanding loans have all settled. Every concurrent and subsequent
  /// `close` call observes the same completion.
  pub async fn close(&self) {
    self.inner.begin_close();
    self.inner.closed_done.cancelled().await;
  }

  /// Like [`Pool::close`], additionally invoking `reclaim` once per lent-out
  /// item so its holder can be nudged to release it.
  ///
  /// `reclaim` only signals: shutdown still completes through the borrowers'
  /// own `release` calls (or handle drops). If a borrower never releases,
  /// this future never resolves. When `close` was already initiated the
  /// callback is ignored.
  pub async fn close_with<C>(&self, reclaim: C)
  where
    C: Fn(&F::Item),
  {
    if self.inner.begin_close() {
      let items: Vec<Arc<F::Item>> = {
        let state = self.inner.state.lock().unwrap();
        state.active.values().map(|el| el.item.clone()).collect()
      };
      debug!(pool = %self.inner.name, in_use = items.len(), "reclaiming lent-out items");
      for item in items {
        if catch_unwind(AssertUnwindSafe(|| reclaim(&item))).is_err() {
          error!(pool = %self.inner.name, "reclaim callback panicked");
        }
      }
    }
    self.inner.closed_done.cancelled().await;
  }

  /// Applies a partial options update.
  ///
  /// Disallowed values fail with [`PoolError::InvalidOption`] before anything
  /// changes. Cap reductions shrink the idle stack from its oldest end;
  /// time-cap changes reschedule or cancel the sweep; an open-cap change
  /// kicks a grow pass when waiters are queued.
  pub fn set_options(&self, update: OptionsUpdate) -> Result<(), PoolError> {
    update.validate()?;
    let inner = &self.inner;
    let mut kick_grow = false;
    {
      let mut state = inner.state.lock().unwrap();
      let mut time_caps_changed = false;
      if let Some(value) = update.max_lifetime {
        if state.options.max_lifetime != value {
          state.options.max_lifetime = value;
          time_caps_changed = true;
        }
      }
      if let Some(value) = update.max_idle_time {
        if state.options.max_idle_time != value {
          state.options.max_idle_time = value;
          time_caps_changed = true;
        }
      }
      if time_caps_changed {
        if state.options.max_lifetime.is_none() && state.options.max_idle_time.is_none() {
          if let Some(timer) = state.sweep.take() {
            timer.handle.abort();
          }
        } else if !state.idle.is_empty() {
          inner.push_sweep(&mut state, Duration::ZERO);
        }
      }
      if let Some(value) = update.max_open {
        state.options.max_open = value;
        kick_grow = !state.wait_queue.is_empty();
        if let Some(cap) = value {
          while state.active.len() + state.idle.len() > cap && !state.idle.is_empty() {
            let element = state.idle.remove(0);
            state.max_idle_closed += 1;
            debug!(pool = %inner.name, element = element.id, "open cap reduced; destroying oldest idle element");
            inner.spawn_destroy(&mut state, element.item);
          }
        }
      }
      if let Some(value) = update.max_idle {
        state.options.max_idle = value;
        if let Some(cap) = value {
          while state.idle.len() > cap {
            let element = state.idle.remove(0);
            state.max_idle_closed += 1;
            debug!(pool = %inner.name, element = element.id, "idle cap reduced; destroying oldest idle element");
            inner.spawn_destroy(&mut state, element.item);
          }
        }
      }
      if let Some(value) = update.parallel_create {
        state.options.parallel_create = value;
      }
    }
    if kick_grow {
      inner.spawn_grow();
    }
    Ok(())
  }

  /// Snapshots the pool's counters and caps.
  pub fn stats(&self) -> PoolStats {
    let state = self.inner.state.lock().unwrap();
    PoolStats {
      max_open: state.options.max_open,
      max_idle: state.options.max_idle,
      max_lifetime: state.options.max_lifetime,
      max_idle_time: state.options.max_idle_time,
      count: state.active.len() + state.idle.len(),
      in_use_count: state.active.len(),
      idle_count: state.idle.len(),
      wait_count: state.wait_queue.len(),
      wait_duration: state.wait_duration,
      max_idle_closed: state.max_idle_closed,
      max_idle_time_closed: state.max_idle_time_closed,
      max_lifetime_closed: state.max_lifetime_closed,
    }
  }

  /// Registers a handler for factory errors (`create`/`destroy`/`reset`).
  pub fn on_error(
    &self,
    handler: impl Fn(FactoryOp, &BoxError) + Send + Sync + 'static,
  ) -> HandlerId {
    self.inner.handlers.add(handler)
  }

  /// Removes a handler registered with [`Pool::on_error`].
  pub fn off_error(&self, id: HandlerId) {
    self.inner.handlers.remove(id);
  }
}

impl<F: Factory> Clone for Pool<F> {
  fn clone(&self) -> Self {
    Pool {
      inner: self.inner.clone(),
    }
  }
}

impl<F: Factory> std::fmt::Debug for Pool<F> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.inner.state.lock().unwrap();
    f.debug_struct("Pool")
      .field("name", &self.inner.name)
      .field("idle", &state.idle.len())
      .field("active", &state.active.len())
      .field("waiting", &state.wait_queue.len())
      .field("closing", &state.closing)
      .field("closed", &state.closed)
      .finish()
  }
}

impl<F: Factory> PoolInner<F> {
  fn get(self: &Arc<Self>, ctx: Option<&Context>) -> Promise<Pooled<F>> {
    let promise = Promise::new();
    let canceler = ctx.and_then(Context::canceler);

    let mut state = self.state.lock().unwrap();
    if state.closed {
      drop(state);
      promise.reject(PoolError::Closed);
      return promise;
    }
    if state.closing {
      drop(state);
      promise.reject(PoolError::Closing);
      return promise;
    }
    if let Some(canceler) = canceler {
      if canceler.is_canceled() {
        drop(state);
        promise.reject(canceler.err().unwrap_or_else(PoolError::canceled));
        return promise;
      }
    }

    if let Some(mut element) = state.idle.pop() {
      element.idled_at = None;
      let handle = Pooled::new(element.item.clone(), element.id, Arc::downgrade(self));
      trace!(pool = %self.name, element = element.id, "serving idle element");
      state.active.insert(element.id, element);
      drop(state);
      let _ = promise.resolve(handle);
      return promise;
    }

    let waiter_id = NEXT_WAITER_ID.fetch_add(1, AtomicOrdering::Relaxed);
    state.wait_queue.push_back(Waiter {
      id: waiter_id,
      promise: promise.clone(),
      enqueued_at: Instant::now(),
      subscription: None,
    });
    debug!(pool = %self.name, waiter = waiter_id, depth = state.wait_queue.len(), "queued waiter");
    drop(state);

    if let Some(canceler) = canceler {
      let weak = Arc::downgrade(self);
      let orphan = promise.clone();
      let subscription = canceler.on_cancel(move |err| match weak.upgrade() {
        Some(inner) => inner.detach_waiter(waiter_id, err),
        None => {
          orphan.reject(err.unwrap_or_else(PoolError::canceled));
        }
      });
      let registered = {
        let mut state = self.state.lock().unwrap();
        match state.wait_queue.iter_mut().find(|w| w.id == waiter_id) {
          Some(waiter) => {
            waiter.subscription = Some((canceler.clone(), subscription));
            true
          }
          None => false,
        }
      };
      if !registered {
        canceler.off(subscription);
      }
    }

    self.spawn_grow();
    promise
  }

  /// Splices a cancelled waiter out of the queue and rejects its promise.
  fn detach_waiter(self: &Arc<Self>, waiter_id: u64, err: Option<PoolError>) {
    let waiter = {
      let mut state = self.state.lock().unwrap();
      match state.wait_queue.iter().position(|w| w.id == waiter_id) {
        Some(position) => {
          let waiter = state.wait_queue.remove(position).expect("position just located");
          state.wait_duration += waiter.enqueued_at.elapsed();
          Some(waiter)
        }
        None => None,
      }
    };
    if let Some(waiter) = waiter {
      debug!(pool = %self.name, waiter = waiter.id, "waiter cancelled; removed from queue");
      waiter.promise.reject(err.unwrap_or_else(PoolError::canceled));
    }
  }

  pub(crate) fn release_parts(self: &Arc<Self>, id: u64, item: Arc<F::Item>) {
    let reset_err: BoxError;
    {
      let mut state = self.state.lock().unwrap();
      let Some(element) = state.active.remove(&id) else {
        debug!(pool = %self.name, element = id, "release of untracked item; destroying");
        self.spawn_destroy(&mut state, item);
        return;
      };
      match catch_unwind(AssertUnwindSafe(|| self.factory.reset(&element.item))) {
        Ok(Ok(())) => {
          self.offer_available(&mut state, element);
          return;
        }
        Ok(Err(err)) => reset_err = err,
        Err(_) => reset_err = "factory reset panicked".into(),
      }
      warn!(pool = %self.name, element = element.id, error = %reset_err, "reset failed; destroying element");
      self.spawn_destroy(&mut state, element.item);
    }
    self.handlers.emit(FactoryOp::Reset, &reset_err);
  }

  /// Routes a just-freed element: destroy it (closing, expired, or over the
  /// open cap), hand it to the oldest waiter, pool it, or drop it as excess.
  fn offer_available(self: &Arc<Self>, state: &mut PoolState<F>, mut element: Element<F::Item>) {
    let now = Instant::now();

    if state.closing {
      self.spawn_destroy(state, element.item);
      return;
    }
    if let Some(reason) = element.expired_by(now, &state.options) {
      match reason {
        ExpiredReason::Lifetime => state.max_lifetime_closed += 1,
        ExpiredReason::IdleTime => state.max_idle_time_closed += 1,
      }
      debug!(pool = %self.name, element = element.id, reason = ?reason, "destroying expired element");
      self.spawn_destroy(state, element.item);
      return;
    }
    if let Some(max_open) = state.options.max_open {
      if state.active.len() + state.idle.len() >= max_open {
        state.max_idle_closed += 1;
        self.spawn_destroy(state, element.item);
        return;
      }
    }

    while let Some(mut waiter) = state.wait_queue.pop_front() {
      state.wait_duration += now.duration_since(waiter.enqueued_at);
      if let Some((canceler, subscription)) = waiter.subscription.take() {
        canceler.off(subscription);
      }
      element.idled_at = None;
      let id = element.id;
      let handle = Pooled::new(element.item.clone(), id, Arc::downgrade(self));
      state.active.insert(id, element);
      match waiter.promise.resolve(handle) {
        Ok(()) => {
          trace!(pool = %self.name, element = id, waiter = waiter.id, "handed element to waiter");
          return;
        }
        Err(handle) => {
          // The waiter settled on its own (lost cancellation race); take the
          // element back and try the next one.
          handle.dismantle();
          element = state.active.remove(&id).expect("element inserted above");
        }
      }
    }

    match state.options.max_idle {
      Some(cap) if state.idle.len() >= cap => {
        state.max_idle_closed += 1;
        self.spawn_destroy(state, element.item);
      }
      _ => {
        element.idled_at = Some(now);
        let ttl = element.ttl(now, &state.options);
        trace!(pool = %self.name, element = element.id, "pooled idle element");
        state.idle.push(element);
        if let Some(ttl) = ttl {
          self.push_sweep(state, ttl);
        }
      }
    }
  }

  /// True when queued waiters need a grow pass and one could make progress.
  fn needs_grow(&self, state: &PoolState<F>) -> bool {
    !state.closing
      && !state.wait_queue.is_empty()
      && state.creating == 0
      && state
        .options
        .max_open
        .map_or(true, |cap| state.active.len() < cap)
  }

  fn spawn_grow(self: &Arc<Self>) {
    let inner = self.clone();
    self.handle.spawn(async move { inner.grow().await });
  }

  /// Tops creation up to demand. Guarded so one pass runs at a time; with
  /// `parallel_create` off, awaits a single create so demand is recomputed
  /// before the next one.
  async fn grow(self: Arc<Self>) {
    {
      let mut state = self.state.lock().unwrap();
      if state.growing {
        return;
      }
      state.growing = true;
    }

    let serialized = {
      let mut state = self.state.lock().unwrap();
      let mut needed = state.wait_queue.len();
      if let Some(max_open) = state.options.max_open {
        needed = needed.min(max_open.saturating_sub(state.active.len()));
      }
      needed = needed.saturating_sub(state.creating);
      if needed == 0 {
        false
      } else if state.options.parallel_create {
        state.creating += needed;
        trace!(pool = %self.name, needed, "starting parallel creates");
        drop(state);
        for _ in 0..needed {
          let inner = self.clone();
          self.handle.spawn(async move { inner.run_create().await });
        }
        false
      } else {
        state.creating += 1;
        true
      }
    };
    if serialized {
      self.clone().run_create().await;
    }

    let rekick = {
      let mut state = self.state.lock().unwrap();
      state.growing = false;
      let rekick = self.needs_grow(&state);
      self.flush_locked(&mut state);
      rekick
    };
    if rekick {
      self.spawn_grow();
    }
  }

  async fn run_create(self: Arc<Self>) {
    let created = match AssertUnwindSafe(self.factory.create()).catch_unwind().await {
      Ok(result) => result,
      Err(_) => Err(BoxError::from("factory create panicked")),
    };

    match created {
      Err(err) => {
        warn!(pool = %self.name, error = %err, "factory create failed");
        self.handlers.emit(FactoryOp::Create, &err);
        let (strike_out, retry) = {
          let mut state = self.state.lock().unwrap();
          state.creating -= 1;
          state.create_failures += 1;
          let strike_out = state.create_failures >= MAX_CONSECUTIVE_CREATE_FAILURES;
          let retry = !strike_out && self.needs_grow(&state);
          self.flush_locked(&mut state);
          (strike_out, retry)
        };
        if strike_out {
          error!(
            pool = %self.name,
            failures = MAX_CONSECUTIVE_CREATE_FAILURES,
            "closing pool after consecutive create failures"
          );
          self.begin_close();
        } else if retry {
          self.spawn_grow();
        }
      }
      Ok(item) => {
        let rekick = {
          let mut state = self.state.lock().unwrap();
          state.create_failures = 0;
          state.creating -= 1;
          if state.closing || state.closed {
            self.spawn_destroy(&mut state, Arc::new(item));
            return;
          }
          let element = Element::new(item);
          trace!(pool = %self.name, element = element.id, "created element");
          self.offer_available(&mut state, element);
          self.needs_grow(&state)
        };
        if rekick {
          self.spawn_grow();
        }
      }
    }
  }

  fn spawn_destroy(self: &Arc<Self>, state: &mut PoolState<F>, item: Arc<F::Item>) {
    state.destroying += 1;
    let inner = self.clone();
    self.handle.spawn(async move { inner.run_destroy(item).await });
  }

  async fn run_destroy(self: Arc<Self>, item: Arc<F::Item>) {
    let destroyed = match AssertUnwindSafe(self.factory.destroy(item)).catch_unwind().await {
      Ok(result) => result,
      Err(_) => Err(BoxError::from("factory destroy panicked")),
    };
    if let Err(err) = &destroyed {
      warn!(pool = %self.name, error = %err, "factory destroy failed; item still counts as destroyed");
    }

    let rekick = {
      let mut state = self.state.lock().unwrap();
      state.destroying -= 1;
      if state.destroying == 0 {
        self.flush_locked(&mut state);
      }
      self.needs_grow(&state)
    };
    if let Err(err) = destroyed {
      self.handlers.emit(FactoryOp::Destroy, &err);
    }
    if rekick {
      self.spawn_grow();
    }
  }

  fn push_sweep(self: &Arc<Self>, state: &mut PoolState<F>, ttl: Duration) {
    let deadline = tokio::time::Instant::now() + ttl;
    if let Some(timer) = &state.sweep {
      if timer.deadline < deadline {
        return;
      }
    }
    if let Some(timer) = state.sweep.take() {
      timer.handle.abort();
    }
    let weak = Arc::downgrade(self);
    let handle = self.handle.spawn(async move {
      tokio::time::sleep_until(deadline).await;
      if let Some(inner) = weak.upgrade() {
        inner.sweep();
      }
    });
    state.sweep = Some(SweepTimer { deadline, handle });
  }

  /// Timer body: reclaims expired idle elements and schedules the next pass
  /// at the nearest surviving TTL.
  fn sweep(self: &Arc<Self>) {
    let mut state = self.state.lock().unwrap();
    if state.closing {
      return;
    }
    // Cleared before the scan so a reschedule from inside it wins.
    state.sweep = None;

    let now = Instant::now();
    let mut next_ttl: Option<Duration> = None;
    let mut index = state.idle.len();
    while index > 0 {
      index -= 1;
      if let Some(reason) = state.idle[index].expired_by(now, &state.options) {
        match reason {
          ExpiredReason::Lifetime => state.max_lifetime_closed += 1,
          ExpiredReason::IdleTime => state.max_idle_time_closed += 1,
        }
        let element = state.idle.remove(index);
        debug!(pool = %self.name, element = element.id, reason = ?reason, "sweep reclaimed idle element");
        self.spawn_destroy(&mut state, element.item);
      } else if let Some(ttl) = state.idle[index].ttl(now, &state.options) {
        next_ttl = Some(match next_ttl {
          Some(best) => best.min(ttl),
          None => ttl,
        });
      }
    }

    if !state.idle.is_empty() {
      if let Some(ttl) = next_ttl {
        self.push_sweep(&mut state, ttl.min(MAX_SWEEP_INTERVAL));
      }
    }
  }

  /// Flips `closing` and drains the queue and idle stack. Returns whether
  /// this call initiated the shutdown.
  fn begin_close(self: &Arc<Self>) -> bool {
    let waiters = {
      let mut state = self.state.lock().unwrap();
      if state.closing {
        return false;
      }
      info!(
        pool = %self.name,
        in_use = state.active.len(),
        idle = state.idle.len(),
        waiting = state.wait_queue.len(),
        "close initiated"
      );
      state.closing = true;
      if let Some(timer) = state.sweep.take() {
        timer.handle.abort();
      }
      let now = Instant::now();
      let waiters: Vec<Waiter<F>> = state.wait_queue.drain(..).collect();
      for waiter in &waiters {
        state.wait_duration += now.duration_since(waiter.enqueued_at);
      }
      let idle: Vec<Element<F::Item>> = state.idle.drain(..).collect();
      for element in idle {
        self.spawn_destroy(&mut state, element.item);
      }
      self.flush_locked(&mut state);
      waiters
    };
    for mut waiter in waiters {
      if let Some((canceler, subscription)) = waiter.subscription.take() {
        canceler.off(subscription);
      }
      waiter.promise.reject(PoolError::Closing);
    }
    true
  }

  /// Completes shutdown once nothing is in flight.
  fn flush_locked(&self, state: &mut PoolState<F>) {
    if state.closing
      && !state.closed
      && state.creating == 0
      && state.destroying == 0
      && state.active.is_empty()
    {
      state.closed = true;
      info!(pool = %self.name, "pool closed");
      self.closed_done.cancel();
    }
  }
}

impl<F: Factory> Drop for PoolInner<F> {
  fn drop(&mut self) {
    let state = self.state.get_mut().unwrap();
    if let Some(timer) = state.sweep.take() {
      timer.handle.abort();
    }
    if !state.closed {
      debug!(pool = %self.name, "pool dropped without close");
    }
  }
}
