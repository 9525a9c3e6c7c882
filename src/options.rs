use std::time::Duration;

use crate::error::PoolError;

/// Live pool configuration.
///
/// `None` means "unlimited" for every cap. Defaults leave all caps off and
/// create resources in parallel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolOptions {
  /// Destroy an element once its age exceeds this. `Some(ZERO)` is invalid.
  pub max_lifetime: Option<Duration>,
  /// Destroy a pooled element once it has idled this long. `Some(ZERO)` is
  /// invalid.
  pub max_idle_time: Option<Duration>,
  /// Ceiling on lent-out plus pooled elements. `Some(0)` is invalid.
  pub max_open: Option<usize>,
  /// Ceiling on pooled elements. `Some(0)` disables idle pooling entirely.
  pub max_idle: Option<usize>,
  /// When `false`, at most one factory `create` runs at a time.
  pub parallel_create: bool,
}

impl Default for PoolOptions {
  fn default() -> Self {
    PoolOptions {
      max_lifetime: None,
      max_idle_time: None,
      max_open: None,
      max_idle: None,
      parallel_create: true,
    }
  }
}

/// A partial update for [`Pool::set_options`](crate::Pool::set_options).
///
/// Only the fields set through the builder methods are touched; everything
/// else keeps its current value.
///
/// ```
/// use pool_warden::OptionsUpdate;
/// use std::time::Duration;
///
/// let update = OptionsUpdate::new()
///   .max_open(Some(8))
///   .max_idle_time(Some(Duration::from_secs(30)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct OptionsUpdate {
  pub(crate) max_lifetime: Option<Option<Duration>>,
  pub(crate) max_idle_time: Option<Option<Duration>>,
  pub(crate) max_open: Option<Option<usize>>,
  pub(crate) max_idle: Option<Option<usize>>,
  pub(crate) parallel_create: Option<bool>,
}

impl OptionsUpdate {
  pub fn new() -> Self {
    OptionsUpdate::default()
  }

  pub fn max_lifetime(mut self, value: Option<Duration>) -> Self {
    self.max_lifetime = Some(value);
    self
  }

  pub fn max_idle_time(mut self, value: Option<Duration>) -> Self {
    self.max_idle_time = Some(value);
    self
  }

  pub fn max_open(mut self, value: Option<usize>) -> Self {
    self.max_open = Some(value);
    self
  }

  pub fn max_idle(mut self, value: Option<usize>) -> Self {
    self.max_idle = Some(value);
    self
  }

  pub fn parallel_create(mut self, value: bool) -> Self {
    self.parallel_create = Some(value);
    self
  }

  /// Rejects disallowed values before anything is applied.
  pub(crate) fn validate(&self) -> Result<(), PoolError> {
    if self.max_lifetime == Some(Some(Duration::ZERO)) {
      return Err(PoolError::InvalidOption(
        "max_lifetime must not be zero; use None for unlimited".into(),
      ));
    }
    if self.max_idle_time == Some(Some(Duration::ZERO)) {
      return Err(PoolError::InvalidOption(
        "max_idle_time must not be zero; use None for unlimited".into(),
      ));
    }
    if self.max_open == Some(Some(0)) {
      return Err(PoolError::InvalidOption(
        "max_open must not be zero; use None for unlimited".into(),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_unlimited_and_parallel() {
    let options = PoolOptions::default();
    assert_eq!(options.max_lifetime, None);
    assert_eq!(options.max_idle_time, None);
    assert_eq!(options.max_open, None);
    assert_eq!(options.max_idle, None);
    assert!(options.parallel_create);
  }

  #[test]
  fn zero_caps_are_rejected() {
    for update in [
      OptionsUpdate::new().max_lifetime(Some(Duration::ZERO)),
      OptionsUpdate::new().max_idle_time(Some(Duration::ZERO)),
      OptionsUpdate::new().max_open(Some(0)),
    ] {
      assert!(matches!(
        update.validate(),
        Err(PoolError::InvalidOption(_))
      ));
    }
  }

  #[test]
  fn zero_max_idle_is_allowed() {
    assert!(OptionsUpdate::new().max_idle(Some(0)).validate().is_ok());
  }

  #[test]
  fn untouched_fields_stay_absent() {
    let update = OptionsUpdate::new().max_open(Some(4));
    assert_eq!(update.max_open, Some(Some(4)));
    assert_eq!(update.max_lifetime, None);
    assert_eq!(update.parallel_create, None);
    assert!(update.validate().is_ok());
  }
}
