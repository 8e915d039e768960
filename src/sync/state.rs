//! The observable sync state: three independent watch signals.

use tokio::sync::watch;

use crate::users::User;

use super::error::SyncError;

/// Publishing half, owned by the orchestrator.
pub(crate) struct SyncSignals {
  loading: watch::Sender<bool>,
  result: watch::Sender<Option<Vec<User>>>,
  error: watch::Sender<Option<SyncError>>,
}

impl SyncSignals {
  pub(crate) fn new() -> Self {
    Self {
      loading: watch::Sender::new(false),
      result: watch::Sender::new(None),
      error: watch::Sender::new(None),
    }
  }

  pub(crate) fn subscribe(&self) -> SyncState {
    SyncState {
      loading: self.loading.subscribe(),
      result: self.result.subscribe(),
      error: self.error.subscribe(),
    }
  }

  // send_replace publishes even when nobody is subscribed yet
  pub(crate) fn set_loading(&self, loading: bool) {
    self.loading.send_replace(loading);
  }

  /// Publish a successful outcome and clear any previous error.
  pub(crate) fn publish_result(&self, users: Vec<User>) {
    self.result.send_replace(Some(users));
    self.error.send_replace(None);
  }

  /// Publish a failure. The previous result is left untouched.
  pub(crate) fn publish_error(&self, error: SyncError) {
    self.error.send_replace(Some(error));
  }
}

/// Subscriber handle onto the sync state.
///
/// Each field is a `watch::Receiver`, so consumers can either poll the
/// latest value with `borrow()` or await `changed()`.
#[derive(Clone)]
pub struct SyncState {
  pub loading: watch::Receiver<bool>,
  pub result: watch::Receiver<Option<Vec<User>>>,
  pub error: watch::Receiver<Option<SyncError>>,
}

impl SyncState {
  pub fn result(&self) -> Option<Vec<User>> {
    self.result.borrow().clone()
  }
}

#[cfg(test)]
impl SyncState {
  pub fn is_loading(&self) -> bool {
    *self.loading.borrow()
  }

  pub fn error(&self) -> Option<SyncError> {
    self.error.borrow().clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_initial_state_is_idle_and_empty() {
    let state = SyncSignals::new().subscribe();
    assert!(!state.is_loading());
    assert_eq!(state.result(), None);
    assert_eq!(state.error(), None);
  }

  #[test]
  fn test_error_keeps_previous_result() {
    let signals = SyncSignals::new();
    let state = signals.subscribe();
    let users = vec![User::new(1, "Ana", "@ana", "https://example.com/1.jpg")];

    signals.publish_result(users.clone());
    signals.publish_error(SyncError::NoCachedData);

    assert_eq!(state.result(), Some(users));
    assert_eq!(state.error(), Some(SyncError::NoCachedData));
  }

  #[test]
  fn test_result_clears_error() {
    let signals = SyncSignals::new();
    let state = signals.subscribe();

    signals.publish_error(SyncError::Unreachable);
    signals.publish_result(Vec::new());

    assert_eq!(state.result(), Some(Vec::new()));
    assert_eq!(state.error(), None);
  }

  #[test]
  fn test_publish_before_subscribe_is_visible() {
    let signals = SyncSignals::new();
    signals.set_loading(true);
    assert!(signals.subscribe().is_loading());
  }
}
