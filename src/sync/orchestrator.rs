//! Offline-first sync: decides network vs cache, persists, publishes state.

use futures::FutureExt;
use serde::Deserialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::UserStore;
use crate::users::User;

use super::error::SyncError;
use super::source::{ConnectivityProbe, FetchFailure, RemoteSource};
use super::state::{SyncSignals, SyncState};

/// Which path a refresh takes to obtain users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
  /// Online: fetch and persist, never fall back to cache on failure.
  /// Offline: serve cache, or report `NoCachedData` when it is empty.
  #[default]
  ConnectivityGated,
  /// Serve cache when non-empty; otherwise fetch regardless of connectivity.
  CacheFirst,
}

/// Orchestrates one decision procedure per refresh.
///
/// Overlapping refreshes are not coalesced: each runs to completion and the
/// last one to finish determines the observed state.
pub struct SyncOrchestrator<S, R, P> {
  store: Arc<S>,
  remote: Arc<R>,
  probe: Arc<P>,
  policy: SyncPolicy,
  signals: Arc<SyncSignals>,
}

impl<S, R, P> SyncOrchestrator<S, R, P>
where
  S: UserStore + 'static,
  R: RemoteSource + 'static,
  P: ConnectivityProbe + 'static,
{
  pub fn new(store: S, remote: R, probe: P, policy: SyncPolicy) -> Self {
    Self {
      store: Arc::new(store),
      remote: Arc::new(remote),
      probe: Arc::new(probe),
      policy,
      signals: Arc::new(SyncSignals::new()),
    }
  }

  pub fn policy(&self) -> SyncPolicy {
    self.policy
  }

  /// Subscribe to the `loading` / `result` / `error` signals.
  pub fn state(&self) -> SyncState {
    self.signals.subscribe()
  }

  /// Start a refresh on the runtime and return immediately.
  ///
  /// The outcome surfaces only through [`SyncState`]; the handle can be
  /// awaited or dropped.
  pub fn refresh(&self) -> JoinHandle<()> {
    let this = self.clone();
    tokio::spawn(async move {
      // Already published on the error signal
      let _ = this.refresh_now().await;
    })
  }

  /// Run one refresh inline, publishing state as it goes.
  ///
  /// Returns the number of users published, or the error that was published.
  /// Never panics: faults inside the adapters become `UnexpectedFault`.
  pub async fn refresh_now(&self) -> Result<usize, SyncError> {
    let loading = LoadingGuard::start(&self.signals);
    info!(policy = ?self.policy, "refresh started");

    let outcome = match AssertUnwindSafe(self.decide()).catch_unwind().await {
      Ok(outcome) => outcome,
      Err(panic) => Err(SyncError::UnexpectedFault(panic_message(panic.as_ref()))),
    };

    let summary = match outcome {
      Ok(users) => {
        let count = users.len();
        self.signals.publish_result(users);
        info!(count, "refresh finished");
        Ok(count)
      }
      Err(e) => {
        warn!(error = %e, "refresh failed");
        self.signals.publish_error(e.clone());
        Err(e)
      }
    };

    drop(loading);
    summary
  }

  async fn decide(&self) -> Result<Vec<User>, SyncError> {
    match self.policy {
      SyncPolicy::ConnectivityGated => {
        if self.probe.is_reachable().await {
          debug!("network reachable, fetching users");
          let users = self
            .remote
            .fetch()
            .await
            .map_err(SyncError::NetworkCallFailed)?;
          self.persist(users).await
        } else {
          debug!("network unreachable, reading cache");
          let cached = self.read_cache().await;
          if cached.is_empty() {
            Err(SyncError::NoCachedData)
          } else {
            Ok(cached)
          }
        }
      }
      SyncPolicy::CacheFirst => {
        let cached = self.read_cache().await;
        if !cached.is_empty() {
          debug!(count = cached.len(), "serving users from cache");
          return Ok(cached);
        }

        debug!("cache empty, fetching users");
        let users = self.remote.fetch().await.map_err(|failure| match failure {
          FetchFailure::Connect(_) => SyncError::Unreachable,
          other => SyncError::NetworkCallFailed(other),
        })?;
        self.persist(users).await
      }
    }
  }

  /// Read the cache off the async worker. A store fault reads as empty.
  async fn read_cache(&self) -> Vec<User> {
    let store = Arc::clone(&self.store);
    match tokio::task::spawn_blocking(move || store.read_all()).await {
      Ok(Ok(users)) => users,
      Ok(Err(e)) => {
        warn!(error = %e, "cache read failed, treating as empty");
        Vec::new()
      }
      Err(e) => {
        warn!(error = %e, "cache read task failed, treating as empty");
        Vec::new()
      }
    }
  }

  /// Write-through: replace the cache with `users`, handing them back on success.
  async fn persist(&self, users: Vec<User>) -> Result<Vec<User>, SyncError> {
    let store = Arc::clone(&self.store);
    tokio::task::spawn_blocking(move || store.write_all(&users).map(|()| users))
      .await
      .map_err(|e| SyncError::UnexpectedFault(format!("cache write task failed: {}", e)))?
      .map_err(|e| SyncError::UnexpectedFault(format!("cache write failed: {}", e)))
  }
}

impl<S, R, P> Clone for SyncOrchestrator<S, R, P> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      remote: Arc::clone(&self.remote),
      probe: Arc::clone(&self.probe),
      policy: self.policy,
      signals: Arc::clone(&self.signals),
    }
  }
}

/// Holds `loading = true` for its lifetime.
struct LoadingGuard<'a> {
  signals: &'a SyncSignals,
}

impl<'a> LoadingGuard<'a> {
  fn start(signals: &'a SyncSignals) -> Self {
    signals.set_loading(true);
    Self { signals }
  }
}

impl Drop for LoadingGuard<'_> {
  fn drop(&mut self) {
    self.signals.set_loading(false);
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "panic in sync task".to_string()
  }
}
