//! Fakes for exercising the orchestrator without network or disk.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

use crate::cache::UserStore;
use crate::users::User;

use super::source::{ConnectivityProbe, FetchFailure, FetchOutcome, RemoteSource};

pub fn eduardo() -> User {
  User::new(
    1001,
    "Eduardo Santos",
    "@eduardo.santos",
    "https://randomuser.me/api/portraits/men/9.jpg",
  )
}

pub fn marina() -> User {
  User::new(
    1002,
    "Marina Coelho",
    "@marina.coelho",
    "https://randomuser.me/api/portraits/women/2.jpg",
  )
}

/// Returns a preset outcome and counts calls.
pub struct ScriptedSource {
  outcome: Mutex<FetchOutcome>,
  calls: AtomicUsize,
}

impl ScriptedSource {
  pub fn ok(users: Vec<User>) -> Self {
    Self {
      outcome: Mutex::new(Ok(users)),
      calls: AtomicUsize::new(0),
    }
  }

  pub fn failing(failure: FetchFailure) -> Self {
    Self {
      outcome: Mutex::new(Err(failure)),
      calls: AtomicUsize::new(0),
    }
  }

  pub fn set_outcome(&self, outcome: FetchOutcome) {
    *self.outcome.lock().unwrap() = outcome;
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl RemoteSource for ScriptedSource {
  async fn fetch(&self) -> FetchOutcome {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.outcome.lock().unwrap().clone()
  }
}

/// Blocks in `fetch` until `release` is called.
pub struct GatedSource {
  gate: Notify,
  users: Vec<User>,
}

impl GatedSource {
  pub fn new(users: Vec<User>) -> Self {
    Self {
      gate: Notify::new(),
      users,
    }
  }

  pub fn release(&self) {
    self.gate.notify_one();
  }
}

#[async_trait]
impl RemoteSource for GatedSource {
  async fn fetch(&self) -> FetchOutcome {
    self.gate.notified().await;
    Ok(self.users.clone())
  }
}

pub struct PanickingSource;

#[async_trait]
impl RemoteSource for PanickingSource {
  async fn fetch(&self) -> FetchOutcome {
    panic!("remote exploded");
  }
}

/// Store whose every operation fails.
pub struct FailingStore;

impl UserStore for FailingStore {
  fn read_all(&self) -> Result<Vec<User>> {
    Err(eyre!("disk unavailable"))
  }

  fn write_all(&self, _users: &[User]) -> Result<()> {
    Err(eyre!("disk full"))
  }
}

/// Store whose every operation panics inside the blocking task.
pub struct PanickingStore;

impl UserStore for PanickingStore {
  fn read_all(&self) -> Result<Vec<User>> {
    panic!("read exploded");
  }

  fn write_all(&self, _users: &[User]) -> Result<()> {
    panic!("write exploded");
  }
}

pub struct CountingProbe {
  reachable: bool,
  calls: AtomicUsize,
}

impl CountingProbe {
  pub fn new(reachable: bool) -> Self {
    Self {
      reachable,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ConnectivityProbe for CountingProbe {
  async fn is_reachable(&self) -> bool {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.reachable
  }
}
