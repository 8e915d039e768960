use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::sync::SyncState;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh
  Tick,
  /// One of the sync signals changed
  Sync,
}

/// Event handler that merges terminal input, a tick timer and sync state changes
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new(tick_rate: Duration, state: SyncState) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm polling blocks, keep it off the async workers
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
      let event = if event::poll(tick_rate).unwrap_or(false) {
        match event::read() {
          Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
          Ok(CrosstermEvent::Resize(_, _)) => Event::Tick,
          _ => continue,
        }
      } else {
        Event::Tick
      };
      if input_tx.send(event).is_err() {
        break;
      }
    });

    tokio::spawn(forward_sync_changes(state, tx));

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

async fn forward_sync_changes(mut state: SyncState, tx: mpsc::UnboundedSender<Event>) {
  loop {
    let changed = tokio::select! {
      r = state.loading.changed() => r,
      r = state.result.changed() => r,
      r = state.error.changed() => r,
    };
    // Orchestrator dropped
    if changed.is_err() {
      break;
    }
    if tx.send(Event::Sync).is_err() {
      break;
    }
  }
}
