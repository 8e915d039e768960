use crate::cache::UserStore;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::sync::{ConnectivityProbe, SyncError, SyncOrchestrator, SyncPolicy, SyncState};
use crate::ui;
use crate::users::{User, UserApiClient};
use chrono::{DateTime, Local};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use std::io::stdout;
use std::time::Duration;
use tracing::warn;

/// The orchestrator as wired by `main`: store and probe are chosen at runtime.
pub type UserSync =
  SyncOrchestrator<Box<dyn UserStore>, UserApiClient, Box<dyn ConnectivityProbe>>;

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Search,
}

/// Main application state
pub struct App {
  sync: UserSync,

  /// Subscription to the sync signals
  state: SyncState,

  /// Last published user list; kept across errors
  users: Vec<User>,
  loading: bool,
  error: Option<SyncError>,
  last_synced: Option<DateTime<Local>>,

  list_state: ListState,

  /// Current input mode
  mode: Mode,

  /// Search filter input (after pressing /)
  search_filter: String,

  api_url: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, sync: UserSync) -> Self {
    let state = sync.state();
    Self {
      sync,
      state,
      users: Vec::new(),
      loading: false,
      error: None,
      last_synced: None,
      list_state: ListState::default(),
      mode: Mode::Normal,
      search_filter: String::new(),
      api_url: config.api.url.clone(),
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Restored on drop, including when the loop bails out with `?`
    let _terminal_guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250), self.sync.state());

    // Initial data load
    self.sync.refresh();

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {} // UI refresh happens automatically
      Event::Sync => self.apply_sync_state(),
    }
  }

  /// Pull the latest published values into the view state.
  fn apply_sync_state(&mut self) {
    self.loading = *self.state.loading.borrow_and_update();

    if self.state.result.has_changed().unwrap_or(false) {
      if let Some(users) = self.state.result.borrow_and_update().clone() {
        self.users = users;
        self.last_synced = Some(Local::now());
      }
    }

    self.error = self.state.error.borrow_and_update().clone();
    let len = self.visible_users().len();
    ui::ensure_valid_selection(&mut self.list_state, len);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Search => self.handle_search_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
      KeyCode::Esc => self.set_filter(String::new()),

      // Fire and forget, the outcome arrives as Event::Sync
      KeyCode::Char('r') => {
        self.sync.refresh();
      }

      KeyCode::Char('/') => {
        self.mode = Mode::Search;
        self.set_filter(String::new());
      }

      _ => {}
    }
  }

  fn handle_search_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.set_filter(String::new());
      }
      KeyCode::Enter => {
        self.mode = Mode::Normal;
      }
      KeyCode::Backspace => {
        let mut filter = self.search_filter.clone();
        filter.pop();
        self.set_filter(filter);
      }
      KeyCode::Char(c) => {
        let mut filter = self.search_filter.clone();
        filter.push(c);
        self.set_filter(filter);
      }
      _ => {}
    }
  }

  fn set_filter(&mut self, filter: String) {
    self.search_filter = filter;
    self.list_state.select(None);
    let len = self.visible_users().len();
    ui::ensure_valid_selection(&mut self.list_state, len);
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.visible_users().len();
    if len == 0 {
      return;
    }

    let current = self.list_state.selected().unwrap_or(0) as i32;
    let next = (current + delta).clamp(0, len as i32 - 1);
    self.list_state.select(Some(next as usize));
  }

  /// Users matching the current filter, in published order
  pub fn visible_users(&self) -> Vec<&User> {
    self
      .users
      .iter()
      .filter(|u| u.matches(&self.search_filter))
      .collect()
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn error(&self) -> Option<&SyncError> {
    self.error.as_ref()
  }

  pub fn last_synced(&self) -> Option<DateTime<Local>> {
    self.last_synced
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn search_filter(&self) -> &str {
    &self.search_filter
  }

  pub fn api_url(&self) -> &str {
    &self.api_url
  }

  pub fn policy(&self) -> SyncPolicy {
    self.sync.policy()
  }

  pub fn list_state_mut(&mut self) -> &mut ListState {
    &mut self.list_state
  }
}

#[cfg(test)]
impl App {
  pub fn selected_user(&self) -> Option<&User> {
    self
      .list_state
      .selected()
      .and_then(|i| self.visible_users().get(i).copied())
  }
}

/// Runs its restore action exactly once, when dropped.
struct TerminalGuard<F: FnOnce()> {
  restore: Option<F>,
}

impl<F: FnOnce()> TerminalGuard<F> {
  fn new(restore: F) -> Self {
    Self {
      restore: Some(restore),
    }
  }
}

impl TerminalGuard<fn()> {
  /// Switch to raw mode and the alternate screen.
  fn enter() -> Result<Self> {
    enable_raw_mode()?;
    let guard = Self::new(restore_terminal as fn());
    stdout().execute(EnterAlternateScreen)?;
    Ok(guard)
  }
}

impl<F: FnOnce()> Drop for TerminalGuard<F> {
  fn drop(&mut self) {
    if let Some(restore) = self.restore.take() {
      restore();
    }
  }
}

fn restore_terminal() {
  if let Err(e) = disable_raw_mode() {
    warn!(error = %e, "failed to disable raw mode");
  }
  if let Err(e) = stdout().execute(LeaveAlternateScreen) {
    warn!(error = %e, "failed to leave alternate screen");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use crate::sync::StaticProbe;
  use color_eyre::eyre::eyre;
  use reqwest::Url;
  use std::cell::Cell;

  fn users() -> Vec<User> {
    vec![
      User::new(1, "Eduardo Santos", "@eduardo.santos", "https://example.com/1.jpg"),
      User::new(2, "Marina Coelho", "@marina.coelho", "https://example.com/2.jpg"),
      User::new(3, "Carlos Lima", "@carlos", "https://example.com/3.jpg"),
    ]
  }

  /// Offline app over an in-memory cache, so refreshes never touch the network.
  fn offline_app(cached: Vec<User>) -> App {
    let remote = UserApiClient::with_endpoint(
      Url::parse("http://127.0.0.1:9/users").unwrap(),
      Duration::from_secs(1),
    )
    .unwrap();
    let sync = UserSync::new(
      Box::new(MemoryStorage::with_users(cached)),
      remote,
      Box::new(StaticProbe(false)),
      SyncPolicy::ConnectivityGated,
    );
    App::new(&Config::default(), sync)
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[tokio::test]
  async fn test_sync_state_applied() {
    let mut app = offline_app(users());
    app.sync.refresh_now().await.unwrap();
    app.apply_sync_state();

    assert!(!app.is_loading());
    assert!(app.error().is_none());
    assert_eq!(app.visible_users().len(), 3);
    assert!(app.last_synced().is_some());
    assert_eq!(app.selected_user().map(|u| u.id), Some(1));
  }

  #[tokio::test]
  async fn test_error_shown_and_list_empty() {
    let mut app = offline_app(Vec::new());
    app.sync.refresh_now().await.unwrap_err();
    app.apply_sync_state();

    assert_eq!(app.error(), Some(&SyncError::NoCachedData));
    assert!(app.visible_users().is_empty());
    assert!(app.last_synced().is_none());
  }

  #[tokio::test]
  async fn test_navigation_is_clamped() {
    let mut app = offline_app(users());
    app.sync.refresh_now().await.unwrap();
    app.apply_sync_state();

    app.handle_key(key(KeyCode::Char('k')));
    assert_eq!(app.selected_user().map(|u| u.id), Some(1));

    for _ in 0..5 {
      app.handle_key(key(KeyCode::Char('j')));
    }
    assert_eq!(app.selected_user().map(|u| u.id), Some(3));
  }

  #[tokio::test]
  async fn test_search_filters_users() {
    let mut app = offline_app(users());
    app.sync.refresh_now().await.unwrap();
    app.apply_sync_state();

    app.handle_key(key(KeyCode::Char('/')));
    assert_eq!(app.mode(), &Mode::Search);
    for c in "marina".chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));

    assert_eq!(app.mode(), &Mode::Normal);
    assert_eq!(app.visible_users().len(), 1);
    assert_eq!(app.selected_user().map(|u| u.id), Some(2));

    app.handle_key(key(KeyCode::Esc));
    assert_eq!(app.visible_users().len(), 3);
  }

  #[tokio::test]
  async fn test_quit_keys() {
    let mut app = offline_app(Vec::new());
    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);

    let mut app = offline_app(Vec::new());
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }

  #[test]
  fn test_terminal_guard_restores_on_early_return() {
    let restored = Cell::new(0);

    let draw_loop = || -> Result<()> {
      let _guard = TerminalGuard::new(|| restored.set(restored.get() + 1));
      let frame: Result<()> = Err(eyre!("draw failed"));
      frame?;
      unreachable!("the failing frame returns early");
    };

    assert!(draw_loop().is_err());
    assert_eq!(restored.get(), 1);
  }

  #[test]
  fn test_terminal_guard_restores_once() {
    let restored = Cell::new(0);
    {
      let _guard = TerminalGuard::new(|| restored.set(restored.get() + 1));
    }
    assert_eq!(restored.get(), 1);
  }
}
