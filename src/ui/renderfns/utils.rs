use ratatui::prelude::Color;

use crate::sync::SyncError;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// What to tell the user when a refresh fails
pub fn error_message(error: &SyncError) -> String {
  match error {
    SyncError::NetworkCallFailed(_) => "Failed to load data".to_string(),
    SyncError::Unreachable => "Network unreachable".to_string(),
    SyncError::NoCachedData => "No internet and no cached data".to_string(),
    SyncError::UnexpectedFault(cause) => format!("An error occurred: {}", cause),
  }
}

/// Offline errors are expected conditions, the rest are failures
pub fn error_color(error: &SyncError) -> Color {
  match error {
    SyncError::Unreachable | SyncError::NoCachedData => Color::Yellow,
    _ => Color::Red,
  }
}
