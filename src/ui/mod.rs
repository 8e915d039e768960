mod renderfns;

use crate::app::{App, Mode};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use renderfns::{draw_header, error_color, error_message, truncate};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // User list
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], app);
  draw_user_list(frame, chunks[1], app);
  draw_status_bar(frame, chunks[2], app);
}

fn draw_user_list(frame: &mut Frame, area: Rect, app: &mut App) {
  let title = if app.is_loading() {
    " Users (loading...) ".to_string()
  } else if app.search_filter().is_empty() {
    format!(" Users ({}) ", app.visible_users().len())
  } else {
    format!(
      " Users ({}) [/{}] ",
      app.visible_users().len(),
      app.search_filter()
    )
  };

  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let users = app.visible_users();
  if users.is_empty() {
    let content = if app.is_loading() {
      "Loading users..."
    } else if app.error().is_some() {
      "Nothing to show. Press 'r' to retry."
    } else if !app.search_filter().is_empty() {
      "No users match the filter."
    } else {
      "No users found."
    };
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = users
    .iter()
    .map(|user| {
      let line = Line::from(vec![
        Span::styled(
          format!("{:<32}", truncate(&user.name, 32)),
          Style::default().fg(Color::White),
        ),
        Span::raw(" "),
        Span::styled(
          truncate(&user.username, 40),
          Style::default().fg(Color::Cyan),
        ),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  frame.render_stateful_widget(list, area, app.list_state_mut());
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match app.mode() {
    Mode::Search => {
      let search = format!("/{}", app.search_filter());
      (search, Style::default().fg(Color::Cyan))
    }
    Mode::Normal => match app.error() {
      Some(error) => (
        format!(" {}", error_message(error)),
        Style::default().fg(error_color(error)),
      ),
      None => {
        let synced = app
          .last_synced()
          .map(|t| format!("synced {}", t.format("%H:%M:%S")))
          .unwrap_or_else(|| "not synced".to_string());
        let hint = format!(" {}   r:refresh  /:filter  j/k:nav  q:quit", synced);
        (hint, Style::default().fg(Color::DarkGray))
      }
    },
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}

/// Keep the selection inside the list bounds
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
  } else {
    match state.selected() {
      Some(i) if i >= len => state.select(Some(len - 1)),
      None => state.select(Some(0)),
      _ => {}
    }
  }
}
