use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use url::Url;

use crate::app::App;
use crate::sync::SyncPolicy;

const SHORTCUTS: &[(&str, &str)] = &[("r", "refresh"), ("/", "filter"), ("q", "quit")];

/// Top bar: app name, endpoint host, active policy and sync activity on the
/// left, key hints on the right.
pub fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
  let separator = Span::styled(" · ", Style::default().fg(Color::DarkGray));

  let mut context = vec![
    Span::styled(" roster", Style::default().fg(Color::Cyan).bold()),
    separator.clone(),
    Span::styled(endpoint_label(app.api_url()), Style::default().fg(Color::White)),
    separator,
    Span::styled(policy_label(app.policy()), Style::default().fg(Color::Yellow)),
  ];
  if app.is_loading() {
    context.push(Span::styled(
      " ⟳ syncing",
      Style::default().fg(Color::Green).italic(),
    ));
  }

  let hints: Vec<Span> = SHORTCUTS
    .iter()
    .flat_map(|(key, action)| {
      [
        Span::styled(format!(" {}", key), Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!(":{} ", action), Style::default().fg(Color::DarkGray)),
      ]
    })
    .collect();

  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Min(1), Constraint::Length(hints_width(&hints))])
    .split(area);

  let style = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(context)).style(style), chunks[0]);
  frame.render_widget(
    Paragraph::new(Line::from(hints))
      .alignment(Alignment::Right)
      .style(style),
    chunks[1],
  );
}

fn policy_label(policy: SyncPolicy) -> &'static str {
  match policy {
    SyncPolicy::ConnectivityGated => "online-first",
    SyncPolicy::CacheFirst => "cache-first",
  }
}

fn hints_width(hints: &[Span]) -> u16 {
  hints.iter().map(|s| s.width() as u16).sum()
}

/// Host (and explicit port) of the users endpoint; the raw string when it
/// does not parse as a URL.
fn endpoint_label(api_url: &str) -> String {
  let Ok(url) = Url::parse(api_url) else {
    return api_url.to_string();
  };

  match (url.host_str(), url.port()) {
    (Some(host), Some(port)) => format!("{}:{}", host, port),
    (Some(host), None) => host.to_string(),
    (None, _) => api_url.to_string(),
  }
}
