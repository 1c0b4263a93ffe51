//! TUI rendering — orchestrates all panes.

pub mod contact_detail;
pub mod contact_list;
pub mod timeline;

use circle_client::LoadState;
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, Screen};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  draw_body(f, rows[1], app);
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let tab = |label: &'static str, active: bool| {
    let style = if active {
      Style::default()
        .fg(Color::Black)
        .bg(Color::Gray)
        .add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(Color::White)
    };
    Span::styled(format!(" {label} "), style)
  };

  let left = vec![
    Span::styled(
      " circle ",
      Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    tab("Timeline", app.screen == Screen::Timeline),
    tab("Contacts", app.screen != Screen::Timeline),
  ];
  let right = Span::styled(
    format!("{}  {} ", app.account, app.today.format("%Y-%m-%d")),
    Style::default().fg(Color::Gray),
  );

  // Simple left-right header: pad the middle.
  let left_width: usize = left.iter().map(|s| s.content.chars().count()).sum();
  let right_width = right.content.chars().count();
  let pad = usize::from(area.width)
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let mut spans = left;
  spans.push(Span::raw(" ".repeat(pad)));
  spans.push(right);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_body(f: &mut Frame, area: Rect, app: &App) {
  match &app.state {
    LoadState::Idle => {
      draw_notice(f, area, "Nothing loaded.\n\nPress r to load.", Color::Gray);
      return;
    }
    LoadState::Loading => {
      draw_notice(f, area, "Loading…", Color::Gray);
      return;
    }
    LoadState::Failed(message) => {
      draw_notice(
        f,
        area,
        &format!("Could not load data: {message}\n\nPress r to retry."),
        Color::Red,
      );
      return;
    }
    LoadState::Loaded(_) => {}
  }

  if app.screen == Screen::Timeline {
    timeline::draw(f, area, app);
    return;
  }

  // Split into left list pane (30%) and right detail pane (70%).
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
    .split(area);

  contact_list::draw(f, cols[0], app);
  match app.shown_detail() {
    Some(detail) => contact_detail::draw(f, cols[1], app, &detail),
    None => draw_empty_detail(f, cols[1]),
  }
}

fn draw_notice(f: &mut Frame, area: Rect, text: &str, color: Color) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let top = inner.height.saturating_sub(3) / 2;
  let centred = Rect {
    y: inner.y + top,
    height: inner.height.saturating_sub(top),
    ..inner
  };
  f.render_widget(
    Paragraph::new(text.to_string())
      .alignment(Alignment::Center)
      .style(Style::default().fg(color)),
    centred,
  );
}

fn draw_empty_detail(f: &mut Frame, area: Rect) {
  let block = Block::default()
    .title(" Detail ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(
    Paragraph::new(Line::from(vec![Span::styled(
      "No contacts to show.",
      Style::default().fg(Color::DarkGray),
    )])),
    inner,
  );
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, hints) = match &app.screen {
    Screen::Contacts if app.filter_active => (
      "SEARCH",
      "Type to filter  Esc cancel  Enter select",
    ),
    Screen::Timeline => (
      "TIMELINE",
      "↑↓/jk scroll  Tab contacts  r reload  L sign out  q quit",
    ),
    Screen::Contacts => (
      "CONTACTS",
      "↑↓/jk navigate  / search  Enter detail  Tab timeline  q quit",
    ),
    Screen::ContactDetail => (
      "DETAIL",
      "↑↓/jk scroll  Esc back  [ prev  ] next  q quit",
    ),
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    format!("{}  ·  {hints}", app.status_msg)
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  );

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
