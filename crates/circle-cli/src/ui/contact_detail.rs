//! Contact detail pane — right panel.

use circle_core::{event::Event, view::ContactDetail};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::app::{App, Screen};

// ─── Public entry ─────────────────────────────────────────────────────────────

/// Render the detail pane into `area`: future interactions, the contact's
/// fields, then past interactions.
pub fn draw(f: &mut Frame, area: Rect, app: &App, detail: &ContactDetail<'_>) {
  let focused = app.screen == Screen::ContactDetail;
  let block = Block::default()
    .title(format!(" {} ", detail.contact.display_name()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(if focused {
      Color::Gray
    } else {
      Color::DarkGray
    }));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let fields = detail.contact.detail_fields();
  let sections = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Percentage(30),
      Constraint::Length(fields.len() as u16 + 2),
      Constraint::Min(3),
    ])
    .split(inner);

  // Both interaction tables share the scroll offset.
  let skip = if focused { app.detail_scroll } else { 0 };

  f.render_widget(
    interactions(" Future Interactions ", &detail.future, skip),
    sections[0],
  );
  draw_fields(f, sections[1], &fields);
  f.render_widget(
    interactions(" Past Interactions ", &detail.past, skip),
    sections[2],
  );
}

// ─── Sections ─────────────────────────────────────────────────────────────────

fn draw_fields(f: &mut Frame, area: Rect, fields: &[(&'static str, String)]) {
  let block = Block::default()
    .title(" Details ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let lines: Vec<Line> = fields
    .iter()
    .map(|(label, value)| {
      let value = if value.is_empty() {
        Span::styled("—", Style::default().fg(Color::DarkGray))
      } else {
        Span::raw(value.clone())
      };
      Line::from(vec![
        Span::styled(
          format!("{label:<14}"),
          Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        ),
        value,
      ])
    })
    .collect();

  f.render_widget(Paragraph::new(lines).block(block), area);
}

fn interactions<'a>(title: &'a str, events: &[&Event], skip: usize) -> Table<'a> {
  let header = Row::new(["Date", "Description", "Notes"]).style(
    Style::default()
      .fg(Color::Gray)
      .add_modifier(Modifier::BOLD),
  );

  let rows: Vec<Row> = events
    .iter()
    .skip(skip.min(events.len().saturating_sub(1)))
    .map(|e| {
      Row::new(vec![
        Cell::from(e.date.format("%Y-%m-%d").to_string()),
        Cell::from(e.occasion.clone()),
        Cell::from(e.description.clone()),
      ])
    })
    .collect();

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  Table::new(rows, [
    Constraint::Length(12),
    Constraint::Percentage(35),
    Constraint::Min(10),
  ])
  .header(header)
  .block(block)
}
