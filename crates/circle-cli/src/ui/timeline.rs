//! Timeline screen — "Upcoming this week" above "Happening later".

use circle_core::view::{Timeline, TimelineRow};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  widgets::{Block, Borders, Cell, Row, Table},
};

use crate::app::App;

const WIDTHS: [Constraint; 4] = [
  Constraint::Length(12),
  Constraint::Percentage(25),
  Constraint::Percentage(25),
  Constraint::Min(10),
];

/// Render both timeline tables into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let Some(data) = app.state.dataset() else {
    return;
  };
  let timeline = data.timeline(app.today);

  let halves = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
    .split(area);

  // Scrolling walks through the upcoming rows first, then the later ones.
  let (upcoming_skip, later_skip) = split_scroll(&timeline, app.timeline_scroll);

  f.render_widget(
    table(" Upcoming this week ", &timeline.upcoming[upcoming_skip..]),
    halves[0],
  );
  f.render_widget(
    table(" Happening later ", &timeline.later[later_skip..]),
    halves[1],
  );
}

fn split_scroll(timeline: &Timeline<'_>, scroll: usize) -> (usize, usize) {
  let upcoming = scroll.min(timeline.upcoming.len());
  let later = scroll
    .saturating_sub(timeline.upcoming.len())
    .min(timeline.later.len());
  (upcoming, later)
}

fn table<'a>(title: &'a str, rows: &[TimelineRow<'_>]) -> Table<'a> {
  let header = Row::new(["Date", "Name", "Description", "Notes"]).style(
    Style::default()
      .fg(Color::Gray)
      .add_modifier(Modifier::BOLD),
  );

  let body: Vec<Row> = rows
    .iter()
    .map(|row| {
      let name = Cell::from(row.contact_name().to_string());
      let name = if row.contact.is_some() {
        name
      } else {
        name.style(Style::default().fg(Color::DarkGray))
      };
      Row::new(vec![
        Cell::from(row.event.date.format("%Y-%m-%d").to_string()),
        name,
        Cell::from(row.event.occasion.clone()),
        Cell::from(row.event.description.clone()),
      ])
    })
    .collect();

  let empty = body.is_empty();
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let table = Table::new(body, WIDTHS).header(header).block(block);
  if empty {
    table.footer(Row::new(["Nothing here."]).style(Style::default().fg(Color::DarkGray)))
  } else {
    table
  }
}
