//! Read models consumed by the presentation layer — never stored, always
//! derived from the two source collections and a reference day.

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
  contact::Contact,
  correlate::{ContactIndex, Correlated},
  event::Event,
  window::Window,
};

// ─── Timeline ────────────────────────────────────────────────────────────────

/// One row of a timeline table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineRow<'a> {
  pub event:   &'a Event,
  /// `None` when the event references an email no contact has.
  pub contact: Option<&'a Contact>,
}

impl TimelineRow<'_> {
  /// The name cell: empty for unmatched events.
  pub fn contact_name(&self) -> &str {
    self.contact.map(Contact::display_name).unwrap_or_default()
  }
}

/// The "this week" and "later" tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline<'a> {
  pub today:    NaiveDate,
  pub upcoming: Vec<TimelineRow<'a>>,
  pub later:    Vec<TimelineRow<'a>>,
}

impl<'a> Timeline<'a> {
  /// Build both tables, each sorted by date. Events on the same date keep
  /// their input order. Past events appear in neither table.
  pub fn build(
    contacts: &'a [Contact],
    events: &'a [Event],
    today: NaiveDate,
  ) -> Self {
    let index = ContactIndex::new(contacts);
    let rows = |window: Window| {
      let mut rows: Vec<_> = window
        .filter(events, today)
        .into_iter()
        .map(|event| TimelineRow {
          event,
          contact: index.contact_for(event),
        })
        .collect();
      rows.sort_by_key(|r| r.event.date);
      rows
    };

    Self {
      today,
      upcoming: rows(Window::Upcoming),
      later: rows(Window::Later),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.upcoming.is_empty() && self.later.is_empty()
  }
}

// ─── Contact detail ──────────────────────────────────────────────────────────

/// A single contact with its interactions split around `today`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactDetail<'a> {
  pub contact: &'a Contact,
  /// Today and later, soonest first.
  pub future:  Vec<&'a Event>,
  /// Before today, most recent first.
  pub past:    Vec<&'a Event>,
}

impl<'a> ContactDetail<'a> {
  pub fn build(correlated: &Correlated<'a>, today: NaiveDate) -> Self {
    let events = || correlated.events.iter().copied();

    let mut future = Window::Future.filter(events(), today);
    future.sort_by_key(|e| e.date);

    let mut past = Window::Past.filter(events(), today);
    past.sort_by_key(|e| std::cmp::Reverse(e.date));

    Self {
      contact: correlated.contact,
      future,
      past,
    }
  }
}
