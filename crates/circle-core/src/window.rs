//! Date windows over events, relative to a reference day.
//!
//! Every comparison is between calendar dates. Callers decide what "today"
//! is (normally `Local::now().date_naive()`) and pass it in once, so a single
//! render never mixes two notions of now.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Width of the upcoming window in days.
pub const UPCOMING_DAYS: u64 = 7;

/// A named slice of time relative to `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
  /// Strictly after today and strictly before today + 7 days.
  Upcoming,
  /// On or after today + 7 days.
  Later,
  /// Strictly before today.
  Past,
  /// Today or later.
  Future,
}

impl Window {
  /// Whether `date` falls in this window as seen from `today`.
  pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
    match self {
      Self::Upcoming => date > today && date < horizon(today),
      Self::Later => date >= horizon(today),
      Self::Past => date < today,
      Self::Future => date >= today,
    }
  }

  /// Events in this window, in input order.
  pub fn filter<'a, I>(self, events: I, today: NaiveDate) -> Vec<&'a Event>
  where
    I: IntoIterator<Item = &'a Event>,
  {
    events
      .into_iter()
      .filter(|e| self.contains(e.date, today))
      .collect()
  }
}

/// The first day that is no longer "upcoming".
pub fn horizon(today: NaiveDate) -> NaiveDate {
  today
    .checked_add_days(Days::new(UPCOMING_DAYS))
    .unwrap_or(NaiveDate::MAX)
}
