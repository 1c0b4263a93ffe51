//! Event — a dated interaction concerning one contact.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A calendar-like event as served by the backend, after boundary
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  #[serde(rename = "Date")]
  pub date:             NaiveDate,
  #[serde(rename = "Occasion", default)]
  pub occasion:         String,
  #[serde(rename = "Description", default)]
  pub description:      String,
  /// Email of the contact this event concerns. Not checked against the
  /// contact list; see [`crate::correlate::unmatched_events`].
  #[serde(rename = "RelevantContact")]
  pub relevant_contact: String,
}

impl Event {
  pub fn new(
    date: NaiveDate,
    relevant_contact: impl Into<String>,
    occasion: impl Into<String>,
  ) -> Self {
    Self {
      date,
      occasion: occasion.into(),
      description: String::new(),
      relevant_contact: relevant_contact.into(),
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }
}

/// Parse a backend date string into a calendar date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (the date is taken in the
/// timestamp's own offset), and offset-less `YYYY-MM-DDTHH:MM[:SS]`.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
  let s = raw.trim();

  if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    return Ok(date);
  }
  if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
    return Ok(ts.date_naive());
  }
  for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
      return Ok(ts.date());
    }
  }

  Err(Error::InvalidDate(raw.to_owned()))
}
