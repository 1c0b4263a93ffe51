//! Boundary validation of raw backend records.
//!
//! The backend serves loosely-shaped JSON objects. Each object is coerced
//! into a typed [`Contact`] or [`Event`] here, once, so nothing downstream
//! has to second-guess field types:
//!
//! - strings are kept; numbers and booleans are stringified;
//! - `null` or a missing field means "absent";
//! - nested objects and arrays in scalar fields reject the record;
//! - a contact needs a non-empty `Email`;
//! - an event needs a parseable `Date` and a non-empty `RelevantContact`.
//!
//! Rejected records are logged and counted, never fatal.

use circle_core::{
  Error, Result,
  contact::Contact,
  event::{Event, parse_date},
};
use serde_json::{Map, Value};

/// The outcome of validating a batch of raw records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated<T> {
  pub records:  Vec<T>,
  /// How many input records were skipped as malformed.
  pub rejected: usize,
}

fn invalid(record: &'static str, reason: impl Into<String>) -> Error {
  Error::InvalidRecord {
    record,
    reason: reason.into(),
  }
}

/// Read a scalar field as text. Empty and whitespace-only strings count as
/// absent.
fn text(
  record: &'static str,
  obj: &Map<String, Value>,
  key: &str,
) -> Result<Option<String>> {
  match obj.get(key) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.clone())),
    Some(Value::Number(n)) => Ok(Some(n.to_string())),
    Some(Value::Bool(b)) => Ok(Some(b.to_string())),
    Some(Value::Array(_) | Value::Object(_)) => {
      Err(invalid(record, format!("`{key}` is not a scalar")))
    }
  }
}

fn object<'a>(record: &'static str, raw: &'a Value) -> Result<&'a Map<String, Value>> {
  raw
    .as_object()
    .ok_or_else(|| invalid(record, "not a JSON object"))
}

/// Coerce one raw contact.
pub fn contact(raw: &Value) -> Result<Contact> {
  const KIND: &str = "contact";
  let obj = object(KIND, raw)?;

  let email = text(KIND, obj, "Email")?.ok_or_else(|| invalid(KIND, "missing `Email`"))?;

  let birthday = match text(KIND, obj, "Birthday")? {
    None => None,
    Some(raw_date) => match parse_date(&raw_date) {
      Ok(date) => Some(date),
      Err(e) => {
        tracing::warn!(%email, error = %e, "dropping unparseable birthday");
        None
      }
    },
  };

  Ok(Contact {
    name: text(KIND, obj, "Name")?,
    birthday,
    phone_number: text(KIND, obj, "Phone_Number")?,
    location: text(KIND, obj, "Location")?,
    education: text(KIND, obj, "Education")?,
    industry: text(KIND, obj, "Industry")?,
    company: text(KIND, obj, "Company")?,
    position: text(KIND, obj, "Position")?,
    image_url: text(KIND, obj, "imageUrl")?,
    email,
  })
}

/// Coerce one raw event.
pub fn event(raw: &Value) -> Result<Event> {
  const KIND: &str = "event";
  let obj = object(KIND, raw)?;

  let date = text(KIND, obj, "Date")?.ok_or_else(|| invalid(KIND, "missing `Date`"))?;
  let date = parse_date(&date)?;
  let relevant_contact = text(KIND, obj, "RelevantContact")?
    .ok_or_else(|| invalid(KIND, "missing `RelevantContact`"))?;

  Ok(Event {
    date,
    occasion: text(KIND, obj, "Occasion")?.unwrap_or_default(),
    description: text(KIND, obj, "Description")?.unwrap_or_default(),
    relevant_contact,
  })
}

/// Validate a batch, skipping and counting the records `coerce` rejects.
pub fn validate<T>(
  what: &'static str,
  raw: &[Value],
  coerce: impl Fn(&Value) -> Result<T>,
) -> Validated<T> {
  let mut records = Vec::with_capacity(raw.len());
  let mut rejected = 0;
  for (i, value) in raw.iter().enumerate() {
    match coerce(value) {
      Ok(record) => records.push(record),
      Err(e) => {
        rejected += 1;
        tracing::warn!(what, index = i, error = %e, "skipping malformed record");
      }
    }
  }
  Validated { records, rejected }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use serde_json::json;

  use super::*;

  #[test]
  fn full_contact() {
    let c = contact(&json!({
      "Email": "a@x.com",
      "Name": "Alice",
      "Birthday": "1990-02-03",
      "Phone_Number": 412555123,
      "Location": "Melbourne",
      "Education": "",
      "Industry": null,
      "Company": "Acme",
      "Position": "Engineer",
      "imageUrl": "https://img/a.png"
    }))
    .unwrap();

    assert_eq!(c.email, "a@x.com");
    assert_eq!(c.name.as_deref(), Some("Alice"));
    assert_eq!(c.birthday, NaiveDate::from_ymd_opt(1990, 2, 3));
    assert_eq!(c.phone_number.as_deref(), Some("412555123"));
    assert_eq!(c.education, None);
    assert_eq!(c.industry, None);
    assert_eq!(c.image_url.as_deref(), Some("https://img/a.png"));
  }

  #[test]
  fn contact_without_email_is_rejected() {
    assert!(contact(&json!({ "Name": "Nobody" })).is_err());
    assert!(contact(&json!({ "Email": "  " })).is_err());
    assert!(contact(&json!("a@x.com")).is_err());
  }

  #[test]
  fn nested_values_are_rejected() {
    let err = contact(&json!({ "Email": "a@x.com", "Name": { "first": "A" } }))
      .unwrap_err();
    assert!(err.to_string().contains("`Name`"), "{err}");
  }

  #[test]
  fn bad_birthday_is_dropped_not_fatal() {
    let c = contact(&json!({ "Email": "a@x.com", "Birthday": "sometime" })).unwrap();
    assert_eq!(c.birthday, None);
  }

  #[test]
  fn event_coercion() {
    let e = event(&json!({
      "Date": "2024-01-10T12:00:00Z",
      "Occasion": "Lunch",
      "RelevantContact": "a@x.com"
    }))
    .unwrap();
    assert_eq!(e.date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    assert_eq!(e.occasion, "Lunch");
    assert_eq!(e.description, "");
    assert_eq!(e.relevant_contact, "a@x.com");
  }

  #[test]
  fn event_needs_date_and_contact() {
    assert!(event(&json!({ "RelevantContact": "a@x.com" })).is_err());
    assert!(event(&json!({ "Date": "soon", "RelevantContact": "a@x.com" })).is_err());
    assert!(event(&json!({ "Date": "2024-01-10" })).is_err());
  }

  #[test]
  fn validate_counts_rejections() {
    let raw = vec![
      json!({ "Email": "a@x.com" }),
      json!(42),
      json!({ "Email": "b@x.com" }),
      json!({}),
    ];
    let out = validate("contacts", &raw, contact);
    assert_eq!(out.rejected, 2);
    let emails: Vec<_> = out.records.iter().map(|c| c.email.as_str()).collect();
    assert_eq!(emails, ["a@x.com", "b@x.com"]);
  }
}
