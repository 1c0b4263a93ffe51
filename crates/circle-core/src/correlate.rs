//! The contact-event join.
//!
//! Events reference contacts by email (`RelevantContact`). Matching is an
//! exact, case-sensitive string comparison; nothing is normalised.

use std::collections::HashMap;

use serde::Serialize;

use crate::{contact::Contact, event::Event};

/// A contact together with every event that references its email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correlated<'a> {
  pub contact: &'a Contact,
  /// Matching events in input order.
  pub events:  Vec<&'a Event>,
}

/// Email → contact lookup over a borrowed contact list.
///
/// When two contacts share an email the first one wins.
#[derive(Debug, Clone)]
pub struct ContactIndex<'a> {
  by_email: HashMap<&'a str, &'a Contact>,
}

impl<'a> ContactIndex<'a> {
  pub fn new(contacts: &'a [Contact]) -> Self {
    let mut by_email = HashMap::with_capacity(contacts.len());
    for contact in contacts {
      by_email.entry(contact.email.as_str()).or_insert(contact);
    }
    Self { by_email }
  }

  pub fn get(&self, email: &str) -> Option<&'a Contact> {
    self.by_email.get(email).copied()
  }

  /// The contact an event concerns, if any.
  pub fn contact_for(&self, event: &Event) -> Option<&'a Contact> {
    self.get(&event.relevant_contact)
  }
}

/// Join `contacts` with `events` by email.
///
/// Returns exactly one entry per contact, in input order. Events that match
/// no contact are dropped; use [`unmatched_events`] to find them.
pub fn correlate<'a>(
  contacts: &'a [Contact],
  events: &'a [Event],
) -> Vec<Correlated<'a>> {
  let mut by_email: HashMap<&str, Vec<&'a Event>> = HashMap::new();
  for event in events {
    by_email
      .entry(event.relevant_contact.as_str())
      .or_default()
      .push(event);
  }

  contacts
    .iter()
    .map(|contact| Correlated {
      contact,
      events: by_email
        .get(contact.email.as_str())
        .cloned()
        .unwrap_or_default(),
    })
    .collect()
}

/// Resolve the contact an event concerns. `None` means the event's
/// `RelevantContact` matches nobody and renders without a name.
pub fn contact_for_event<'a>(
  contacts: &'a [Contact],
  event: &Event,
) -> Option<&'a Contact> {
  ContactIndex::new(contacts).contact_for(event)
}

/// Events whose `RelevantContact` matches no contact's email.
pub fn unmatched_events<'a>(
  contacts: &[Contact],
  events: &'a [Event],
) -> Vec<&'a Event> {
  let index = ContactIndex::new(contacts);
  events
    .iter()
    .filter(|e| index.contact_for(e).is_none())
    .collect()
}
