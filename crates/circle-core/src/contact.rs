//! Contact — one person in the user's address book.
//!
//! The email address is the contact's key: events reference contacts by it,
//! and nothing else identifies a contact across the two collections.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A contact as served by the backend, after boundary validation.
///
/// Field names on the wire follow the backend's spelling (`Email`,
/// `Phone_Number`, `imageUrl`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  #[serde(rename = "Email")]
  pub email:        String,
  #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
  pub name:         Option<String>,
  #[serde(rename = "Birthday", default, skip_serializing_if = "Option::is_none")]
  pub birthday:     Option<NaiveDate>,
  #[serde(
    rename = "Phone_Number",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub phone_number: Option<String>,
  #[serde(rename = "Location", default, skip_serializing_if = "Option::is_none")]
  pub location:     Option<String>,
  #[serde(rename = "Education", default, skip_serializing_if = "Option::is_none")]
  pub education:    Option<String>,
  #[serde(rename = "Industry", default, skip_serializing_if = "Option::is_none")]
  pub industry:     Option<String>,
  #[serde(rename = "Company", default, skip_serializing_if = "Option::is_none")]
  pub company:      Option<String>,
  #[serde(rename = "Position", default, skip_serializing_if = "Option::is_none")]
  pub position:     Option<String>,
  #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
  pub image_url:    Option<String>,
}

impl Contact {
  /// A contact with only its key set.
  pub fn new(email: impl Into<String>) -> Self {
    Self {
      email:        email.into(),
      name:         None,
      birthday:     None,
      phone_number: None,
      location:     None,
      education:    None,
      industry:     None,
      company:      None,
      position:     None,
      image_url:    None,
    }
  }

  /// Builder-style setter for the display name.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// The name to show for this contact, falling back to the email address.
  pub fn display_name(&self) -> &str {
    self
      .name
      .as_deref()
      .filter(|n| !n.trim().is_empty())
      .unwrap_or(&self.email)
  }

  /// `(label, value)` pairs for the detail view, in display order.
  ///
  /// Absent fields are included with an empty value so the layout stays
  /// stable between contacts.
  pub fn detail_fields(&self) -> [(&'static str, String); 10] {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    [
      ("Name", text(&self.name)),
      ("Email", self.email.clone()),
      (
        "Birthday",
        self
          .birthday
          .map(|d| d.format("%Y-%m-%d").to_string())
          .unwrap_or_default(),
      ),
      ("Phone Number", text(&self.phone_number)),
      ("Location", text(&self.location)),
      ("Education", text(&self.education)),
      ("Industry", text(&self.industry)),
      ("Company", text(&self.company)),
      ("Position", text(&self.position)),
      ("Image", text(&self.image_url)),
    ]
  }
}
