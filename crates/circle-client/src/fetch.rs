//! Async HTTP client for the contacts/events API, and the loader that runs
//! both fetches for a user.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `GET`  | `{base}/contacts` | JSON array of contact objects |
//! | `GET`  | `{base}/events`   | JSON array of event objects |
//!
//! Both requests carry `Authorization: Bearer <id token>`.

use std::{future::Future, time::Duration};

use chrono::NaiveDate;
use circle_core::{
  contact::Contact,
  correlate::{Correlated, correlate},
  event::Event,
  view::Timeline,
};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::{
  error::{FetchError, LoadError},
  identity::User,
  record,
  session::SessionToken,
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Source of a user's contacts and events.
///
/// Implementations do not retry; a failure is returned to the caller as-is.
pub trait DataFetcher: Send + Sync {
  fn fetch_contacts(
    &self,
    user: &User,
  ) -> impl Future<Output = Result<Vec<Contact>, FetchError>> + Send;

  fn fetch_events(
    &self,
    user: &User,
  ) -> impl Future<Output = Result<Vec<Event>, FetchError>> + Send;
}

// ─── HTTP client ─────────────────────────────────────────────────────────────

/// Connection settings for the data API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

impl ApiConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      timeout:  Duration::from_secs(30),
    }
  }
}

/// [`DataFetcher`] over the JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self, FetchError> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// `GET <path>` and return the raw JSON array.
  async fn get_array(
    &self,
    user: &User,
    path: &str,
    what: &'static str,
  ) -> Result<Vec<Value>, FetchError> {
    tracing::debug!(what, uid = %user.uid, "fetching");
    let resp = self
      .client
      .get(self.url(path))
      .bearer_auth(&user.id_token)
      .send()
      .await?;

    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
      return Err(FetchError::Unauthorized { what, status });
    }
    if !status.is_success() {
      return Err(FetchError::Status { what, status });
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode { what, source })
  }
}

impl DataFetcher for ApiClient {
  async fn fetch_contacts(&self, user: &User) -> Result<Vec<Contact>, FetchError> {
    let raw = self.get_array(user, "/contacts", "contacts").await?;
    let validated = record::validate("contacts", &raw, record::contact);
    if validated.rejected > 0 {
      tracing::warn!(rejected = validated.rejected, "some contacts were malformed");
    }
    Ok(validated.records)
  }

  async fn fetch_events(&self, user: &User) -> Result<Vec<Event>, FetchError> {
    let raw = self.get_array(user, "/events", "events").await?;
    let validated = record::validate("events", &raw, record::event);
    if validated.rejected > 0 {
      tracing::warn!(rejected = validated.rejected, "some events were malformed");
    }
    Ok(validated.records)
  }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Both collections for one user, fetched together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
  pub contacts: Vec<Contact>,
  pub events:   Vec<Event>,
}

impl Dataset {
  pub fn correlated(&self) -> Vec<Correlated<'_>> { correlate(&self.contacts, &self.events) }

  pub fn timeline(&self, today: NaiveDate) -> Timeline<'_> {
    Timeline::build(&self.contacts, &self.events, today)
  }
}

/// Where a load stands. Only [`LoadState::Loaded`] exposes data, so nothing
/// can correlate a half-fetched pair of collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
  /// No user, nothing requested.
  #[default]
  Idle,
  Loading,
  Loaded(Dataset),
  Failed(String),
}

impl LoadState {
  pub fn dataset(&self) -> Option<&Dataset> {
    match self {
      Self::Loaded(data) => Some(data),
      _ => None,
    }
  }

  pub fn is_loading(&self) -> bool { matches!(self, Self::Loading) }
}

/// Fetch contacts and events for `user` concurrently.
///
/// Resolves to [`LoadError::Cancelled`] as soon as `token` is cancelled,
/// dropping whichever request is still in flight. A result that completes
/// after cancellation is discarded the same way.
pub async fn load<F: DataFetcher>(
  fetcher: &F,
  user: &User,
  token: &SessionToken,
) -> Result<Dataset, LoadError> {
  let both = async {
    tokio::try_join!(fetcher.fetch_contacts(user), fetcher.fetch_events(user))
  };

  tokio::select! {
    biased;
    () = token.cancelled() => Err(LoadError::Cancelled),
    result = both => {
      let (contacts, events) = result?;
      if token.is_cancelled() {
        return Err(LoadError::Cancelled);
      }
      tracing::info!(contacts = contacts.len(), events = events.len(), "loaded");
      Ok(Dataset { contacts, events })
    }
  }
}
