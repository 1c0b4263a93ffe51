//! Error types for `circle-client`.

pub use reqwest::StatusCode;
use thiserror::Error;

/// Failure while fetching contacts or events.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{what}: not authorised ({status})")]
  Unauthorized {
    what:   &'static str,
    status: StatusCode,
  },

  #[error("{what}: unexpected status {status}")]
  Status {
    what:   &'static str,
    status: StatusCode,
  },

  #[error("{what}: malformed response: {source}")]
  Decode {
    what:   &'static str,
    #[source]
    source: serde_json::Error,
  },
}

/// Failure while talking to the identity provider.
#[derive(Debug, Error)]
pub enum AuthError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("identity provider rejected the request ({status}): {message}")]
  Rejected { status: StatusCode, message: String },

  #[error("malformed id token: {0}")]
  MalformedToken(String),
}

/// Failure of a combined contacts + events load.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  /// The session changed while the load was in flight; its result was
  /// discarded.
  #[error("load cancelled by session change")]
  Cancelled,
}
