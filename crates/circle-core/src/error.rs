//! Error types for `circle-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unrecognised date: {0:?}")]
  InvalidDate(String),

  #[error("invalid {record} record: {reason}")]
  InvalidRecord {
    record: &'static str,
    reason: String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
