//! Identity provider — password sign-in against a Firebase-compatible REST
//! auth service.
//!
//! | Call | Endpoint |
//! |------|----------|
//! | sign in  | `POST {identity}/accounts:signInWithPassword?key=<api key>` |
//! | sign up  | `POST {identity}/accounts:signUp?key=<api key>` |
//! | refresh  | `POST {token}/token?key=<api key>` (form-encoded) |
//!
//! ID tokens are JWTs. Their payload is decoded, not verified: the backend
//! verifies them, and the client only needs `auth_time` and `exp` to
//! schedule sign-out.

use std::{future::Future, time::Duration};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub const IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

// ─── User ────────────────────────────────────────────────────────────────────

/// A signed-in user and the credentials the data API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub uid:              String,
  pub email:            Option<String>,
  /// Bearer token for the data API.
  pub id_token:         String,
  pub refresh_token:    String,
  /// When the user last authenticated with a password. Session length is
  /// measured from here, not from the latest token refresh.
  pub auth_time:        DateTime<Utc>,
  pub token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct Claims {
  #[serde(default)]
  auth_time: Option<i64>,
  #[serde(default)]
  iat:       Option<i64>,
  exp:       i64,
  #[serde(default)]
  user_id:   Option<String>,
  #[serde(default)]
  sub:       Option<String>,
  #[serde(default)]
  email:     Option<String>,
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
  DateTime::from_timestamp(secs, 0)
    .ok_or_else(|| AuthError::MalformedToken(format!("timestamp {secs} out of range")))
}

impl User {
  /// Build a user from a raw ID token, reading identity and timing from its
  /// claims.
  pub fn from_tokens(
    id_token: impl Into<String>,
    refresh_token: impl Into<String>,
  ) -> Result<Self, AuthError> {
    let id_token = id_token.into();

    let payload = id_token
      .split('.')
      .nth(1)
      .ok_or_else(|| AuthError::MalformedToken("missing payload segment".into()))?;
    let bytes = URL_SAFE_NO_PAD
      .decode(payload.trim_end_matches('='))
      .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
    let claims: Claims = serde_json::from_slice(&bytes)
      .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

    let uid = claims
      .user_id
      .or(claims.sub)
      .ok_or_else(|| AuthError::MalformedToken("no user id claim".into()))?;
    let auth_secs = claims
      .auth_time
      .or(claims.iat)
      .ok_or_else(|| AuthError::MalformedToken("no auth_time claim".into()))?;

    Ok(Self {
      uid,
      email: claims.email,
      id_token,
      refresh_token: refresh_token.into(),
      auth_time: timestamp(auth_secs)?,
      token_expires_at: timestamp(claims.exp)?,
    })
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Source of signed-in users.
pub trait IdentityProvider: Send + Sync {
  /// Exchange an email and password for a user.
  fn sign_in(
    &self,
    email: &str,
    password: &str,
  ) -> impl Future<Output = Result<User, AuthError>> + Send;

  /// Create an account and sign it in.
  fn sign_up(
    &self,
    email: &str,
    password: &str,
  ) -> impl Future<Output = Result<User, AuthError>> + Send;

  /// Trade the user's refresh token for a fresh ID token.
  fn refresh(&self, user: &User) -> impl Future<Output = Result<User, AuthError>> + Send;
}

// ─── Firebase REST ───────────────────────────────────────────────────────────

/// [`IdentityProvider`] backed by the Firebase Auth REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct FirebaseAuth {
  client:       Client,
  api_key:      String,
  identity_url: String,
  token_url:    String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordBody<'a> {
  email:               &'a str,
  password:            &'a str,
  return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
  id_token:      String,
  refresh_token: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
  id_token:      String,
  refresh_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
  error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
  message: String,
}

impl FirebaseAuth {
  pub fn new(api_key: impl Into<String>) -> Result<Self, AuthError> {
    Self::with_endpoints(api_key, IDENTITY_URL, TOKEN_URL)
  }

  /// Point the provider at non-default endpoints (emulators, tests).
  pub fn with_endpoints(
    api_key: impl Into<String>,
    identity_url: impl Into<String>,
    token_url: impl Into<String>,
  ) -> Result<Self, AuthError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self {
      client,
      api_key: api_key.into(),
      identity_url: identity_url.into().trim_end_matches('/').to_owned(),
      token_url: token_url.into().trim_end_matches('/').to_owned(),
    })
  }

  async fn password_call(
    &self,
    method: &str,
    email: &str,
    password: &str,
  ) -> Result<User, AuthError> {
    tracing::debug!(method, email, "identity request");
    let resp = self
      .client
      .post(format!("{}/accounts:{method}", self.identity_url))
      .query(&[("key", self.api_key.as_str())])
      .json(&PasswordBody {
        email,
        password,
        return_secure_token: true,
      })
      .send()
      .await?;

    let body: PasswordResponse = decode(resp).await?;
    User::from_tokens(body.id_token, body.refresh_token)
  }
}

/// Decode a success body, or turn an error body into [`AuthError::Rejected`].
async fn decode<T: serde::de::DeserializeOwned>(
  resp: reqwest::Response,
) -> Result<T, AuthError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp.json().await?);
  }

  let text = resp.text().await.unwrap_or_default();
  let message = serde_json::from_str::<ErrorEnvelope>(&text)
    .map(|e| e.error.message)
    .unwrap_or(text);
  Err(AuthError::Rejected { status, message })
}

impl IdentityProvider for FirebaseAuth {
  async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
    self.password_call("signInWithPassword", email, password).await
  }

  async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
    self.password_call("signUp", email, password).await
  }

  async fn refresh(&self, user: &User) -> Result<User, AuthError> {
    tracing::debug!(uid = %user.uid, "refreshing id token");
    let resp = self
      .client
      .post(format!("{}/token", self.token_url))
      .query(&[("key", self.api_key.as_str())])
      .form(&[
        ("grant_type", "refresh_token"),
        ("refresh_token", user.refresh_token.as_str()),
      ])
      .send()
      .await?;

    let body: RefreshResponse = decode(resp).await?;
    User::from_tokens(body.id_token, body.refresh_token)
  }
}
