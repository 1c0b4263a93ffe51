//! Client tests against an in-process axum server, plus session lifecycle
//! tests on tokio's paused clock.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  extract::{Form, Query},
  http::{HeaderMap, StatusCode, Uri, header},
  response::{IntoResponse, Response},
  routing::get,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use circle_core::{contact::Contact, event::Event};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::Notify};

use crate::{
  ApiClient, ApiConfig, AuthError, DataFetcher, FetchError, FirebaseAuth,
  IdentityProvider, LoadError, Session, User, load,
  session::session_expiry,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn serve(router: Router) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, router).await.unwrap();
  });
  format!("http://{addr}")
}

fn jwt(claims: Value) -> String {
  let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
  let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
  format!("{header}.{payload}.sig")
}

fn user_at(uid: &str, auth_time: DateTime<Utc>) -> User {
  User {
    uid:              uid.into(),
    email:            Some(format!("{uid}@x.com")),
    id_token:         format!("token-{uid}"),
    refresh_token:    format!("refresh-{uid}"),
    auth_time,
    token_expires_at: auth_time + TimeDelta::hours(1),
  }
}

fn user(uid: &str) -> User { user_at(uid, Utc::now()) }

fn authorised(headers: &HeaderMap) -> bool {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    == Some("Bearer token-alice")
}

fn data_api() -> Router {
  Router::new()
    .route(
      "/api/contacts",
      get(|headers: HeaderMap| async move {
        if !authorised(&headers) {
          return StatusCode::UNAUTHORIZED.into_response();
        }
        Json(json!([
          { "Email": "a@x.com", "Name": "A", "Phone_Number": 123 },
          { "Name": "no email" },
          { "Email": "b@x.com", "Name": "B" }
        ]))
        .into_response()
      }),
    )
    .route(
      "/api/events",
      get(|headers: HeaderMap| async move {
        if !authorised(&headers) {
          return StatusCode::UNAUTHORIZED.into_response();
        }
        Json(json!([
          { "Date": "2024-01-10", "Occasion": "Lunch", "RelevantContact": "a@x.com" },
          { "Date": "whenever", "Occasion": "Bad", "RelevantContact": "a@x.com" },
          { "Date": "2024-01-12", "Occasion": "Call", "RelevantContact": "ghost@x.com" }
        ]))
        .into_response()
      }),
    )
}

async fn api_client(router: Router) -> ApiClient {
  let base = serve(router).await;
  ApiClient::new(ApiConfig::new(format!("{base}/api/"))).unwrap()
}

// ─── Fetcher ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetches_and_validates_contacts() {
  let client = api_client(data_api()).await;
  let contacts = client.fetch_contacts(&user("alice")).await.unwrap();

  let emails: Vec<_> = contacts.iter().map(|c| c.email.as_str()).collect();
  assert_eq!(emails, ["a@x.com", "b@x.com"]);
  assert_eq!(contacts[0].phone_number.as_deref(), Some("123"));
}

#[tokio::test]
async fn fetches_and_validates_events() {
  let client = api_client(data_api()).await;
  let events = client.fetch_events(&user("alice")).await.unwrap();

  let occasions: Vec<_> = events.iter().map(|e| e.occasion.as_str()).collect();
  assert_eq!(occasions, ["Lunch", "Call"]);
  assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
  let client = api_client(data_api()).await;
  let err = client.fetch_contacts(&user("mallory")).await.unwrap_err();
  assert!(matches!(
    err,
    FetchError::Unauthorized { what: "contacts", status } if status == StatusCode::UNAUTHORIZED
  ));
}

#[tokio::test]
async fn server_error_is_reported_not_retried() {
  let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
  let counter = hits.clone();
  let router = Router::new().route(
    "/api/events",
    get(move || {
      let counter = counter.clone();
      async move {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }),
  );
  let client = api_client(router).await;

  let err = client.fetch_events(&user("alice")).await.unwrap_err();
  assert!(matches!(
    err,
    FetchError::Status { what: "events", status } if status == StatusCode::INTERNAL_SERVER_ERROR
  ));
  assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_array_body_is_a_decode_error() {
  let router = Router::new().route(
    "/api/contacts",
    get(|| async { Json(json!({ "data": [] })) }),
  );
  let client = api_client(router).await;
  let err = client.fetch_contacts(&user("alice")).await.unwrap_err();
  assert!(matches!(err, FetchError::Decode { what: "contacts", .. }));
}

#[tokio::test]
async fn empty_collections_are_not_errors() {
  let router = Router::new()
    .route("/api/contacts", get(|| async { Json(json!([])) }))
    .route("/api/events", get(|| async { Json(json!([])) }));
  let client = api_client(router).await;
  let session = Session::default();

  let data = load(&client, &user("alice"), &session.token()).await.unwrap();
  assert!(data.contacts.is_empty());
  assert!(data.events.is_empty());
  assert!(data.correlated().is_empty());
}

#[tokio::test]
async fn load_joins_both_collections() {
  let client = api_client(data_api()).await;
  let session = Session::default();
  let alice = user("alice");
  session.sign_in(alice.clone());

  let data = load(&client, &alice, &session.token()).await.unwrap();
  let correlated = data.correlated();
  assert_eq!(correlated.len(), 2);
  assert_eq!(correlated[0].events.len(), 1);
  assert!(correlated[1].events.is_empty());

  let timeline = data.timeline(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
  assert_eq!(timeline.upcoming.len(), 2);
  assert_eq!(timeline.upcoming[1].contact_name(), "");
}

// ─── Cancellation ────────────────────────────────────────────────────────────

/// Returns contacts immediately; events wait until released.
struct Stalled {
  release: Arc<Notify>,
}

impl DataFetcher for Stalled {
  async fn fetch_contacts(&self, _: &User) -> Result<Vec<Contact>, FetchError> {
    Ok(vec![Contact::new("a@x.com")])
  }

  async fn fetch_events(&self, _: &User) -> Result<Vec<Event>, FetchError> {
    self.release.notified().await;
    Ok(Vec::new())
  }
}

#[tokio::test]
async fn sign_out_cancels_in_flight_load() {
  let session = Session::default();
  let alice = user("alice");
  session.sign_in(alice.clone());

  let fetcher = Stalled {
    release: Arc::new(Notify::new()),
  };
  let token = session.token();

  let signer = session.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    signer.sign_out();
  });

  let result = load(&fetcher, &alice, &token).await;
  assert!(matches!(result, Err(LoadError::Cancelled)));
  assert!(token.is_cancelled());
}

#[tokio::test]
async fn new_sign_in_cancels_previous_token() {
  let session = Session::default();
  session.sign_in(user("alice"));
  let token = session.token();
  assert!(!token.is_cancelled());

  session.sign_in(user("bob"));
  assert!(token.is_cancelled());
  assert!(!session.token().is_cancelled());
}

#[tokio::test]
async fn token_refresh_keeps_token_alive() {
  let session = Session::default();
  let alice = user("alice");
  session.sign_in(alice.clone());
  let token = session.token();

  let mut refreshed = alice.clone();
  refreshed.id_token = "token-alice-2".into();
  session.token_refreshed(refreshed);

  assert!(!token.is_cancelled());
  assert_eq!(session.current_user().unwrap().id_token, "token-alice-2");
}

// ─── Session expiry ──────────────────────────────────────────────────────────

#[test]
fn expiry_is_measured_from_auth_time() {
  let auth = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
  assert_eq!(
    session_expiry(auth, TimeDelta::minutes(60)),
    DateTime::from_timestamp(1_700_003_600, 0).unwrap()
  );
  assert_eq!(
    session_expiry(DateTime::<Utc>::MAX_UTC, TimeDelta::minutes(60)),
    DateTime::<Utc>::MAX_UTC
  );
}

#[tokio::test(start_paused = true)]
async fn session_signs_out_when_it_expires() {
  let session = Session::new(TimeDelta::minutes(60));
  let mut rx = session.subscribe();
  session.sign_in(user("alice"));
  assert!(session.expires_at().is_some());

  rx.changed().await.unwrap();
  assert!(rx.borrow_and_update().is_some());

  tokio::time::sleep(Duration::from_secs(61 * 60)).await;
  assert!(session.current_user().is_none());
  assert!(session.expires_at().is_none());
}

#[tokio::test(start_paused = true)]
async fn stale_auth_time_expires_immediately() {
  let session = Session::new(TimeDelta::minutes(60));
  session.sign_in(user_at("alice", Utc::now() - TimeDelta::hours(2)));

  tokio::time::sleep(Duration::from_millis(1)).await;
  assert!(session.current_user().is_none());
}

#[tokio::test(start_paused = true)]
async fn cancelled_expiry_never_fires() {
  let session = Session::new(TimeDelta::minutes(60));
  session.sign_in(user("alice"));

  let handle = session.schedule_expiry(Utc::now() + TimeDelta::minutes(5));
  session.cancel_expiry(handle);

  tokio::time::sleep(Duration::from_secs(10 * 60)).await;
  assert!(session.current_user().is_some());
}

#[tokio::test(start_paused = true)]
async fn sign_out_cancels_pending_expiry() {
  let session = Session::new(TimeDelta::minutes(60));
  session.sign_in(user("alice"));
  session.sign_out();
  session.sign_in(user_at("bob", Utc::now() + TimeDelta::minutes(30)));

  // Alice's original expiry would have fired at 60 minutes.
  tokio::time::sleep(Duration::from_secs(70 * 60)).await;
  assert_eq!(session.current_user().unwrap().uid, "bob");
}

#[tokio::test(start_paused = true)]
async fn stale_handle_cannot_end_newer_session() {
  let session = Session::new(TimeDelta::minutes(600));
  session.sign_in(user("alice"));
  let handle = session.schedule_expiry(Utc::now() + TimeDelta::minutes(5));

  session.sign_in(user("bob"));
  tokio::time::sleep(Duration::from_secs(10 * 60)).await;
  assert_eq!(session.current_user().unwrap().uid, "bob");
  drop(handle);
}

#[tokio::test]
async fn expire_only_applies_to_its_own_generation() {
  let session = Session::default();
  session.sign_in(user("alice"));
  let alice_token = session.token();

  // A sign-in between taking the token and expiring it wins.
  session.sign_in(user("bob"));
  assert!(!session.expire(&alice_token));
  assert_eq!(session.current_user().unwrap().uid, "bob");
  assert!(session.expires_at().is_some());

  let bob_token = session.token();
  assert!(session.expire(&bob_token));
  assert!(session.current_user().is_none());
  assert!(session.expires_at().is_none());
  assert!(bob_token.is_cancelled());
}

// ─── Identity provider ───────────────────────────────────────────────────────

fn fake_firebase(id_token: String) -> Router {
  let sign_in_token = id_token.clone();
  Router::new()
    .route(
      "/token",
      axum::routing::post(
        move |Query(q): Query<HashMap<String, String>>,
              Form(form): Form<HashMap<String, String>>| {
          let id_token = id_token.clone();
          async move {
            if q.get("key").map(String::as_str) != Some("k")
              || form.get("grant_type").map(String::as_str) != Some("refresh_token")
              || form.get("refresh_token").map(String::as_str) != Some("r1")
            {
              return StatusCode::BAD_REQUEST.into_response();
            }
            Json(json!({ "id_token": id_token, "refresh_token": "r2" })).into_response()
          }
        },
      ),
    )
    .fallback(move |uri: Uri, Json(body): Json<Value>| {
      let id_token = sign_in_token.clone();
      async move { identity_endpoint(uri, body, id_token) }
    })
}

fn identity_endpoint(uri: Uri, body: Value, id_token: String) -> Response {
  let path = uri.path();
  if !path.ends_with("accounts:signInWithPassword") && !path.ends_with("accounts:signUp") {
    return StatusCode::NOT_FOUND.into_response();
  }
  if body["password"] != "secret" {
    return (
      StatusCode::BAD_REQUEST,
      Json(json!({ "error": { "code": 400, "message": "INVALID_PASSWORD" } })),
    )
      .into_response();
  }
  Json(json!({
    "idToken": id_token,
    "refreshToken": "r1",
    "email": body["email"],
    "expiresIn": "3600",
    "localId": "uid-1"
  }))
  .into_response()
}

fn sample_token() -> String {
  jwt(json!({
    "user_id": "uid-1",
    "email": "alice@x.com",
    "auth_time": 1_700_000_000,
    "iat": 1_700_000_100,
    "exp": 1_700_003_700
  }))
}

async fn firebase() -> FirebaseAuth {
  let base = serve(fake_firebase(sample_token())).await;
  FirebaseAuth::with_endpoints("k", &base, &base).unwrap()
}

#[tokio::test]
async fn sign_in_reads_token_claims() {
  let auth = firebase().await;
  let user = auth.sign_in("alice@x.com", "secret").await.unwrap();

  assert_eq!(user.uid, "uid-1");
  assert_eq!(user.email.as_deref(), Some("alice@x.com"));
  assert_eq!(user.refresh_token, "r1");
  assert_eq!(user.auth_time.timestamp(), 1_700_000_000);
  assert_eq!(user.token_expires_at.timestamp(), 1_700_003_700);
}

#[tokio::test]
async fn sign_up_uses_the_same_shape() {
  let auth = firebase().await;
  let user = auth.sign_up("alice@x.com", "secret").await.unwrap();
  assert_eq!(user.uid, "uid-1");
}

#[tokio::test]
async fn bad_password_is_rejected_with_message() {
  let auth = firebase().await;
  let err = auth.sign_in("alice@x.com", "nope").await.unwrap_err();
  match err {
    AuthError::Rejected { status, message } => {
      assert_eq!(status, StatusCode::BAD_REQUEST);
      assert_eq!(message, "INVALID_PASSWORD");
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn refresh_swaps_tokens() {
  let auth = firebase().await;
  let user = auth.sign_in("alice@x.com", "secret").await.unwrap();
  let refreshed = auth.refresh(&user).await.unwrap();
  assert_eq!(refreshed.refresh_token, "r2");
  assert_eq!(refreshed.uid, user.uid);
}

#[test]
fn auth_time_falls_back_to_iat() {
  let token = jwt(json!({ "sub": "s", "iat": 1_700_000_100, "exp": 1_700_003_700 }));
  let user = User::from_tokens(token, "r").unwrap();
  assert_eq!(user.uid, "s");
  assert_eq!(user.auth_time.timestamp(), 1_700_000_100);
}

#[test]
fn malformed_tokens_are_rejected() {
  let no_exp = jwt(json!({ "user_id": "u" }));
  for token in ["", "onlyone", "a.!!!.c", no_exp.as_str()] {
    assert!(
      matches!(User::from_tokens(token, "r"), Err(AuthError::MalformedToken(_))),
      "{token}"
    );
  }
}
