//! The signed-in session.
//!
//! A [`Session`] owns the current user, the pending auto sign-out, and a
//! generation counter. Every identity change (sign-in, sign-out, expiry)
//! bumps the generation; a [`SessionToken`] captured before the change
//! reports itself cancelled afterwards, which is how in-flight loads learn
//! their result is stale.

use std::{
  sync::{Arc, Mutex, PoisonError, Weak},
  time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::{sync::watch, task::JoinHandle};

use crate::identity::User;

/// Sessions end this many minutes after the user's last password sign-in.
pub const DEFAULT_SESSION_MINUTES: i64 = 60;

/// When a session that authenticated at `auth_time` must end.
pub fn session_expiry(auth_time: DateTime<Utc>, length: TimeDelta) -> DateTime<Utc> {
  auth_time
    .checked_add_signed(length)
    .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ─── Expiry handle ───────────────────────────────────────────────────────────

/// A scheduled sign-out. Dropping the handle cancels it.
#[derive(Debug)]
pub struct ExpiryHandle {
  at:   DateTime<Utc>,
  task: JoinHandle<()>,
}

impl ExpiryHandle {
  /// When the sign-out is due.
  pub fn at(&self) -> DateTime<Utc> { self.at }

  pub fn cancel(self) { self.task.abort(); }
}

impl Drop for ExpiryHandle {
  fn drop(&mut self) { self.task.abort(); }
}

// ─── Session token ───────────────────────────────────────────────────────────

/// Ties a unit of work to the session generation it started in.
#[derive(Debug, Clone)]
pub struct SessionToken {
  generation: u64,
  rx:         watch::Receiver<u64>,
}

impl SessionToken {
  pub fn is_cancelled(&self) -> bool { *self.rx.borrow() != self.generation }

  /// Resolves once the session has moved on from this token's generation,
  /// or the session itself is gone.
  pub async fn cancelled(&self) {
    let mut rx = self.rx.clone();
    loop {
      if *rx.borrow_and_update() != self.generation {
        return;
      }
      if rx.changed().await.is_err() {
        return;
      }
    }
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

struct Shared {
  user:       watch::Sender<Option<User>>,
  generation: watch::Sender<u64>,
  expiry:     Mutex<Option<ExpiryHandle>>,
  length:     TimeDelta,
}

/// Explicit session state, shared by clone.
///
/// Must be used from within a tokio runtime: scheduling an expiry spawns a
/// task.
#[derive(Clone)]
pub struct Session {
  shared: Arc<Shared>,
}

impl Default for Session {
  fn default() -> Self { Self::new(TimeDelta::minutes(DEFAULT_SESSION_MINUTES)) }
}

impl Session {
  pub fn new(length: TimeDelta) -> Self {
    let (user, _) = watch::channel(None);
    let (generation, _) = watch::channel(0);
    Self {
      shared: Arc::new(Shared {
        user,
        generation,
        expiry: Mutex::new(None),
        length,
      }),
    }
  }

  pub fn current_user(&self) -> Option<User> { self.shared.user.borrow().clone() }

  /// Observe sign-in and sign-out. The receiver starts at the current value.
  pub fn subscribe(&self) -> watch::Receiver<Option<User>> { self.shared.user.subscribe() }

  /// A token for work started now; cancelled by the next identity change.
  pub fn token(&self) -> SessionToken {
    let rx = self.shared.generation.subscribe();
    let generation = *rx.borrow();
    SessionToken { generation, rx }
  }

  /// When the pending auto sign-out is due, if one is scheduled.
  pub fn expires_at(&self) -> Option<DateTime<Utc>> {
    self.expiry_slot().as_ref().map(ExpiryHandle::at)
  }

  // Identity changes hold the expiry slot for their whole duration, so an
  // expiry can never observe one half-applied.

  /// Publish `user` as signed in and schedule its auto sign-out.
  pub fn sign_in(&self, user: User) {
    let mut slot = self.expiry_slot();
    self.sign_in_locked(&mut slot, user);
  }

  /// Replace the current user's tokens after a refresh. A refresh for a
  /// different user is treated as a fresh sign-in.
  pub fn token_refreshed(&self, user: User) {
    let mut slot = self.expiry_slot();
    let same_user = self
      .shared
      .user
      .borrow()
      .as_ref()
      .is_some_and(|u| u.uid == user.uid);
    if !same_user {
      self.sign_in_locked(&mut slot, user);
      return;
    }

    let at = session_expiry(user.auth_time, self.shared.length);
    tracing::debug!(uid = %user.uid, expires_at = %at, "token refreshed");
    self.shared.user.send_replace(Some(user));
    *slot = Some(self.schedule_expiry(at));
  }

  /// Clear the user and cancel any pending expiry.
  pub fn sign_out(&self) {
    let mut slot = self.expiry_slot();
    self.sign_out_locked(&mut slot);
  }

  /// Sign out, but only if no identity change has happened since `token`
  /// was taken. Returns whether the sign-out applied.
  pub fn expire(&self, token: &SessionToken) -> bool {
    let mut slot = self.expiry_slot();
    if token.is_cancelled() {
      return false;
    }
    tracing::info!("session expired");
    self.sign_out_locked(&mut slot);
    true
  }

  fn sign_in_locked(&self, slot: &mut Option<ExpiryHandle>, user: User) {
    let at = session_expiry(user.auth_time, self.shared.length);
    tracing::info!(uid = %user.uid, expires_at = %at, "signed in");

    self.bump();
    self.shared.user.send_replace(Some(user));
    // Replacing the old handle drops it, which aborts its task.
    *slot = Some(self.schedule_expiry(at));
  }

  fn sign_out_locked(&self, slot: &mut Option<ExpiryHandle>) {
    if let Some(handle) = slot.take() {
      self.cancel_expiry(handle);
    }
    let previous = self.shared.user.send_replace(None);
    if let Some(user) = previous {
      tracing::info!(uid = %user.uid, "signed out");
      self.bump();
    }
  }

  /// Schedule a sign-out at `at`. Times in the past fire immediately.
  ///
  /// The sign-out only applies to the generation current at scheduling
  /// time, so a stale handle can never end a newer session.
  pub fn schedule_expiry(&self, at: DateTime<Utc>) -> ExpiryHandle {
    let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    let token = self.token();
    let weak: Weak<Shared> = Arc::downgrade(&self.shared);

    let task = tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      let Some(shared) = weak.upgrade() else {
        return;
      };
      // Signing out aborts this task's own handle; no await point follows.
      Session { shared }.expire(&token);
    });

    ExpiryHandle { at, task }
  }

  /// Cancel a scheduled sign-out.
  pub fn cancel_expiry(&self, handle: ExpiryHandle) {
    tracing::debug!(at = %handle.at(), "expiry cancelled");
    handle.cancel();
  }

  fn bump(&self) { self.shared.generation.send_modify(|g| *g += 1); }

  fn expiry_slot(&self) -> std::sync::MutexGuard<'_, Option<ExpiryHandle>> {
    self
      .shared
      .expiry
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }
}
