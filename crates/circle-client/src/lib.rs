//! Network-facing collaborators for the circle contact client.
//!
//! - [`identity`]: the identity provider (password sign-in, token refresh).
//! - [`session`]: the signed-in user, auto sign-out on expiry, and the
//!   cancellation token that in-flight loads watch.
//! - [`fetch`]: the contacts/events API client and the concurrent loader.
//! - [`record`]: validation of raw backend records into typed ones.

pub mod error;
pub mod fetch;
pub mod identity;
pub mod record;
pub mod session;

pub use error::{AuthError, FetchError, LoadError};
pub use fetch::{ApiClient, ApiConfig, DataFetcher, Dataset, LoadState, load};
pub use identity::{FirebaseAuth, IdentityProvider, User};
pub use session::{ExpiryHandle, Session, SessionToken};

#[cfg(test)]
mod tests;
