//! Explicit credential context.
//!
//! The signed-in session is an object handed to the API adapter and the
//! views. Signing in creates it, signing out or any 401 response destroys it.

use crate::models::User;
use std::sync::{Arc, PoisonError, RwLock};

/// A signed-in user and the bearer token issued for them.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Shared handle to the current credential, if any.
///
/// Cloning the handle shares the underlying slot.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    inner: Arc<RwLock<Option<AuthSession>>>,
}

impl Credentials {
    /// Create an empty (signed-out) credential slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fresh session, replacing any previous one.
    pub fn sign_in(&self, session: AuthSession) {
        tracing::info!(email = %session.user.email, "signed in");
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    /// Drop the current session. Returns whether one was present.
    pub fn sign_out(&self) -> bool {
        let previous = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::info!("credentials cleared");
        }
        previous.is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.user.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Whether a 401 should send the user to the sign-in entry point.
///
/// Never redirects while already there, which would loop.
pub fn entry_redirect(at_entry_point: bool) -> bool {
    !at_entry_point
}
