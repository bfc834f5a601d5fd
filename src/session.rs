//! Explicit per-caller session state.
//!
//! Each controller instance owns one `Session`; there is no process-wide
//! current user. The store stays the only state shared between sessions.
//! Admin-only operations (approve, reject, reset-all) are gated here, at
//! the caller, not inside the services.

use crate::domain::User;
use crate::error::SessionError;

/// Holds at most one current user. Transitions: anonymous to authenticated
/// via [`Session::sign_in`] after a successful login, and back via
/// [`Session::sign_out`]. No other states.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<User>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, user: User) {
        self.current = Some(user);
    }

    /// Returns the user that was signed in, if any.
    pub fn sign_out(&mut self) -> Option<User> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&User> {
        self.current.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.current.as_ref().is_some_and(|user| user.is_admin())
    }

    pub fn require_user(&self) -> Result<&User, SessionError> {
        self.current.as_ref().ok_or(SessionError::NotSignedIn)
    }

    pub fn require_admin(&self) -> Result<&User, SessionError> {
        let user = self.require_user()?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(SessionError::NotAuthorized)
        }
    }
}
