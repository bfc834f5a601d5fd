use serde::{Deserialize, Serialize};

use crate::store::Document;

/// The reserved administrator id. No other account may use it, matched
/// case-insensitively at signup.
pub const ADMIN_ID: &str = "admin";

/// An approved member, able to log in.
///
/// Passwords are stored and compared as plaintext; the application has no
/// credential security model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub password: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.id == ADMIN_ID
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";
}

/// A signup request awaiting administrator approval.
///
/// Same shape as [`User`], but not a valid login identity until promoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUser {
    pub id: String,
    pub name: String,
    pub password: String,
}

impl PendingUser {
    /// Promotes the pending signup, copying every field verbatim.
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            password: self.password,
        }
    }
}

impl Document for PendingUser {
    const COLLECTION: &'static str = "pending_users";
}
