use thiserror::Error;

/// Errors surfaced by the collection store gateway.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid document in {collection}: {reason}")]
    InvalidDocument {
        collection: &'static str,
        reason: String,
    },
}

/// Errors that can occur during signup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SignupError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("id is reserved: {0}")]
    ReservedId(String),
    #[error("id already in use: {0}")]
    DuplicateId(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur during login.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("invalid id or password")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur while approving or rejecting a pending signup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApprovalError {
    #[error("no pending signup: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur while recording or wiping evaluations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecorderError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by the session controller's authorization checks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("not signed in")]
    NotSignedIn,
    #[error("administrator privileges required")]
    NotAuthorized,
}
