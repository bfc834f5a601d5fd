use tokio::sync::oneshot;

use crate::domain::{EvalRecord, Outcome, PendingUser, User};
use crate::error::{ApprovalError, AuthError, RecorderError, SignupError, StoreError};

/// Generic type aliases for service communication
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Typed message enums for actor communication. Each variant includes
/// parameters and a oneshot channel for responses.
#[derive(Debug)]
pub enum MembershipRequest {
    Signup {
        name: String,
        id: String,
        password: String,
        respond_to: ServiceResponse<PendingUser, SignupError>,
    },
    Login {
        id: String,
        password: String,
        respond_to: ServiceResponse<User, AuthError>,
    },
    Approve {
        pending_id: String,
        respond_to: ServiceResponse<User, ApprovalError>,
    },
    Reject {
        pending_id: String,
        respond_to: ServiceResponse<(), ApprovalError>,
    },
    ListMembers {
        respond_to: ServiceResponse<Vec<User>, StoreError>,
    },
    ListPending {
        respond_to: ServiceResponse<Vec<PendingUser>, StoreError>,
    },
    /// Bootstrap: seeds the administrator account if it does not exist yet.
    EnsureAdmin {
        name: String,
        password: String,
        respond_to: ServiceResponse<User, StoreError>,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum RecorderRequest {
    Submit {
        evaluator: String,
        result: Outcome,
        memo: Option<String>,
        respond_to: ServiceResponse<EvalRecord, RecorderError>,
    },
    ListRecords {
        respond_to: ServiceResponse<Vec<EvalRecord>, RecorderError>,
    },
    ResetAll {
        respond_to: ServiceResponse<(), RecorderError>,
    },
    Shutdown,
}
