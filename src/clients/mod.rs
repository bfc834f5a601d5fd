use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use crate::domain::{EvalRecord, Outcome, PendingUser, User};
use crate::error::{ApprovalError, AuthError, RecorderError, SignupError, StoreError};
use crate::messages::{MembershipRequest, RecorderRequest};

// =============================================================================
// CLIENT METHOD MACRO
// =============================================================================

/// Generate client methods with oneshot channel boilerplate and automatic
/// tracing. A closed or dropped service channel maps to the error type's
/// `StoreError::Unavailable` variant.
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident, Error = $error_type:ty) => {
        impl $client {
            #[instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, $error_type> {
                debug!("Sending request");
                let (respond_to, response) = oneshot::channel();
                self.sender.send($request::$variant {
                    $($param,)*
                    respond_to,
                }).await.map_err(|_| <$error_type>::from(StoreError::Unavailable("service closed".to_string())))?;

                response.await.map_err(|_| <$error_type>::from(StoreError::Unavailable("service dropped the request".to_string())))?
            }
        }
    };
}

// =============================================================================
// 1. MEMBERSHIP CLIENT
// =============================================================================

#[derive(Clone)]
pub struct MembershipClient {
    sender: mpsc::Sender<MembershipRequest>,
}

impl MembershipClient {
    pub fn new(sender: mpsc::Sender<MembershipRequest>) -> Self {
        Self { sender }
    }

    // Written out rather than macro-generated so passwords stay out of spans.
    #[instrument(skip(self, password))]
    pub async fn signup(
        &self,
        name: String,
        id: String,
        password: String,
    ) -> Result<PendingUser, SignupError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(MembershipRequest::Signup {
                name,
                id,
                password,
                respond_to,
            })
            .await
            .map_err(|_| SignupError::from(StoreError::Unavailable("service closed".to_string())))?;

        response.await.map_err(|_| {
            SignupError::from(StoreError::Unavailable(
                "service dropped the request".to_string(),
            ))
        })?
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, id: String, password: String) -> Result<User, AuthError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(MembershipRequest::Login {
                id,
                password,
                respond_to,
            })
            .await
            .map_err(|_| AuthError::from(StoreError::Unavailable("service closed".to_string())))?;

        response.await.map_err(|_| {
            AuthError::from(StoreError::Unavailable(
                "service dropped the request".to_string(),
            ))
        })?
    }

    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, name: String, password: String) -> Result<User, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(MembershipRequest::EnsureAdmin {
                name,
                password,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::Unavailable("service closed".to_string()))?;

        response
            .await
            .map_err(|_| StoreError::Unavailable("service dropped the request".to_string()))?
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(MembershipRequest::Shutdown).await;
    }
}

client_method!(MembershipClient => fn approve(pending_id: String) -> User as MembershipRequest::Approve, Error = ApprovalError);
client_method!(MembershipClient => fn reject(pending_id: String) -> () as MembershipRequest::Reject, Error = ApprovalError);
client_method!(MembershipClient => fn list_members() -> Vec<User> as MembershipRequest::ListMembers, Error = StoreError);
client_method!(MembershipClient => fn list_pending() -> Vec<PendingUser> as MembershipRequest::ListPending, Error = StoreError);

// =============================================================================
// 2. RECORDER CLIENT
// =============================================================================

#[derive(Clone)]
pub struct RecorderClient {
    sender: mpsc::Sender<RecorderRequest>,
}

impl RecorderClient {
    pub fn new(sender: mpsc::Sender<RecorderRequest>) -> Self {
        Self { sender }
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(RecorderRequest::Shutdown).await;
    }
}

client_method!(RecorderClient => fn submit(evaluator: String, result: Outcome, memo: Option<String>) -> EvalRecord as RecorderRequest::Submit, Error = RecorderError);
client_method!(RecorderClient => fn list_records() -> Vec<EvalRecord> as RecorderRequest::ListRecords, Error = RecorderError);
client_method!(RecorderClient => fn reset_all() -> () as RecorderRequest::ResetAll, Error = RecorderError);
