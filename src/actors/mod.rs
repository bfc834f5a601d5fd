//! Service actors: membership management and the evaluation recorder.
//!
//! All membership mutations flow through one actor, so the two store calls
//! of an approval can never interleave with another caller's membership
//! operation. The store collections stay the only shared state.

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::clients::{MembershipClient, RecorderClient};
use crate::domain::{EvalRecord, Outcome, PendingUser, User, ADMIN_ID};
use crate::error::{ApprovalError, AuthError, RecorderError, SignupError, StoreError};
use crate::messages::{MembershipRequest, RecorderRequest};
use crate::store::CollectionClient;

/// Timestamp layout written to every record: local time, minute precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Source of record timestamps. Injected so tests can pin the clock.
pub type Clock = Box<dyn Fn() -> String + Send + Sync>;

pub fn wall_clock() -> Clock {
    Box::new(|| Local::now().format(TIMESTAMP_FORMAT).to_string())
}

// =============================================================================
// MEMBERSHIP SERVICE
// =============================================================================

pub struct MembershipService {
    receiver: mpsc::Receiver<MembershipRequest>,
    users: CollectionClient<User>,
    pending: CollectionClient<PendingUser>,
}

impl MembershipService {
    pub fn new(
        buffer_size: usize,
        users: CollectionClient<User>,
        pending: CollectionClient<PendingUser>,
    ) -> (Self, MembershipClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            users,
            pending,
        };
        let client = MembershipClient::new(sender);
        (service, client)
    }

    #[instrument(name = "membership_service", skip(self))]
    pub async fn run(mut self) {
        info!("MembershipService starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                MembershipRequest::Signup {
                    name,
                    id,
                    password,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.signup(name, id, password).await);
                }
                MembershipRequest::Login {
                    id,
                    password,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.login(id, password).await);
                }
                MembershipRequest::Approve {
                    pending_id,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.approve(pending_id).await);
                }
                MembershipRequest::Reject {
                    pending_id,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.reject(pending_id).await);
                }
                MembershipRequest::ListMembers { respond_to } => {
                    let _ = respond_to.send(self.list_members().await);
                }
                MembershipRequest::ListPending { respond_to } => {
                    let _ = respond_to.send(self.list_pending().await);
                }
                MembershipRequest::EnsureAdmin {
                    name,
                    password,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.ensure_admin(name, password).await);
                }
                MembershipRequest::Shutdown => {
                    info!("MembershipService shutting down");
                    break;
                }
            }
        }
        info!("MembershipService stopped");
    }

    #[instrument(skip(self, password))]
    async fn signup(
        &self,
        name: String,
        id: String,
        password: String,
    ) -> Result<PendingUser, SignupError> {
        if name.is_empty() {
            return Err(SignupError::MissingField("name"));
        }
        if id.is_empty() {
            return Err(SignupError::MissingField("id"));
        }
        if password.is_empty() {
            return Err(SignupError::MissingField("password"));
        }
        if id.eq_ignore_ascii_case(ADMIN_ID) {
            warn!("Signup attempted with reserved id");
            return Err(SignupError::ReservedId(id));
        }

        // Uniqueness is checked against the union of both collections.
        let users = self.users.list_all().await?;
        let pending = self.repaired_pending(&users).await?;
        let taken = users.iter().any(|(_, u)| u.id == id)
            || pending.iter().any(|(_, p)| p.id == id);
        if taken {
            warn!("Signup attempted with duplicate id");
            return Err(SignupError::DuplicateId(id));
        }

        let request = PendingUser {
            id: id.clone(),
            name,
            password,
        };
        self.pending.set_by_key(&id, &request).await?;
        info!(pending_id = %request.id, "Signup request stored");
        Ok(request)
    }

    #[instrument(skip(self, password))]
    async fn login(&self, id: String, password: String) -> Result<User, AuthError> {
        // Linear scan; the member list is expected to stay small.
        let users = self.users.list_all().await?;
        let user = users
            .into_iter()
            .map(|(_, u)| u)
            .find(|u| u.id == id && u.password == password);
        match user {
            Some(user) => {
                info!(name = %user.name, "Login succeeded");
                Ok(user)
            }
            None => {
                warn!("Login failed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    #[instrument(skip(self))]
    async fn approve(&self, pending_id: String) -> Result<User, ApprovalError> {
        let users = self.users.list_all().await?;
        let pending = self.repaired_pending(&users).await?;
        let user = match pending.into_iter().find(|(_, p)| p.id == pending_id) {
            Some((key, entry)) => {
                // Fields are copied verbatim; promotion adds nothing.
                let user = entry.into_user();
                self.users.set_by_key(&user.id, &user).await?;
                self.pending.delete_by_key(&key).await?;
                user
            }
            None => {
                warn!("Approval for unknown pending id");
                return Err(ApprovalError::NotFound(pending_id));
            }
        };
        info!(member = %user.name, "Pending signup promoted");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn reject(&self, pending_id: String) -> Result<(), ApprovalError> {
        let removed = self.pending.delete_by_key(&pending_id).await?;
        if !removed {
            warn!("Rejection for unknown pending id");
            return Err(ApprovalError::NotFound(pending_id));
        }
        info!("Pending signup rejected");
        Ok(())
    }

    async fn list_members(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.list_all().await?;
        Ok(users.into_iter().map(|(_, u)| u).collect())
    }

    async fn list_pending(&self) -> Result<Vec<PendingUser>, StoreError> {
        let users = self.users.list_all().await?;
        let pending = self.repaired_pending(&users).await?;
        Ok(pending.into_iter().map(|(_, p)| p).collect())
    }

    #[instrument(skip(self, password))]
    async fn ensure_admin(&self, name: String, password: String) -> Result<User, StoreError> {
        let users = self.users.list_all().await?;
        if let Some(existing) = users.into_iter().map(|(_, u)| u).find(|u| u.is_admin()) {
            return Ok(existing);
        }
        let admin = User {
            id: ADMIN_ID.to_string(),
            name,
            password,
        };
        self.users.set_by_key(ADMIN_ID, &admin).await?;
        info!("Administrator account seeded");
        Ok(admin)
    }

    /// Pending entries whose id already exists among users are leftovers of
    /// a half-applied promotion; drop them before using the list.
    async fn repaired_pending(
        &self,
        users: &[(String, User)],
    ) -> Result<Vec<(String, PendingUser)>, StoreError> {
        let pending = self.pending.list_all().await?;
        let mut surviving = Vec::with_capacity(pending.len());
        for (key, entry) in pending {
            if users.iter().any(|(_, u)| u.id == entry.id) {
                warn!(pending_id = %entry.id, "Repairing half-applied promotion");
                self.pending.delete_by_key(&key).await?;
            } else {
                surviving.push((key, entry));
            }
        }
        Ok(surviving)
    }
}

// =============================================================================
// RECORDER SERVICE
// =============================================================================

pub struct RecorderService {
    receiver: mpsc::Receiver<RecorderRequest>,
    records: CollectionClient<EvalRecord>,
    clock: Clock,
}

impl RecorderService {
    pub fn new(
        buffer_size: usize,
        records: CollectionClient<EvalRecord>,
        clock: Clock,
    ) -> (Self, RecorderClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            records,
            clock,
        };
        let client = RecorderClient::new(sender);
        (service, client)
    }

    #[instrument(name = "recorder_service", skip(self))]
    pub async fn run(mut self) {
        info!("RecorderService starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                RecorderRequest::Submit {
                    evaluator,
                    result,
                    memo,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.submit(evaluator, result, memo).await);
                }
                RecorderRequest::ListRecords { respond_to } => {
                    let _ = respond_to.send(self.list_records().await);
                }
                RecorderRequest::ResetAll { respond_to } => {
                    let _ = respond_to.send(self.reset_all().await);
                }
                RecorderRequest::Shutdown => {
                    info!("RecorderService shutting down");
                    break;
                }
            }
        }
        info!("RecorderService stopped");
    }

    // The evaluator name is taken as-is: it is not checked against the
    // member list, and nothing limits how often one member may submit.
    #[instrument(skip(self, memo))]
    async fn submit(
        &self,
        evaluator: String,
        result: Outcome,
        memo: Option<String>,
    ) -> Result<EvalRecord, RecorderError> {
        let record = EvalRecord {
            evaluator,
            result,
            memo,
            timestamp: (self.clock)(),
        };
        let key = self.records.append_generated(&record).await?;
        info!(key = %key, result = %record.result, "Evaluation recorded");
        Ok(record)
    }

    async fn list_records(&self) -> Result<Vec<EvalRecord>, RecorderError> {
        let records = self.records.list_all().await?;
        Ok(records.into_iter().map(|(_, r)| r).collect())
    }

    #[instrument(skip(self))]
    async fn reset_all(&self) -> Result<(), RecorderError> {
        self.records.delete_all().await?;
        info!("Every record wiped");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{sequential_keys, CollectionActor};

    fn spawn_membership() -> (
        MembershipClient,
        CollectionClient<User>,
        CollectionClient<PendingUser>,
    ) {
        let (users_actor, users_tx) = CollectionActor::new("users", 10, sequential_keys("user"));
        tokio::spawn(users_actor.run());
        let (pending_actor, pending_tx) =
            CollectionActor::new("pending_users", 10, sequential_keys("pending"));
        tokio::spawn(pending_actor.run());

        let users = CollectionClient::<User>::new(users_tx);
        let pending = CollectionClient::<PendingUser>::new(pending_tx);
        let (service, client) = MembershipService::new(10, users.clone(), pending.clone());
        tokio::spawn(service.run());
        (client, users, pending)
    }

    fn fixed_clock(stamp: &'static str) -> Clock {
        Box::new(move || stamp.to_string())
    }

    fn spawn_recorder(clock: Clock) -> (RecorderClient, CollectionClient<EvalRecord>) {
        let (records_actor, records_tx) =
            CollectionActor::new("records", 10, sequential_keys("record"));
        tokio::spawn(records_actor.run());

        let records = CollectionClient::<EvalRecord>::new(records_tx);
        let (service, client) = RecorderService::new(10, records.clone(), clock);
        tokio::spawn(service.run());
        (client, records)
    }

    #[tokio::test]
    async fn signup_rejects_empty_fields() {
        let (client, _, pending) = spawn_membership();

        let result = client
            .signup("".to_string(), "kim1".to_string(), "pw".to_string())
            .await;
        assert_eq!(result, Err(SignupError::MissingField("name")));

        let result = client
            .signup("Kim".to_string(), "kim1".to_string(), "".to_string())
            .await;
        assert_eq!(result, Err(SignupError::MissingField("password")));

        assert!(pending.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn signup_rejects_reserved_id_case_insensitively() {
        let (client, _, pending) = spawn_membership();

        for id in ["admin", "Admin", "ADMIN"] {
            let result = client
                .signup("Mallory".to_string(), id.to_string(), "pw".to_string())
                .await;
            assert_eq!(result, Err(SignupError::ReservedId(id.to_string())));
        }

        assert!(pending.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn signup_rejects_ids_taken_by_users_or_pending() {
        let (client, users, pending) = spawn_membership();
        users
            .set_by_key(
                "kim1",
                &User {
                    id: "kim1".to_string(),
                    name: "Kim".to_string(),
                    password: "pw".to_string(),
                },
            )
            .await
            .unwrap();

        let result = client
            .signup("Other".to_string(), "kim1".to_string(), "pw2".to_string())
            .await;
        assert_eq!(result, Err(SignupError::DuplicateId("kim1".to_string())));

        client
            .signup("Lee".to_string(), "lee1".to_string(), "pw".to_string())
            .await
            .unwrap();
        let result = client
            .signup("Lee Again".to_string(), "lee1".to_string(), "pw".to_string())
            .await;
        assert_eq!(result, Err(SignupError::DuplicateId("lee1".to_string())));

        assert_eq!(pending.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn signup_stores_exactly_the_submitted_fields() {
        let (client, _, pending) = spawn_membership();

        let stored = client
            .signup("Kim".to_string(), "kim1".to_string(), "pw".to_string())
            .await
            .unwrap();

        let entries = pending.list_all().await.unwrap();
        assert_eq!(entries, vec![("kim1".to_string(), stored)]);
    }

    #[tokio::test]
    async fn login_requires_an_exact_match_on_both_fields() {
        let (client, users, _) = spawn_membership();
        let kim = User {
            id: "kim1".to_string(),
            name: "Kim".to_string(),
            password: "pw".to_string(),
        };
        users.set_by_key("kim1", &kim).await.unwrap();

        assert_eq!(
            client.login("kim1".to_string(), "pw".to_string()).await,
            Ok(kim)
        );
        assert_eq!(
            client.login("kim1".to_string(), "PW".to_string()).await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            client.login("kim2".to_string(), "pw".to_string()).await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn approve_promotes_verbatim_and_second_attempt_fails() {
        let (client, users, pending) = spawn_membership();
        client
            .signup("Kim".to_string(), "kim1".to_string(), "pw".to_string())
            .await
            .unwrap();

        let user = client.approve("kim1".to_string()).await.unwrap();
        assert_eq!(
            user,
            User {
                id: "kim1".to_string(),
                name: "Kim".to_string(),
                password: "pw".to_string(),
            }
        );
        assert_eq!(users.list_all().await.unwrap().len(), 1);
        assert!(pending.list_all().await.unwrap().is_empty());

        assert_eq!(
            client.approve("kim1".to_string()).await,
            Err(ApprovalError::NotFound("kim1".to_string()))
        );
    }

    #[tokio::test]
    async fn reject_removes_the_request_without_creating_a_user() {
        let (client, users, pending) = spawn_membership();
        client
            .signup("Kim".to_string(), "kim1".to_string(), "pw".to_string())
            .await
            .unwrap();

        client.reject("kim1".to_string()).await.unwrap();

        assert!(users.list_all().await.unwrap().is_empty());
        assert!(pending.list_all().await.unwrap().is_empty());
        assert_eq!(
            client.reject("kim1".to_string()).await,
            Err(ApprovalError::NotFound("kim1".to_string()))
        );
    }

    #[tokio::test]
    async fn ensure_admin_seeds_once() {
        let (client, users, _) = spawn_membership();

        let admin = client
            .ensure_admin("Boss".to_string(), "secret".to_string())
            .await
            .unwrap();
        assert!(admin.is_admin());

        // A second call must not overwrite the existing account.
        let again = client
            .ensure_admin("Impostor".to_string(), "other".to_string())
            .await
            .unwrap();
        assert_eq!(again.name, "Boss");
        assert_eq!(users.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_pending_repairs_a_half_applied_promotion() {
        let (client, users, pending) = spawn_membership();
        let kim = User {
            id: "kim1".to_string(),
            name: "Kim".to_string(),
            password: "pw".to_string(),
        };
        users.set_by_key("kim1", &kim).await.unwrap();
        // Simulate a promotion that wrote the user but kept the pending copy.
        pending
            .set_by_key(
                "kim1",
                &PendingUser {
                    id: "kim1".to_string(),
                    name: "Kim".to_string(),
                    password: "pw".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(client.list_pending().await.unwrap().is_empty());
        assert!(pending.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_stamps_records_with_the_clock() {
        let (client, _) = spawn_recorder(fixed_clock("2024-05-01 10:00"));

        let record = client
            .submit("Kim".to_string(), Outcome::HomeRun, Some("walk-off".to_string()))
            .await
            .unwrap();

        assert_eq!(record.timestamp, "2024-05-01 10:00");
        assert_eq!(
            client.list_records().await.unwrap(),
            vec![record]
        );
    }

    #[tokio::test]
    async fn list_records_keeps_insertion_order() {
        let (client, _) = spawn_recorder(fixed_clock("2024-05-01 10:00"));

        for name in ["A", "B", "C"] {
            client
                .submit(name.to_string(), Outcome::Hit, None)
                .await
                .unwrap();
        }

        let evaluators: Vec<String> = client
            .list_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.evaluator)
            .collect();
        assert_eq!(evaluators, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn reset_all_deletes_every_record() {
        let (client, records) = spawn_recorder(fixed_clock("2024-05-01 10:00"));
        client
            .submit("Kim".to_string(), Outcome::Out, None)
            .await
            .unwrap();
        client
            .submit("Lee".to_string(), Outcome::Hit, None)
            .await
            .unwrap();

        client.reset_all().await.unwrap();

        assert!(records.list_all().await.unwrap().is_empty());
        assert!(client.list_records().await.unwrap().is_empty());
    }
}
