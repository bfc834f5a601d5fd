//! System orchestration, startup, and shutdown logic.

pub mod telemetry;

pub use telemetry::setup_tracing;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::actors::{wall_clock, Clock, MembershipService, RecorderService};
use crate::clients::{MembershipClient, RecorderClient};
use crate::domain::{EvalRecord, PendingUser, User};
use crate::store::{sequential_keys, CollectionActor, CollectionClient};

/// The main application system.
///
/// Starts the three collection actors and the two service actors, wires the
/// clients together, and handles shutdown.
pub struct RatingSystem {
    pub membership: MembershipClient,
    pub recorder: RecorderClient,
    handles: Vec<JoinHandle<()>>,
}

impl RatingSystem {
    pub fn new() -> Self {
        Self::with_clock(wall_clock())
    }

    /// Builds the system with an explicit record clock; tests pin it to a
    /// fixed timestamp.
    pub fn with_clock(clock: Clock) -> Self {
        // 1. Collection actors, one per store collection. Users and pending
        // users are keyed explicitly by id; records get generated keys.
        let (users_actor, users_tx) = CollectionActor::new("users", 32, sequential_keys("user"));
        let users_handle = tokio::spawn(users_actor.run());

        let (pending_actor, pending_tx) =
            CollectionActor::new("pending_users", 32, sequential_keys("pending"));
        let pending_handle = tokio::spawn(pending_actor.run());

        let (records_actor, records_tx) =
            CollectionActor::new("records", 32, sequential_keys("record"));
        let records_handle = tokio::spawn(records_actor.run());

        // 2. Membership service over the two user collections.
        let (membership_actor, membership) = MembershipService::new(
            32,
            CollectionClient::<User>::new(users_tx),
            CollectionClient::<PendingUser>::new(pending_tx),
        );
        let membership_handle = tokio::spawn(membership_actor.run());

        // 3. Recorder service over the records collection.
        let (recorder_actor, recorder) =
            RecorderService::new(32, CollectionClient::<EvalRecord>::new(records_tx), clock);
        let recorder_handle = tokio::spawn(recorder_actor.run());

        Self {
            membership,
            recorder,
            handles: vec![
                users_handle,
                pending_handle,
                records_handle,
                membership_handle,
                recorder_handle,
            ],
        }
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");
        // Services stop on the shutdown message; the collection actors stop
        // once the services drop their store clients.
        self.membership.shutdown().await;
        self.recorder.shutdown().await;
        drop(self.membership);
        drop(self.recorder);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

impl Default for RatingSystem {
    fn default() -> Self {
        Self::new()
    }
}
