//! # Mock Framework
//!
//! Utilities for testing services in isolation.
//!
//! Use [`create_mock_collection`] to get a typed store client and a receiver.
//! Then use helpers like [`expect_list_all`] or [`expect_set`] to assert
//! behavior.

use tokio::sync::mpsc;

use crate::store::{CollectionClient, Document, Fields, StoreRequest, StoreResponse};

/// Creates a mock store client and a receiver for asserting requests.
///
/// # Testing Strategy
/// When testing service logic (e.g., `MembershipService`), we don't want to
/// spin up real `CollectionActor`s. Instead, this client sends messages to a
/// channel we control; the test inspects the messages arriving on that
/// channel and plays the store's side deterministically, including failures
/// and dropped requests.
pub fn create_mock_collection<D: Document>(
    buffer_size: usize,
) -> (CollectionClient<D>, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (CollectionClient::new(sender), receiver)
}

/// Helper to verify that the next message is a ListAll request
pub async fn expect_list_all(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<StoreResponse<Vec<(String, Fields)>>> {
    match receiver.recv().await {
        Some(StoreRequest::ListAll { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Helper to verify that the next message is a SetByKey request
pub async fn expect_set(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, Fields, StoreResponse<()>)> {
    match receiver.recv().await {
        Some(StoreRequest::SetByKey {
            key,
            fields,
            respond_to,
        }) => Some((key, fields, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a DeleteByKey request
pub async fn expect_delete(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, StoreResponse<bool>)> {
    match receiver.recv().await {
        Some(StoreRequest::DeleteByKey { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an AppendGenerated request
pub async fn expect_append(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(Fields, StoreResponse<String>)> {
    match receiver.recv().await {
        Some(StoreRequest::AppendGenerated { fields, respond_to }) => Some((fields, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a DeleteAll request
pub async fn expect_delete_all(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<StoreResponse<()>> {
    match receiver.recv().await {
        Some(StoreRequest::DeleteAll { respond_to }) => Some(respond_to),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;

    #[tokio::test]
    async fn mock_collection_round_trip() {
        let (client, mut receiver) = create_mock_collection::<User>(10);

        let task = tokio::spawn(async move { client.delete_by_key("kim1").await });

        let (key, responder) = expect_delete(&mut receiver).await.expect("Expected Delete");
        assert_eq!(key, "kim1");
        responder.send(Ok(true)).unwrap();

        assert_eq!(task.await.unwrap(), Ok(true));
    }

    #[tokio::test]
    async fn client_retries_when_the_store_drops_a_request() {
        let (client, mut receiver) = create_mock_collection::<User>(10);

        let task = tokio::spawn(async move { client.list_all().await });

        // Drop the first responder to simulate a lost request.
        let responder = expect_list_all(&mut receiver).await.expect("first attempt");
        drop(responder);

        // The client retries after a short pause; answer the second attempt.
        let responder = expect_list_all(&mut receiver).await.expect("retry");
        responder.send(Ok(Vec::new())).unwrap();

        let result = task.await.unwrap().unwrap();
        assert!(result.is_empty());
    }
}
