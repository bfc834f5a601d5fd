//! Collection store gateway.
//!
//! Each collection (`users`, `pending_users`, `records`) is one
//! [`CollectionActor`] owning a flat key-to-fields mapping, answering the
//! five gateway operations: list all, set by key, delete by key, append
//! under a generated key, and delete all. Listing preserves insertion
//! order, which is the collection's natural order.
//!
//! The actor itself is untyped; [`CollectionClient`] is the typed view.
//! Documents are serialized to flat field mappings on write and validated
//! back into structs on read, so a malformed document surfaces as
//! [`StoreError::InvalidDocument`] instead of a panic.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

use crate::error::StoreError;

/// Flat field mapping held by the store, one per document.
pub type Fields = Map<String, Value>;

pub type StoreResponse<T> = oneshot::Sender<Result<T, StoreError>>;

/// A typed view over one collection's documents.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name, used for spans and error reports.
    const COLLECTION: &'static str;
}

#[derive(Debug)]
pub enum StoreRequest {
    ListAll {
        respond_to: StoreResponse<Vec<(String, Fields)>>,
    },
    SetByKey {
        key: String,
        fields: Fields,
        respond_to: StoreResponse<()>,
    },
    DeleteByKey {
        key: String,
        respond_to: StoreResponse<bool>,
    },
    AppendGenerated {
        fields: Fields,
        respond_to: StoreResponse<String>,
    },
    DeleteAll {
        respond_to: StoreResponse<()>,
    },
}

/// Key generator producing `<prefix>_1`, `<prefix>_2`, ...
pub fn sequential_keys(prefix: &'static str) -> impl Fn() -> String + Send + Sync + 'static {
    let counter = AtomicU64::new(1);
    move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        format!("{}_{}", prefix, n)
    }
}

// =============================================================================
// THE COLLECTION ACTOR
// =============================================================================

pub struct CollectionActor {
    name: &'static str,
    receiver: mpsc::Receiver<StoreRequest>,
    // Insertion order doubles as the collection's natural order.
    docs: Vec<(String, Fields)>,
    next_key_fn: Box<dyn Fn() -> String + Send + Sync>,
}

impl CollectionActor {
    pub fn new(
        name: &'static str,
        buffer_size: usize,
        next_key_fn: impl Fn() -> String + Send + Sync + 'static,
    ) -> (Self, mpsc::Sender<StoreRequest>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            name,
            receiver,
            docs: Vec::new(),
            next_key_fn: Box::new(next_key_fn),
        };
        (actor, sender)
    }

    #[instrument(name = "collection", skip(self), fields(collection = %self.name))]
    pub async fn run(mut self) {
        info!("Collection actor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::ListAll { respond_to } => {
                    debug!(count = self.docs.len(), "Listing collection");
                    let _ = respond_to.send(Ok(self.docs.clone()));
                }
                StoreRequest::SetByKey {
                    key,
                    fields,
                    respond_to,
                } => {
                    debug!(key = %key, "Setting document");
                    match self.docs.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, existing)) => *existing = fields,
                        None => self.docs.push((key, fields)),
                    }
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::DeleteByKey { key, respond_to } => {
                    debug!(key = %key, "Deleting document");
                    let removed = match self.docs.iter().position(|(k, _)| *k == key) {
                        Some(index) => {
                            self.docs.remove(index);
                            true
                        }
                        None => false,
                    };
                    let _ = respond_to.send(Ok(removed));
                }
                StoreRequest::AppendGenerated { fields, respond_to } => {
                    let key = (self.next_key_fn)();
                    debug!(key = %key, "Appending document");
                    self.docs.push((key.clone(), fields));
                    let _ = respond_to.send(Ok(key));
                }
                StoreRequest::DeleteAll { respond_to } => {
                    debug!(count = self.docs.len(), "Wiping collection");
                    self.docs.clear();
                    let _ = respond_to.send(Ok(()));
                }
            }
        }
        info!("Collection actor stopped");
    }
}

// =============================================================================
// THE TYPED CLIENT
// =============================================================================

// Transport failures are retried a bounded number of times; domain-level
// errors pass through untouched since they are not transient.
const RETRY_ATTEMPTS: usize = 2;
const RETRY_PAUSE: Duration = Duration::from_millis(25);

pub struct CollectionClient<D: Document> {
    sender: mpsc::Sender<StoreRequest>,
    _marker: PhantomData<D>,
}

impl<D: Document> Clone for CollectionClient<D> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            _marker: PhantomData,
        }
    }
}

impl<D: Document> CollectionClient<D> {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self {
            sender,
            _marker: PhantomData,
        }
    }

    pub async fn list_all(&self) -> Result<Vec<(String, D)>, StoreError> {
        let entries = self
            .request(|respond_to| StoreRequest::ListAll { respond_to })
            .await?;
        entries
            .into_iter()
            .map(|(key, fields)| Ok((key, from_fields::<D>(fields)?)))
            .collect()
    }

    pub async fn set_by_key(&self, key: &str, doc: &D) -> Result<(), StoreError> {
        let fields = to_fields(doc)?;
        self.request(|respond_to| StoreRequest::SetByKey {
            key: key.to_string(),
            fields: fields.clone(),
            respond_to,
        })
        .await
    }

    /// Returns whether a document existed under the key.
    pub async fn delete_by_key(&self, key: &str) -> Result<bool, StoreError> {
        self.request(|respond_to| StoreRequest::DeleteByKey {
            key: key.to_string(),
            respond_to,
        })
        .await
    }

    /// Appends the document under a store-generated key and returns the key.
    pub async fn append_generated(&self, doc: &D) -> Result<String, StoreError> {
        let fields = to_fields(doc)?;
        self.request(|respond_to| StoreRequest::AppendGenerated {
            fields: fields.clone(),
            respond_to,
        })
        .await
    }

    pub async fn delete_all(&self) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::DeleteAll { respond_to })
            .await
    }

    async fn request<T>(
        &self,
        make: impl Fn(StoreResponse<T>) -> StoreRequest,
    ) -> Result<T, StoreError> {
        let mut attempt = 0;
        loop {
            let (respond_to, response) = oneshot::channel();
            let failure = match self.sender.send(make(respond_to)).await {
                Ok(()) => match response.await {
                    Ok(result) => return result,
                    Err(_) => StoreError::Unavailable("store dropped the request".to_string()),
                },
                Err(_) => StoreError::Unavailable("store closed".to_string()),
            };
            if attempt >= RETRY_ATTEMPTS {
                return Err(failure);
            }
            attempt += 1;
            debug!(attempt, collection = D::COLLECTION, "Retrying store request");
            tokio::time::sleep(RETRY_PAUSE).await;
        }
    }
}

fn to_fields<D: Document>(doc: &D) -> Result<Fields, StoreError> {
    match serde_json::to_value(doc) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::InvalidDocument {
            collection: D::COLLECTION,
            reason: "document is not a flat field mapping".to_string(),
        }),
        Err(e) => Err(StoreError::InvalidDocument {
            collection: D::COLLECTION,
            reason: e.to_string(),
        }),
    }
}

fn from_fields<D: Document>(fields: Fields) -> Result<D, StoreError> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| StoreError::InvalidDocument {
        collection: D::COLLECTION,
        reason: e.to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
