//! Revisioned document store interface.
//!
//! The control layer relies entirely on the store's optimistic concurrency:
//! every write names the revision it expects to replace, and the store
//! rejects stale ones with [`StoreError::Conflict`].

mod memory;

pub use memory::MemoryStore;

use thiserror::Error;

use crate::document::{Document, Payload, Revision};

/// Errors reported by a document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    Missing(String),

    #[error("Document was deleted: {0}")]
    Deleted(String),

    #[error("Document update conflict: {0}")]
    Conflict(String),

    #[error("Cannot store a payload without an _id")]
    MissingId,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// True for both never-existed and deleted documents.
    pub fn is_missing(&self) -> bool {
        matches!(self, StoreError::Missing(_) | StoreError::Deleted(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Outcome of a successful put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    pub id: String,
    pub rev: Revision,
}

/// A store offering get/put/remove with per-document linearizability.
///
/// `put` semantics:
/// - no `_rev` on a live id is a conflict
/// - a `_rev` that is not the current one is a conflict
/// - no `_rev` on a deleted id recreates the document
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    async fn get(&self, id: &str) -> Result<Document, StoreError>;

    async fn put(&self, payload: &Payload) -> Result<PutResult, StoreError>;

    async fn remove(&self, id: &str, rev: &Revision) -> Result<(), StoreError>;

    /// Ids of live documents starting with `prefix`, in id order.
    async fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Ids of live documents whose `meta.humanId` starts with `prefix`.
    async fn ids_with_human_id_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
