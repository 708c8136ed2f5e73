//! Errors surfaced by the document control layer.

use thiserror::Error;

use crate::combine::UpdateStrategy;
use crate::document::{DocKind, Document, Payload, Revision, ShapeError};
use crate::ids::IdError;
use crate::store::StoreError;

/// An update was refused before anything was merged or written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdateDocError {
    #[error("_rev does not match document to update: {id} is at {actual}, payload expected {expected}")]
    RevisionMismatch {
        id: String,
        expected: Revision,
        actual: Revision,
    },

    #[error("Update strategy '{strategy}' not supported for {kind} documents")]
    UnsupportedStrategy {
        strategy: UpdateStrategy,
        kind: DocKind,
    },

    #[error("Cannot update {kind} document {id} with a {payload_kind} payload")]
    IncompatiblePayload {
        id: String,
        kind: DocKind,
        payload_kind: DocKind,
    },
}

/// Errors from adding, updating, deleting or looking up documents.
///
/// None of these are retried internally; each carries enough context for
/// the caller to retry, merge by hand, or give up.
#[derive(Error, Debug)]
pub enum DocError {
    #[error("Cannot assign an id: {0}")]
    Id(#[from] IdError),

    #[error("Doc at id {0} specified to update does not exist")]
    NoDocToUpdate(String),

    #[error("Doc at id {0} specified to delete does not exist")]
    NoDocToDelete(String),

    #[error(transparent)]
    UpdateDoc(#[from] UpdateDocError),

    /// A write collided with a different document already stored at the
    /// target id. Both sides are kept for manual reconciliation.
    #[error("Document already exists at {}", .existing.id)]
    DocExists {
        attempted: Box<Payload>,
        existing: Box<Document>,
    },

    #[error("No document matches quick id '{0}'")]
    NotFound(String),

    #[error("Quick id '{quick_id}' is ambiguous between: {}", .candidates.join(", "))]
    Ambiguous {
        quick_id: String,
        candidates: Vec<String>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Shape(#[from] ShapeError),
}
