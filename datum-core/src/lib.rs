//! Datum Core Library
//!
//! Identity and merge control for a revisioned personal data log: canonical
//! id assembly, quick-id lookup, merge strategies and the update/rename
//! protocol, over any [`DocumentStore`].

pub mod combine;
pub mod doc_control;
pub mod document;
pub mod error;
pub mod ids;
pub mod output;
pub mod quick_id;
pub mod store;

pub use combine::{combine_data, is_no_diff, UpdateStrategy};
pub use doc_control::{add_doc, delete_doc, prepare_datum, update_doc, AddDoc, UpdateDoc};
pub use quick_id::get_doc;
pub use document::{
    Body, Data, DocKind, Document, Metadata, OccurTime, Payload, Revision, ShapeError,
    ViewDefinition,
};
pub use error::{DocError, UpdateDocError};
pub use ids::{assemble_id, derive_id, new_human_id, IdError};
pub use output::{DocOutput, NoOutput};
pub use store::{DocumentStore, MemoryStore, PutResult, StoreError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
