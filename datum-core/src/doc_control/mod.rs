//! Document lifecycle operations built on a [`DocumentStore`](crate::store::DocumentStore).
//!
//! Every operation is a single fetch/merge/write sequence. Nothing here holds
//! locks or retries: concurrent writers are arbitrated by the store's revision
//! check and the loser sees the conflict.

mod add;
mod delete;
mod update;

pub use add::{add_doc, prepare_datum, AddDoc};
pub use delete::delete_doc;
pub use update::{update_doc, UpdateDoc};
