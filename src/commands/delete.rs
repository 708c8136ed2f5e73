use clap::Args;
use datum_core::{delete_doc, quick_id};

use crate::db::SqliteStore;
use crate::output::TerminalOutput;

#[derive(Args)]
pub struct DeleteCommand {
    /// Prefix of the document's id or human id
    pub quick_id: String,
}

impl DeleteCommand {
    pub async fn run(
        &self,
        store: &SqliteStore,
        output: &TerminalOutput,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let doc = quick_id::resolve(store, &self.quick_id).await?;
        delete_doc(store, &doc.id, output).await?;
        Ok(())
    }
}
