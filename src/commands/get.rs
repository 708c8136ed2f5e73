use clap::Args;
use datum_core::quick_id;

use super::OutputFormat;
use crate::db::SqliteStore;
use crate::output::TerminalOutput;

#[derive(Args)]
pub struct GetCommand {
    /// Prefix of the document's id or human id
    pub quick_id: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl GetCommand {
    pub async fn run(
        &self,
        store: &SqliteStore,
        output: &TerminalOutput,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match self.format {
            OutputFormat::Json => {
                let doc = quick_id::resolve(store, &self.quick_id).await?;
                println!("{}", serde_json::to_string_pretty(&doc)?);
            }
            OutputFormat::Text => {
                quick_id::get_doc(store, &self.quick_id, output).await?;
            }
        }
        Ok(())
    }
}
