use chrono::{Local, Utc};
use clap::Args;
use datum_core::{add_doc, prepare_datum, AddDoc, OccurTime, UpdateStrategy};

use crate::db::SqliteStore;
use crate::input::parse_data_args;
use crate::output::TerminalOutput;

#[derive(Args)]
pub struct AddCommand {
    /// Data fields as key=value (`field=<key>` makes <key> part of the id)
    #[arg(value_name = "KEY=VALUE")]
    pub data: Vec<String>,

    /// When it happened: RFC 3339 timestamp or YYYY-MM-DD (default: now)
    #[arg(long)]
    pub occur: Option<OccurTime>,

    /// UTC offset of the occurrence in hours (default: local offset)
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<f64>,

    /// Store at this id instead of deriving one
    #[arg(long)]
    pub id: Option<String>,

    /// Merge into a different document already at the id with this strategy
    #[arg(long, value_name = "STRATEGY")]
    pub merge: Option<UpdateStrategy>,
}

impl AddCommand {
    pub async fn run(
        &self,
        store: &SqliteStore,
        output: &TerminalOutput,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = parse_data_args(&self.data)?;
        let utc_offset = self.offset.unwrap_or_else(local_utc_offset);

        let mut payload = prepare_datum(data, self.occur, Some(utc_offset), Utc::now());
        if let Some(id) = &self.id {
            payload = payload.with_id(id.clone());
        }

        let mut request = AddDoc::new(payload);
        if let Some(strategy) = self.merge {
            request = request.on_conflict(strategy);
        }

        add_doc(store, request, output).await?;
        Ok(())
    }
}

fn local_utc_offset() -> f64 {
    f64::from(Local::now().offset().local_minus_utc()) / 3600.0
}
