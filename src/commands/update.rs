use clap::Args;
use datum_core::{quick_id, update_doc, Metadata, OccurTime, Payload, Revision, UpdateDoc, UpdateStrategy};

use crate::db::SqliteStore;
use crate::input::parse_data_args;
use crate::output::TerminalOutput;

#[derive(Args)]
pub struct UpdateCommand {
    /// Prefix of the document's id or human id
    pub quick_id: String,

    /// Data fields as key=value; `key=null` removes a key
    #[arg(value_name = "KEY=VALUE")]
    pub data: Vec<String>,

    /// Merge strategy: update, merge, append, preferOld, remove, useNew, useOld
    #[arg(long, short, default_value = "update")]
    pub strategy: UpdateStrategy,

    /// Only update if the document is still at this revision
    #[arg(long)]
    pub rev: Option<String>,

    /// Move the datum to a new occur time (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub occur: Option<OccurTime>,

    /// UTC offset of the new occur time in hours
    #[arg(long, allow_negative_numbers = true, requires = "occur")]
    pub offset: Option<f64>,
}

impl UpdateCommand {
    pub async fn run(
        &self,
        store: &SqliteStore,
        output: &TerminalOutput,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let doc = quick_id::resolve(store, &self.quick_id).await?;
        let data = parse_data_args(&self.data)?;

        let mut payload = match self.occur {
            Some(occur_time) => Payload::datum(
                data,
                Metadata {
                    occur_time: Some(occur_time),
                    utc_offset: self.offset,
                    ..Default::default()
                },
            ),
            None => Payload::data_only(data),
        };
        if let Some(rev) = &self.rev {
            payload = payload.with_rev(Revision::new(rev.clone()));
        }

        let request = UpdateDoc::new(doc.id, payload).strategy(self.strategy);
        update_doc(store, request, output).await?;
        Ok(())
    }
}
