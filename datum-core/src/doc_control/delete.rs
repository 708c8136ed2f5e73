use tracing::info;

use crate::document::Document;
use crate::error::DocError;
use crate::output::DocOutput;
use crate::store::DocumentStore;

/// Removes the document at `id` at its current revision and returns it.
pub async fn delete_doc<S, O>(store: &S, id: &str, output: &O) -> Result<Document, DocError>
where
    S: DocumentStore,
    O: DocOutput + ?Sized,
{
    let doc = match store.get(id).await {
        Ok(doc) => doc,
        Err(e) if e.is_missing() => return Err(DocError::NoDocToDelete(id.to_string())),
        Err(e) => return Err(e.into()),
    };

    store.remove(&doc.id, &doc.rev).await?;
    info!("deleted {}", doc.id);
    output.show_delete(&doc);
    Ok(doc)
}
