//! Resolves short user-typed prefixes to a single document.
//!
//! The `_id` and `meta.humanId` namespaces are searched together: a prefix
//! resolves when exactly one document matches in either of them.

use std::collections::BTreeSet;

use crate::document::Document;
use crate::error::DocError;
use crate::output::DocOutput;
use crate::store::DocumentStore;

/// Looks up the one document whose id or human id starts with `quick_id`.
pub async fn resolve<S>(store: &S, quick_id: &str) -> Result<Document, DocError>
where
    S: DocumentStore,
{
    if quick_id.is_empty() {
        return Err(DocError::NotFound(String::new()));
    }

    let mut candidates: BTreeSet<String> =
        store.ids_with_prefix(quick_id).await?.into_iter().collect();
    candidates.extend(store.ids_with_human_id_prefix(quick_id).await?);

    if candidates.len() > 1 {
        tracing::debug!("quick id '{}' matched {} documents", quick_id, candidates.len());
        return Err(DocError::Ambiguous {
            quick_id: quick_id.to_string(),
            candidates: candidates.into_iter().collect(),
        });
    }

    let id = candidates
        .pop_first()
        .ok_or_else(|| DocError::NotFound(quick_id.to_string()))?;

    store.get(&id).await.map_err(|e| {
        if e.is_missing() {
            DocError::NotFound(quick_id.to_string())
        } else {
            e.into()
        }
    })
}

/// Resolves `quick_id` and reports the document through `output`.
pub async fn get_doc<S, O>(store: &S, quick_id: &str, output: &O) -> Result<Document, DocError>
where
    S: DocumentStore,
    O: DocOutput + ?Sized,
{
    let doc = resolve(store, quick_id).await?;
    output.show_exists(&doc);
    Ok(doc)
}
