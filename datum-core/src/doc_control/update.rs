use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::combine::{combine_data, is_no_diff, UpdateStrategy};
use crate::document::{Body, Data, DocKind, Document, Metadata, Payload, ViewDefinition, ID_KEY};
use crate::error::{DocError, UpdateDocError};
use crate::ids::{derive_id, FIELD_KEY};
use crate::output::DocOutput;
use crate::store::DocumentStore;

/// Request to merge `payload` into the document stored at `id`.
#[derive(Debug, Clone)]
pub struct UpdateDoc {
    pub id: String,
    pub payload: Payload,
    pub strategy: UpdateStrategy,
}

impl UpdateDoc {
    pub fn new(id: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            payload,
            strategy: UpdateStrategy::default(),
        }
    }

    pub fn strategy(mut self, strategy: UpdateStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

enum Merged {
    NoDiff,
    Changed(Payload),
}

/// Merges new content into a stored document, moving it to a new id when the
/// merged content derives one.
///
/// Merging to identical content writes nothing. A rename never overwrites a
/// different document already stored at the target id: the old document is
/// left in place and [`DocError::DocExists`] carries both sides.
pub async fn update_doc<S, O>(
    store: &S,
    request: UpdateDoc,
    output: &O,
) -> Result<Document, DocError>
where
    S: DocumentStore,
    O: DocOutput + ?Sized,
{
    let UpdateDoc {
        id,
        payload,
        strategy,
    } = request;

    let old = match store.get(&id).await {
        Ok(doc) => doc,
        Err(e) if e.is_missing() => return Err(DocError::NoDocToUpdate(id)),
        Err(e) => return Err(e.into()),
    };

    if let Some(expected) = &payload.rev {
        if *expected != old.rev {
            return Err(UpdateDocError::RevisionMismatch {
                id: old.id,
                expected: expected.clone(),
                actual: old.rev,
            }
            .into());
        }
    }

    let merged = match merge(&old, payload, strategy)? {
        Merged::NoDiff => {
            debug!("update of {} with {} produced no changes", old.id, strategy);
            output.show_no_diff(&old);
            return Ok(old);
        }
        Merged::Changed(merged) => merged,
    };

    let new_id = derive_id(&merged).unwrap_or_else(|| old.id.clone());

    if new_id == old.id {
        let write = merged.with_id(new_id.clone()).with_rev(old.rev.clone());
        store.put(&write).await.map_err(|e| {
            if e.is_conflict() {
                warn!("document {} changed during update", old.id);
            }
            e
        })?;
    } else {
        rename(store, &old, merged.with_id(new_id.clone()), output).await?;
    }

    let new = store.get(&new_id).await?;
    output.show_update(&old, &new);
    Ok(new)
}

/// Writes the merged document under its new id, then removes the old one.
///
/// The two steps are not atomic. If the removal fails both documents remain
/// and the error is returned as is.
async fn rename<S, O>(
    store: &S,
    old: &Document,
    payload: Payload,
    output: &O,
) -> Result<(), DocError>
where
    S: DocumentStore,
    O: DocOutput + ?Sized,
{
    let new_id = payload.id.clone().unwrap_or_default();

    match store.put(&payload).await {
        Ok(_) => {}
        Err(e) if e.is_conflict() => {
            let existing = store.get(&new_id).await?;
            warn!(
                "cannot rename {} to {}: a different document exists there",
                old.id, new_id
            );
            output.show_exists(&existing);
            output.show_failed(&payload);
            return Err(DocError::DocExists {
                attempted: Box::new(payload),
                existing: Box::new(existing),
            });
        }
        Err(e) => return Err(e.into()),
    }

    store.remove(&old.id, &old.rev).await?;
    info!("renamed {} to {}", old.id, new_id);
    output.show_rename(&old.id, &new_id);
    Ok(())
}

fn merge(old: &Document, payload: Payload, strategy: UpdateStrategy) -> Result<Merged, DocError> {
    let incompatible = |payload_kind| UpdateDocError::IncompatiblePayload {
        id: old.id.clone(),
        kind: old.body.kind(),
        payload_kind,
    };

    match (&old.body, payload.body) {
        (Body::View { views, meta }, Body::View { views: new_views, .. }) => {
            merge_views(&old.id, views, meta.as_ref(), new_views, strategy)
        }
        (Body::View { .. }, other) => Err(incompatible(other.kind()).into()),
        (_, Body::View { .. }) => Err(incompatible(DocKind::View).into()),
        (Body::Datum { data, meta }, Body::Datum { data: new_data, meta: new_meta }) => Ok(
            merge_datum(data, meta, new_data, Some(new_meta), strategy),
        ),
        (Body::Datum { data, meta }, Body::DataOnly(new_data)) => {
            Ok(merge_datum(data, meta, new_data, None, strategy))
        }
        (Body::DataOnly(fields), Body::Datum { data: new_data, .. }) => Ok(merge_data_only(
            &old.id,
            fields,
            payload.id,
            new_data,
            strategy,
        )),
        (Body::DataOnly(fields), Body::DataOnly(new_fields)) => Ok(merge_data_only(
            &old.id,
            fields,
            payload.id,
            new_fields,
            strategy,
        )),
    }
}

fn merge_views(
    id: &str,
    views: &BTreeMap<String, ViewDefinition>,
    meta: Option<&Metadata>,
    new_views: BTreeMap<String, ViewDefinition>,
    strategy: UpdateStrategy,
) -> Result<Merged, DocError> {
    match strategy {
        UpdateStrategy::UseOld => Ok(Merged::NoDiff),
        UpdateStrategy::Update | UpdateStrategy::UseNew => {
            if *views == new_views {
                return Ok(Merged::NoDiff);
            }
            let meta = meta.cloned().map(|mut meta| {
                meta.touch();
                meta
            });
            Ok(Merged::Changed(
                Payload::new(Body::View {
                    views: new_views,
                    meta,
                })
                .with_id(id),
            ))
        }
        strategy => Err(UpdateDocError::UnsupportedStrategy {
            strategy,
            kind: DocKind::View,
        }
        .into()),
    }
}

fn merge_datum(
    data: &Data,
    meta: &Metadata,
    new_data: Data,
    new_meta: Option<Metadata>,
    strategy: UpdateStrategy,
) -> Merged {
    let merged_data = combine_data(data, &new_data, strategy);
    let mut merged_meta = meta.clone();

    if new_data.contains_key(FIELD_KEY) {
        match merged_data.get(FIELD_KEY) {
            Some(Value::String(field)) => merged_meta.field_structure = Some(field.clone()),
            None | Some(Value::Null) => merged_meta.field_structure = None,
            Some(_) => {}
        }
    }

    if let Some(new_meta) = new_meta {
        let adopt = match strategy {
            UpdateStrategy::UseOld => false,
            UpdateStrategy::PreferOld => meta.occur_time.is_none(),
            _ => true,
        };
        if adopt && new_meta.occur_time.is_some() {
            merged_meta.occur_time = new_meta.occur_time;
            if new_meta.utc_offset.is_some() {
                merged_meta.utc_offset = new_meta.utc_offset;
            }
        }
    }

    if is_no_diff(data, &merged_data) && merged_meta == *meta {
        return Merged::NoDiff;
    }

    merged_meta.touch();
    Merged::Changed(Payload::datum(merged_data, merged_meta))
}

fn merge_data_only(
    id: &str,
    fields: &Data,
    new_id: Option<String>,
    mut new_fields: Data,
    strategy: UpdateStrategy,
) -> Merged {
    let mut old_fields = fields.clone();
    old_fields.insert(ID_KEY.to_string(), Value::String(id.to_string()));
    if let Some(new_id) = new_id {
        new_fields.insert(ID_KEY.to_string(), Value::String(new_id));
    }

    let mut merged = combine_data(&old_fields, &new_fields, strategy);
    merged
        .entry(ID_KEY)
        .or_insert_with(|| Value::String(id.to_string()));

    if is_no_diff(&old_fields, &merged) {
        return Merged::NoDiff;
    }
    Merged::Changed(Payload::data_only(merged))
}
