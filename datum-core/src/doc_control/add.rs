use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::combine::UpdateStrategy;
use crate::document::{Body, Data, Document, Metadata, OccurTime, Payload};
use crate::error::DocError;
use crate::ids::{assemble_id, new_human_id, FIELD_KEY};
use crate::output::DocOutput;
use crate::store::DocumentStore;

use super::update::{update_doc, UpdateDoc};

/// Request to store a new document.
#[derive(Debug, Clone)]
pub struct AddDoc {
    pub payload: Payload,
    /// Strategy to merge with a different document already at the id.
    /// `None` fails with [`DocError::DocExists`] instead.
    pub on_conflict: Option<UpdateStrategy>,
}

impl AddDoc {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            on_conflict: None,
        }
    }

    pub fn on_conflict(mut self, strategy: UpdateStrategy) -> Self {
        self.on_conflict = Some(strategy);
        self
    }
}

/// Builds a datum payload with fresh metadata.
///
/// Without an explicit occur time the datum occurs at `now`.
pub fn prepare_datum(
    data: Data,
    occur_time: Option<OccurTime>,
    utc_offset: Option<f64>,
    now: DateTime<Utc>,
) -> Payload {
    let field_structure = match data.get(FIELD_KEY) {
        Some(Value::String(field)) => Some(field.clone()),
        _ => None,
    };
    let meta = Metadata {
        human_id: Some(new_human_id()),
        create_time: Some(now),
        modify_time: Some(now),
        occur_time: Some(occur_time.unwrap_or(OccurTime::DateTime(now))),
        utc_offset,
        field_structure,
        extra: Data::new(),
    };
    Payload::datum(data, meta)
}

/// Stores a new document at its assembled id.
///
/// An explicit payload id is used as given. Re-adding content identical to
/// what is already stored returns the stored document without writing.
pub async fn add_doc<S, O>(store: &S, request: AddDoc, output: &O) -> Result<Document, DocError>
where
    S: DocumentStore,
    O: DocOutput + ?Sized,
{
    let AddDoc {
        mut payload,
        on_conflict,
    } = request;

    let id = match payload.id.take().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => assemble_id(&payload)?,
    };
    payload.id = Some(id.clone());
    payload.rev = None;

    match store.put(&payload).await {
        Ok(_) => {
            let doc = store.get(&id).await?;
            info!("created {}", doc.id);
            output.show_create(&doc);
            return Ok(doc);
        }
        Err(e) if e.is_conflict() => {}
        Err(e) => return Err(e.into()),
    }

    let existing = store.get(&id).await?;
    if same_content(&existing.body, &payload.body) {
        output.show_exists(&existing);
        return Ok(existing);
    }

    if let Some(strategy) = on_conflict {
        let request = UpdateDoc {
            id,
            payload,
            strategy,
        };
        return update_doc(store, request, output).await;
    }

    warn!("document already exists at {}", id);
    output.show_exists(&existing);
    output.show_failed(&payload);
    Err(DocError::DocExists {
        attempted: Box::new(payload),
        existing: Box::new(existing),
    })
}

/// Datum bodies match on content and occurrence; bookkeeping such as the
/// human id or timestamps is ignored.
fn same_content(existing: &Body, new: &Body) -> bool {
    match (existing, new) {
        (
            Body::Datum { data, meta },
            Body::Datum {
                data: new_data,
                meta: new_meta,
            },
        ) => {
            data == new_data
                && meta.occur_time == new_meta.occur_time
                && meta.utc_offset == new_meta.utc_offset
        }
        (Body::View { views, .. }, Body::View { views: new_views, .. }) => views == new_views,
        (existing, new) => existing == new,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn obj(value: Value) -> Data {
        match value {
            Value::Object(data) => data,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_prepare_datum_metadata() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 0).unwrap();
        let payload = prepare_datum(
            obj(json!({"field": "activity", "activity": "run"})),
            None,
            Some(-5.0),
            now,
        );

        let meta = payload.body.meta().unwrap();
        assert_eq!(meta.create_time, Some(now));
        assert_eq!(meta.modify_time, Some(now));
        assert_eq!(meta.occur_time, Some(OccurTime::DateTime(now)));
        assert_eq!(meta.utc_offset, Some(-5.0));
        assert_eq!(meta.field_structure.as_deref(), Some("activity"));
        assert_eq!(meta.human_id.as_ref().map(String::len), Some(10));
        assert_eq!(
            assemble_id(&payload).unwrap(),
            "2024-03-01T08:15:00.000Z:run"
        );
    }

    #[test]
    fn test_prepare_datum_keeps_explicit_occur_time() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 0).unwrap();
        let occur: OccurTime = "2024-02-29".parse().unwrap();
        let payload = prepare_datum(obj(json!({"a": 1})), Some(occur), None, now);

        assert_eq!(payload.body.meta().unwrap().occur_time, Some(occur));
        assert!(payload.body.meta().unwrap().field_structure.is_none());
    }

    #[test]
    fn test_same_content_ignores_bookkeeping() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 0).unwrap();
        let occur: OccurTime = "2024-03-01".parse().unwrap();
        let a = prepare_datum(obj(json!({"a": 1})), Some(occur), None, now);
        let b = prepare_datum(obj(json!({"a": 1})), Some(occur), None, now);
        let c = prepare_datum(obj(json!({"a": 2})), Some(occur), None, now);

        assert!(same_content(&a.body, &b.body));
        assert!(!same_content(&a.body, &c.body));
        assert!(!same_content(&a.body, &Body::DataOnly(obj(json!({"a": 1})))));
    }
}
