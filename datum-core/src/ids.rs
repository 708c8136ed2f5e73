//! Canonical id assembly.
//!
//! Datum ids are derived from content so that two independent submissions of
//! the same event land on the same id: the occur time, optionally followed by
//! the value of the composite field named in `meta.fieldStructure`.
//!
//! ```text
//! 2024-03-01T08:15:00.000Z
//! 2024-03-01:morning_run
//! ```

use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use thiserror::Error;

use crate::document::{Body, Data, Metadata, Payload};

/// Data key that, when present in new data, names the composite field.
pub const FIELD_KEY: &str = "field";

/// Separates the time part of an id from the composite field value.
pub const ID_DELIMITER: char = ':';

const HUMAN_ID_LEN: usize = 10;

/// Reasons an id cannot be derived from a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Payload has no occurTime to derive an id from")]
    MissingOccurTime,

    #[error("Payload has no _id and its kind does not derive one")]
    MissingId,

    #[error("Composite field '{0}' is missing from data")]
    MissingField(String),

    #[error("Composite field '{field}' cannot be part of an id: {reason}")]
    InvalidFieldValue { field: String, reason: &'static str },
}

/// Assembles the canonical id of a payload.
///
/// Datum payloads derive their id from `meta`; view and data-only payloads
/// can only use the `_id` they already carry.
pub fn assemble_id(payload: &Payload) -> Result<String, IdError> {
    match &payload.body {
        Body::Datum { data, meta } => assemble_datum_id(data, meta),
        Body::View { .. } | Body::DataOnly(_) => payload
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(IdError::MissingId),
    }
}

/// Like [`assemble_id`], but treats "cannot derive" as "no opinion".
pub fn derive_id(payload: &Payload) -> Option<String> {
    match assemble_id(payload) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::debug!("id not derivable, keeping existing id: {}", e);
            None
        }
    }
}

fn assemble_datum_id(data: &Data, meta: &Metadata) -> Result<String, IdError> {
    let occur_time = meta.occur_time.ok_or(IdError::MissingOccurTime)?;
    let mut id = occur_time.id_component();

    if let Some(field) = &meta.field_structure {
        let value = data
            .get(field)
            .ok_or_else(|| IdError::MissingField(field.clone()))?;
        id.push(ID_DELIMITER);
        id.push_str(&field_fragment(field, value)?);
    }

    Ok(id)
}

fn field_fragment(field: &str, value: &Value) -> Result<String, IdError> {
    let invalid = |reason| IdError::InvalidFieldValue {
        field: field.to_string(),
        reason,
    };

    match value {
        Value::String(s) => {
            let cleaned = sanitize(s);
            if cleaned.is_empty() {
                Err(invalid("empty string"))
            } else {
                Ok(cleaned)
            }
        }
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(invalid("null")),
        Value::Array(_) | Value::Object(_) => Err(invalid("not a scalar")),
    }
}

fn sanitize(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == ID_DELIMITER || c == '/' {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Generates a short random id for disambiguated lookup.
pub fn new_human_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(HUMAN_ID_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn datum(data: Value, meta: Value) -> Payload {
        let data = match data {
            Value::Object(data) => data,
            _ => panic!("data must be an object"),
        };
        Payload::datum(data, serde_json::from_value(meta).unwrap())
    }

    #[test]
    fn test_time_only_id() {
        let payload = datum(json!({"mood": "ok"}), json!({"occurTime": "2024-03-01T08:15:00Z"}));
        assert_eq!(assemble_id(&payload).unwrap(), "2024-03-01T08:15:00.000Z");
    }

    #[test]
    fn test_date_only_id() {
        let payload = datum(json!({}), json!({"occurTime": "2024-03-01"}));
        assert_eq!(assemble_id(&payload).unwrap(), "2024-03-01");
    }

    #[test]
    fn test_composite_field_id() {
        let payload = datum(
            json!({"activity": "morning run", "distance": 5}),
            json!({"occurTime": "2024-03-01", "fieldStructure": "activity"}),
        );
        assert_eq!(assemble_id(&payload).unwrap(), "2024-03-01:morning_run");
    }

    #[test]
    fn test_numeric_field_value() {
        let payload = datum(
            json!({"lap": 3}),
            json!({"occurTime": "2024-03-01", "fieldStructure": "lap"}),
        );
        assert_eq!(assemble_id(&payload).unwrap(), "2024-03-01:3");
    }

    #[test]
    fn test_field_value_is_sanitized() {
        let payload = datum(
            json!({"project": " a/b:c "}),
            json!({"occurTime": "2024-03-01", "fieldStructure": "project"}),
        );
        assert_eq!(assemble_id(&payload).unwrap(), "2024-03-01:a_b_c");
    }

    #[test]
    fn test_deterministic_and_ignores_unrelated_fields() {
        let meta = json!({"occurTime": "2024-03-01T08:15:00Z", "fieldStructure": "activity"});
        let a = datum(json!({"activity": "run", "distance": 5}), meta.clone());
        let b = datum(json!({"activity": "run", "distance": 7}), meta.clone());

        assert_eq!(assemble_id(&a).unwrap(), assemble_id(&a.clone()).unwrap());
        assert_eq!(assemble_id(&a).unwrap(), assemble_id(&b).unwrap());
    }

    #[test]
    fn test_missing_occur_time_fails() {
        let payload = datum(json!({"a": 1}), json!({"humanId": "abc"}));
        assert_eq!(assemble_id(&payload), Err(IdError::MissingOccurTime));
    }

    #[test]
    fn test_missing_composite_field_fails() {
        let payload = datum(
            json!({"a": 1}),
            json!({"occurTime": "2024-03-01", "fieldStructure": "activity"}),
        );
        assert_eq!(
            assemble_id(&payload),
            Err(IdError::MissingField("activity".to_string()))
        );
    }

    #[test]
    fn test_non_scalar_field_fails() {
        let payload = datum(
            json!({"activity": ["run"]}),
            json!({"occurTime": "2024-03-01", "fieldStructure": "activity"}),
        );
        assert!(matches!(
            assemble_id(&payload),
            Err(IdError::InvalidFieldValue { .. })
        ));
    }

    #[test]
    fn test_data_only_uses_own_id() {
        let payload = Payload::new(Body::DataOnly(Data::new())).with_id("the_quick_brown_fox");
        assert_eq!(assemble_id(&payload).unwrap(), "the_quick_brown_fox");

        let anonymous = Payload::new(Body::DataOnly(Data::new()));
        assert_eq!(assemble_id(&anonymous), Err(IdError::MissingId));
        assert_eq!(derive_id(&anonymous), None);
    }

    #[test]
    fn test_datum_ignores_explicit_id() {
        let payload =
            datum(json!({}), json!({"occurTime": "2024-03-01"})).with_id("something-else");
        assert_eq!(assemble_id(&payload).unwrap(), "2024-03-01");
    }

    #[test]
    fn test_human_id_shape() {
        let a = new_human_id();
        let b = new_human_id();
        assert_eq!(a.len(), HUMAN_ID_LEN);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(a, b);
    }
}
