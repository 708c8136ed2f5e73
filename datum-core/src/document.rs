//! Document model shared by the stores and the control layer.
//!
//! On the wire a document is a flat JSON object with CouchDB-style `_id` and
//! `_rev` keys. Everything else is its [`Body`], which comes in three shapes
//! told apart structurally:
//!
//! - view documents carry a `views` object
//! - datum documents carry both a `data` and a `meta` object
//! - anything else is a data-only document with freeform top-level fields

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Freeform keyed content of a document.
pub type Data = Map<String, Value>;

pub const ID_KEY: &str = "_id";
pub const REV_KEY: &str = "_rev";
pub const DATA_KEY: &str = "data";
pub const META_KEY: &str = "meta";
pub const VIEWS_KEY: &str = "views";

/// Errors raised when a JSON value does not have the shape of a document.
#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("Document must be a JSON object")]
    NotAnObject,

    #[error("Document has no string _id")]
    MissingId,

    #[error("Document {0} has no string _rev")]
    MissingRev(String),

    #[error("Invalid document body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Opaque revision token assigned by a store.
///
/// The control layer only ever compares revisions for equality. Stores mint
/// them as `<generation>-<digest>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generation counter of a store-minted revision, if it has one.
    pub fn generation(&self) -> Option<u64> {
        self.0
            .split_once('-')
            .and_then(|(generation, _)| generation.parse().ok())
    }

    /// Mints the revision that follows `previous` for the given body.
    ///
    /// A `None` body mints a deletion (tombstone) revision.
    pub fn mint(previous: Option<&Revision>, body: Option<&Body>) -> Self {
        let generation = previous.and_then(Revision::generation).unwrap_or(0) + 1;

        let mut hasher = Sha256::new();
        if let Some(prev) = previous {
            hasher.update(prev.as_str().as_bytes());
        }
        match body {
            Some(body) => hasher.update(Value::Object(body.to_fields()).to_string().as_bytes()),
            None => hasher.update(b"deleted"),
        }

        let digest: String = hasher
            .finalize()
            .iter()
            .take(16)
            .map(|b| format!("{:02x}", b))
            .collect();
        Self(format!("{}-{}", generation, digest))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The time a record logically concerns: either a whole day or an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OccurTime {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl OccurTime {
    /// Stable textual form used as the time part of derived ids.
    pub fn id_component(&self) -> String {
        match self {
            OccurTime::Date(date) => date.format("%Y-%m-%d").to_string(),
            OccurTime::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl fmt::Display for OccurTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id_component())
    }
}

impl FromStr for OccurTime {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(OccurTime::Date(date));
        }
        let dt = DateTime::parse_from_rfc3339(s)?;
        Ok(OccurTime::DateTime(dt.with_timezone(&Utc)))
    }
}

/// Bookkeeping carried alongside datum content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modify_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occur_time: Option<OccurTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<f64>,

    /// Name of the `data` field whose value takes part in the derived id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_structure: Option<String>,

    /// Workflow fields (e.g. `lastState`) owned by higher layers.
    #[serde(flatten)]
    pub extra: Data,
}

impl Metadata {
    /// Stamps a fresh modify time, always later than the previous one.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.modify_time = Some(match self.modify_time {
            Some(previous) if now <= previous => previous + Duration::milliseconds(1),
            _ => now,
        });
    }
}

/// A single derived-view definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub map: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
}

/// Which of the three document shapes a body has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Datum,
    View,
    DataOnly,
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocKind::Datum => write!(f, "datum"),
            DocKind::View => write!(f, "view"),
            DocKind::DataOnly => write!(f, "data-only"),
        }
    }
}

/// Document content without its `_id` and `_rev`.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Datum {
        data: Data,
        meta: Metadata,
    },
    View {
        views: BTreeMap<String, ViewDefinition>,
        meta: Option<Metadata>,
    },
    DataOnly(Data),
}

impl Body {
    pub fn kind(&self) -> DocKind {
        match self {
            Body::Datum { .. } => DocKind::Datum,
            Body::View { .. } => DocKind::View,
            Body::DataOnly(_) => DocKind::DataOnly,
        }
    }

    pub fn meta(&self) -> Option<&Metadata> {
        match self {
            Body::Datum { meta, .. } => Some(meta),
            Body::View { meta, .. } => meta.as_ref(),
            Body::DataOnly(_) => None,
        }
    }

    pub fn human_id(&self) -> Option<&str> {
        self.meta().and_then(|meta| meta.human_id.as_deref())
    }

    /// Classifies a flat JSON object. `_id` and `_rev` are ignored.
    pub fn from_fields(mut fields: Data) -> Result<Self, ShapeError> {
        fields.remove(ID_KEY);
        fields.remove(REV_KEY);

        if let Some(Value::Object(_)) = fields.get(VIEWS_KEY) {
            let views = serde_json::from_value(fields.remove(VIEWS_KEY).unwrap_or_default())?;
            let meta = fields
                .remove(META_KEY)
                .filter(|meta| !meta.is_null())
                .map(serde_json::from_value)
                .transpose()?;
            return Ok(Body::View { views, meta });
        }

        let is_datum = matches!(fields.get(DATA_KEY), Some(Value::Object(_)))
            && matches!(fields.get(META_KEY), Some(Value::Object(_)));
        if is_datum {
            let data = match fields.remove(DATA_KEY) {
                Some(Value::Object(data)) => data,
                _ => Data::new(),
            };
            let meta = serde_json::from_value(fields.remove(META_KEY).unwrap_or_default())?;
            return Ok(Body::Datum { data, meta });
        }

        Ok(Body::DataOnly(fields))
    }

    /// Flattens the body back into JSON object fields.
    pub fn to_fields(&self) -> Data {
        match self {
            Body::Datum { data, meta } => {
                let mut fields = Data::new();
                fields.insert(DATA_KEY.to_string(), Value::Object(data.clone()));
                fields.insert(META_KEY.to_string(), meta_to_value(meta));
                fields
            }
            Body::View { views, meta } => {
                let mut fields = Data::new();
                let views = views
                    .iter()
                    .map(|(name, view)| (name.clone(), view_to_value(view)))
                    .collect();
                fields.insert(VIEWS_KEY.to_string(), Value::Object(views));
                if let Some(meta) = meta {
                    fields.insert(META_KEY.to_string(), meta_to_value(meta));
                }
                fields
            }
            Body::DataOnly(data) => data.clone(),
        }
    }
}

// Both are string-keyed structs, so serialization cannot fail.
fn meta_to_value(meta: &Metadata) -> Value {
    serde_json::to_value(meta).unwrap_or_default()
}

fn view_to_value(view: &ViewDefinition) -> Value {
    serde_json::to_value(view).unwrap_or_default()
}

fn take_id_and_rev(fields: &mut Data) -> (Option<String>, Option<Revision>) {
    let id = match fields.remove(ID_KEY) {
        Some(Value::String(id)) => Some(id),
        _ => None,
    };
    let rev = match fields.remove(REV_KEY) {
        Some(Value::String(rev)) => Some(Revision::new(rev)),
        _ => None,
    };
    (id, rev)
}

fn split_object(value: Value) -> Result<(Option<String>, Option<Revision>, Data), ShapeError> {
    let Value::Object(mut fields) = value else {
        return Err(ShapeError::NotAnObject);
    };
    let (id, rev) = take_id_and_rev(&mut fields);
    Ok((id, rev, fields))
}

fn join_object(id: Option<&str>, rev: Option<&Revision>, body: &Body) -> Value {
    let mut fields = Data::new();
    if let Some(id) = id {
        fields.insert(ID_KEY.to_string(), Value::String(id.to_string()));
    }
    if let Some(rev) = rev {
        fields.insert(REV_KEY.to_string(), Value::String(rev.to_string()));
    }
    fields.extend(body.to_fields());
    Value::Object(fields)
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub rev: Revision,
    pub body: Body,
}

impl Document {
    pub fn from_json(value: Value) -> Result<Self, ShapeError> {
        let (id, rev, fields) = split_object(value)?;
        let id = id.ok_or(ShapeError::MissingId)?;
        let rev = rev.ok_or_else(|| ShapeError::MissingRev(id.clone()))?;
        Ok(Self {
            id,
            rev,
            body: Body::from_fields(fields)?,
        })
    }

    pub fn to_json(&self) -> Value {
        join_object(Some(&self.id), Some(&self.rev), &self.body)
    }

    pub fn human_id(&self) -> Option<&str> {
        self.body.human_id()
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// Content on its way into the store: the id may not be assigned yet and the
/// revision, when present, is the one the writer expects to replace.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub id: Option<String>,
    pub rev: Option<Revision>,
    pub body: Body,
}

impl Payload {
    pub fn new(body: Body) -> Self {
        Self {
            id: None,
            rev: None,
            body,
        }
    }

    pub fn datum(data: Data, meta: Metadata) -> Self {
        Self::new(Body::Datum { data, meta })
    }

    /// Builds a data-only payload, lifting `_id` and `_rev` out of the fields.
    ///
    /// The fields are not classified: `data`/`meta`/`views` keys stay freeform.
    pub fn data_only(mut fields: Data) -> Self {
        let (id, rev) = take_id_and_rev(&mut fields);
        Self {
            id,
            rev,
            body: Body::DataOnly(fields),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_rev(mut self, rev: Revision) -> Self {
        self.rev = Some(rev);
        self
    }

    pub fn from_json(value: Value) -> Result<Self, ShapeError> {
        let (id, rev, fields) = split_object(value)?;
        Ok(Self {
            id,
            rev,
            body: Body::from_fields(fields)?,
        })
    }

    pub fn to_json(&self) -> Value {
        join_object(self.id.as_deref(), self.rev.as_ref(), &self.body)
    }
}

impl From<Document> for Payload {
    fn from(doc: Document) -> Self {
        Self {
            id: Some(doc.id),
            rev: Some(doc.rev),
            body: doc.body,
        }
    }
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}
