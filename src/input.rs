//! Parsing of `key=value` data arguments.

use datum_core::Data;
use serde_json::Value;

#[derive(Debug, PartialEq)]
pub enum DataArgError {
    MissingKey(String),
    DuplicateKey(String),
}

impl std::fmt::Display for DataArgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataArgError::MissingKey(arg) => {
                write!(f, "Data argument '{}' must have the form key=value", arg)
            }
            DataArgError::DuplicateKey(key) => {
                write!(f, "Data key '{}' given more than once", key)
            }
        }
    }
}

impl std::error::Error for DataArgError {}

/// Parses `key=value` arguments into a data object.
pub fn parse_data_args(args: &[String]) -> Result<Data, DataArgError> {
    let mut data = Data::new();
    for arg in args {
        let (key, raw) = split_first_equals(arg)?;
        if data.contains_key(key) {
            return Err(DataArgError::DuplicateKey(key.to_string()));
        }
        data.insert(key.to_string(), infer_value(raw));
    }
    Ok(data)
}

fn split_first_equals(arg: &str) -> Result<(&str, &str), DataArgError> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(DataArgError::MissingKey(arg.to_string())),
    }
}

/// `null` (any case) and JSON literals keep their type; anything else is a
/// string. `nan` and `inf` stay strings since JSON numbers cannot hold them.
pub fn infer_value(raw: &str) -> Value {
    if raw.trim().eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
