//! Merge policies for combining stored data with new partial data.
//!
//! JSON has no `undefined`, so `null` in new data is the absent marker: under
//! the strategies that overwrite, a `null` value deletes the key (the JSON
//! Merge Patch convention).

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::document::{Data, ID_KEY};

/// Keys that `useNew` keeps from old data when new data omits them.
const STRUCTURAL_KEYS: &[&str] = &[ID_KEY];

/// Named policy for merging new data into old data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateStrategy {
    /// Shallow merge, new over old.
    #[default]
    Update,
    /// Deep merge, new over old, nested objects merged recursively.
    Merge,
    /// Like `Update`, but arrays in old data are extended.
    Append,
    /// Only adds keys that old data lacks.
    PreferOld,
    /// Deletes matching keys or array elements from old data.
    Remove,
    /// New data wholesale.
    UseNew,
    /// Old data wholesale.
    UseOld,
}

impl UpdateStrategy {
    pub const ALL: [UpdateStrategy; 7] = [
        UpdateStrategy::Update,
        UpdateStrategy::Merge,
        UpdateStrategy::Append,
        UpdateStrategy::PreferOld,
        UpdateStrategy::Remove,
        UpdateStrategy::UseNew,
        UpdateStrategy::UseOld,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UpdateStrategy::Update => "update",
            UpdateStrategy::Merge => "merge",
            UpdateStrategy::Append => "append",
            UpdateStrategy::PreferOld => "preferOld",
            UpdateStrategy::Remove => "remove",
            UpdateStrategy::UseNew => "useNew",
            UpdateStrategy::UseOld => "useOld",
        }
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for UpdateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UpdateStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = UpdateStrategy::ALL.iter().map(|s| s.name()).collect();
                format!(
                    "Invalid update strategy '{}'. Valid options: {}",
                    s,
                    names.join(", ")
                )
            })
    }
}

/// Combines `old` and `new` under `strategy`. Neither input is modified.
pub fn combine_data(old: &Data, new: &Data, strategy: UpdateStrategy) -> Data {
    match strategy {
        UpdateStrategy::Update => update(old, new),
        UpdateStrategy::Merge => deep_merge(old, new),
        UpdateStrategy::Append => append(old, new),
        UpdateStrategy::PreferOld => prefer_old(old, new),
        UpdateStrategy::Remove => remove(old, new),
        UpdateStrategy::UseNew => use_new(old, new),
        UpdateStrategy::UseOld => old.clone(),
    }
}

/// True when merging changed nothing.
pub fn is_no_diff(old: &Data, merged: &Data) -> bool {
    old == merged
}

fn update(old: &Data, new: &Data) -> Data {
    let mut merged = old.clone();
    for (key, value) in new {
        if value.is_null() {
            merged.remove(key);
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

fn deep_merge(old: &Data, new: &Data) -> Data {
    let mut merged = old.clone();
    for (key, value) in new {
        if value.is_null() {
            merged.remove(key);
            continue;
        }
        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (merged.get_mut(key), value)
        {
            let nested = deep_merge(existing, incoming);
            *existing = nested;
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn append(old: &Data, new: &Data) -> Data {
    let mut merged = old.clone();
    for (key, value) in new {
        if value.is_null() {
            merged.remove(key);
            continue;
        }
        if let Some(Value::Array(existing)) = merged.get_mut(key) {
            match value {
                Value::Array(items) => existing.extend(items.iter().cloned()),
                other => existing.push(other.clone()),
            }
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn prefer_old(old: &Data, new: &Data) -> Data {
    let mut merged = old.clone();
    for (key, value) in new {
        if !value.is_null() && !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

fn remove(old: &Data, new: &Data) -> Data {
    let mut merged = old.clone();
    for (key, value) in new {
        let remove_key = match merged.get_mut(key) {
            None => false,
            Some(Value::Array(items)) if !value.is_null() => {
                let unwanted: Vec<&Value> = match value {
                    Value::Array(values) => values.iter().collect(),
                    other => vec![other],
                };
                items.retain(|item| !unwanted.contains(&item));
                false
            }
            Some(existing) => value.is_null() || *existing == *value,
        };
        if remove_key {
            merged.remove(key);
        }
    }
    merged
}

fn use_new(old: &Data, new: &Data) -> Data {
    let mut merged = new.clone();
    for key in STRUCTURAL_KEYS {
        if merged.contains_key(*key) {
            continue;
        }
        if let Some(value) = old.get(*key) {
            merged.insert(key.to_string(), value.clone());
        }
    }
    merged
}
