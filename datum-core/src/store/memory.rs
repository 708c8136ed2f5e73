//! In-process document store.

use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{DocumentStore, PutResult, StoreError};
use crate::document::{Body, Document, Payload, Revision};

#[derive(Debug, Clone)]
struct Entry {
    rev: Revision,
    /// `None` marks a deleted document.
    body: Option<Body>,
}

/// Document store kept in memory.
///
/// Each operation holds the map lock for its whole check-and-write, which
/// gives the same per-document linearizability a real store offers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-deleted) documents.
    pub async fn len(&self) -> usize {
        self.docs
            .read()
            .await
            .values()
            .filter(|entry| entry.body.is_some())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Document, StoreError> {
        let docs = self.docs.read().await;
        match docs.get(id) {
            None => Err(StoreError::Missing(id.to_string())),
            Some(Entry { body: None, .. }) => Err(StoreError::Deleted(id.to_string())),
            Some(Entry {
                rev,
                body: Some(body),
            }) => Ok(Document {
                id: id.to_string(),
                rev: rev.clone(),
                body: body.clone(),
            }),
        }
    }

    async fn put(&self, payload: &Payload) -> Result<PutResult, StoreError> {
        let id = payload
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(StoreError::MissingId)?;

        let mut docs = self.docs.write().await;
        let previous = match (docs.get(id), &payload.rev) {
            (None, None) => None,
            (Some(entry), None) if entry.body.is_none() => Some(entry.rev.clone()),
            (Some(entry), Some(expected)) if entry.rev == *expected => Some(entry.rev.clone()),
            _ => return Err(StoreError::Conflict(id.to_string())),
        };

        let rev = Revision::mint(previous.as_ref(), Some(&payload.body));
        docs.insert(
            id.to_string(),
            Entry {
                rev: rev.clone(),
                body: Some(payload.body.clone()),
            },
        );

        Ok(PutResult {
            id: id.to_string(),
            rev,
        })
    }

    async fn remove(&self, id: &str, rev: &Revision) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        let entry = docs
            .get_mut(id)
            .ok_or_else(|| StoreError::Missing(id.to_string()))?;

        if entry.body.is_none() {
            return Err(StoreError::Deleted(id.to_string()));
        }
        if entry.rev != *rev {
            return Err(StoreError::Conflict(id.to_string()));
        }

        entry.rev = Revision::mint(Some(&entry.rev), None);
        entry.body = None;
        Ok(())
    }

    async fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs
            .range(prefix.to_string()..)
            .take_while(|(id, _)| id.starts_with(prefix))
            .filter(|(_, entry)| entry.body.is_some())
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn ids_with_human_id_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|(_, entry)| {
                entry
                    .body
                    .as_ref()
                    .and_then(Body::human_id)
                    .is_some_and(|human_id| human_id.starts_with(prefix))
            })
            .map(|(id, _)| id.clone())
            .collect())
    }
}
