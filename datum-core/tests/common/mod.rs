#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use datum_core::{
    DocOutput, Document, DocumentStore, MemoryStore, Payload, PutResult, Revision, StoreError,
};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Exists(String),
    NoDiff(String),
    Create(String),
    Update { before: String, after: String },
    Rename { from: String, to: String },
    Delete(String),
    Failed(Option<String>),
}

/// Presenter that records every notification it receives.
#[derive(Default)]
pub struct RecordingOutput {
    events: Mutex<Vec<Event>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl DocOutput for RecordingOutput {
    fn show_exists(&self, doc: &Document) {
        self.push(Event::Exists(doc.id.clone()));
    }

    fn show_no_diff(&self, doc: &Document) {
        self.push(Event::NoDiff(doc.id.clone()));
    }

    fn show_create(&self, doc: &Document) {
        self.push(Event::Create(doc.id.clone()));
    }

    fn show_update(&self, before: &Document, after: &Document) {
        self.push(Event::Update {
            before: before.id.clone(),
            after: after.id.clone(),
        });
    }

    fn show_rename(&self, old_id: &str, new_id: &str) {
        self.push(Event::Rename {
            from: old_id.to_string(),
            to: new_id.to_string(),
        });
    }

    fn show_delete(&self, doc: &Document) {
        self.push(Event::Delete(doc.id.clone()));
    }

    fn show_failed(&self, payload: &Payload) {
        self.push(Event::Failed(payload.id.clone()));
    }
}

/// In-memory store that counts successful writes.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    puts: AtomicUsize,
    removes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.puts.load(Ordering::SeqCst) + self.removes.load(Ordering::SeqCst)
    }
}

impl DocumentStore for CountingStore {
    async fn get(&self, id: &str) -> Result<Document, StoreError> {
        self.inner.get(id).await
    }

    async fn put(&self, payload: &Payload) -> Result<PutResult, StoreError> {
        let result = self.inner.put(payload).await?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }

    async fn remove(&self, id: &str, rev: &Revision) -> Result<(), StoreError> {
        self.inner.remove(id, rev).await?;
        self.removes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.ids_with_prefix(prefix).await
    }

    async fn ids_with_human_id_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.ids_with_human_id_prefix(prefix).await
    }
}

/// In-memory store whose removals always fail, leaving a rename half done.
#[derive(Default)]
pub struct CrashOnRemoveStore {
    pub inner: MemoryStore,
}

impl DocumentStore for CrashOnRemoveStore {
    async fn get(&self, id: &str) -> Result<Document, StoreError> {
        self.inner.get(id).await
    }

    async fn put(&self, payload: &Payload) -> Result<PutResult, StoreError> {
        self.inner.put(payload).await
    }

    async fn remove(&self, _id: &str, _rev: &Revision) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection lost".to_string()))
    }

    async fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.ids_with_prefix(prefix).await
    }

    async fn ids_with_human_id_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.ids_with_human_id_prefix(prefix).await
    }
}

/// In-memory store that yields to the scheduler after every read, so that
/// concurrent operations interleave between fetch and write.
#[derive(Default)]
pub struct YieldingStore {
    pub inner: MemoryStore,
}

impl DocumentStore for YieldingStore {
    async fn get(&self, id: &str) -> Result<Document, StoreError> {
        let doc = self.inner.get(id).await;
        tokio::task::yield_now().await;
        doc
    }

    async fn put(&self, payload: &Payload) -> Result<PutResult, StoreError> {
        self.inner.put(payload).await
    }

    async fn remove(&self, id: &str, rev: &Revision) -> Result<(), StoreError> {
        self.inner.remove(id, rev).await
    }

    async fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.ids_with_prefix(prefix).await
    }

    async fn ids_with_human_id_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.ids_with_human_id_prefix(prefix).await
    }
}

pub async fn seed<S: DocumentStore>(store: &S, value: Value) -> Document {
    let payload = Payload::from_json(value).unwrap();
    let result = store.put(&payload).await.unwrap();
    store.get(&result.id).await.unwrap()
}

pub fn payload(value: Value) -> Payload {
    Payload::from_json(value).unwrap()
}
