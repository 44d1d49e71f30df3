use crate::selector::Selector;
use crate::types::{Entry, IndexHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

/// Errors reported by a `DocumentStore` implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("backend error: {0}")]
    Backend(String),
}

/// The remote document store a connector writes its records into.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Defines (or fetches, if it already exists) an index over `fields` of `doctype`.
    async fn define_index(&self, doctype: &str, fields: &[String]) -> Result<IndexHandle, StoreError>;

    /// Returns every record of the index's doctype that matches `selector`.
    async fn query(&self, index: &IndexHandle, selector: &Selector) -> Result<Vec<Entry>, StoreError>;
}

/// An in-process `DocumentStore`.
///
/// Records are kept per doctype in insertion order. Index and query calls are counted so callers
/// can check how often the store was hit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Entry>>>,
    index_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entries` to the `doctype` collection.
    pub fn insert(&self, doctype: &str, entries: impl IntoIterator<Item = Entry>) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        collections
            .entry(doctype.to_string())
            .or_default()
            .extend(entries);
        Ok(())
    }

    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn define_index(&self, doctype: &str, fields: &[String]) -> Result<IndexHandle, StoreError> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        Ok(IndexHandle::new(doctype, fields))
    }

    async fn query(&self, index: &IndexHandle, selector: &Selector) -> Result<Vec<Entry>, StoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);

        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let records: Vec<Entry> = collections
            .get(&index.doctype)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| selector.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        debug!(doctype = %index.doctype, index = %index.name, count = records.len(), "Memory store query");
        Ok(records)
    }
}
