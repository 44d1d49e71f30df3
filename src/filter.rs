use crate::selector::Selector;
use crate::store::DocumentStore;
use crate::types::{Entry, Fingerprint, IndexHandle};
use crate::{ConnectorError, Result, DEFAULT_KEY};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Options for a filtering pass. Every field falls back to a default when unset.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Fields making up an entry's identity. Defaults to `["id"]`.
    pub keys: Option<Vec<String>>,
    /// A previously defined index. When absent one is defined over `keys`.
    pub index: Option<IndexHandle>,
    /// Restricts the stored records compared against. Defaults to "every key field is set".
    pub selector: Option<Selector>,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_index(mut self, index: IndexHandle) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_selector(mut self, selector: impl Into<Selector>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    fn resolved_keys(&self) -> Result<Vec<String>> {
        match &self.keys {
            None => Ok(vec![DEFAULT_KEY.to_string()]),
            Some(keys) if keys.is_empty() => Err(ConnectorError::InvalidArgument(
                "At least one key is needed to compare entries".to_string(),
            )),
            Some(keys) => Ok(keys.clone()),
        }
    }
}

/// The `DataFilter` struct drops entries that already exist in a document store.
pub struct DataFilter<'a, S: DocumentStore + ?Sized> {
    /// The store holding previously saved records.
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> DataFilter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Removes from `entries` every entry whose fingerprint matches a stored `doctype` record.
    ///
    /// # Arguments
    ///
    /// * `entries` - The freshly fetched batch.
    /// * `doctype` - The collection to compare against. Must not be empty.
    /// * `options` - Keys, index and selector overrides.
    ///
    /// # Returns
    ///
    /// A `Result` with the entries not yet stored, in their original order, or an error if the
    /// doctype is missing or the store fails.
    #[instrument(skip(self, entries, options), fields(batch = entries.len()))]
    pub async fn filter(
        &self,
        entries: Vec<Entry>,
        doctype: &str,
        options: FilterOptions,
    ) -> Result<Vec<Entry>> {
        debug!("{} entries before filtering", entries.len());

        if doctype.is_empty() {
            return Err(ConnectorError::InvalidArgument(
                "Doctype is mandatory to filter the connector data".to_string(),
            ));
        }

        let keys = options.resolved_keys()?;
        debug!(?keys, "Comparing entries on keys");

        let index = match options.index {
            Some(index) => index,
            None => self
                .store
                .define_index(doctype, &keys)
                .await
                .map_err(|source| store_failure(doctype, source))?,
        };

        let selector = options
            .selector
            .unwrap_or_else(|| Selector::exists_all(&keys));
        debug!(selector = %selector.as_value(), "Querying stored records");

        let stored = self
            .store
            .query(&index, &selector)
            .await
            .map_err(|source| store_failure(doctype, source))?;

        let known = index_by_fingerprint(stored, &keys);

        let fresh: Vec<Entry> = entries
            .into_iter()
            .filter(|entry| !known.contains_key(&Fingerprint::of(entry, &keys)))
            .collect();

        debug!("{} entries after filtering", fresh.len());
        Ok(fresh)
    }
}

/// Filters `entries` against the `doctype` records of `store`. See [`DataFilter::filter`].
pub async fn filter_data<S: DocumentStore + ?Sized>(
    store: &S,
    entries: Vec<Entry>,
    doctype: &str,
    options: FilterOptions,
) -> Result<Vec<Entry>> {
    DataFilter::new(store).filter(entries, doctype, options).await
}

/// Later records overwrite earlier ones sharing a fingerprint.
fn index_by_fingerprint(stored: Vec<Entry>, keys: &[String]) -> HashMap<Fingerprint, Entry> {
    stored
        .into_iter()
        .map(|record| (Fingerprint::of(&record, keys), record))
        .collect()
}

fn store_failure(doctype: &str, source: crate::store::StoreError) -> ConnectorError {
    ConnectorError::StoreQueryFailed {
        doctype: doctype.to_string(),
        source,
    }
}
