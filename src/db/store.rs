use crate::{Error, Result};
use chrono::Utc;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// A normalized record stored in its own collection, keyed by upstream id.
pub trait Document: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;

    fn id(&self) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// One fjall partition holding JSON documents of a single type.
pub struct Collection<D> {
    partition: PartitionHandle,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Clone for Collection<D> {
    fn clone(&self) -> Self {
        Self {
            partition: self.partition.clone(),
            _marker: PhantomData,
        }
    }
}

impl<D: Document> Collection<D> {
    pub fn open(keyspace: &Keyspace) -> Result<Self> {
        let partition = keyspace.open_partition(D::COLLECTION, PartitionCreateOptions::default())?;
        debug!("{} collection opened", D::COLLECTION);

        Ok(Self {
            partition,
            _marker: PhantomData,
        })
    }

    pub fn name(&self) -> &'static str {
        D::COLLECTION
    }

    fn key(id: i64) -> [u8; 8] {
        id.to_be_bytes()
    }

    pub fn get(&self, id: i64) -> Result<Option<D>> {
        match self.partition.get(&Self::key(id)[..])? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn get_raw(&self, id: i64) -> Result<Option<Value>> {
        match self.partition.get(&Self::key(id)[..])? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Insert the document if `key` is absent, otherwise overwrite the
    /// fields the document carries. Fields already stored but absent from
    /// the patch are kept. `unique_key` is written with `key` as its value.
    pub fn upsert(&self, unique_key: &str, key: i64, doc: &D) -> Result<UpsertOutcome> {
        let Value::Object(patch) = serde_json::to_value(doc)? else {
            return Err(Error::Other(format!(
                "{} documents must serialize to JSON objects",
                D::COLLECTION
            )));
        };

        let now = serde_json::to_value(Utc::now())?;
        let (mut merged, outcome) = match self.get_raw(key)? {
            Some(Value::Object(existing)) => (existing, UpsertOutcome::Updated),
            _ => {
                let mut fresh = Map::new();
                fresh.insert("created_at".to_string(), now.clone());
                (fresh, UpsertOutcome::Inserted)
            }
        };

        merged.extend(patch);
        merged.insert(unique_key.to_string(), Value::from(key));
        merged.insert("updated_at".to_string(), now);

        let bytes = serde_json::to_vec(&Value::Object(merged))?;
        self.partition.insert(&Self::key(key)[..], bytes.as_slice())?;
        debug!("{} {} {:?}", D::COLLECTION, key, outcome);

        Ok(outcome)
    }

    fn raw_documents(&self) -> impl Iterator<Item = Result<Value>> + '_ {
        self.partition.iter().map(|item| -> Result<Value> {
            let (_, value) = item?;
            Ok(serde_json::from_slice(&value)?)
        })
    }

    pub fn all(&self) -> Result<Vec<D>> {
        self.find(|_| true)
    }

    pub fn find<F>(&self, filter: F) -> Result<Vec<D>>
    where
        F: Fn(&D) -> bool,
    {
        let mut documents = Vec::new();

        for item in self.partition.iter() {
            let (_, value) = item?;
            let document: D = serde_json::from_slice(&value)?;

            if filter(&document) {
                documents.push(document);
            }
        }

        Ok(documents)
    }

    /// Every distinct id referenced at `id_field` across the collection.
    ///
    /// Scalar fields skip null/missing values; array fields are flattened,
    /// skipping empty arrays. An empty result is not an error.
    pub fn extract_ids(&self, id_field: &str, is_array_field: bool) -> Result<BTreeSet<i64>> {
        let mut ids = BTreeSet::new();

        for document in self.raw_documents() {
            let document = document?;
            match (document.get(id_field), is_array_field) {
                (Some(Value::Array(values)), true) => {
                    ids.extend(values.iter().filter_map(Value::as_i64));
                }
                (Some(value), false) => {
                    if let Some(id) = value.as_i64() {
                        ids.insert(id);
                    }
                }
                _ => {}
            }
        }

        if ids.is_empty() {
            warn!(
                "No {} values found in the {} collection",
                id_field,
                D::COLLECTION
            );
        } else {
            info!(
                "Found {} unique {} values in the {} collection",
                ids.len(),
                id_field,
                D::COLLECTION
            );
        }

        Ok(ids)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.partition.len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.partition.is_empty()?)
    }
}
