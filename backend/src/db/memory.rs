use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::store::{
    CommitOutcome, DocumentStore, KeyVersion, Mutation, Precondition, Versioned, WriteBatch,
};
use crate::error::{AppError, Result};

/// In-memory document store for tests and local development.
///
/// Commits validate and apply under one write lock, which gives the same
/// all-or-nothing behaviour as the Postgres store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<String, StoredDocument>>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    value: Value,
    version: i64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> AppError {
    AppError::storage("memory store lock poisoned")
}

fn list_locked(docs: &BTreeMap<String, StoredDocument>, prefix: &str) -> Vec<KeyVersion> {
    docs.range(prefix.to_string()..)
        .take_while(|(key, _)| key.starts_with(prefix))
        .map(|(key, doc)| KeyVersion {
            key: key.clone(),
            version: doc.version,
        })
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>> {
        let docs = self.documents.read().map_err(|_| poisoned())?;
        Ok(docs.get(key).map(|doc| Versioned {
            value: doc.value.clone(),
            version: doc.version,
        }))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KeyVersion>> {
        let docs = self.documents.read().map_err(|_| poisoned())?;
        Ok(list_locked(&docs, prefix))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome> {
        let mut docs = self.documents.write().map_err(|_| poisoned())?;

        for (key, expected) in &batch.preconditions {
            let holds = match (expected, docs.get(key)) {
                (Precondition::Absent, None) => true,
                (Precondition::Version(v), Some(doc)) => doc.version == *v,
                _ => false,
            };
            if !holds {
                return Ok(CommitOutcome::Conflict { key: key.clone() });
            }
        }

        for (prefix, observed) in &batch.prefix_reads {
            if list_locked(&docs, prefix) != *observed {
                return Ok(CommitOutcome::Conflict {
                    key: prefix.clone(),
                });
            }
        }

        for (key, mutation) in batch.mutations {
            match mutation {
                Mutation::Put(value) => {
                    let version = docs.get(&key).map_or(1, |doc| doc.version + 1);
                    docs.insert(key, StoredDocument { value, version });
                }
                Mutation::Delete => {
                    docs.remove(&key);
                }
            }
        }

        Ok(CommitOutcome::Committed)
    }
}
