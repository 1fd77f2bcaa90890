//! Transactional executor.
//!
//! A unit of work reads through a [`Transaction`], which remembers the version
//! of every document and prefix it observed and buffers every write. Commit
//! hands both to the store, which applies the writes only if nothing observed
//! has changed. On a conflict the whole unit is re-run from scratch against
//! fresh state, up to a bounded number of attempts.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::Rng;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::{DEFAULT_TX_MAX_ATTEMPTS, TX_BACKOFF_BASE_MS, TX_BACKOFF_MAX_MS};
use crate::db::store::{
    CommitOutcome, DocumentStore, KeyVersion, Mutation, Precondition, WriteBatch,
};
use crate::error::{AppError, Result};

/// Everything one attempt observed. Shared with the executor so the
/// snapshot can still be validated when the unit of work fails.
#[derive(Debug, Default)]
struct ReadSet {
    keys: BTreeMap<String, (Precondition, Option<Value>)>,
    prefixes: BTreeMap<String, Vec<KeyVersion>>,
}

#[derive(Debug, Clone, Default)]
struct SharedReads(Arc<Mutex<ReadSet>>);

impl SharedReads {
    fn lock(&self) -> Result<MutexGuard<'_, ReadSet>> {
        self.0
            .lock()
            .map_err(|_| AppError::storage("transaction read set poisoned"))
    }

    /// A batch without mutations that commits only if every read still holds.
    fn validation_batch(&self) -> Result<WriteBatch> {
        let reads = self.lock()?;
        Ok(WriteBatch {
            preconditions: reads
                .keys
                .iter()
                .map(|(key, (precondition, _))| (key.clone(), *precondition))
                .collect(),
            prefix_reads: reads.prefixes.clone(),
            mutations: BTreeMap::new(),
        })
    }
}

/// Read set plus buffered writes of one attempt.
pub struct Transaction {
    store: Arc<dyn DocumentStore>,
    reads: SharedReads,
    writes: BTreeMap<String, Mutation>,
}

impl Transaction {
    fn begin(store: Arc<dyn DocumentStore>, reads: SharedReads) -> Self {
        Self {
            store,
            reads,
            writes: BTreeMap::new(),
        }
    }

    /// Reads and decodes a document. Repeated reads return the same snapshot,
    /// and keys written earlier in this transaction return the buffered value.
    pub async fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        if let Some(mutation) = self.writes.get(key) {
            return match mutation {
                Mutation::Put(value) => Ok(Some(serde_json::from_value(value.clone())?)),
                Mutation::Delete => Ok(None),
            };
        }

        let cached = self.reads.lock()?.keys.get(key).map(|(_, value)| value.clone());
        let value = match cached {
            Some(value) => value,
            None => {
                let doc = self.store.get(key).await?;
                let observed = match doc {
                    Some(doc) => (Precondition::Version(doc.version), Some(doc.value)),
                    None => (Precondition::Absent, None),
                };
                let value = observed.1.clone();
                self.reads.lock()?.keys.insert(key.to_string(), observed);
                value
            }
        };

        value
            .map(|value| serde_json::from_value(value).map_err(AppError::from))
            .transpose()
    }

    /// Like [`Transaction::get`], but a missing document is `NotFound`.
    pub async fn require<T: DeserializeOwned>(&mut self, key: &str, what: &str) -> Result<T> {
        self.get(key)
            .await?
            .ok_or_else(|| AppError::NotFound(what.to_string()))
    }

    /// Lists keys under `prefix` as this transaction sees them. The commit
    /// fails if any other writer adds, removes or changes a key under it.
    pub async fn list_keys(&mut self, prefix: &str) -> Result<Vec<String>> {
        let cached = self.reads.lock()?.prefixes.get(prefix).cloned();
        let listed = match cached {
            Some(listed) => listed,
            None => {
                let listed = self.store.list(prefix).await?;
                self.reads
                    .lock()?
                    .prefixes
                    .insert(prefix.to_string(), listed.clone());
                listed
            }
        };

        let mut keys: Vec<String> = listed
            .into_iter()
            .map(|kv| kv.key)
            .filter(|key| !matches!(self.writes.get(key), Some(Mutation::Delete)))
            .collect();
        for (key, mutation) in &self.writes {
            if key.starts_with(prefix) && matches!(mutation, Mutation::Put(_)) {
                keys.push(key.clone());
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.writes.insert(key.to_string(), Mutation::Put(value));
        Ok(())
    }

    /// Writes a document that must not exist yet.
    pub fn create<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.reads
            .lock()?
            .keys
            .entry(key.to_string())
            .or_insert((Precondition::Absent, None));
        self.put(key, value)
    }

    pub fn delete(&mut self, key: &str) {
        self.writes.insert(key.to_string(), Mutation::Delete);
    }

    fn into_batch(self) -> Result<WriteBatch> {
        let mut batch = self.reads.validation_batch()?;
        batch.mutations = self.writes;
        Ok(batch)
    }
}

/// Runs units of work with retry-on-conflict.
#[derive(Clone)]
pub struct Executor {
    store: Arc<dyn DocumentStore>,
    max_attempts: u32,
}

impl Executor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_max_attempts(store, DEFAULT_TX_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(store: Arc<dyn DocumentStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Runs `work` until it commits.
    ///
    /// `work` receives a fresh transaction per attempt and hands it back with
    /// its result. An error from `work` aborts without writing anything. It is
    /// returned unchanged only if everything the attempt read is still
    /// current; an error drawn from a stale snapshot is retried like any
    /// other conflict. Running out of attempts yields `Contention`.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut work: F) -> Result<T>
    where
        F: FnMut(Transaction) -> Fut,
        Fut: Future<Output = Result<(Transaction, T)>>,
    {
        for attempt in 1..=self.max_attempts {
            let reads = SharedReads::default();
            let tx = Transaction::begin(Arc::clone(&self.store), reads.clone());

            let outcome = match work(tx).await {
                Ok((tx, value)) => match self.store.commit(tx.into_batch()?).await? {
                    CommitOutcome::Committed => {
                        if attempt > 1 {
                            debug!(operation, attempt, "transaction committed after retry");
                        }
                        return Ok(value);
                    }
                    conflict => conflict,
                },
                Err(err) => {
                    let batch = reads.validation_batch()?;
                    if batch.preconditions.is_empty() && batch.prefix_reads.is_empty() {
                        return Err(err);
                    }
                    match self.store.commit(batch).await? {
                        CommitOutcome::Committed => return Err(err),
                        conflict => {
                            debug!(operation, attempt, error = %err, "error raised on a stale snapshot");
                            conflict
                        }
                    }
                }
            };

            if let CommitOutcome::Conflict { key } = outcome {
                debug!(operation, attempt, %key, "transaction conflict, retrying");
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
        }

        warn!(
            operation,
            attempts = self.max_attempts,
            "transaction abandoned after repeated conflicts"
        );
        Err(AppError::Contention {
            operation,
            attempts: self.max_attempts,
        })
    }
}

/// Exponential backoff with up to 100% random jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = TX_BACKOFF_BASE_MS.saturating_mul(1 << attempt.saturating_sub(1).min(16));
    let capped = exp.min(TX_BACKOFF_MAX_MS);
    let jitter = rand::rng().random_range(0..=capped);
    Duration::from_millis(capped / 2 + jitter / 2)
}
