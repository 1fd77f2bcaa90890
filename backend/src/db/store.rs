//! Transactional document store contract.
//!
//! Documents are JSON values under composite string keys. Every stored
//! document carries a version that increases on each write. Commits are
//! optimistic: a [`WriteBatch`] lists the versions the writer observed and
//! the store applies the batch only if all of them still hold.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A document together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub value: Value,
    pub version: i64,
}

/// What a transaction observed about one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The key did not exist.
    Absent,
    /// The key existed at this version.
    Version(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Put(Value),
    Delete,
}

/// A key and its version as returned by a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyVersion {
    pub key: String,
    pub version: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub preconditions: BTreeMap<String, Precondition>,
    /// Prefix listings the transaction depended on, sorted by key.
    pub prefix_reads: BTreeMap<String, Vec<KeyVersion>>,
    pub mutations: BTreeMap<String, Mutation>,
}

impl WriteBatch {
    pub fn is_read_only(&self) -> bool {
        self.mutations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// A precondition or prefix listing no longer held; nothing was written.
    Conflict { key: String },
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Reads one document. Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Versioned>>;

    /// Lists keys starting with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> Result<Vec<KeyVersion>>;

    /// Validates the batch's preconditions and prefix reads, then applies
    /// its mutations atomically.
    ///
    /// A failed validation is a normal [`CommitOutcome::Conflict`], not an error.
    async fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome>;
}
