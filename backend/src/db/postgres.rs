use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::store::{
    CommitOutcome, DocumentStore, KeyVersion, Mutation, Precondition, Versioned, WriteBatch,
};
use crate::error::Result;

/// Document store over a single `documents` table.
///
/// A commit locks every touched row in key order (`FOR UPDATE`), validates the
/// batch against the locked versions and applies it in the same SQL
/// transaction.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escapes `LIKE` wildcards so the prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Serialization failures, deadlocks and duplicate inserts are lost races.
fn is_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001" | "40P01" | "23505"))
        }
        _ => false,
    }
}

async fn list_in<'c, E>(executor: E, prefix: &str) -> sqlx::Result<Vec<KeyVersion>>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let rows = sqlx::query(
        r#"
        SELECT key, version
        FROM documents
        WHERE key LIKE $1 ESCAPE '\'
        ORDER BY key COLLATE "C"
        "#,
    )
    .bind(like_prefix(prefix))
    .fetch_all(executor)
    .await?;

    rows.into_iter()
        .map(|row| -> sqlx::Result<KeyVersion> {
            Ok(KeyVersion {
                key: row.try_get("key")?,
                version: row.try_get("version")?,
            })
        })
        .collect()
}

async fn apply(
    tx: &mut Transaction<'static, Postgres>,
    batch: WriteBatch,
) -> sqlx::Result<CommitOutcome> {
    let keys: Vec<String> = batch
        .preconditions
        .keys()
        .chain(batch.mutations.keys())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows = sqlx::query(
        r#"
        SELECT key, version
        FROM documents
        WHERE key = ANY($1)
        ORDER BY key COLLATE "C"
        FOR UPDATE
        "#,
    )
    .bind(&keys)
    .fetch_all(&mut **tx)
    .await?;

    let mut current = HashMap::with_capacity(rows.len());
    for row in rows {
        let key: String = row.try_get("key")?;
        let version: i64 = row.try_get("version")?;
        current.insert(key, version);
    }

    for (key, expected) in &batch.preconditions {
        let holds = match expected {
            Precondition::Absent => !current.contains_key(key),
            Precondition::Version(v) => current.get(key) == Some(v),
        };
        if !holds {
            return Ok(CommitOutcome::Conflict { key: key.clone() });
        }
    }

    for (prefix, observed) in &batch.prefix_reads {
        if list_in(&mut **tx, prefix).await? != *observed {
            return Ok(CommitOutcome::Conflict {
                key: prefix.clone(),
            });
        }
    }

    for (key, mutation) in batch.mutations {
        match mutation {
            Mutation::Put(value) if current.contains_key(&key) => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET value = $2, version = version + 1, updated_at = NOW()
                    WHERE key = $1
                    "#,
                )
                .bind(&key)
                .bind(&value)
                .execute(&mut **tx)
                .await?;
            }
            Mutation::Put(value) => {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO documents (key, value, version)
                    VALUES ($1, $2, 1)
                    ON CONFLICT (key) DO NOTHING
                    "#,
                )
                .bind(&key)
                .bind(&value)
                .execute(&mut **tx)
                .await?;

                if inserted.rows_affected() == 0 {
                    return Ok(CommitOutcome::Conflict { key });
                }
            }
            Mutation::Delete => {
                sqlx::query("DELETE FROM documents WHERE key = $1")
                    .bind(&key)
                    .execute(&mut **tx)
                    .await?;
            }
        }
    }

    Ok(CommitOutcome::Committed)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>> {
        let row = sqlx::query("SELECT value, version FROM documents WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let doc = row
            .map(|row| -> sqlx::Result<Versioned> {
                Ok(Versioned {
                    value: row.try_get::<Value, _>("value")?,
                    version: row.try_get("version")?,
                })
            })
            .transpose()?;

        Ok(doc)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KeyVersion>> {
        Ok(list_in(&self.pool, prefix).await?)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome> {
        let mut tx = self.pool.begin().await?;

        match apply(&mut tx, batch).await {
            Ok(CommitOutcome::Committed) => match tx.commit().await {
                Ok(()) => Ok(CommitOutcome::Committed),
                Err(e) if is_conflict(&e) => {
                    tracing::debug!("document commit lost a race: {}", e);
                    Ok(CommitOutcome::Conflict {
                        key: "<database>".to_string(),
                    })
                }
                Err(e) => Err(e.into()),
            },
            Ok(conflict) => {
                tx.rollback().await?;
                Ok(conflict)
            }
            Err(e) if is_conflict(&e) => {
                tracing::debug!("document commit lost a race: {}", e);
                tx.rollback().await?;
                Ok(CommitOutcome::Conflict {
                    key: "<database>".to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
