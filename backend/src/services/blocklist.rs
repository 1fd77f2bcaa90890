use std::sync::Arc;

use async_trait::async_trait;

use super::transaction::Executor;
use crate::db::{keys, DocumentStore};
use crate::error::Result;
use crate::models::{BlockedBusinesses, validate_id};

/// Businesses a member has blocked, consulted when serving candidates.
#[async_trait]
pub trait BlockList: Send + Sync {
    async fn is_blocked(&self, member_id: &str, business_id: &str) -> Result<bool>;
}

/// Block lists stored as one document per member.
#[derive(Clone)]
pub struct StoreBlockList {
    store: Arc<dyn DocumentStore>,
    executor: Executor,
}

impl StoreBlockList {
    pub fn new(executor: Executor) -> Self {
        Self {
            store: Arc::clone(executor.store()),
            executor,
        }
    }

    pub async fn set_blocked(&self, member_id: &str, business_id: &str, blocked: bool) -> Result<()> {
        validate_id("member", member_id)?;
        validate_id("business", business_id)?;
        let key = keys::blocks(member_id);
        let business_id = business_id.to_string();

        self.executor
            .run("set_blocked", |mut tx| {
                let key = key.clone();
                let business_id = business_id.clone();
                async move {
                    let mut list: BlockedBusinesses = tx.get(&key).await?.unwrap_or_default();
                    let changed = if blocked {
                        list.0.insert(business_id)
                    } else {
                        list.0.remove(&business_id)
                    };
                    if changed {
                        if list.0.is_empty() {
                            tx.delete(&key);
                        } else {
                            tx.put(&key, &list)?;
                        }
                    }
                    Ok((tx, ()))
                }
            })
            .await
    }
}

#[async_trait]
impl BlockList for StoreBlockList {
    async fn is_blocked(&self, member_id: &str, business_id: &str) -> Result<bool> {
        let Some(doc) = self.store.get(&keys::blocks(member_id)).await? else {
            return Ok(false);
        };
        let list: BlockedBusinesses = serde_json::from_value(doc.value)?;
        Ok(list.0.contains(business_id))
    }
}
