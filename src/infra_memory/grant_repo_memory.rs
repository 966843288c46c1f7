use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Grants kept in bytewise key order, the same order as the binary-collated
/// MySQL key column.
#[derive(Default)]
pub struct MemoryGrantRepo {
    grants: RwLock<BTreeMap<GrantKey, Grant>>,
}

impl MemoryGrantRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.grants.read().await.len()
    }
}

#[async_trait::async_trait]
impl GrantRepo for MemoryGrantRepo {
    async fn find(&self, key: &GrantKey) -> Result<Option<Grant>, RepoError> {
        Ok(self.grants.read().await.get(key).cloned())
    }

    async fn insert(&self, grant: &Grant) -> Result<(), RepoError> {
        let mut grants = self.grants.write().await;
        if grants.contains_key(&grant.key) {
            return Err(RepoError::Duplicate(grant.key.to_string()));
        }
        grants.insert(grant.key.clone(), grant.clone());
        Ok(())
    }

    async fn update(&self, grant: &Grant) -> Result<u64, RepoError> {
        let mut grants = self.grants.write().await;
        match grants.get_mut(&grant.key) {
            Some(existing) => {
                existing.apply_update(grant);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find_all(&self, filter: &GrantFilter) -> Result<Vec<Grant>, RepoError> {
        let grants = self.grants.read().await;
        Ok(grants
            .values()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &GrantKey) -> Result<u64, RepoError> {
        let removed = self.grants.write().await.remove(key);
        Ok(removed.map_or(0, |_| 1))
    }

    async fn delete_all(&self, filter: &GrantFilter) -> Result<u64, RepoError> {
        let mut grants = self.grants.write().await;
        let before = grants.len();
        grants.retain(|_, g| !filter.matches(g));
        Ok((before - grants.len()) as u64)
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Grant>, RepoError> {
        let grants = self.grants.read().await;
        Ok(grants
            .values()
            .filter(|g| g.is_expired_at(now))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete_batch(&self, keys: &[GrantKey]) -> Result<u64, RepoError> {
        let mut grants = self.grants.write().await;
        let removed = keys.iter().filter(|k| grants.remove(*k).is_some()).count();
        Ok(removed as u64)
    }
}
