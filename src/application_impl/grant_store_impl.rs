use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{GrantRepo, RepoError};
use crate::logger::*;
use std::sync::Arc;

pub struct RealGrantStore {
    repo: Arc<dyn GrantRepo>,
    failure_policy: StoreFailurePolicy,
}

impl RealGrantStore {
    pub fn new(repo: Arc<dyn GrantRepo>, failure_policy: StoreFailurePolicy) -> Self {
        Self {
            repo,
            failure_policy,
        }
    }

    async fn upsert(&self, grant: &Grant) -> Result<u64, RepoError> {
        if self.repo.find(&grant.key).await?.is_some() {
            debug!(key = %grant.key, "grant found, updating");
            return self.repo.update(grant).await;
        }

        debug!(key = %grant.key, "grant not found, inserting");
        match self.repo.insert(grant).await {
            Ok(()) => Ok(1),
            // lost a race with another writer for the same key; last writer wins
            Err(RepoError::Duplicate(_)) => {
                debug!(key = %grant.key, "grant inserted concurrently, updating");
                self.repo.update(grant).await
            }
            Err(e) => Err(e),
        }
    }

    fn settle(
        &self,
        operation: &'static str,
        key: &str,
        result: Result<u64, RepoError>,
    ) -> Result<MutationOutcome, GrantStoreError> {
        match result {
            Ok(affected) => Ok(MutationOutcome::Applied { affected }),
            Err(e) => match self.failure_policy {
                StoreFailurePolicy::Propagate => Err(e.into()),
                StoreFailurePolicy::Swallow => {
                    warn!(operation, key, error = %e, "grant store failure swallowed");
                    Ok(MutationOutcome::Swallowed {
                        error: e.to_string(),
                    })
                }
            },
        }
    }
}

#[async_trait::async_trait]
impl GrantStore for RealGrantStore {
    async fn store(&self, grant: &Grant) -> Result<MutationOutcome, GrantStoreError> {
        let result = self.upsert(grant).await;
        self.settle("store", &grant.key.0, result)
    }

    async fn get(&self, key: &GrantKey) -> Result<Option<Grant>, GrantStoreError> {
        let grant = self.repo.find(key).await?;
        debug!(%key, found = grant.is_some(), "grant lookup");
        Ok(grant)
    }

    async fn get_all(&self, filter: &GrantFilter) -> Result<Vec<Grant>, GrantStoreError> {
        filter.validate()?;

        let grants = self.repo.find_all(filter).await?;
        debug!(count = grants.len(), ?filter, "grants found");
        Ok(grants)
    }

    async fn remove(&self, key: &GrantKey) -> Result<MutationOutcome, GrantStoreError> {
        let result = self.repo.delete(key).await;
        if let Ok(affected) = result {
            debug!(%key, removed = affected > 0, "grant remove");
        }
        self.settle("remove", &key.0, result)
    }

    async fn remove_all(&self, filter: &GrantFilter) -> Result<MutationOutcome, GrantStoreError> {
        filter.validate()?;

        let result = self.repo.delete_all(filter).await;
        if let Ok(affected) = result {
            debug!(count = affected, ?filter, "grants removed");
        }
        self.settle("remove_all", "filter", result)
    }
}
