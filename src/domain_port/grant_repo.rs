use super::RepoError;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait GrantRepo: Send + Sync {
    async fn find(&self, key: &GrantKey) -> Result<Option<Grant>, RepoError>;

    /// Insert a new row. Fails with `RepoError::Duplicate` if the key exists.
    async fn insert(&self, grant: &Grant) -> Result<(), RepoError>;

    /// Replace every mutable column of the row with `grant.key`.
    /// Returns the number of rows touched.
    async fn update(&self, grant: &Grant) -> Result<u64, RepoError>;

    /// `filter` must already be validated; an empty filter is a caller bug.
    async fn find_all(&self, filter: &GrantFilter) -> Result<Vec<Grant>, RepoError>;

    async fn delete(&self, key: &GrantKey) -> Result<u64, RepoError>;

    async fn delete_all(&self, filter: &GrantFilter) -> Result<u64, RepoError>;

    /// Up to `limit` grants with `expiration < now`, ordered by key ascending.
    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Grant>, RepoError>;

    async fn delete_batch(&self, keys: &[GrantKey]) -> Result<u64, RepoError>;
}
