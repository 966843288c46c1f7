use super::RepoError;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait DeviceCodeRepo: Send + Sync {
    /// Insert a new row. Fails with `RepoError::Duplicate` if either the user
    /// code or the device code is already taken.
    async fn insert(&self, code: &DeviceFlowCode) -> Result<(), RepoError>;

    async fn find_by_user_code(&self, user_code: &str)
    -> Result<Option<DeviceFlowCode>, RepoError>;

    async fn find_by_device_code(
        &self,
        device_code: &str,
    ) -> Result<Option<DeviceFlowCode>, RepoError>;

    /// Rewrite the row with `code.user_code`. Returns the number of rows touched.
    async fn update(&self, code: &DeviceFlowCode) -> Result<u64, RepoError>;

    async fn delete_by_device_code(&self, device_code: &str) -> Result<u64, RepoError>;

    /// Up to `limit` codes with `expiration < now`, ordered by user code ascending.
    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<DeviceFlowCode>, RepoError>;

    async fn delete_batch(&self, user_codes: &[String]) -> Result<u64, RepoError>;
}
