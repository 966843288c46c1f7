use crate::domain_model::*;
use crate::domain_port::RepoError;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum GrantStoreError {
    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilter),
    #[error("store error: {0}")]
    Store(String),
}

impl From<RepoError> for GrantStoreError {
    fn from(err: RepoError) -> Self {
        GrantStoreError::Store(err.to_string())
    }
}

/// What a grant store mutation does when the backing store fails.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFailurePolicy {
    /// Return the failure to the caller.
    #[default]
    Propagate,
    /// Log the failure and report it as `MutationOutcome::Swallowed`.
    Swallow,
}

impl fmt::Display for StoreFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreFailurePolicy::Propagate => "propagate",
            StoreFailurePolicy::Swallow => "swallow",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MutationOutcome {
    /// The mutation reached the backing store; `affected` rows were touched.
    Applied { affected: u64 },
    /// The backing store failed and the failure policy is `Swallow`.
    Swallowed { error: String },
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied { .. })
    }
}

#[async_trait::async_trait]
pub trait GrantStore: Send + Sync {
    /// Insert the grant, or replace the mutable fields of the grant already
    /// stored under the same key.
    async fn store(&self, grant: &Grant) -> Result<MutationOutcome, GrantStoreError>;
    async fn get(&self, key: &GrantKey) -> Result<Option<Grant>, GrantStoreError>;
    async fn get_all(&self, filter: &GrantFilter) -> Result<Vec<Grant>, GrantStoreError>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &GrantKey) -> Result<MutationOutcome, GrantStoreError>;
    async fn remove_all(&self, filter: &GrantFilter) -> Result<MutationOutcome, GrantStoreError>;
}
