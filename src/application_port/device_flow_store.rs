use crate::domain_model::*;
use crate::domain_port::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum DeviceFlowError {
    #[error("device code {device_code} or user code {user_code} already exists")]
    Duplicate {
        device_code: String,
        user_code: String,
    },
    #[error("user code not found: {0}")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(String),
}

impl From<RepoError> for DeviceFlowError {
    fn from(err: RepoError) -> Self {
        DeviceFlowError::Store(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait DeviceFlowStore: Send + Sync {
    async fn store_device_authorization(
        &self,
        device_code: &str,
        user_code: &str,
        authorization: DeviceAuthorization,
    ) -> Result<(), DeviceFlowError>;

    async fn find_by_user_code(
        &self,
        user_code: &str,
    ) -> Result<Option<DeviceFlowCode>, DeviceFlowError>;

    async fn find_by_device_code(
        &self,
        device_code: &str,
    ) -> Result<Option<DeviceFlowCode>, DeviceFlowError>;

    /// Attach the authorization result to a pending code.
    async fn update_by_user_code(
        &self,
        user_code: &str,
        authorization: DeviceAuthorization,
    ) -> Result<(), DeviceFlowError>;

    async fn remove_by_device_code(&self, device_code: &str) -> Result<(), DeviceFlowError>;
}
