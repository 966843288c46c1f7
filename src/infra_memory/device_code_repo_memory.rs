use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct Codes {
    by_user_code: BTreeMap<String, DeviceFlowCode>,
    // device code -> user code
    device_index: HashMap<String, String>,
}

/// Both uniqueness constraints are checked under one write lock.
#[derive(Default)]
pub struct MemoryDeviceCodeRepo {
    codes: RwLock<Codes>,
}

impl MemoryDeviceCodeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.codes.read().await.by_user_code.len()
    }
}

#[async_trait::async_trait]
impl DeviceCodeRepo for MemoryDeviceCodeRepo {
    async fn insert(&self, code: &DeviceFlowCode) -> Result<(), RepoError> {
        let mut codes = self.codes.write().await;
        if codes.by_user_code.contains_key(&code.user_code) {
            return Err(RepoError::Duplicate(format!("user_code {}", code.user_code)));
        }
        if codes.device_index.contains_key(&code.device_code) {
            return Err(RepoError::Duplicate(format!(
                "device_code {}",
                code.device_code
            )));
        }
        codes
            .device_index
            .insert(code.device_code.clone(), code.user_code.clone());
        codes
            .by_user_code
            .insert(code.user_code.clone(), code.clone());
        Ok(())
    }

    async fn find_by_user_code(
        &self,
        user_code: &str,
    ) -> Result<Option<DeviceFlowCode>, RepoError> {
        Ok(self.codes.read().await.by_user_code.get(user_code).cloned())
    }

    async fn find_by_device_code(
        &self,
        device_code: &str,
    ) -> Result<Option<DeviceFlowCode>, RepoError> {
        let codes = self.codes.read().await;
        Ok(codes
            .device_index
            .get(device_code)
            .and_then(|user_code| codes.by_user_code.get(user_code))
            .cloned())
    }

    async fn update(&self, code: &DeviceFlowCode) -> Result<u64, RepoError> {
        let mut guard = self.codes.write().await;
        let codes = &mut *guard;
        let Some(existing) = codes.by_user_code.get_mut(&code.user_code) else {
            return Ok(0);
        };
        if existing.device_code != code.device_code {
            if codes.device_index.contains_key(&code.device_code) {
                return Err(RepoError::Duplicate(format!(
                    "device_code {}",
                    code.device_code
                )));
            }
            codes.device_index.remove(&existing.device_code);
            codes
                .device_index
                .insert(code.device_code.clone(), code.user_code.clone());
        }
        *existing = code.clone();
        Ok(1)
    }

    async fn delete_by_device_code(&self, device_code: &str) -> Result<u64, RepoError> {
        let mut codes = self.codes.write().await;
        let Some(user_code) = codes.device_index.remove(device_code) else {
            return Ok(0);
        };
        codes.by_user_code.remove(&user_code);
        Ok(1)
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<DeviceFlowCode>, RepoError> {
        let codes = self.codes.read().await;
        Ok(codes
            .by_user_code
            .values()
            .filter(|c| c.is_expired_at(now))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete_batch(&self, user_codes: &[String]) -> Result<u64, RepoError> {
        let mut codes = self.codes.write().await;
        let mut removed = 0;
        for user_code in user_codes {
            if let Some(code) = codes.by_user_code.remove(user_code) {
                codes.device_index.remove(&code.device_code);
                removed += 1;
            }
        }
        Ok(removed)
    }
}
