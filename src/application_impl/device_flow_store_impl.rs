use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{DeviceCodeRepo, RepoError};
use crate::logger::*;
use std::sync::Arc;

pub struct RealDeviceFlowStore {
    repo: Arc<dyn DeviceCodeRepo>,
}

impl RealDeviceFlowStore {
    pub fn new(repo: Arc<dyn DeviceCodeRepo>) -> Self {
        Self { repo }
    }
}

#[async_trait::async_trait]
impl DeviceFlowStore for RealDeviceFlowStore {
    async fn store_device_authorization(
        &self,
        device_code: &str,
        user_code: &str,
        authorization: DeviceAuthorization,
    ) -> Result<(), DeviceFlowError> {
        let code = DeviceFlowCode::new(device_code, user_code, authorization);

        match self.repo.insert(&code).await {
            Ok(()) => {
                debug!(user_code, client_id = %code.client_id, "device code stored");
                Ok(())
            }
            Err(RepoError::Duplicate(detail)) => {
                warn!(user_code, %detail, "device code collision");
                Err(DeviceFlowError::Duplicate {
                    device_code: device_code.to_owned(),
                    user_code: user_code.to_owned(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_user_code(
        &self,
        user_code: &str,
    ) -> Result<Option<DeviceFlowCode>, DeviceFlowError> {
        let code = self.repo.find_by_user_code(user_code).await?;
        debug!(user_code, found = code.is_some(), "device code lookup by user code");
        Ok(code)
    }

    async fn find_by_device_code(
        &self,
        device_code: &str,
    ) -> Result<Option<DeviceFlowCode>, DeviceFlowError> {
        let code = self.repo.find_by_device_code(device_code).await?;
        debug!(found = code.is_some(), "device code lookup by device code");
        Ok(code)
    }

    async fn update_by_user_code(
        &self,
        user_code: &str,
        authorization: DeviceAuthorization,
    ) -> Result<(), DeviceFlowError> {
        let Some(mut code) = self.repo.find_by_user_code(user_code).await? else {
            debug!(user_code, "device code not found for update");
            return Err(DeviceFlowError::NotFound(user_code.to_owned()));
        };

        code.authorize(authorization);

        // removed between the read and the write
        if self.repo.update(&code).await? == 0 {
            return Err(DeviceFlowError::NotFound(user_code.to_owned()));
        }

        debug!(user_code, state = ?code.state(), "device code updated");
        Ok(())
    }

    async fn remove_by_device_code(&self, device_code: &str) -> Result<(), DeviceFlowError> {
        let removed = self.repo.delete_by_device_code(device_code).await?;
        debug!(removed = removed > 0, "device code remove");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemoryDeviceCodeRepo;
    use chrono::{Duration, TimeZone, Utc};

    fn authorization(subject: Option<&str>, lifetime_secs: i64) -> DeviceAuthorization {
        DeviceAuthorization {
            client_id: "device_flow".to_owned(),
            subject_id: subject.map(str::to_owned),
            session_id: None,
            description: None,
            creation_time: Utc.with_ymd_and_hms(2018, 10, 19, 16, 14, 29).unwrap(),
            lifetime: Duration::seconds(lifetime_secs),
            data: br#"{"scopes":["openid","api1"]}"#.to_vec(),
        }
    }

    fn store() -> RealDeviceFlowStore {
        RealDeviceFlowStore::new(Arc::new(MemoryDeviceCodeRepo::new()))
    }

    #[tokio::test]
    async fn stored_code_is_found_by_both_keys() {
        let store = store();
        store
            .store_device_authorization("device1", "user1", authorization(None, 300))
            .await
            .unwrap();

        let by_user = store.find_by_user_code("user1").await.unwrap().unwrap();
        let by_device = store.find_by_device_code("device1").await.unwrap().unwrap();
        assert_eq!(by_user, by_device);
        assert_eq!(by_user.state(), DeviceCodeState::Pending);
        assert_eq!(
            by_user.data,
            br#"{"scopes":["openid","api1"]}"#.to_vec()
        );
    }

    #[tokio::test]
    async fn reusing_either_code_is_rejected() {
        let store = store();
        store
            .store_device_authorization("device1", "user1", authorization(None, 300))
            .await
            .unwrap();

        let err = store
            .store_device_authorization("device2", "user1", authorization(None, 300))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceFlowError::Duplicate { .. }));

        let err = store
            .store_device_authorization("device1", "user2", authorization(None, 300))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceFlowError::Duplicate { .. }));

        // the original record is untouched
        let code = store.find_by_user_code("user1").await.unwrap().unwrap();
        assert_eq!(code.device_code, "device1");
        assert!(store.find_by_user_code("user2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_codes_are_absent() {
        let store = store();
        assert!(store.find_by_user_code("nope").await.unwrap().is_none());
        assert!(store.find_by_device_code("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_authorizes_and_recomputes_expiration() {
        let store = store();
        let pending = authorization(None, 300);
        let created = pending.creation_time;
        store
            .store_device_authorization("device1", "user1", pending)
            .await
            .unwrap();

        let mut authorized = authorization(Some("sub1"), 600);
        authorized.client_id = "other_client".to_owned();
        authorized.creation_time = created + Duration::days(1);
        authorized.data = b"authorized".to_vec();
        store.update_by_user_code("user1", authorized).await.unwrap();

        let code = store.find_by_user_code("user1").await.unwrap().unwrap();
        assert_eq!(code.device_code, "device1");
        assert_eq!(code.client_id, "device_flow");
        assert_eq!(code.creation_time, created);
        assert_eq!(code.expiration, created + Duration::seconds(600));
        assert_eq!(code.subject_id.as_deref(), Some("sub1"));
        assert_eq!(code.state(), DeviceCodeState::Authorized);
        assert_eq!(code.data, b"authorized".to_vec());
    }

    #[tokio::test]
    async fn update_of_missing_user_code_fails() {
        let err = store()
            .update_by_user_code("nope", authorization(Some("sub1"), 300))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceFlowError::NotFound(code) if code == "nope"));
    }

    #[tokio::test]
    async fn remove_by_device_code_deletes_and_tolerates_absence() {
        let store = store();
        store
            .store_device_authorization("device1", "user1", authorization(None, 300))
            .await
            .unwrap();

        store.remove_by_device_code("device1").await.unwrap();
        assert!(store.find_by_user_code("user1").await.unwrap().is_none());

        store.remove_by_device_code("device1").await.unwrap();
    }
}
