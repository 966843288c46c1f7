use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum DeviceCodeState {
    Pending,
    Authorized,
}

/// A device authorization as supplied by the caller. `lifetime` is the
/// lifetime the caller encoded in `data`; expiration is derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAuthorization {
    pub client_id: String,
    pub subject_id: Option<String>,
    pub session_id: Option<String>,
    pub description: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub lifetime: Duration,
    pub data: Vec<u8>,
}

/// Persisted pairing of a device-facing and a user-facing code.
/// `user_code` is the primary key, `device_code` is independently unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFlowCode {
    pub user_code: String,
    pub device_code: String,
    pub client_id: String,
    pub subject_id: Option<String>,
    pub session_id: Option<String>,
    pub description: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
    pub data: Vec<u8>,
}

impl DeviceFlowCode {
    pub fn new(device_code: &str, user_code: &str, authorization: DeviceAuthorization) -> Self {
        Self {
            user_code: user_code.to_owned(),
            device_code: device_code.to_owned(),
            expiration: authorization.creation_time + authorization.lifetime,
            client_id: authorization.client_id,
            subject_id: authorization.subject_id,
            session_id: authorization.session_id,
            description: authorization.description,
            creation_time: authorization.creation_time,
            data: authorization.data,
        }
    }

    pub fn state(&self) -> DeviceCodeState {
        match self.subject_id {
            Some(_) => DeviceCodeState::Authorized,
            None => DeviceCodeState::Pending,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration < now
    }

    /// Applies an authorization (or re-authorization) to an existing code.
    /// `device_code`, `client_id` and `creation_time` never change; the new
    /// lifetime is measured from the original creation time.
    pub fn authorize(&mut self, authorization: DeviceAuthorization) {
        self.expiration = self.creation_time + authorization.lifetime;
        self.subject_id = authorization.subject_id;
        self.session_id = authorization.session_id;
        self.description = authorization.description;
        self.data = authorization.data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorization(subject: Option<&str>, lifetime_secs: i64) -> DeviceAuthorization {
        DeviceAuthorization {
            client_id: "device_flow".to_owned(),
            subject_id: subject.map(str::to_owned),
            session_id: None,
            description: None,
            creation_time: Utc::now(),
            lifetime: Duration::seconds(lifetime_secs),
            data: b"payload".to_vec(),
        }
    }

    #[test]
    fn new_code_derives_expiration_from_lifetime() {
        let auth = authorization(None, 300);
        let created = auth.creation_time;
        let code = DeviceFlowCode::new("device", "user", auth);

        assert_eq!(code.expiration, created + Duration::seconds(300));
        assert_eq!(code.state(), DeviceCodeState::Pending);
    }

    #[test]
    fn authorize_preserves_identity_and_creation_time() {
        let mut code = DeviceFlowCode::new("device", "user", authorization(None, 300));
        let created = code.creation_time;

        let mut update = authorization(Some("sub1"), 600);
        update.client_id = "someone_else".to_owned();
        update.creation_time = created + Duration::hours(1);
        code.authorize(update);

        assert_eq!(code.device_code, "device");
        assert_eq!(code.client_id, "device_flow");
        assert_eq!(code.creation_time, created);
        assert_eq!(code.expiration, created + Duration::seconds(600));
        assert_eq!(code.state(), DeviceCodeState::Authorized);
    }
}
