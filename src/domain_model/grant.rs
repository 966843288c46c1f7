use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Well-known values for [`Grant::grant_type`]. The store itself never
/// interprets the type; these exist so callers agree on spelling.
pub mod grant_types {
    pub const AUTHORIZATION_CODE: &str = "authorization_code";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const REFERENCE_TOKEN: &str = "reference_token";
    pub const USER_CONSENT: &str = "user_consent";
    pub const BACKCHANNEL_AUTHENTICATION_REQUEST: &str = "ciba";
}

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize)]
pub struct GrantKey(pub String);

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GrantKey {
    fn from(s: &str) -> Self {
        GrantKey(s.to_owned())
    }
}

/// A persisted authorization artifact (authorization code, refresh token
/// handle, consent, ...). `data` is serialized and owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub key: GrantKey,
    pub grant_type: String,
    pub subject_id: Option<String>,
    pub session_id: Option<String>,
    pub client_id: String,
    pub description: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub expiration: Option<DateTime<Utc>>,
    pub consumed_time: Option<DateTime<Utc>>,
    pub data: Vec<u8>,
}

impl Grant {
    /// Grants without an expiration are never swept.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiration, Some(expiration) if expiration < now)
    }

    /// Copies every mutable field of `other` onto `self`, keeping `self.key`.
    pub fn apply_update(&mut self, other: &Grant) {
        self.grant_type = other.grant_type.clone();
        self.subject_id = other.subject_id.clone();
        self.session_id = other.session_id.clone();
        self.client_id = other.client_id.clone();
        self.description = other.description.clone();
        self.creation_time = other.creation_time;
        self.expiration = other.expiration;
        self.consumed_time = other.consumed_time;
        self.data = other.data.clone();
    }
}
