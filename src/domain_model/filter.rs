use super::Grant;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[error("invalid filter: at least one of subject_id, session_id, client_id or type must be set")]
pub struct InvalidFilter;

/// Selects grants for bulk reads and deletes. Every set field narrows the
/// selection; blank values count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrantFilter {
    pub subject_id: Option<String>,
    pub session_id: Option<String>,
    pub client_id: Option<String>,
    pub grant_type: Option<String>,
}

/// One equality constraint on a grant column.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum GrantPredicate<'a> {
    SubjectId(&'a str),
    SessionId(&'a str),
    ClientId(&'a str),
    GrantType(&'a str),
}

impl<'a> GrantPredicate<'a> {
    pub fn column(&self) -> &'static str {
        match self {
            GrantPredicate::SubjectId(_) => "subject_id",
            GrantPredicate::SessionId(_) => "session_id",
            GrantPredicate::ClientId(_) => "client_id",
            GrantPredicate::GrantType(_) => "type",
        }
    }

    pub fn value(&self) -> &'a str {
        match *self {
            GrantPredicate::SubjectId(v)
            | GrantPredicate::SessionId(v)
            | GrantPredicate::ClientId(v)
            | GrantPredicate::GrantType(v) => v,
        }
    }

    pub fn matches(&self, grant: &Grant) -> bool {
        match self {
            GrantPredicate::SubjectId(v) => grant.subject_id.as_deref() == Some(*v),
            GrantPredicate::SessionId(v) => grant.session_id.as_deref() == Some(*v),
            GrantPredicate::ClientId(v) => grant.client_id == *v,
            GrantPredicate::GrantType(v) => grant.grant_type == *v,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl GrantFilter {
    pub fn by_subject(subject_id: &str) -> Self {
        Self {
            subject_id: Some(subject_id.to_owned()),
            ..Default::default()
        }
    }

    pub fn by_client(client_id: &str) -> Self {
        Self {
            client_id: Some(client_id.to_owned()),
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject_id: &str) -> Self {
        self.subject_id = Some(subject_id.to_owned());
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_owned());
        self
    }

    pub fn with_client(mut self, client_id: &str) -> Self {
        self.client_id = Some(client_id.to_owned());
        self
    }

    pub fn with_type(mut self, grant_type: &str) -> Self {
        self.grant_type = Some(grant_type.to_owned());
        self
    }

    /// The AND-combined equality predicates of this filter, in column order.
    pub fn predicates(&self) -> Vec<GrantPredicate<'_>> {
        let mut predicates = Vec::with_capacity(4);
        if let Some(v) = non_blank(&self.client_id) {
            predicates.push(GrantPredicate::ClientId(v));
        }
        if let Some(v) = non_blank(&self.session_id) {
            predicates.push(GrantPredicate::SessionId(v));
        }
        if let Some(v) = non_blank(&self.subject_id) {
            predicates.push(GrantPredicate::SubjectId(v));
        }
        if let Some(v) = non_blank(&self.grant_type) {
            predicates.push(GrantPredicate::GrantType(v));
        }
        predicates
    }

    pub fn validate(&self) -> Result<(), InvalidFilter> {
        if self.predicates().is_empty() {
            return Err(InvalidFilter);
        }
        Ok(())
    }

    pub fn matches(&self, grant: &Grant) -> bool {
        self.predicates().iter().all(|p| p.matches(grant))
    }
}
