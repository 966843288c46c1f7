#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("duplicate key: {0}")]
    Duplicate(String),
    #[error("store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Store(err.to_string())
    }
}
