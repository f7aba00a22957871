use thiserror::Error;

impl From<serde_json::Error> for EvidenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedRecord(format!("JSON decode error: {}", err))
    }
}

impl From<sqlx::Error> for EvidenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(format!("Database error: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Malformed stream record: {0}")]
    MalformedRecord(String),

    #[error("Malformed digest proof: {0}")]
    MalformedProof(String),

    #[error("Invalid object locator: {0}")]
    InvalidLocator(String),

    #[error("Evidence record not found: {0}")]
    NotFound(String),

    #[error("Concurrent update conflict: {0}")]
    ConcurrentUpdate(String),

    #[error("Transient infrastructure failure: {0}")]
    Transient(String),
}

impl EvidenceError {
    /// Input errors are never retried automatically; everything else may be
    /// retried after the caller has re-read current state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_) | Self::ConcurrentUpdate(_) | Self::Transient(_)
        )
    }
}
