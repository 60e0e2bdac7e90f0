//! The module contains the error the engine can throw.
//!
//! Every variant carries a human readable reason. Any error returned from
//! inside an atomic unit rolls the whole unit back, so callers never observe a
//! partial write.
//!
//! Only [`StoreUnavailable`] is worth retrying: it is raised when the store
//! did not answer in time or reported a transient failure (busy/locked
//! database, pool exhaustion, broken connection).
//!
//!  [`StoreUnavailable`]: EngineError::StoreUnavailable
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("Insufficient budget: {0}")]
    InsufficientBudget(String),
    #[error("Already processed: {0}")]
    AlreadyProcessed(String),
    #[error("Not processed: {0}")]
    NotProcessed(String),
    #[error("No attendees: {0}")]
    NoAttendees(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error(transparent)]
    Database(DbErr),
}

impl EngineError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        if is_transient(&err) {
            return Self::StoreUnavailable(err.to_string());
        }
        Self::Database(err)
    }
}

/// SQLite reports lock contention as `SQLITE_BUSY`/`SQLITE_LOCKED`, which
/// surfaces as "database is locked" or "database table is locked".
fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        other => mentions_lock(&other.to_string()),
    }
}

fn mentions_lock(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("database is busy")
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::PermissionDenied(a), Self::PermissionDenied(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::InsufficientBudget(a), Self::InsufficientBudget(b)) => a == b,
            (Self::AlreadyProcessed(a), Self::AlreadyProcessed(b)) => a == b,
            (Self::NotProcessed(a), Self::NotProcessed(b)) => a == b,
            (Self::NoAttendees(a), Self::NoAttendees(b)) => a == b,
            (Self::StoreUnavailable(a), Self::StoreUnavailable(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhaustion_is_retryable() {
        let err = EngineError::from(DbErr::ConnectionAcquire(
            sea_orm::ConnAcquireErr::Timeout,
        ));
        assert!(matches!(err, EngineError::StoreUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn locked_database_is_retryable() {
        let err = EngineError::from(DbErr::Custom("database is locked".to_string()));
        assert!(err.is_retryable());
    }

    #[test]
    fn record_not_found_is_not_retryable() {
        let err = EngineError::from(DbErr::RecordNotFound("users".to_string()));
        assert!(matches!(err, EngineError::Database(_)));
        assert!(!err.is_retryable());
        assert!(!EngineError::InsufficientBalance("x".to_string()).is_retryable());
    }
}
