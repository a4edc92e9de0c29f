use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database aborted the transaction because of a concurrent writer
    /// (serialization failure or deadlock). Safe to retry.
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// A write violated a table constraint (negative stock, dangling
    /// reference, ...).
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// An aggregate computed by the store does not fit its result type.
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// A stored value does not fit its domain type.
    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if repeating the whole transaction may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Conflict(_) => true,
            StoreError::Database(err) => {
                matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
            }
            _ => false,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let code = match &err {
            sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
            _ => None,
        };

        match code.as_deref() {
            // serialization_failure, deadlock_detected
            Some(code @ ("40001" | "40P01")) => {
                tracing::debug!(code, error = %err, "transaction aborted by concurrent writer");
                StoreError::Conflict(err.to_string())
            }
            // numeric_value_out_of_range
            Some("22003") => StoreError::OutOfRange(err.to_string()),
            // integrity_constraint_violation class
            Some(code) if code.starts_with("23") => StoreError::Constraint(err.to_string()),
            _ => StoreError::Database(err),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_transient() {
        assert!(StoreError::Conflict("deadlock".to_string()).is_transient());
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_transient());
    }

    #[test]
    fn test_constraint_is_not_transient() {
        assert!(!StoreError::Constraint("stock".to_string()).is_transient());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_non_database_sqlx_errors_pass_through() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
