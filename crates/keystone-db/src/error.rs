//! # Store Errors
//!
//! Everything an item or customer adapter can fail with. The in-memory
//! adapters build these directly; the SQLite adapters get most of them from
//! `From<sqlx::Error>`.
//!
//! ```text
//! sqlx::Error ──► DbError ──► ApiError (keystone-admin)
//!                   ▲
//!   validate_item / validate_customer (both adapters, before any write)
//! ```

use thiserror::Error;

/// Store operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// No item or customer with this id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// SKU, email or id already taken.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Stock decrement would take an item below zero. The row is left untouched.
    #[error("Insufficient stock for item {id}: available {available}, requested {requested}")]
    InsufficientStock {
        id: String,
        available: i64,
        requested: i64,
    },

    /// Rejected before the write: bad field, non-positive quantity, or a
    /// row that tripped a schema CHECK.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The database file could not be opened or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other SQL error reported by SQLite.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Every pooled connection was busy for the whole acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Column named by a SQLite constraint message,
/// e.g. `"UNIQUE constraint failed: items.sku"` gives `"sku"`.
fn constraint_column(message: &str, prefix: &str) -> Option<String> {
    let detail = message.split(prefix).nth(1)?.trim();
    let column = detail.split_whitespace().next()?;
    Some(column.rsplit('.').next()?.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("UNIQUE constraint failed") {
                    let field = constraint_column(msg, "UNIQUE constraint failed:")
                        .unwrap_or_else(|| "unknown".to_string());
                    DbError::duplicate(field, "unknown")
                } else if msg.contains("CHECK constraint failed") {
                    let column = constraint_column(msg, "CHECK constraint failed:")
                        .unwrap_or_else(|| "row".to_string());
                    DbError::InvalidArgument(format!("{} is out of range", column))
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for store operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DbError::not_found("Item", "abc").to_string(),
            "Item not found: abc"
        );
        assert_eq!(
            DbError::duplicate("sku", "MOUSE-01").to_string(),
            "Duplicate sku: 'MOUSE-01' already exists"
        );
        let err = DbError::InsufficientStock {
            id: "abc".to_string(),
            available: 1,
            requested: 2,
        };
        assert!(err.to_string().contains("available 1, requested 2"));
    }

    #[test]
    fn test_constraint_column() {
        assert_eq!(
            constraint_column("UNIQUE constraint failed: items.sku", "UNIQUE constraint failed:"),
            Some("sku".to_string())
        );
        assert_eq!(
            constraint_column(
                "CHECK constraint failed: price_cents >= 0",
                "CHECK constraint failed:"
            ),
            Some("price_cents".to_string())
        );
        assert_eq!(constraint_column("disk I/O error", "CHECK constraint failed:"), None);
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::NotFound { .. }
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolExhausted
        ));
    }
}
