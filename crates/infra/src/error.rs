//! Storage-layer failures.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `PersistenceError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | PersistenceError |
//! |------------|----------------------|------------------|
//! | Database (integrity constraint) | class `23` | `Constraint` |
//! | Database (serialization failure / deadlock) | `40001`, `40P01` | `Transaction` |
//! | Database (other) | Any other | `Query` |
//! | PoolTimedOut, PoolClosed, Io, Tls | N/A | `Connection` |
//! | RowNotFound, ColumnNotFound, ColumnDecode, Decode | N/A | `RowDecode` |
//! | Other | N/A | `Query` |

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("storage connection failed: {0}")]
    Connection(String),

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("failed to read row: {0}")]
    RowDecode(String),
}

/// Map SQLx errors to PersistenceError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> PersistenceError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                Some(code) if code.starts_with("23") => PersistenceError::Constraint(msg),
                Some("40001") | Some("40P01") => PersistenceError::Transaction(msg),
                _ => PersistenceError::Query(msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            PersistenceError::Connection(format!("timed out acquiring a connection in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            PersistenceError::Connection(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::Io(e) => PersistenceError::Connection(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => PersistenceError::Connection(format!("tls error in {}: {}", operation, e)),
        sqlx::Error::RowNotFound
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_) => {
            PersistenceError::RowDecode(format!("{} in {}", err, operation))
        }
        _ => PersistenceError::Query(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_failures_are_connection_errors() {
        assert!(matches!(
            map_sqlx_error("begin", sqlx::Error::PoolTimedOut),
            PersistenceError::Connection(_)
        ));
        assert!(matches!(
            map_sqlx_error("begin", sqlx::Error::PoolClosed),
            PersistenceError::Connection(_)
        ));
    }

    #[test]
    fn missing_rows_are_row_decode_errors() {
        let err = map_sqlx_error("get_user", sqlx::Error::RowNotFound);
        assert!(matches!(err, PersistenceError::RowDecode(ref m) if m.contains("get_user")));
    }
}
