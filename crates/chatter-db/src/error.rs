//! Datastore error taxonomy.
//!
//! Every failure leaving this crate is a [`DatastoreError`]. Driver errors are
//! classified once, at the statement boundary, so callers can tell a unique-key
//! collision apart from a broken query without inspecting driver codes.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = DatastoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DatastoreError {
    /// Could not acquire a master or replica handle.
    #[error("{context}: {source}")]
    Connection { context: String, source: BoxError },

    /// Malformed SQL, a binding failure, or a row that does not decode.
    #[error("{context}: {source}")]
    Statement { context: String, source: BoxError },

    /// Unique-key collision.
    #[error("{context}: {source}")]
    Constraint { context: String, source: BoxError },

    /// Begin or commit failed.
    #[error("{context}: {source}")]
    Transaction { context: String, source: BoxError },

    /// Caller error, rejected before any statement was issued.
    #[error("{0}")]
    Validation(String),

    #[error("operation cancelled")]
    Cancelled,

    /// Unknown backend name or incomplete backend settings.
    #[error("invalid datastore configuration: {0}")]
    Config(String),
}

impl DatastoreError {
    pub fn connection(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connection {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Classifies a driver error raised while running a statement.
    pub fn statement(context: impl Into<String>, source: DriverError) -> Self {
        let context = context.into();
        if source.is_constraint_violation() {
            Self::Constraint {
                context,
                source: Box::new(source),
            }
        } else {
            Self::Statement {
                context,
                source: Box::new(source),
            }
        }
    }

    pub fn transaction(context: impl Into<String>, source: DriverError) -> Self {
        Self::Transaction {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn decode(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Statement {
            context: context.into(),
            source: reason.into().into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Constraint { .. })
    }
}

/// Raw error from one of the SQL drivers.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Mysql(#[from] mysql::Error),
}

/// MySQL server codes for duplicate-key failures.
const MYSQL_DUP_ENTRY: u16 = 1062;
const MYSQL_DUP_UNIQUE: u16 = 1169;
const MYSQL_DUP_ENTRY_WITH_KEY_NAME: u16 = 1586;

impl DriverError {
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            DriverError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation
            }
            DriverError::Mysql(mysql::Error::MySqlError(e)) => matches!(
                e.code,
                MYSQL_DUP_ENTRY | MYSQL_DUP_UNIQUE | MYSQL_DUP_ENTRY_WITH_KEY_NAME
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> DriverError {
        DriverError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            Some("boom".into()),
        ))
    }

    #[test]
    fn test_unique_violation_becomes_constraint() {
        let err = DatastoreError::statement(
            "inserting",
            sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
        );
        assert!(err.is_constraint_violation());
        assert!(err.to_string().starts_with("inserting: "));
    }

    #[test]
    fn test_other_failures_stay_statement_errors() {
        let err = DatastoreError::statement("selecting", sqlite_failure(rusqlite::ffi::SQLITE_ERROR));
        assert!(matches!(err, DatastoreError::Statement { .. }));

        let err = DatastoreError::statement(
            "selecting",
            DriverError::Sqlite(rusqlite::Error::QueryReturnedNoRows),
        );
        assert!(!err.is_constraint_violation());
    }
}
