//! Error types for the persistence layer

use miette::Diagnostic;
use rusqlite::ffi;
use thiserror::Error;

/// Errors returned by every persistence call
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// The database could not be opened or reached
    #[error("Cannot open database: {0}")]
    #[diagnostic(code(hospital::connection), help("Check HOSPITAL_DB_PATH or --db"))]
    Connection(String),

    /// DDL failure while creating or checking the schema (fatal at startup)
    #[error("Schema error: {0}")]
    #[diagnostic(code(hospital::schema))]
    Schema(String),

    /// An insert, update or delete would violate a foreign key
    #[error("Referential integrity violation on {entity}: {message}")]
    #[diagnostic(code(hospital::referential_integrity))]
    ReferentialIntegrity { entity: &'static str, message: String },

    /// A row with the same primary key already exists
    #[error("{entity} {id} already exists")]
    #[diagnostic(code(hospital::duplicate_key))]
    DuplicateKey { entity: &'static str, id: i64 },

    /// Update or delete of a row that does not exist
    #[error("{entity} {id} not found")]
    #[diagnostic(code(hospital::not_found))]
    NotFound { entity: &'static str, id: i64 },

    /// Reading a bulk data source failed
    #[error("Cannot read {source_name}: {message}")]
    #[diagnostic(code(hospital::source))]
    Source { source_name: String, message: String },

    /// Any other SQLite failure
    #[error("Database error: {0}")]
    #[diagnostic(code(hospital::database))]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    /// Classify a rusqlite error raised while writing `entity` row `id`.
    ///
    /// Foreign key failures become `ReferentialIntegrity`, primary key and
    /// unique failures become `DuplicateKey`; everything else stays a
    /// `Database` error.
    pub fn from_write(err: rusqlite::Error, entity: &'static str, id: i64) -> Self {
        match constraint_kind(&err) {
            Some(ConstraintKind::ForeignKey) => StoreError::ReferentialIntegrity {
                entity,
                message: err.to_string(),
            },
            Some(ConstraintKind::PrimaryKey) => StoreError::DuplicateKey { entity, id },
            _ => StoreError::Database(err),
        }
    }

    /// True for errors the caller can fix by changing the request
    /// (bad id, missing parent, duplicate) as opposed to backend failures.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. }
                | StoreError::DuplicateKey { .. }
                | StoreError::ReferentialIntegrity { .. }
        )
    }
}

/// Constraint families the store distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConstraintKind {
    ForeignKey,
    PrimaryKey,
    Other,
}

/// Inspect a rusqlite error for a constraint violation
pub(crate) fn constraint_kind(err: &rusqlite::Error) -> Option<ConstraintKind> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Some(match e.extended_code {
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    ConstraintKind::PrimaryKey
                }
                _ => ConstraintKind::Other,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk_error() -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                extended_code: ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            Some("FOREIGN KEY constraint failed".to_string()),
        )
    }

    #[test]
    fn test_foreign_key_failure_maps_to_referential_integrity() {
        let err = StoreError::from_write(fk_error(), "visit", 3);
        assert!(matches!(err, StoreError::ReferentialIntegrity { entity: "visit", .. }));
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_primary_key_failure_maps_to_duplicate() {
        let raw = rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                extended_code: ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
            },
            None,
        );
        let err = StoreError::from_write(raw, "doctor", 7);
        assert!(matches!(err, StoreError::DuplicateKey { entity: "doctor", id: 7 }));
    }

    #[test]
    fn test_backend_failure_is_not_caller_error() {
        let err = StoreError::from_write(rusqlite::Error::InvalidQuery, "drug", 1);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_caller_error());
    }
}
