//! SQLite error mapping.
//!
//! Maps `tokio_rusqlite::Error` and `rusqlite::Error` to `RepositoryError` from
//! `gymo_core::storage`. Raw SQLite errors never leave this module.

use gymo_core::storage::RepositoryError;
use rusqlite::ErrorCode;

/// What the failing statement was doing, for error context.
#[derive(Debug, Clone, Copy)]
pub struct ErrorContext<'a> {
    pub entity_type: &'static str,
    pub title: Option<&'a str>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(entity_type: &'static str) -> Self {
        Self {
            entity_type,
            title: None,
        }
    }

    pub fn with_title(entity_type: &'static str, title: &'a str) -> Self {
        Self {
            entity_type,
            title: Some(title),
        }
    }
}

/// Maps a rusqlite error to a RepositoryError.
///
/// # Error Mapping
///
/// - `SQLITE_CONSTRAINT_UNIQUE` → `RepositoryError::Conflict`
/// - `SQLITE_CONSTRAINT_NOTNULL` → `RepositoryError::InvalidInput`
/// - busy, locked or interrupted → `RepositoryError::Timeout`
/// - All other errors → `RepositoryError::Internal`
fn map_rusqlite_error(err: &rusqlite::Error, ctx: ErrorContext<'_>) -> RepositoryError {
    match err {
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepositoryError::Conflict {
                entity_type: ctx.entity_type,
                title: ctx.title.unwrap_or("unknown").to_string(),
            }
        }

        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL =>
        {
            RepositoryError::InvalidInput(format!(
                "{} is missing a required field: {err}",
                ctx.entity_type
            ))
        }

        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if matches!(
                sqlite_err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::OperationInterrupted
            ) =>
        {
            RepositoryError::Timeout(err.to_string())
        }

        _ => RepositoryError::Internal(err.to_string()),
    }
}

/// Maps a tokio_rusqlite error to a RepositoryError.
///
/// This is the main entry point for error mapping in async code.
pub fn map_tokio_rusqlite_error(
    err: tokio_rusqlite::Error,
    ctx: ErrorContext<'_>,
) -> RepositoryError {
    match &err {
        tokio_rusqlite::Error::Rusqlite(rusqlite_err) => map_rusqlite_error(rusqlite_err, ctx),
        tokio_rusqlite::Error::ConnectionClosed | tokio_rusqlite::Error::Close(_) => {
            RepositoryError::Internal("Connection closed unexpectedly".to_string())
        }
        _ => RepositoryError::Internal(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn failure(code: ErrorCode, extended_code: i32) -> tokio_rusqlite::Error {
        let sqlite_err = ffi::Error {
            code,
            extended_code,
        };
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(sqlite_err, None))
    }

    #[test]
    fn test_unique_constraint_maps_to_conflict() {
        let err = failure(ErrorCode::ConstraintViolation, ffi::SQLITE_CONSTRAINT_UNIQUE);

        let result = map_tokio_rusqlite_error(err, ErrorContext::with_title("Item", "Suya"));

        assert_eq!(
            result,
            RepositoryError::Conflict {
                entity_type: "Item",
                title: "Suya".to_string(),
            }
        );
    }

    #[test]
    fn test_not_null_constraint_maps_to_invalid_input() {
        let err = failure(ErrorCode::ConstraintViolation, ffi::SQLITE_CONSTRAINT_NOTNULL);

        let result = map_tokio_rusqlite_error(err, ErrorContext::new("Menu"));

        assert!(matches!(result, RepositoryError::InvalidInput(_)));
    }

    #[test]
    fn test_busy_and_locked_map_to_timeout() {
        for (code, extended) in [
            (ErrorCode::DatabaseBusy, ffi::SQLITE_BUSY),
            (ErrorCode::DatabaseLocked, ffi::SQLITE_LOCKED),
            (ErrorCode::OperationInterrupted, ffi::SQLITE_INTERRUPT),
        ] {
            let result = map_tokio_rusqlite_error(failure(code, extended), ErrorContext::new("Menu"));
            assert!(
                matches!(result, RepositoryError::Timeout(_)),
                "{code:?} should map to Timeout"
            );
        }
    }

    #[test]
    fn test_foreign_key_maps_to_internal() {
        let err = failure(ErrorCode::ConstraintViolation, ffi::SQLITE_CONSTRAINT_FOREIGNKEY);

        let result = map_tokio_rusqlite_error(err, ErrorContext::new("Item"));

        assert!(matches!(result, RepositoryError::Internal(_)));
    }

    #[test]
    fn test_other_error_maps_to_internal() {
        let err = tokio_rusqlite::Error::Other(Box::new(std::io::Error::other("test error")));

        let result = map_tokio_rusqlite_error(err, ErrorContext::new("Category"));

        assert!(matches!(result, RepositoryError::Internal(_)));
    }
}
