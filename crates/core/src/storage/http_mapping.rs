//! Pure functions for mapping repository errors to HTTP status codes.
//!
//! The mapping goes through [`ErrorKind`], so every variant of one kind
//! renders the same status.

use super::{ErrorKind, RepositoryError};

/// Maps an [`ErrorKind`] to an HTTP status code.
///
/// - `NotFound` -> 404
/// - `Conflict` -> 409
/// - `InvalidInput` -> 400
/// - `Timeout` -> 408
/// - `Internal` -> 500
pub fn error_kind_to_status_code(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::NotFound => 404,
        ErrorKind::Conflict => 409,
        ErrorKind::InvalidInput => 400,
        ErrorKind::Timeout => 408,
        ErrorKind::Internal => 500,
    }
}

/// Maps a [`RepositoryError`] to an HTTP status code.
///
/// # Examples
///
/// ```
/// use gymo_core::storage::{RepositoryError, repository_error_to_status_code};
///
/// let error = RepositoryError::Deleted {
///     entity_type: "Category",
///     id: 5,
/// };
/// assert_eq!(repository_error_to_status_code(&error), 404);
/// ```
pub fn repository_error_to_status_code(error: &RepositoryError) -> u16 {
    error_kind_to_status_code(error.kind())
}
