use thiserror::Error;

/// Coarse classification of a repository failure.
///
/// Callers branch on the kind; the concrete variant carries the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Timeout,
    Internal,
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: &'static str, id: i64 },
    #[error("{entity_type} {id} has been deleted")]
    Deleted { entity_type: &'static str, id: i64 },
    #[error("{relation} not found: {missing:?}")]
    RelationNotFound {
        relation: &'static str,
        missing: Vec<i64>,
    },
    #[error("{entity_type} with title '{title}' already exists")]
    Conflict {
        entity_type: &'static str,
        title: String,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Storage timed out: {0}")]
    Timeout(String),
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::NotFound { .. }
            | RepositoryError::Deleted { .. }
            | RepositoryError::RelationNotFound { .. } => ErrorKind::NotFound,
            RepositoryError::Conflict { .. } => ErrorKind::Conflict,
            RepositoryError::InvalidInput(_) => ErrorKind::InvalidInput,
            RepositoryError::Timeout(_) => ErrorKind::Timeout,
            RepositoryError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_not_found_display() {
        let error = RepositoryError::NotFound {
            entity_type: "Category",
            id: 5,
        };
        assert_eq!(error.to_string(), "Category not found: 5");
    }

    #[test]
    fn test_repository_error_deleted_display() {
        let error = RepositoryError::Deleted {
            entity_type: "Menu",
            id: 2,
        };
        assert_eq!(error.to_string(), "Menu 2 has been deleted");
    }

    #[test]
    fn test_repository_error_relation_not_found_display() {
        let error = RepositoryError::RelationNotFound {
            relation: "itemIds",
            missing: vec![3, 8],
        };
        assert_eq!(error.to_string(), "itemIds not found: [3, 8]");
    }

    #[test]
    fn test_repository_error_conflict_display() {
        let error = RepositoryError::Conflict {
            entity_type: "Item",
            title: "Chicken Pizza".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Item with title 'Chicken Pizza' already exists"
        );
    }

    #[test]
    fn test_repository_error_timeout_display() {
        let error = RepositoryError::Timeout("database is locked".to_string());
        assert_eq!(error.to_string(), "Storage timed out: database is locked");
    }

    #[test]
    fn test_kind_groups_not_found_variants() {
        let deleted = RepositoryError::Deleted {
            entity_type: "Item",
            id: 1,
        };
        let relation = RepositoryError::RelationNotFound {
            relation: "menuIds",
            missing: vec![1],
        };
        assert_eq!(deleted.kind(), ErrorKind::NotFound);
        assert_eq!(relation.kind(), ErrorKind::NotFound);
        assert_eq!(
            RepositoryError::Internal("x".to_string()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            RepositoryError::InvalidInput("x".to_string()).kind(),
            ErrorKind::InvalidInput
        );
    }
}
