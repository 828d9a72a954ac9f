//! Error type shared by the services

use crate::db::{is_foreign_key_violation, is_unique_violation};
use crate::models::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A field failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] FieldError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The input names rows that do not exist
    #[error("Invalid {field}: no such {entity} {ids:?}")]
    InvalidReference {
        field: &'static str,
        entity: &'static str,
        ids: Vec<i64>,
    },

    /// The write clashes with existing rows
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Turn constraint violations raised by the database into conflicts
    pub fn from_write(err: anyhow::Error, what: &str) -> Self {
        if is_foreign_key_violation(&err) {
            ServiceError::Conflict(format!("{} is still referenced by other records", what))
        } else if is_unique_violation(&err) {
            ServiceError::Conflict(format!("{} duplicates an existing record", what))
        } else {
            ServiceError::Internal(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_converts() {
        let err: ServiceError = FieldError::new("name", "This field is required").into();
        assert!(matches!(err, ServiceError::Validation(ref f) if f.field == "name"));
        assert_eq!(err.to_string(), "Validation error: name: This field is required");
    }

    #[test]
    fn test_not_found_message() {
        let err = ServiceError::not_found("Country", 7);
        assert_eq!(err.to_string(), "Country not found: 7");
    }

    #[test]
    fn test_plain_write_error_is_internal() {
        let err = ServiceError::from_write(anyhow::anyhow!("disk full"), "City 1");
        assert!(matches!(err, ServiceError::Internal(_)));
    }
}
