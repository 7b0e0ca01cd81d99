// ❗ Error types for the farm ledger
// Library code returns FarmError; binaries wrap it in anyhow

use crate::schema::ValidationError;
use thiserror::Error;

/// Result type alias for store and config operations
pub type FarmResult<T> = Result<T, FarmError>;

#[derive(Error, Debug)]
pub enum FarmError {
    /// Update/delete/get referencing an id that does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Input rejected by field checks
    #[error("{}", describe_validation(.0))]
    Validation(Vec<ValidationError>),

    /// Configuration value out of range or unparsable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FarmError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        FarmError::NotFound { entity, id }
    }

    /// True for errors caused by the caller's input rather than storage
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FarmError::NotFound { .. } | FarmError::Validation(_)
        )
    }
}

impl From<Vec<ValidationError>> for FarmError {
    fn from(errors: Vec<ValidationError>) -> Self {
        FarmError::Validation(errors)
    }
}

fn describe_validation(errors: &[ValidationError]) -> String {
    let parts: Vec<String> = errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect();
    format!("validation failed: {}", parts.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = FarmError::not_found("Invoice", 42);
        assert_eq!(err.to_string(), "Invoice not found: 42");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = FarmError::from(vec![
            ValidationError::new("Invoice", "clientName", "Required field is empty"),
            ValidationError::new("Invoice", "quantity", "Must be greater than 0, got 0"),
        ]);

        assert_eq!(
            err.to_string(),
            "validation failed: clientName: Required field is empty; quantity: Must be greater than 0, got 0"
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn test_database_error_is_not_client_error() {
        let err = FarmError::from(rusqlite::Error::InvalidQuery);
        assert!(!err.is_client_error());
    }
}
