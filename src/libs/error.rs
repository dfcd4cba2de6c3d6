//! Error types for the data-access layer.

use crate::libs::dialect::Dialect;
use thiserror::Error;

/// Main error type for connection, query and model operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Backend connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Prepare or execute failure, carrying the driver message
    #[error("Query failed: {message}\n  Query: {query}")]
    Query { message: String, query: String },

    /// No SQL template exists for this operation on the active dialect
    #[error("{operation} is not supported for the {dialect} dialect")]
    Unsupported {
        operation: &'static str,
        dialect: Dialect,
    },

    /// Identifier or input failed a format check
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Column name not present in the column set
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Second registration of an existing column name
    #[error("Duplicate column definition: {0}")]
    DuplicateColumn(String),

    /// Table or record the operation targets does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Every requested change matched the stored row
    #[error("Nothing to update for {0}")]
    NothingToUpdate(String),

    /// Configuration error (invalid TOML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (config file reads)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Wrap a driver error raised while running `query`.
    pub fn query(message: impl ToString, query: impl Into<String>) -> Self {
        DataError::Query {
            message: message.to_string(),
            query: query.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DataError::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, DataError::Unsupported { .. })
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        DataError::query(err, "")
    }
}

impl From<toml::de::Error> for DataError {
    fn from(err: toml::de::Error) -> Self {
        DataError::Config(err.to_string())
    }
}

/// Result type alias for data-access operations.
pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_keeps_message_and_sql() {
        let err = DataError::query("no such table: Roles", "SELECT * FROM Roles");
        let text = err.to_string();
        assert!(text.contains("no such table: Roles"));
        assert!(text.contains("SELECT * FROM Roles"));
    }

    #[test]
    fn unsupported_is_flagged() {
        let err = DataError::Unsupported {
            operation: "table_ddl",
            dialect: Dialect::SqlServer,
        };
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "table_ddl is not supported for the sqlsrv dialect");
        assert!(!DataError::validation("bad").is_unsupported());
    }

    #[test]
    fn not_found_is_distinct_from_validation() {
        let err = DataError::NotFound("table 'Nope'".into());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: table 'Nope'");
        assert!(!DataError::validation("table 'Nope'").is_not_found());
    }
}
