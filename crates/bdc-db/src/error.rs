//! Error types for the database management library.

use thiserror::Error;

/// Main error type for database management operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// Configuration error (invalid settings, missing namespace value, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider contribution failed to load.
    #[error("Provider '{provider}' failed to load: {message}")]
    Provider { provider: String, message: String },

    /// Connection pool error with context.
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Database connection or statement error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A value failed JSON Schema validation on write.
    #[error("Value does not match schema '{schema}': {message}")]
    Validation { schema: String, message: String },

    /// A schema key was requested that no provider contributed.
    #[error("No JSON Schema registered under key '{0}'")]
    SchemaNotFound(String),

    /// IO error (reading SQL or schema files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The user declined a confirmation prompt.
    #[error("Operation aborted")]
    Aborted,
}

impl DbError {
    /// Create a Pool error with context about where it occurred.
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        DbError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Provider error for a named contribution.
    pub fn provider(provider: impl Into<String>, message: impl ToString) -> Self {
        DbError::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Format error with full details including error chain.
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

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            DbError::Config(_) | DbError::Provider { .. } => 2,
            DbError::Aborted => 3,
            _ => 1,
        }
    }
}

/// Result type alias for database management operations.
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_names_the_provider() {
        let err = DbError::provider("demo_app", "directory not found");
        assert!(err.to_string().contains("demo_app"));
        assert!(err.to_string().contains("directory not found"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(DbError::Config("x".into()).exit_code(), 2);
        assert_eq!(DbError::Aborted.exit_code(), 3);
        assert_eq!(
            DbError::SchemaNotFound("dummy.json".into()).exit_code(),
            1
        );
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.sql");
        let err = DbError::Io(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error:"));
        assert!(detailed.contains("missing.sql"));
    }
}
