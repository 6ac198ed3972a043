use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error(
        "the return type of batch update expected one of [void, int, int[], Void, Integer, Integer[]] but {0}"
    )]
    InvalidReturnShape(String),

    #[error("Shard resolution error: {0}")]
    ShardResolution(String),

    #[error("Binding error: {0}")]
    Binding(String),

    #[error("Data source for database '{0}' not found")]
    DataSourceNotFound(String),

    #[error("Dispatch to database '{database}' failed: {message}")]
    Dispatch { database: String, message: String },

    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl DbError {
    pub(crate) fn dispatch(database: &str, message: impl Into<String>) -> Self {
        Self::Dispatch {
            database: database.to_string(),
            message: message.into(),
        }
    }

    /// True for errors raised while talking to a backend.
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_return_shape_message() {
        let err = DbError::InvalidReturnShape("String".to_string());
        assert_eq!(
            err.to_string(),
            "the return type of batch update expected one of [void, int, int[], Void, Integer, Integer[]] but String"
        );
    }

    #[test]
    fn test_dispatch_helper() {
        let err = DbError::dispatch("l50", "connection reset");
        assert!(err.is_dispatch());
        assert_eq!(
            err.to_string(),
            "Dispatch to database 'l50' failed: connection reset"
        );
    }
}
