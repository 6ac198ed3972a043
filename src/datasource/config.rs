use crate::core::{DbError, Result};
use std::time::Duration;

/// Per-source dispatch settings.
///
/// # Examples
///
/// ```
/// use shardbatch::DataSourceConfig;
/// use std::time::Duration;
///
/// let config = DataSourceConfig::new().query_timeout(Duration::from_millis(250));
/// assert_eq!(config.query_timeout, Some(Duration::from_millis(250)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceConfig {
    /// Per-call timeout for batch statements; overrides the operator default
    pub query_timeout: Option<Duration>,
}

impl DataSourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.query_timeout == Some(Duration::ZERO) {
            return Err(DbError::Config("query_timeout must be > 0".to_string()));
        }
        Ok(())
    }
}
