use crate::core::{DbError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime tuning of a batch update operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Per-call deadline in milliseconds; a data source's own query timeout wins
    pub dispatch_timeout_ms: Option<u64>,

    /// Maximum backend calls of one invocation running at the same time
    pub max_in_flight: usize,

    /// Merge groups that share a database into one multi-statement call when
    /// the backend supports it
    pub coalesce_statements: bool,
}

impl OperatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch_timeout(mut self, timeout: Duration) -> Self {
        // sub-millisecond timeouts round up rather than collapse to zero
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.dispatch_timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    pub fn coalesce_statements(mut self, coalesce: bool) -> Self {
        self.coalesce_statements = coalesce;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.dispatch_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(DbError::Config("max_in_flight must be > 0".to_string()));
        }
        if self.dispatch_timeout_ms == Some(0) {
            return Err(DbError::Config("dispatch_timeout_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_ms: None,
            max_in_flight: 8,
            coalesce_statements: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OperatorConfig::default();
        assert_eq!(config.timeout(), None);
        assert_eq!(config.max_in_flight, 8);
        assert!(config.coalesce_statements);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = OperatorConfig::new()
            .dispatch_timeout(Duration::from_millis(1500))
            .max_in_flight(2)
            .coalesce_statements(false);

        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.max_in_flight, 2);
        assert!(!config.coalesce_statements);
    }

    #[test]
    fn test_sub_millisecond_timeout_rounds_up() {
        let config = OperatorConfig::new().dispatch_timeout(Duration::from_micros(500));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1)));
        assert!(config.validate().is_ok());

        let config = OperatorConfig::new().dispatch_timeout(Duration::from_micros(1500));
        assert_eq!(config.dispatch_timeout_ms, Some(2));
    }

    #[test]
    fn test_validate() {
        assert!(OperatorConfig::new().max_in_flight(0).validate().is_err());
        assert!(OperatorConfig::new()
            .dispatch_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: OperatorConfig = serde_json::from_str(r#"{"max_in_flight": 3}"#).unwrap();
        assert_eq!(config.max_in_flight, 3);
        assert!(config.coalesce_statements);
    }
}
