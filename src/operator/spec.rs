use super::config::OperatorConfig;
use super::descriptor::{DEFAULT_DATABASE, OperatorDescriptor};
use crate::core::{DbError, Result};
use crate::record::FieldAccessors;
use crate::sharding::StrategyRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Declarative form of an operator, loadable from JSON.
///
/// ```json
/// {
///   "sql": "update #table set name=:1.name where id=:1.id",
///   "table": "user",
///   "sharding": {
///     "shard_by": "id",
///     "table_strategy": "mod_hundred",
///     "database_strategy": "split50"
///   },
///   "return_type": "int[]",
///   "config": { "max_in_flight": 4 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorSpec {
    pub sql: String,
    #[serde(default)]
    pub table: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub sharding: Option<ShardingSpec>,
    #[serde(default = "default_return_type")]
    pub return_type: String,
    #[serde(default)]
    pub config: OperatorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShardingSpec {
    pub shard_by: String,
    #[serde(default)]
    pub table_strategy: Option<String>,
    #[serde(default)]
    pub database_strategy: Option<String>,
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_return_type() -> String {
    "int[]".to_string()
}

impl OperatorSpec {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(json)?;
        spec.config.validate()?;
        Ok(spec)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            DbError::Config(format!("cannot read operator spec '{}': {}", path.display(), err))
        })?;
        Self::from_json_str(&text)
    }

    /// Resolves strategy names against `registry` and fields against `accessors`.
    pub fn into_descriptor<R>(
        &self,
        registry: &StrategyRegistry,
        accessors: FieldAccessors<R>,
    ) -> Result<OperatorDescriptor<R>> {
        let mut builder = OperatorDescriptor::builder(self.sql.clone(), accessors)
            .database(self.database.clone())
            .table(self.table.clone())
            .return_type(self.return_type.clone());

        if let Some(sharding) = &self.sharding {
            builder = builder.shard_by(sharding.shard_by.clone());
            if let Some(name) = &sharding.table_strategy {
                builder = builder.table_strategy(registry.table(name)?);
            }
            if let Some(name) = &sharding.database_strategy {
                builder = builder.database_strategy(registry.database(name)?);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharding::RangeDatabaseShardingStrategy;
    use serde_json::json;
    use std::sync::Arc;

    const SHARDED: &str = r#"{
        "sql": "update #table set name=:1.name where id=:1.id",
        "table": "user",
        "sharding": {
            "shard_by": "id",
            "table_strategy": "mod_hundred",
            "database_strategy": "split50"
        },
        "return_type": "int"
    }"#;

    fn registry() -> StrategyRegistry {
        let mut registry = StrategyRegistry::with_default_strategies();
        registry.register_database(Arc::new(
            RangeDatabaseShardingStrategy::new("split50")
                .below(50, "l50")
                .otherwise("g50"),
        ));
        registry
    }

    #[test]
    fn test_defaults() {
        let spec = OperatorSpec::from_json_str(r#"{"sql": "update user set name=:name"}"#).unwrap();
        assert_eq!(spec.database, "default");
        assert_eq!(spec.return_type, "int[]");
        assert!(spec.sharding.is_none());
        assert_eq!(spec.config, OperatorConfig::default());
    }

    #[test]
    fn test_into_descriptor() {
        let spec = OperatorSpec::from_json_str(SHARDED).unwrap();
        let descriptor = spec
            .into_descriptor(&registry(), FieldAccessors::json())
            .unwrap();

        let key = descriptor
            .resolver()
            .resolve(&json!({"id": 20, "name": "lucy"}))
            .unwrap();
        assert_eq!(key.database, "l50");
        assert_eq!(key.table, "user_20");
    }

    #[test]
    fn test_unknown_strategy() {
        let spec = OperatorSpec::from_json_str(SHARDED).unwrap();
        let err = spec
            .into_descriptor(&StrategyRegistry::with_default_strategies(), FieldAccessors::json())
            .unwrap_err();
        assert!(err.to_string().contains("split50"));
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_config() {
        assert!(OperatorSpec::from_json_str(r#"{"sql": "x", "tabel": "user"}"#).is_err());
        assert!(
            OperatorSpec::from_json_str(r#"{"sql": "x", "config": {"max_in_flight": 0}}"#).is_err()
        );
    }
}
