use super::strategy::{DatabaseShardingStrategy, TableShardingStrategy};
use crate::core::{DbError, Result};
use crate::record::{Accessor, FieldAccessors};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The physical destination of one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ShardKey {
    pub database: String,
    pub table: String,
}

impl ShardKey {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

struct ShardParameter<R> {
    field: String,
    accessor: Accessor<R>,
}

/// Computes the shard key of a record from the configured strategies.
///
/// Both strategies read the same shard parameter. A missing table strategy
/// keeps the base table; a missing database strategy keeps the default
/// database. With no strategies at all the shard parameter is never read.
pub struct ShardResolver<R> {
    database: String,
    table: String,
    shard_parameter: Option<ShardParameter<R>>,
    table_strategy: Option<Arc<dyn TableShardingStrategy>>,
    database_strategy: Option<Arc<dyn DatabaseShardingStrategy>>,
}

impl<R> ShardResolver<R> {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            shard_parameter: None,
            table_strategy: None,
            database_strategy: None,
        }
    }

    /// Resolve the shard parameter field against the record's accessors.
    pub fn shard_by(mut self, field: &str, accessors: &FieldAccessors<R>) -> Result<Self> {
        let accessor = accessors.resolve(field)?;
        self.shard_parameter = Some(ShardParameter {
            field: field.to_string(),
            accessor,
        });
        Ok(self)
    }

    pub fn with_table_strategy(mut self, strategy: Arc<dyn TableShardingStrategy>) -> Self {
        self.table_strategy = Some(strategy);
        self
    }

    pub fn with_database_strategy(mut self, strategy: Arc<dyn DatabaseShardingStrategy>) -> Self {
        self.database_strategy = Some(strategy);
        self
    }

    pub fn is_sharded(&self) -> bool {
        self.table_strategy.is_some() || self.database_strategy.is_some()
    }

    pub fn default_database(&self) -> &str {
        &self.database
    }

    pub fn base_table(&self) -> &str {
        &self.table
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_strategy.is_none() && self.database.trim().is_empty() {
            return Err(DbError::Config(
                "a default database is required without a database sharding strategy".to_string(),
            ));
        }
        if self.table_strategy.is_some() && self.table.trim().is_empty() {
            return Err(DbError::Config(
                "a base table is required with a table sharding strategy".to_string(),
            ));
        }
        if self.is_sharded() && self.shard_parameter.is_none() {
            return Err(DbError::Config(
                "sharding strategies are configured but no shard parameter is set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolve(&self, record: &R) -> Result<ShardKey> {
        if !self.is_sharded() {
            return Ok(ShardKey::new(self.database.clone(), self.table.clone()));
        }

        let parameter = self.shard_parameter.as_ref().ok_or_else(|| {
            DbError::Config("sharding strategies are configured but no shard parameter is set".to_string())
        })?;
        let value = (parameter.accessor)(record).ok_or_else(|| {
            DbError::Binding(format!("record has no shard field '{}'", parameter.field))
        })?;
        if value.is_null() {
            return Err(DbError::ShardResolution(format!(
                "shard field '{}' is NULL",
                parameter.field
            )));
        }

        let table = match &self.table_strategy {
            Some(strategy) => format!("{}_{}", self.table, strategy.compute_table(&value)?),
            None => self.table.clone(),
        };
        let database = match &self.database_strategy {
            Some(strategy) => {
                let database = strategy.compute_database(&value)?;
                if database.trim().is_empty() {
                    return Err(DbError::ShardResolution(format!(
                        "strategy '{}' returned an empty database name for {}",
                        strategy.name(),
                        value
                    )));
                }
                database
            }
            None => self.database.clone(),
        };

        Ok(ShardKey { database, table })
    }
}

impl<R> fmt::Debug for ShardResolver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardResolver")
            .field("database", &self.database)
            .field("table", &self.table)
            .field(
                "shard_by",
                &self.shard_parameter.as_ref().map(|p| p.field.as_str()),
            )
            .field("table_strategy", &self.table_strategy.as_ref().map(|s| s.name()))
            .field(
                "database_strategy",
                &self.database_strategy.as_ref().map(|s| s.name()),
            )
            .finish()
    }
}
