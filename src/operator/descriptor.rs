use super::binder::RowBinder;
use super::return_shape::ReturnShape;
use crate::core::{DbError, Result};
use crate::record::FieldAccessors;
use crate::sharding::{DatabaseShardingStrategy, ShardResolver, TableShardingStrategy};
use crate::template::{SqlTemplate, TABLE_PLACEHOLDER};
use std::fmt;
use std::sync::Arc;

/// Logical database used when the builder is not given one.
pub const DEFAULT_DATABASE: &str = "default";

/// Everything an operator needs to know about its statement, resolved once.
pub struct OperatorDescriptor<R> {
    binder: RowBinder<R>,
    resolver: ShardResolver<R>,
    return_shape: ReturnShape,
}

impl<R> OperatorDescriptor<R> {
    pub fn builder(sql: impl Into<String>, accessors: FieldAccessors<R>) -> OperatorDescriptorBuilder<R> {
        OperatorDescriptorBuilder {
            sql: sql.into(),
            accessors,
            database: DEFAULT_DATABASE.to_string(),
            table: String::new(),
            shard_by: None,
            table_strategy: None,
            database_strategy: None,
            return_type: ReturnShape::IntArray.type_name().to_string(),
        }
    }

    pub fn binder(&self) -> &RowBinder<R> {
        &self.binder
    }

    pub fn resolver(&self) -> &ShardResolver<R> {
        &self.resolver
    }

    pub fn return_shape(&self) -> ReturnShape {
        self.return_shape
    }

    pub fn sql(&self) -> &str {
        self.binder.template().source()
    }
}

impl<R> fmt::Debug for OperatorDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorDescriptor")
            .field("sql", &self.sql())
            .field("database", &self.resolver.default_database())
            .field("table", &self.resolver.base_table())
            .field("sharded", &self.resolver.is_sharded())
            .field("return_shape", &self.return_shape)
            .finish()
    }
}

pub struct OperatorDescriptorBuilder<R> {
    sql: String,
    accessors: FieldAccessors<R>,
    database: String,
    table: String,
    shard_by: Option<String>,
    table_strategy: Option<Arc<dyn TableShardingStrategy>>,
    database_strategy: Option<Arc<dyn DatabaseShardingStrategy>>,
    return_type: String,
}

impl<R> OperatorDescriptorBuilder<R> {
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Base table substituted for `#table`, suffixed by a table strategy.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Field whose value both sharding strategies receive.
    pub fn shard_by(mut self, field: impl Into<String>) -> Self {
        self.shard_by = Some(field.into());
        self
    }

    pub fn table_strategy(mut self, strategy: Arc<dyn TableShardingStrategy>) -> Self {
        self.table_strategy = Some(strategy);
        self
    }

    pub fn database_strategy(mut self, strategy: Arc<dyn DatabaseShardingStrategy>) -> Self {
        self.database_strategy = Some(strategy);
        self
    }

    /// Declared return type name, e.g. `int[]` or `void`.
    pub fn return_type(mut self, declared: impl Into<String>) -> Self {
        self.return_type = declared.into();
        self
    }

    pub fn build(self) -> Result<OperatorDescriptor<R>> {
        let return_shape = ReturnShape::parse(&self.return_type)?;
        let template = SqlTemplate::parse(&self.sql)?;
        if template.uses_table() && self.table.trim().is_empty() {
            return Err(DbError::Config(format!(
                "statement uses {} but no table is configured",
                TABLE_PLACEHOLDER
            )));
        }

        let mut resolver = ShardResolver::new(self.database, self.table);
        if let Some(field) = &self.shard_by {
            resolver = resolver.shard_by(field, &self.accessors)?;
        }
        if let Some(strategy) = self.table_strategy {
            resolver = resolver.with_table_strategy(strategy);
        }
        if let Some(strategy) = self.database_strategy {
            resolver = resolver.with_database_strategy(strategy);
        }
        resolver.validate()?;

        let binder = RowBinder::new(template, &self.accessors)?;
        Ok(OperatorDescriptor {
            binder,
            resolver,
            return_shape,
        })
    }
}
