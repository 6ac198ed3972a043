// ============================================================================
// shardbatch Library
// ============================================================================

//! Sharded batch updates.
//!
//! A [`BatchUpdateOperator`] takes a SQL template such as
//! `update #table set name=:1.name where id=:1.id` and a slice of records,
//! routes every record to its database and table through pluggable sharding
//! strategies, sends one batch per destination through a [`BatchBackend`] and
//! hands back the per-record results in request order.

pub mod backend;
pub mod core;
pub mod datasource;
pub mod operator;
pub mod record;
pub mod sharding;
pub mod stats;
pub mod template;

// Re-export main types for convenience
pub use backend::{BatchBackend, EXECUTE_FAILED, SUCCESS_NO_INFO};
pub use core::{DbError, Result, Value};
pub use datasource::{
    DataSource, DataSourceDirectory, MultiDataSourceDirectory, SingleDataSourceDirectory,
    config::DataSourceConfig,
};
pub use operator::{
    BatchInterceptor, BatchOutput, BatchUpdateOperator, CallShape, DispatchPlan, OperatorConfig,
    OperatorDescriptor, OperatorSpec, ReturnShape, ShardGroup,
};
pub use record::{Accessor, FieldAccessors};
pub use sharding::{
    DatabaseShardingStrategy, FnDatabaseShardingStrategy, FnTableShardingStrategy,
    HashDatabaseShardingStrategy, ModTableShardingStrategy, RangeDatabaseShardingStrategy,
    ShardKey, StrategyRegistry, TableShardingStrategy,
};
pub use stats::{StatsCounter, StatsSnapshot};
pub use template::SqlTemplate;
