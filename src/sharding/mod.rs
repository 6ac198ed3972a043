pub mod registry;
pub mod resolver;
pub mod strategy;

pub use registry::StrategyRegistry;
pub use resolver::{ShardKey, ShardResolver};
pub use strategy::{
    DatabaseShardingStrategy, FnDatabaseShardingStrategy, FnTableShardingStrategy,
    HashDatabaseShardingStrategy, ModTableShardingStrategy, RangeDatabaseShardingStrategy,
    TableShardingStrategy,
};
