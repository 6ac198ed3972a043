use super::strategy::{DatabaseShardingStrategy, ModTableShardingStrategy, TableShardingStrategy};
use crate::core::{DbError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Named sharding strategies that declarative operator specs refer to.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    tables: HashMap<String, Arc<dyn TableShardingStrategy>>,
    databases: HashMap<String, Arc<dyn DatabaseShardingStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in table strategies.
    pub fn with_default_strategies() -> Self {
        let mut registry = Self::new();
        registry.register_table(Arc::new(ModTableShardingStrategy::mod_hundred()));
        registry.register_table(Arc::new(ModTableShardingStrategy::mod_ten()));
        registry
    }

    /// Registers under the strategy's own name, replacing any previous entry.
    pub fn register_table(&mut self, strategy: Arc<dyn TableShardingStrategy>) {
        self.tables.insert(strategy.name().to_string(), strategy);
    }

    pub fn register_database(&mut self, strategy: Arc<dyn DatabaseShardingStrategy>) {
        self.databases.insert(strategy.name().to_string(), strategy);
    }

    pub fn table(&self, name: &str) -> Result<Arc<dyn TableShardingStrategy>> {
        self.tables.get(name).cloned().ok_or_else(|| {
            DbError::Config(format!("unknown table sharding strategy '{}'", name))
        })
    }

    pub fn database(&self, name: &str) -> Result<Arc<dyn DatabaseShardingStrategy>> {
        self.databases.get(name).cloned().ok_or_else(|| {
            DbError::Config(format!("unknown database sharding strategy '{}'", name))
        })
    }

    pub fn list_strategies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tables
            .keys()
            .chain(self.databases.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}
