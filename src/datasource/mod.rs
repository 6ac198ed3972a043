pub mod config;

use crate::core::{DbError, Result};
use config::DataSourceConfig;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Handle to one physical data source, passed to the backend with every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    name: String,
    config: DataSourceConfig,
}

impl DataSource {
    pub fn new(name: impl Into<String>, config: DataSourceConfig) -> Result<Self> {
        let name = name.into();
        config.validate()?;
        Ok(Self { name, config })
    }

    /// Logical database name shard strategies route to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }
}

/// Maps logical database names to data sources.
pub trait DataSourceDirectory: Send + Sync {
    fn resolve(&self, database: &str) -> Result<Arc<DataSource>>;

    /// Logical names this directory knows, for diagnostics.
    fn databases(&self) -> Vec<String>;
}

/// One data source serving every database name.
#[derive(Debug, Clone)]
pub struct SingleDataSourceDirectory {
    source: Arc<DataSource>,
}

impl SingleDataSourceDirectory {
    pub fn new(source: DataSource) -> Self {
        Self {
            source: Arc::new(source),
        }
    }
}

impl DataSourceDirectory for SingleDataSourceDirectory {
    fn resolve(&self, _database: &str) -> Result<Arc<DataSource>> {
        Ok(Arc::clone(&self.source))
    }

    fn databases(&self) -> Vec<String> {
        vec![self.source.name().to_string()]
    }
}

/// Named data sources; unknown names are an error.
#[derive(Debug, Clone, Default)]
pub struct MultiDataSourceDirectory {
    sources: BTreeMap<String, Arc<DataSource>>,
}

impl MultiDataSourceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: DataSource) -> Result<()> {
        if source.name().trim().is_empty() {
            return Err(DbError::Config(
                "data source name must not be empty".to_string(),
            ));
        }
        if self.sources.contains_key(source.name()) {
            return Err(DbError::Config(format!(
                "data source '{}' is already registered",
                source.name()
            )));
        }
        self.sources
            .insert(source.name().to_string(), Arc::new(source));
        Ok(())
    }

    pub fn with_source(mut self, source: DataSource) -> Result<Self> {
        self.register(source)?;
        Ok(self)
    }
}

impl DataSourceDirectory for MultiDataSourceDirectory {
    fn resolve(&self, database: &str) -> Result<Arc<DataSource>> {
        self.sources
            .get(database)
            .cloned()
            .ok_or_else(|| DbError::DataSourceNotFound(database.to_string()))
    }

    fn databases(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }
}
