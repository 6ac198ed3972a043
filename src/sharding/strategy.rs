use crate::core::{DbError, Result, Value};
use std::sync::Arc;

/// Maps a shard value to a table suffix; the resolver appends it as `{table}_{suffix}`.
pub trait TableShardingStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn compute_table(&self, shard_value: &Value) -> Result<String>;
}

/// Maps a shard value to the name of the target database.
pub trait DatabaseShardingStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn compute_database(&self, shard_value: &Value) -> Result<String>;
}

fn shard_integer(strategy: &str, shard_value: &Value) -> Result<i64> {
    shard_value.as_i64().ok_or_else(|| {
        DbError::ShardResolution(format!(
            "strategy '{}' expects an integer shard value, got {}",
            strategy,
            shard_value.type_name()
        ))
    })
}

/// `value % modulus` as the table suffix. Negative values are outside the domain.
#[derive(Debug, Clone)]
pub struct ModTableShardingStrategy {
    name: String,
    modulus: i64,
}

impl ModTableShardingStrategy {
    pub fn new(modulus: i64) -> Result<Self> {
        if modulus <= 0 {
            return Err(DbError::Config(format!(
                "table sharding modulus must be > 0, got {}",
                modulus
            )));
        }
        Ok(Self {
            name: format!("mod_{}", modulus),
            modulus,
        })
    }

    pub fn mod_hundred() -> Self {
        Self {
            name: "mod_hundred".to_string(),
            modulus: 100,
        }
    }

    pub fn mod_ten() -> Self {
        Self {
            name: "mod_ten".to_string(),
            modulus: 10,
        }
    }
}

impl TableShardingStrategy for ModTableShardingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_table(&self, shard_value: &Value) -> Result<String> {
        let value = shard_integer(&self.name, shard_value)?;
        if value < 0 {
            return Err(DbError::ShardResolution(format!(
                "shard value {} is outside the domain of '{}'",
                value, self.name
            )));
        }
        Ok((value % self.modulus).to_string())
    }
}

/// Routes integer shard values by ordered exclusive upper bounds.
///
/// Values at or above the last bound fail unless a fallback database is set.
#[derive(Debug, Clone)]
pub struct RangeDatabaseShardingStrategy {
    name: String,
    ranges: Vec<(i64, String)>,
    fallback: Option<String>,
}

impl RangeDatabaseShardingStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ranges: Vec::new(),
            fallback: None,
        }
    }

    /// Values below `upper` (and at or above the previous bound) go to `database`.
    pub fn below(mut self, upper: i64, database: impl Into<String>) -> Self {
        self.ranges.push((upper, database.into()));
        self.ranges.sort_by_key(|(bound, _)| *bound);
        self
    }

    pub fn otherwise(mut self, database: impl Into<String>) -> Self {
        self.fallback = Some(database.into());
        self
    }
}

impl DatabaseShardingStrategy for RangeDatabaseShardingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_database(&self, shard_value: &Value) -> Result<String> {
        let value = shard_integer(&self.name, shard_value)?;
        self.ranges
            .iter()
            .find(|(upper, _)| value < *upper)
            .map(|(_, database)| database.clone())
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| {
                DbError::ShardResolution(format!(
                    "shard value {} matches no range of '{}'",
                    value, self.name
                ))
            })
    }
}

/// Spreads shard values over a fixed database list with a stable FNV-1a hash
/// of the value's text form.
#[derive(Debug, Clone)]
pub struct HashDatabaseShardingStrategy {
    name: String,
    databases: Vec<String>,
}

impl HashDatabaseShardingStrategy {
    pub fn new(name: impl Into<String>, databases: Vec<String>) -> Result<Self> {
        if databases.is_empty() {
            return Err(DbError::Config(
                "hash database sharding needs at least one database".to_string(),
            ));
        }
        if databases.iter().any(|db| db.trim().is_empty()) {
            return Err(DbError::Config(
                "database names must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name: name.into(),
            databases,
        })
    }
}

impl DatabaseShardingStrategy for HashDatabaseShardingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_database(&self, shard_value: &Value) -> Result<String> {
        if shard_value.is_null() {
            return Err(DbError::ShardResolution(format!(
                "strategy '{}' cannot hash a NULL shard value",
                self.name
            )));
        }
        let slot = stable_slot(&shard_value.to_string(), self.databases.len());
        Ok(self.databases[slot].clone())
    }
}

fn stable_slot(text: &str, slots: usize) -> usize {
    let mut hash = 14695981039346656037u64;
    for byte in text.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    (hash % slots as u64) as usize
}

type ShardFn = dyn Fn(&Value) -> Result<String> + Send + Sync;

/// Adapts a closure into a table strategy.
pub struct FnTableShardingStrategy {
    name: String,
    compute: Arc<ShardFn>,
}

impl FnTableShardingStrategy {
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Value) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            compute: Arc::new(compute),
        }
    }
}

impl TableShardingStrategy for FnTableShardingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_table(&self, shard_value: &Value) -> Result<String> {
        (self.compute)(shard_value)
    }
}

/// Adapts a closure into a database strategy.
pub struct FnDatabaseShardingStrategy {
    name: String,
    compute: Arc<ShardFn>,
}

impl FnDatabaseShardingStrategy {
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Value) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            compute: Arc::new(compute),
        }
    }
}

impl DatabaseShardingStrategy for FnDatabaseShardingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_database(&self, shard_value: &Value) -> Result<String> {
        (self.compute)(shard_value)
    }
}
