#![allow(dead_code)]

use async_trait::async_trait;
use shardbatch::{
    BatchBackend, DataSource, DataSourceConfig, DbError, FieldAccessors,
    MultiDataSourceDirectory, RangeDatabaseShardingStrategy, Result, SingleDataSourceDirectory,
    Value,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub database: String,
    pub sqls: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub multi_statement: bool,
}

/// Backend that records every call and answers from a script.
///
/// Codes come from, in order: a scripted list for the data source, the value
/// of the echo column, or `1` per row.
#[derive(Default)]
pub struct RecordingBackend {
    multi_statement: bool,
    codes: HashMap<String, Vec<i64>>,
    echo_column: Option<usize>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_multi_statement(mut self) -> Self {
        self.multi_statement = true;
        self
    }

    pub fn with_codes(mut self, database: &str, codes: Vec<i64>) -> Self {
        self.codes.insert(database.to_string(), codes);
        self
    }

    pub fn echoing_column(mut self, column: usize) -> Self {
        self.echo_column = Some(column);
        self
    }

    pub fn failing_on(mut self, database: &str) -> Self {
        self.failing.insert(database.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_for(&self, database: &str) -> Option<RecordedCall> {
        self.calls().into_iter().find(|c| c.database == database)
    }

    async fn respond(
        &self,
        source: &DataSource,
        sqls: Vec<String>,
        rows: &[Vec<Value>],
        multi_statement: bool,
    ) -> Result<Vec<i64>> {
        self.calls.lock().unwrap().push(RecordedCall {
            database: source.name().to_string(),
            sqls,
            rows: rows.to_vec(),
            multi_statement,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(source.name()) {
            return Err(DbError::UnsupportedOperation("connection refused".to_string()));
        }
        if let Some(codes) = self.codes.get(source.name()) {
            return Ok(codes.clone());
        }
        Ok(match self.echo_column {
            Some(column) => rows
                .iter()
                .map(|row| row.get(column).and_then(Value::as_i64).unwrap_or(-1))
                .collect(),
            None => vec![1; rows.len()],
        })
    }
}

#[async_trait]
impl BatchBackend for RecordingBackend {
    async fn batch_update(
        &self,
        source: &DataSource,
        sql: &str,
        rows: &[Vec<Value>],
    ) -> Result<Vec<i64>> {
        self.respond(source, vec![sql.to_string(); rows.len()], rows, false)
            .await
    }

    fn supports_multi_statement(&self) -> bool {
        self.multi_statement
    }

    async fn batch_update_multi(
        &self,
        source: &DataSource,
        sqls: &[String],
        rows: &[Vec<Value>],
    ) -> Result<Vec<i64>> {
        self.respond(source, sqls.to_vec(), rows, true).await
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
}

impl User {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

pub fn user_accessors() -> FieldAccessors<User> {
    FieldAccessors::new()
        .value("id", |u: &User| u.id)
        .value("name", |u: &User| u.name.clone())
}

/// Ids below 50 live in `l50`, the rest in `g50`.
pub fn split50() -> Arc<RangeDatabaseShardingStrategy> {
    Arc::new(
        RangeDatabaseShardingStrategy::new("split50")
            .below(50, "l50")
            .otherwise("g50"),
    )
}

pub fn source(name: &str) -> DataSource {
    DataSource::new(name, DataSourceConfig::new()).unwrap()
}

pub fn single_directory() -> Arc<SingleDataSourceDirectory> {
    Arc::new(SingleDataSourceDirectory::new(source("main")))
}

pub fn directory(names: &[&str]) -> Arc<MultiDataSourceDirectory> {
    let mut directory = MultiDataSourceDirectory::new();
    for name in names {
        directory.register(source(name)).unwrap();
    }
    Arc::new(directory)
}
