use super::binder::RowBinding;
use super::config::OperatorConfig;
use super::descriptor::OperatorDescriptor;
use super::dispatcher::{ExecutionDispatcher, PlannedCall};
use super::grouper::{ShardGroup, group};
use super::interceptor::{BatchInterceptor, InterceptorChain};
use super::reassembler::reassemble;
use super::return_shape::{BatchOutput, ReturnShape};
use crate::backend::BatchBackend;
use crate::core::{DbError, Result};
use crate::datasource::DataSourceDirectory;
use crate::stats::{StatsCounter, StatsSnapshot};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// What an invocation would send, without sending it.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchPlan {
    pub return_shape: ReturnShape,
    pub groups: Vec<ShardGroup>,
    pub calls: Vec<PlannedCall>,
}

impl DispatchPlan {
    pub fn call_count(&self) -> usize {
        self.calls.len()
    }
}

/// A sharded batch update statement, built once and executed many times.
///
/// Each invocation resolves the shard of every record, groups rows by
/// database and rendered statement, dispatches the groups and returns the
/// per-record codes in request order, coerced to the declared return shape.
/// Any failure before dispatch leaves the backend untouched.
///
/// # Examples
///
/// ```no_run
/// use shardbatch::{
///     BatchBackend, BatchUpdateOperator, DataSource, DataSourceConfig, FieldAccessors,
///     OperatorDescriptor, SingleDataSourceDirectory,
/// };
/// use std::sync::Arc;
///
/// # async fn run(backend: Arc<dyn BatchBackend>) -> shardbatch::Result<()> {
/// let descriptor = OperatorDescriptor::builder(
///     "update user set name=:1.name where id=:1.id",
///     FieldAccessors::json(),
/// )
/// .return_type("int")
/// .build()?;
///
/// let source = DataSource::new("main", DataSourceConfig::default())?;
/// let operator = BatchUpdateOperator::builder(descriptor)
///     .directory(Arc::new(SingleDataSourceDirectory::new(source)))
///     .backend(backend)
///     .build()?;
///
/// let records = vec![
///     serde_json::json!({"id": 100, "name": "ash"}),
///     serde_json::json!({"id": 200, "name": "lucy"}),
/// ];
/// let updated = operator.execute(&records).await?;
/// println!("{:?}", updated.as_sum());
/// # Ok(())
/// # }
/// ```
pub struct BatchUpdateOperator<R> {
    descriptor: OperatorDescriptor<R>,
    dispatcher: ExecutionDispatcher,
    interceptors: InterceptorChain,
}

impl<R> std::fmt::Debug for BatchUpdateOperator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchUpdateOperator").finish_non_exhaustive()
    }
}

impl<R> BatchUpdateOperator<R> {
    pub fn builder(descriptor: OperatorDescriptor<R>) -> BatchUpdateOperatorBuilder<R> {
        BatchUpdateOperatorBuilder {
            descriptor,
            directory: None,
            backend: None,
            stats: None,
            config: OperatorConfig::default(),
            interceptors: InterceptorChain::new(),
        }
    }

    pub fn descriptor(&self) -> &OperatorDescriptor<R> {
        &self.descriptor
    }

    pub fn return_shape(&self) -> ReturnShape {
        self.descriptor.return_shape()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.dispatcher.stats().snapshot()
    }

    pub async fn execute(&self, records: &[R]) -> Result<BatchOutput> {
        let span = info_span!(
            "batch_update.execute",
            sql = %self.descriptor.sql(),
            records = records.len(),
            return_shape = %self.return_shape()
        );

        async move {
            if records.is_empty() {
                event!(Level::DEBUG, "empty batch, nothing to dispatch");
                return Ok(self.return_shape().coerce(Vec::new()));
            }

            let groups = self.bind_and_group(records)?;
            self.interceptors.intercept(&groups)?;
            let calls = self.dispatcher.plan(&groups)?;
            let outcomes = self.dispatcher.dispatch(&groups, &calls).await?;
            let codes = reassemble(records.len(), &groups, &outcomes)?;

            event!(
                Level::DEBUG,
                groups = groups.len(),
                calls = calls.len(),
                "batch update finished"
            );
            Ok(self.return_shape().coerce(codes))
        }
        .instrument(span)
        .await
    }

    /// Resolves, binds and groups `records` and decides the backend calls.
    ///
    /// Interceptors are not consulted and nothing is dispatched.
    pub fn plan(&self, records: &[R]) -> Result<DispatchPlan> {
        let groups = if records.is_empty() {
            Vec::new()
        } else {
            self.bind_and_group(records)?
        };
        let calls = self.dispatcher.plan(&groups)?;
        Ok(DispatchPlan {
            return_shape: self.return_shape(),
            groups,
            calls,
        })
    }

    fn bind_and_group(&self, records: &[R]) -> Result<Vec<ShardGroup>> {
        let resolver = self.descriptor.resolver();
        let binder = self.descriptor.binder();
        // one rendering per distinct table
        let mut rendered: HashMap<String, Arc<str>> = HashMap::new();

        let bindings = records
            .iter()
            .enumerate()
            .map(|(original_index, record)| {
                let shard_key = resolver.resolve(record)?;
                let values = binder.values(record)?;
                let sql = match rendered.get(&shard_key.table) {
                    Some(sql) => Arc::clone(sql),
                    None => {
                        let sql: Arc<str> = Arc::from(binder.render(&shard_key.table));
                        rendered.insert(shard_key.table.clone(), Arc::clone(&sql));
                        sql
                    }
                };
                Ok(RowBinding {
                    original_index,
                    shard_key,
                    sql,
                    values,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(group(bindings))
    }
}

pub struct BatchUpdateOperatorBuilder<R> {
    descriptor: OperatorDescriptor<R>,
    directory: Option<Arc<dyn DataSourceDirectory>>,
    backend: Option<Arc<dyn BatchBackend>>,
    stats: Option<Arc<StatsCounter>>,
    config: OperatorConfig,
    interceptors: InterceptorChain,
}

impl<R> BatchUpdateOperatorBuilder<R> {
    pub fn directory(mut self, directory: Arc<dyn DataSourceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn BatchBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Shares a counter with other operators; each operator gets its own otherwise.
    pub fn stats(mut self, stats: Arc<StatsCounter>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn config(mut self, config: OperatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn BatchInterceptor>) -> Self {
        self.interceptors.register(interceptor);
        self
    }

    pub fn build(self) -> Result<BatchUpdateOperator<R>> {
        self.config.validate()?;
        let directory = self
            .directory
            .ok_or_else(|| DbError::Config("a data source directory is required".to_string()))?;
        let backend = self
            .backend
            .ok_or_else(|| DbError::Config("a batch backend is required".to_string()))?;
        let stats = self.stats.unwrap_or_default();

        Ok(BatchUpdateOperator {
            descriptor: self.descriptor,
            dispatcher: ExecutionDispatcher::new(backend, directory, stats, self.config),
            interceptors: self.interceptors,
        })
    }
}
