use super::config::OperatorConfig;
use super::grouper::ShardGroup;
use crate::backend::BatchBackend;
use crate::core::{DbError, Result, Value};
use crate::datasource::{DataSource, DataSourceDirectory};
use crate::stats::StatsCounter;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, Level, event, info_span};

/// How one backend call covers the grouping result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallShape {
    /// One statement, every row of `groups[group]`.
    Single { group: usize },
    /// Several statements on one database. `entries` holds `(group, row)`
    /// pairs in request order; statement `i` is `groups[entries[i].0].sql`.
    MultiStatement {
        groups: Vec<usize>,
        entries: Vec<(usize, usize)>,
    },
}

impl CallShape {
    pub fn statement_count(&self, groups: &[ShardGroup]) -> usize {
        match self {
            Self::Single { group } => groups.get(*group).map_or(0, ShardGroup::len),
            Self::MultiStatement { entries, .. } => entries.len(),
        }
    }
}

/// A backend call with its data source already resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedCall {
    pub database: String,
    pub shape: CallShape,
    #[serde(skip)]
    pub source: Arc<DataSource>,
}

/// Sends grouped rows to the backend and records every attempt.
pub struct ExecutionDispatcher {
    backend: Arc<dyn BatchBackend>,
    directory: Arc<dyn DataSourceDirectory>,
    stats: Arc<StatsCounter>,
    config: OperatorConfig,
}

impl ExecutionDispatcher {
    pub fn new(
        backend: Arc<dyn BatchBackend>,
        directory: Arc<dyn DataSourceDirectory>,
        stats: Arc<StatsCounter>,
        config: OperatorConfig,
    ) -> Self {
        Self {
            backend,
            directory,
            stats,
            config,
        }
    }

    pub fn stats(&self) -> &Arc<StatsCounter> {
        &self.stats
    }

    fn coalesces(&self) -> bool {
        self.config.coalesce_statements && self.backend.supports_multi_statement()
    }

    /// Decides the backend calls for `groups` and resolves their data sources.
    ///
    /// Fails with [`DbError::DataSourceNotFound`] before anything is sent when
    /// any database is unknown to the directory.
    pub fn plan(&self, groups: &[ShardGroup]) -> Result<Vec<PlannedCall>> {
        let shapes: Vec<(String, CallShape)> = if self.coalesces() {
            coalesced_shapes(groups)
        } else {
            groups
                .iter()
                .enumerate()
                .map(|(index, group)| (group.database.clone(), CallShape::Single { group: index }))
                .collect()
        };

        let mut sources: HashMap<String, Arc<DataSource>> = HashMap::new();
        let mut calls = Vec::with_capacity(shapes.len());
        for (database, shape) in shapes {
            let source = match sources.get(&database) {
                Some(source) => Arc::clone(source),
                None => {
                    let source = self.directory.resolve(&database)?;
                    sources.insert(database.clone(), Arc::clone(&source));
                    source
                }
            };
            calls.push(PlannedCall {
                database,
                shape,
                source,
            });
        }

        event!(
            Level::DEBUG,
            groups = groups.len(),
            calls = calls.len(),
            "dispatch planned"
        );
        Ok(calls)
    }

    /// Runs `calls` and returns the codes of every group, index-aligned with `groups`.
    ///
    /// All calls run to completion; the first failure in call order is returned.
    pub async fn dispatch(
        &self,
        groups: &[ShardGroup],
        calls: &[PlannedCall],
    ) -> Result<Vec<Vec<i64>>> {
        let pending: Vec<_> = calls.iter().map(|call| self.run_call(groups, call)).collect();
        let results: Vec<Result<Vec<(usize, Vec<i64>)>>> = stream::iter(pending)
            .buffered(self.config.max_in_flight.max(1))
            .collect()
            .await;

        let mut outcomes: Vec<Vec<i64>> = vec![Vec::new(); groups.len()];
        for result in results {
            for (group, codes) in result? {
                if let Some(slot) = outcomes.get_mut(group) {
                    *slot = codes;
                }
            }
        }
        Ok(outcomes)
    }

    async fn run_call(
        &self,
        groups: &[ShardGroup],
        call: &PlannedCall,
    ) -> Result<Vec<(usize, Vec<i64>)>> {
        let span = info_span!(
            "batch_update.dispatch",
            database = %call.database,
            statements = call.shape.statement_count(groups)
        );

        async move {
            let started = Instant::now();
            let outcome = self.timed(call, self.send(groups, call)).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(per_group) => {
                    let rows: usize = per_group.iter().map(|(_, codes)| codes.len()).sum();
                    self.stats.record_success(rows, elapsed);
                    event!(Level::DEBUG, rows, elapsed_us = elapsed.as_micros() as u64, "batch dispatched");
                    Ok(per_group)
                }
                Err(err) => {
                    self.stats.record_exception(elapsed);
                    event!(Level::ERROR, error = %err, "batch dispatch failed");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn call_timeout(&self, source: &DataSource) -> Option<Duration> {
        source.config().query_timeout.or_else(|| self.config.timeout())
    }

    async fn timed<F>(&self, call: &PlannedCall, future: F) -> Result<Vec<(usize, Vec<i64>)>>
    where
        F: std::future::Future<Output = Result<Vec<(usize, Vec<i64>)>>>,
    {
        match self.call_timeout(&call.source) {
            Some(limit) => tokio::time::timeout(limit, future).await.map_err(|_| {
                DbError::dispatch(&call.database, format!("timed out after {:?}", limit))
            })?,
            None => future.await,
        }
    }

    async fn send(
        &self,
        groups: &[ShardGroup],
        call: &PlannedCall,
    ) -> Result<Vec<(usize, Vec<i64>)>> {
        match &call.shape {
            CallShape::Single { group } => {
                let group_ref = groups.get(*group).ok_or_else(|| {
                    DbError::Consistency(format!("call refers to unknown group {}", group))
                })?;
                let codes = self
                    .backend
                    .batch_update(&call.source, &group_ref.sql, &group_ref.rows)
                    .await
                    .map_err(|err| as_dispatch(&call.database, err))?;
                check_code_count(&call.database, group_ref.rows.len(), codes.len())?;
                Ok(vec![(*group, codes)])
            }
            CallShape::MultiStatement {
                groups: members,
                entries,
            } => {
                let mut sqls: Vec<String> = Vec::with_capacity(entries.len());
                let mut rows: Vec<Vec<Value>> = Vec::with_capacity(entries.len());
                for (group, row) in entries {
                    let values = groups
                        .get(*group)
                        .and_then(|g| g.rows.get(*row).map(|values| (g, values)))
                        .ok_or_else(|| {
                            DbError::Consistency(format!(
                                "call refers to unknown row {} of group {}",
                                row, group
                            ))
                        })?;
                    sqls.push(values.0.sql.to_string());
                    rows.push(values.1.clone());
                }

                let codes = self
                    .backend
                    .batch_update_multi(&call.source, &sqls, &rows)
                    .await
                    .map_err(|err| as_dispatch(&call.database, err))?;
                check_code_count(&call.database, rows.len(), codes.len())?;

                let mut per_group: Vec<(usize, Vec<i64>)> = members
                    .iter()
                    .map(|group| (*group, vec![0; groups.get(*group).map_or(0, ShardGroup::len)]))
                    .collect();
                for ((group, row), code) in entries.iter().zip(codes) {
                    if let Some((_, slot)) = per_group.iter_mut().find(|(g, _)| g == group) {
                        slot[*row] = code;
                    }
                }
                Ok(per_group)
            }
        }
    }
}

/// One call per database; databases holding several statements become a
/// multi-statement call.
fn coalesced_shapes(groups: &[ShardGroup]) -> Vec<(String, CallShape)> {
    let mut by_database: Vec<(String, Vec<usize>)> = Vec::new();
    for (index, group) in groups.iter().enumerate() {
        match by_database.iter_mut().find(|(db, _)| *db == group.database) {
            Some((_, members)) => members.push(index),
            None => by_database.push((group.database.clone(), vec![index])),
        }
    }

    by_database
        .into_iter()
        .map(|(database, members)| {
            if members.len() == 1 {
                return (database, CallShape::Single { group: members[0] });
            }
            let mut ordered: Vec<(usize, usize, usize)> = members
                .iter()
                .flat_map(|group| {
                    groups[*group]
                        .member_indices
                        .iter()
                        .enumerate()
                        .map(move |(row, original)| (*original, *group, row))
                })
                .collect();
            ordered.sort_unstable_by_key(|(original, _, _)| *original);
            let entries = ordered.into_iter().map(|(_, group, row)| (group, row)).collect();
            (
                database,
                CallShape::MultiStatement {
                    groups: members,
                    entries,
                },
            )
        })
        .collect()
}

fn as_dispatch(database: &str, err: DbError) -> DbError {
    if err.is_dispatch() {
        err
    } else {
        DbError::dispatch(database, err.to_string())
    }
}

fn check_code_count(database: &str, rows: usize, codes: usize) -> Result<()> {
    if rows != codes {
        return Err(DbError::dispatch(
            database,
            format!("backend returned {} codes for {} rows", codes, rows),
        ));
    }
    Ok(())
}
