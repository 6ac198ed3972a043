use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use clap::Parser;
use shardbatch::{
    BatchBackend, BatchUpdateOperator, DataSource, DataSourceConfig, DataSourceDirectory,
    DbError, FieldAccessors, HashDatabaseShardingStrategy, MultiDataSourceDirectory,
    OperatorSpec, RangeDatabaseShardingStrategy, SingleDataSourceDirectory, StrategyRegistry,
    Value,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "shardbatch-plan")]
#[command(about = "Print how a batch update would be routed and dispatched")]
struct Cli {
    /// Operator spec (JSON)
    #[arg(long)]
    spec: PathBuf,

    /// Records to plan for (JSON array of objects)
    #[arg(long)]
    records: PathBuf,

    /// Plan as if the backend ran multi-statement batches
    #[arg(long)]
    multi_statement: bool,

    /// Known databases; any other routing target is an error. Unrestricted when omitted.
    #[arg(long = "database")]
    databases: Vec<String>,

    /// Hash database strategy, `name=db1,db2,...`
    #[arg(long = "hash")]
    hash_strategies: Vec<String>,

    /// Range database strategy, `name=upper:db,...,fallback_db`
    #[arg(long = "range")]
    range_strategies: Vec<String>,
}

/// Planning never reaches a backend.
struct DryRunBackend {
    multi_statement: bool,
}

#[async_trait]
impl BatchBackend for DryRunBackend {
    async fn batch_update(
        &self,
        source: &DataSource,
        _sql: &str,
        _rows: &[Vec<Value>],
    ) -> shardbatch::Result<Vec<i64>> {
        Err(DbError::UnsupportedOperation(format!(
            "dry run cannot execute against '{}'",
            source.name()
        )))
    }

    fn supports_multi_statement(&self) -> bool {
        self.multi_statement
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let spec = OperatorSpec::from_json_file(&cli.spec)
        .with_context(|| format!("failed to load {}", cli.spec.display()))?;
    let records_text = fs::read_to_string(&cli.records)
        .with_context(|| format!("failed to read {}", cli.records.display()))?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&records_text)
        .with_context(|| format!("{} is not a JSON array", cli.records.display()))?;

    let registry = build_registry(&cli)?;
    let descriptor = spec
        .into_descriptor(&registry, FieldAccessors::json())
        .context("invalid operator spec")?;

    let operator = BatchUpdateOperator::builder(descriptor)
        .directory(build_directory(&cli.databases)?)
        .backend(Arc::new(DryRunBackend {
            multi_statement: cli.multi_statement,
        }))
        .config(spec.config.clone())
        .build()?;

    let plan = operator.plan(&records).context("planning failed")?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn build_registry(cli: &Cli) -> Result<StrategyRegistry> {
    let mut registry = StrategyRegistry::with_default_strategies();

    for definition in &cli.hash_strategies {
        let (name, databases) = split_definition(definition)?;
        let databases = databases.split(',').map(|db| db.trim().to_string()).collect();
        registry.register_database(Arc::new(HashDatabaseShardingStrategy::new(name, databases)?));
    }

    for definition in &cli.range_strategies {
        let (name, ranges) = split_definition(definition)?;
        let mut strategy = RangeDatabaseShardingStrategy::new(name);
        for range in ranges.split(',').map(str::trim) {
            strategy = match range.split_once(':') {
                Some((upper, database)) => {
                    let upper: i64 = upper
                        .parse()
                        .with_context(|| format!("invalid range bound '{}'", upper))?;
                    strategy.below(upper, database)
                }
                None => strategy.otherwise(range),
            };
        }
        registry.register_database(Arc::new(strategy));
    }

    Ok(registry)
}

fn split_definition(definition: &str) -> Result<(&str, &str)> {
    let (name, body) = definition
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=..., got '{}'", definition))?;
    if name.trim().is_empty() || body.trim().is_empty() {
        bail!("expected name=..., got '{}'", definition);
    }
    Ok((name.trim(), body.trim()))
}

fn build_directory(databases: &[String]) -> Result<Arc<dyn DataSourceDirectory>> {
    if databases.is_empty() {
        let source = DataSource::new("dry-run", DataSourceConfig::default())?;
        return Ok(Arc::new(SingleDataSourceDirectory::new(source)));
    }

    let mut directory = MultiDataSourceDirectory::new();
    for name in databases {
        directory.register(DataSource::new(name.clone(), DataSourceConfig::default())?)?;
    }
    Ok(Arc::new(directory))
}
