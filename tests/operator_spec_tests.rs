/// Declarative operator spec tests
///
/// Loading operator specs from JSON files and running them on JSON records
/// Run with: cargo test --test operator_spec_tests

mod common;

use common::{RecordingBackend, directory, split50};
use serde_json::json;
use shardbatch::{
    BatchOutput, BatchUpdateOperator, DbError, FieldAccessors, HashDatabaseShardingStrategy,
    OperatorSpec, StrategyRegistry,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_spec(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn registry() -> StrategyRegistry {
    let mut registry = StrategyRegistry::with_default_strategies();
    registry.register_database(split50());
    registry
}

#[tokio::test]
async fn test_spec_file_drives_sharded_operator() {
    let file = write_spec(
        r#"{
            "sql": "update #table set name=:1.name where id=:1.id",
            "table": "user",
            "sharding": {
                "shard_by": "id",
                "table_strategy": "mod_hundred",
                "database_strategy": "split50"
            },
            "return_type": "int[]",
            "config": { "max_in_flight": 1 }
        }"#,
    );

    let spec = OperatorSpec::from_json_file(file.path()).unwrap();
    assert_eq!(spec.config.max_in_flight, 1);
    let descriptor = spec
        .into_descriptor(&registry(), FieldAccessors::json())
        .unwrap();

    let backend = Arc::new(
        RecordingBackend::new()
            .with_multi_statement()
            .with_codes("l50", vec![5, 8])
            .with_codes("g50", vec![6]),
    );
    let operator = BatchUpdateOperator::builder(descriptor)
        .directory(directory(&["l50", "g50"]))
        .backend(backend.clone())
        .config(spec.config.clone())
        .build()
        .unwrap();

    let records = vec![
        json!({"id": 10, "name": "a"}),
        json!({"id": 20, "name": "b"}),
        json!({"id": 60, "name": "c"}),
    ];
    let result = operator.execute(&records).await.unwrap();
    assert_eq!(result, BatchOutput::Array(vec![5, 8, 6]));
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_nested_json_fields() {
    let spec = OperatorSpec::from_json_str(
        r#"{
            "sql": "update account set city=:1.address.city where id=:1.id",
            "database": "main",
            "return_type": "int"
        }"#,
    )
    .unwrap();
    let descriptor = spec
        .into_descriptor(&registry(), FieldAccessors::json())
        .unwrap();
    let backend = Arc::new(RecordingBackend::new());
    let operator = BatchUpdateOperator::builder(descriptor)
        .directory(directory(&["main"]))
        .backend(backend.clone())
        .build()
        .unwrap();

    let records = vec![
        json!({"id": 1, "address": {"city": "Lviv"}}),
        json!({"id": 2, "address": {"city": "Kyiv"}}),
    ];
    assert_eq!(operator.execute(&records).await.unwrap(), BatchOutput::Sum(2));

    let call = backend.call_for("main").unwrap();
    assert_eq!(call.sqls[0], "update account set city=? where id=?");
    assert_eq!(call.rows[1][0], shardbatch::Value::from("Kyiv"));

    let err = operator
        .execute(&[json!({"id": 3})])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Binding(_)));
}

#[tokio::test]
async fn test_hash_strategy_from_registry() {
    let mut registry = registry();
    registry.register_database(Arc::new(
        HashDatabaseShardingStrategy::new("by_hash", vec!["h0".into(), "h1".into()]).unwrap(),
    ));
    let spec = OperatorSpec::from_json_str(
        r#"{
            "sql": "update user set name=:name where id=:id",
            "sharding": { "shard_by": "id", "database_strategy": "by_hash" },
            "return_type": "int[]"
        }"#,
    )
    .unwrap();
    let descriptor = spec.into_descriptor(&registry, FieldAccessors::json()).unwrap();
    let operator = BatchUpdateOperator::builder(descriptor)
        .directory(directory(&["h0", "h1"]))
        .backend(Arc::new(RecordingBackend::new().echoing_column(1)))
        .build()
        .unwrap();

    let records: Vec<_> = (0..12).map(|id| json!({"id": id, "name": "n"})).collect();
    let plan = operator.plan(&records).unwrap();
    let planned: usize = plan.groups.iter().map(|g| g.len()).sum();
    assert_eq!(planned, 12);
    assert!(plan.groups.iter().all(|g| g.database == "h0" || g.database == "h1"));

    let result = operator.execute(&records).await.unwrap();
    assert_eq!(result, BatchOutput::Array((0..12).collect()));
}

#[test]
fn test_invalid_specs() {
    let missing = OperatorSpec::from_json_file("/nonexistent/operator.json").unwrap_err();
    assert!(matches!(missing, DbError::Config(_)));

    let file = write_spec("{ not json");
    assert!(OperatorSpec::from_json_file(file.path()).is_err());

    let spec = OperatorSpec::from_json_str(r#"{"sql": "update user set a=:a", "return_type": "long"}"#)
        .unwrap();
    let err = spec
        .into_descriptor(&registry(), FieldAccessors::json())
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidReturnShape(_)));
}
