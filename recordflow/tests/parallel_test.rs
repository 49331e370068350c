use recordflow::context::RecordflowConfig;
use recordflow::prelude::*;
use recordflow::runtime::ParallelError;
use recordflow::yaml::{ConfigurationError, FlowError};
use serde_json::{json, Value};

fn flow(config: Value) -> Result<Flow, ConfigurationError> {
    Flow::load_with(
        FlowSource::Value(&config),
        &TransformationCatalogue::new(),
        &RecordflowConfig::default(),
    )
}

fn records(count: usize) -> Vec<Value> {
    (0..count).map(|i| json!({"id": i})).collect()
}

fn transformations() -> Value {
    json!([
        {"add_field": {"name": "a", "value": "b"}},
        {"add_field": {"name": "c/d", "value": "e"}},
        {"prefix": {"field": "name", "value": "x-", "ignore_errors": ["field_does_not_exist"]}}
    ])
}

#[tokio::test]
async fn test_simple_parallel() {
    let mut flow = flow(json!({
        "parallel": true,
        "transformations": transformations()
    }))
    .unwrap();
    flow.process(vec![json!({}), json!({"1": "a"}), json!({"name": "n"})])
        .await
        .unwrap();

    assert_eq!(
        flow.datasets().to_value(),
        json!({"default": [
            {"a": "b", "c": {"d": "e"}},
            {"1": "a", "a": "b", "c": {"d": "e"}},
            {"name": "x-n", "a": "b", "c": {"d": "e"}}
        ]})
    );
    assert!(flow.failed_records().is_empty());
}

#[tokio::test]
async fn test_parallel_matches_single_mode() {
    let mut input = records(23);
    input.push(json!({"id": 99, "a": "taken"}));

    let mut single = flow(json!({"transformations": transformations()})).unwrap();
    single.process(input.clone()).await.unwrap();

    let mut parallel = flow(json!({
        "parallel": true,
        "batch": 4,
        "transformations": transformations()
    }))
    .unwrap();
    parallel.process(input).await.unwrap();

    assert_eq!(parallel.datasets(), single.datasets());
    assert_eq!(parallel.failed_records().len(), 1);
    assert_eq!(
        parallel.failed_records()[0].init_record,
        single.failed_records()[0].init_record
    );
    assert_eq!(parallel.statistics(), single.statistics());
}

#[tokio::test]
async fn test_parallel_with_batch_and_cores() {
    let input = records(5);
    let mut flow = flow(json!({
        "parallel": true,
        "batch": 2,
        "cores": 1,
        "transformations": transformations()
    }))
    .unwrap();
    flow.process(input).await.unwrap();

    let ids: Vec<Value> = flow
        .dataset("default")
        .unwrap()
        .iter()
        .map(|record| record.get("id").cloned().unwrap_or(Value::Null))
        .collect();
    assert_eq!(ids, (0..5).map(|i| json!(i)).collect::<Vec<_>>());
    assert!(flow.failed_records().is_empty());
}

#[tokio::test]
async fn test_parallel_not_available_cores() {
    let mut flow = flow(json!({
        "parallel": true,
        "batch": 2,
        "cores": 100000,
        "transformations": []
    }))
    .unwrap();
    let err = flow.process(vec![json!({})]).await.unwrap_err();

    assert!(matches!(
        err,
        FlowError::Parallel(ParallelError::InsufficientCores { desired: 100000, .. })
    ));
    assert!(err
        .to_string()
        .contains("Desired number of cores: 100000, available: "));
}

#[tokio::test]
async fn test_parallel_instant_fail() {
    let mut flow = flow(json!({
        "parallel": true,
        "batch": 1,
        "instant_fail": true,
        "transformations": [{"add_field": {"name": "a", "value": "b"}}]
    }))
    .unwrap();
    let err = flow
        .process(vec![json!({}), json!({"a": 1})])
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::InstantFail(_)));
}

#[test]
fn test_parallel_misconfigured() {
    for (config, message) in [
        (
            json!({"cores": 100, "transformations": []}),
            "Cores parameter cannot be set if 'parallel' is not set to 'True'",
        ),
        (
            json!({"batch": 2, "transformations": []}),
            "Batch parameter cannot be set if 'parallel' is not set to 'True'",
        ),
        (
            json!({"batch": -1, "cores": 100, "parallel": true, "transformations": []}),
            "Batch parameter has to be greater than 0",
        ),
        (
            json!({"batch": 2, "cores": -1, "parallel": true, "transformations": []}),
            "Cores parameter has to be greater than 0",
        ),
    ] {
        let err = flow(config).err().unwrap();
        assert!(
            err.to_string().contains(message),
            "expected '{}', got '{}'",
            message,
            err
        );
    }
}
