use super::{ParallelConfig, ParallelError, ParallelFlow};
use recordflow_context::Record;
use recordflow_core::{
    ExecutionEnv, FlowPipeline, PipelineError, StepError, Transformation, TransformationConfig,
    TransformationError,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Doubles `n`, fails on odd numbers when `strict`
struct Double {
    config: TransformationConfig,
    strict: bool,
}

impl Transformation for Double {
    fn name(&self) -> &str {
        "double"
    }

    fn config(&self) -> &TransformationConfig {
        &self.config
    }

    fn transform(&self, record: &mut Record) -> Result<(), StepError> {
        let n = record.get("n").and_then(Value::as_i64).unwrap_or_default();
        if self.strict && n % 2 == 1 {
            return Err(TransformationError::custom("odd_number", format!("{} is odd", n)).into());
        }
        record.insert("n", json!(n * 2));
        Ok(())
    }
}

fn pipeline(strict: bool, instant_fail: bool) -> FlowPipeline {
    let step: Arc<dyn Transformation> = Arc::new(Double {
        config: TransformationConfig::new().finalize("default"),
        strict,
    });
    FlowPipeline::new(vec![step], instant_fail, ExecutionEnv::with_defaults().unwrap())
}

fn records(count: i64) -> Vec<Record> {
    (0..count)
        .map(|n| Record::try_from(json!({ "n": n })).unwrap())
        .collect()
}

fn doubled(results: &[recordflow_core::FlowPipelineResult]) -> Vec<Value> {
    results
        .iter()
        .flat_map(|result| result.state.dataset("default").unwrap_or_default())
        .map(|record| record.get("n").cloned().unwrap_or(Value::Null))
        .collect()
}

#[tokio::test]
async fn test_parallel_config_creation() {
    let config = ParallelConfig::default();
    assert!(config.batch_size.is_none());
    assert!(config.workers.is_none());

    let config = ParallelConfig::with_workers(2).batch_size(10);
    assert_eq!(config.workers, Some(2));
    assert_eq!(config.batch_size, Some(10));

    assert_eq!(ParallelConfig::batched(3).workers(1), ParallelConfig {
        batch_size: Some(3),
        workers: Some(1),
    });
}

#[tokio::test]
async fn test_results_keep_input_order() {
    let config = ParallelConfig::batched(1).workers(ParallelFlow::available_workers());
    let flow = ParallelFlow::new(pipeline(false, false), config);

    let results = flow.execute(records(20)).await.unwrap();
    assert_eq!(results.len(), 20);
    assert!(results.iter().all(|result| result.success));

    let expected: Vec<Value> = (0..20).map(|n| json!(n * 2)).collect();
    assert_eq!(doubled(&results), expected);
}

#[tokio::test]
async fn test_uneven_batches() {
    let flow = ParallelFlow::new(pipeline(false, false), ParallelConfig::batched(3).workers(1));

    let results = flow.execute(records(7)).await.unwrap();
    let expected: Vec<Value> = (0..7).map(|n| json!(n * 2)).collect();
    assert_eq!(doubled(&results), expected);
}

#[tokio::test]
async fn test_failed_runs_are_results() {
    let flow = ParallelFlow::new(pipeline(true, false), ParallelConfig::batched(2).workers(1));

    let results = flow.execute(records(4)).await.unwrap();
    let success: Vec<bool> = results.iter().map(|result| result.success).collect();
    assert_eq!(success, vec![true, false, true, false]);
    assert_eq!(results[1].state.failed_records()[0].error_kind(), "odd_number");
}

#[tokio::test]
async fn test_instant_fail_propagates() {
    let flow = ParallelFlow::new(pipeline(true, true), ParallelConfig::batched(2).workers(1));

    let err = flow.execute(records(4)).await.unwrap_err();
    assert!(matches!(
        err,
        ParallelError::Pipeline(PipelineError::InstantFail { ref step, .. }) if step == "double"
    ));
}

#[tokio::test]
async fn test_insufficient_cores() {
    let available = ParallelFlow::available_workers();
    let flow = ParallelFlow::new(
        pipeline(false, false),
        ParallelConfig::with_workers(available + 1),
    );

    let err = flow.execute(records(1)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Desired number of cores: {}, available: {}",
            available + 1,
            available
        )
    );
}

#[tokio::test]
async fn test_invalid_settings() {
    let flow = ParallelFlow::new(pipeline(false, false), ParallelConfig::batched(0));
    assert!(matches!(
        flow.execute(records(1)).await,
        Err(ParallelError::InvalidBatchSize)
    ));

    let flow = ParallelFlow::new(pipeline(false, false), ParallelConfig::with_workers(0));
    assert!(matches!(
        flow.execute(records(1)).await,
        Err(ParallelError::InvalidWorkers)
    ));
}

#[tokio::test]
async fn test_empty_input() {
    let flow = ParallelFlow::new(pipeline(false, false), ParallelConfig::default());
    let results = flow.execute(Vec::new()).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_batches_use_own_condition_cache() {
    let step: Arc<dyn Transformation> = Arc::new(Double {
        config: TransformationConfig::new()
            .with_condition("@n > 2")
            .finalize("default"),
        strict: false,
    });
    let pipeline = FlowPipeline::new(vec![step], false, ExecutionEnv::with_defaults().unwrap());
    let flow = ParallelFlow::new(pipeline, ParallelConfig::batched(2));

    let results = flow.execute(records(6)).await.unwrap();
    assert_eq!(doubled(&results), vec![json!(0), json!(1), json!(2), json!(6), json!(8), json!(10)]);
    assert_eq!(flow.pipeline.env().cached_conditions(), 0);
}
