//! # RecordFlow Pipeline
//!
//! 单条输入记录的运行: 按配置顺序执行所有步骤, 每一步取走 (drain) 其输入
//! 数据集中的记录, 成功的记录按输出数据集条件分发, 失败的记录进入
//! `failed_records`。

use crate::controller::{Controller, ControllerResult};
use crate::env::ExecutionEnv;
use crate::error::{ConditionError, PipelineError};
use crate::failed::FailedRecord;
use crate::transformation::Transformation;
use recordflow_context::Record;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// 一次运行的状态
#[derive(Debug, Clone)]
pub struct FlowPipelineState {
    pub pipeline_id: Uuid,
    pub run_id: Uuid,
    pub init_record: Record,
    datasets: BTreeMap<String, Vec<Record>>,
    failed_records: Vec<FailedRecord>,
}

impl FlowPipelineState {
    pub fn new(pipeline_id: Uuid, record: Record, default_dataset: &str) -> Self {
        let mut datasets = BTreeMap::new();
        datasets.insert(default_dataset.to_string(), vec![record.clone()]);
        Self {
            pipeline_id,
            run_id: Uuid::new_v4(),
            init_record: record,
            datasets,
            failed_records: Vec::new(),
        }
    }

    /// Remove `dataset` from the state and hand its records over
    pub fn get_records(&mut self, dataset: &str) -> Vec<Record> {
        self.datasets.remove(dataset).unwrap_or_default()
    }

    pub fn add_record(&mut self, dataset: &str, record: Record) {
        self.datasets
            .entry(dataset.to_string())
            .or_default()
            .push(record);
    }

    pub fn add_failed_record(&mut self, failed: FailedRecord) {
        self.failed_records.push(failed);
    }

    pub fn datasets(&self) -> &BTreeMap<String, Vec<Record>> {
        &self.datasets
    }

    pub fn dataset(&self, name: &str) -> Option<&[Record]> {
        self.datasets.get(name).map(Vec::as_slice)
    }

    pub fn failed_records(&self) -> &[FailedRecord] {
        &self.failed_records
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_records.is_empty()
    }

    pub fn into_parts(self) -> (BTreeMap<String, Vec<Record>>, Vec<FailedRecord>) {
        (self.datasets, self.failed_records)
    }
}

#[derive(Debug, Clone)]
pub struct FlowPipelineResult {
    pub success: bool,
    pub state: FlowPipelineState,
}

/// 步骤序列, 可被多次 `submit`, 每次提交互相独立
#[derive(Clone)]
pub struct FlowPipeline {
    id: Uuid,
    transformations: Vec<Arc<dyn Transformation>>,
    instant_fail: bool,
    env: ExecutionEnv,
}

impl FlowPipeline {
    pub fn new(
        transformations: Vec<Arc<dyn Transformation>>,
        instant_fail: bool,
        env: ExecutionEnv,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transformations,
            instant_fail,
            env,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn instant_fail(&self) -> bool {
        self.instant_fail
    }

    pub fn transformations(&self) -> &[Arc<dyn Transformation>] {
        &self.transformations
    }

    pub fn env(&self) -> &ExecutionEnv {
        &self.env
    }

    /// Run every step over one input record
    pub fn submit(&self, record: Record) -> Result<FlowPipelineResult, PipelineError> {
        let mut state = FlowPipelineState::new(self.id, record, self.env.default_dataset());
        let controller = Controller::new(&self.env);
        tracing::debug!(
            pipeline_id = %self.id,
            run_id = %state.run_id,
            "Submitting record to pipeline"
        );

        for transformation in &self.transformations {
            let records: Vec<Record> = transformation
                .input_datasets()
                .iter()
                .flat_map(|dataset| state.get_records(dataset))
                .collect();
            tracing::debug!(
                run_id = %state.run_id,
                step = %transformation.name(),
                records = records.len(),
                "Running transformation"
            );

            for record in records {
                match controller.process_record(record, transformation.as_ref())? {
                    ControllerResult::Processed(record) => {
                        self.route(&mut state, transformation.as_ref(), record)?;
                    }
                    ControllerResult::Failed(failed) => {
                        let error = failed.error.clone();
                        state.add_failed_record(failed);
                        if self.instant_fail {
                            tracing::error!(
                                run_id = %state.run_id,
                                step = %transformation.name(),
                                error = %error,
                                "Instant fail triggered"
                            );
                            return Err(PipelineError::InstantFail {
                                step: transformation.name().to_string(),
                                error,
                            });
                        }
                    }
                }
            }
        }

        Ok(FlowPipelineResult {
            success: !state.has_failures(),
            state,
        })
    }

    // 每个满足条件的输出数据集得到一份独立的记录, 最后一个直接取得所有权
    fn route(
        &self,
        state: &mut FlowPipelineState,
        transformation: &dyn Transformation,
        record: Record,
    ) -> Result<(), PipelineError> {
        let mut destinations = Vec::new();
        for output in transformation.output_datasets() {
            let Some(condition) = &output.condition else {
                destinations.push(output.name.as_str());
                continue;
            };
            match self.env.check_condition(condition, &record) {
                Ok(()) => destinations.push(output.name.as_str()),
                Err(ConditionError::NotMet(_)) => {
                    tracing::debug!(
                        run_id = %state.run_id,
                        dataset = %output.name,
                        "Output dataset condition not met"
                    );
                }
                Err(ConditionError::Expression(source)) => {
                    return Err(PipelineError::OutputCondition {
                        dataset: output.name.clone(),
                        source,
                    })
                }
            }
        }

        if let Some((last, others)) = destinations.split_last() {
            for dataset in others {
                state.add_record(dataset, record.clone());
            }
            state.add_record(last, record);
        }
        Ok(())
    }
}
