use crate::catalogue::TransformationCatalogue;
use crate::configuration::FlowConfiguration;
use crate::error::{ConfigurationError, FlowError};
use crate::loader::FlowConfigurationLoader;
use recordflow_context::{FlowVariables, Record, RecordflowConfig};
use recordflow_core::{ExecutionEnv, FlowPipeline, FlowPipelineResult};
use recordflow_logger::Logger;
use recordflow_runtime::{Datasets, FailedDataset, FlowStatistics, ParallelFlow};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// 流程配置的来源
#[derive(Debug, Clone, Copy)]
pub enum FlowSource<'a> {
    /// `<flows_path>/<name>.yml` or `.yaml`
    Name(&'a str),
    File(&'a Path),
    Yaml(&'a str),
    Json(&'a str),
    Value(&'a Value),
}

/// 流程入口: 持有配置, 处理输入记录并汇总输出数据集
pub struct Flow {
    id: Uuid,
    configuration: FlowConfiguration,
    datasets: Datasets,
    failed_records: Vec<FailedDataset>,
    statistics: FlowStatistics,
    logger: Logger,
}

impl Flow {
    pub fn new(configuration: FlowConfiguration) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            configuration,
            datasets: Datasets::new(),
            failed_records: Vec::new(),
            statistics: FlowStatistics::default(),
            logger: Logger::with_trace_id(id.to_string()),
        }
    }

    /// Flow from a configuration value, using the built-in catalogue and the
    /// environment settings
    pub fn from_config(config: &Value) -> Result<Self, ConfigurationError> {
        Self::load_with(
            FlowSource::Value(config),
            &TransformationCatalogue::new(),
            &RecordflowConfig::from_env()?,
        )
    }

    /// Flow from `<flows_path>/<name>.yml`
    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        Self::load_with(
            FlowSource::Name(name),
            &TransformationCatalogue::new(),
            &RecordflowConfig::from_env()?,
        )
    }

    pub fn load_with(
        source: FlowSource<'_>,
        catalogue: &TransformationCatalogue,
        settings: &RecordflowConfig,
    ) -> Result<Self, ConfigurationError> {
        let schema = match source {
            FlowSource::Name(name) => FlowConfigurationLoader::load(name, &settings.flows_path)?,
            FlowSource::File(path) => FlowConfigurationLoader::from_file(path)?,
            FlowSource::Yaml(content) => FlowConfigurationLoader::from_yaml_str(content)?,
            FlowSource::Json(content) => FlowConfigurationLoader::from_json_str(content)?,
            FlowSource::Value(value) => FlowConfigurationLoader::from_value(value)?,
        };
        let configuration = FlowConfiguration::new(schema, catalogue, settings)?;
        Ok(Self::new(configuration))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn configuration(&self) -> &FlowConfiguration {
        &self.configuration
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    /// Records of one output dataset
    pub fn dataset(&self, name: &str) -> Option<&[Record]> {
        self.datasets.get(name)
    }

    pub fn failed_records(&self) -> &[FailedDataset] {
        &self.failed_records
    }

    pub fn statistics(&self) -> &FlowStatistics {
        &self.statistics
    }

    pub fn variables(&self) -> &FlowVariables {
        &self.configuration.variables
    }

    /// Variables can be changed between `process` calls, a running
    /// `process` works on a snapshot
    pub fn variables_mut(&mut self) -> &mut FlowVariables {
        &mut self.configuration.variables
    }

    /// Process `records` and merge the results into the flow's datasets,
    /// then evaluate the fail scenarios
    pub async fn process(&mut self, records: Vec<Value>) -> Result<(), FlowError> {
        let settings = Arc::clone(&self.configuration.settings);
        let records = records
            .into_iter()
            .enumerate()
            .map(|(position, value)| match value {
                Value::Object(data) => Ok(settings.record(data)),
                _ => Err(FlowError::NotAMapping(position)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let input_records = records.len();

        self.statistics =
            FlowStatistics::calculate(input_records, &self.datasets, &self.failed_records);
        self.logger.log_statistics("before_processing", &self.statistics);

        let env = ExecutionEnv::new(settings, Arc::new(self.configuration.variables.clone()))
            .map_err(ConfigurationError::from)?;
        let pipeline = FlowPipeline::new(
            self.configuration.transformations.clone(),
            self.configuration.instant_fail,
            env,
        );

        if self.configuration.parallel {
            tracing::debug!(flow_id = %self.id, "Initializing flow processing in parallel mode");
            let parallel = ParallelFlow::new(pipeline, self.configuration.parallel_config());
            for result in parallel.execute(records).await? {
                self.merge(result);
            }
        } else {
            tracing::debug!(flow_id = %self.id, "Initializing flow processing in single mode");
            for record in records {
                let result = pipeline.submit(record)?;
                self.merge(result);
            }
        }

        self.statistics =
            FlowStatistics::calculate(input_records, &self.datasets, &self.failed_records);
        self.logger.log_statistics("after_processing", &self.statistics);
        self.logger
            .log_flow_summary(&self.statistics, &self.datasets, &self.failed_records);

        self.configuration
            .fail_scenarios
            .evaluate(&self.statistics, &self.datasets)?;
        Ok(())
    }

    fn merge(&mut self, result: FlowPipelineResult) {
        if let Some(failed) = self.datasets.merge(result) {
            self.failed_records.push(failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flow(config: Value) -> Flow {
        Flow::load_with(
            FlowSource::Value(&config),
            &TransformationCatalogue::new(),
            &RecordflowConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_process_add_field() {
        let mut flow = flow(json!({
            "transformations": [{"add_field": {"name": "a", "value": "b"}}]
        }));
        flow.process(vec![json!({}), json!({"a": "c"})]).await.unwrap();

        assert_eq!(flow.datasets().to_value(), json!({"default": [{"a": "b"}]}));
        assert_eq!(flow.failed_records().len(), 1);
        assert_eq!(
            flow.failed_records()[0].failed_records[0].error_kind(),
            "output_already_exists"
        );
        assert_eq!(flow.statistics().failed_records, 1);
        assert_eq!(flow.statistics().percentage_of_failed_records, 50);
    }

    #[tokio::test]
    async fn test_not_a_mapping() {
        let mut flow = flow(json!({"transformations": []}));
        let err = flow.process(vec![json!({}), json!([1])]).await.unwrap_err();
        assert!(matches!(err, FlowError::NotAMapping(1)));
    }

    #[tokio::test]
    async fn test_variables_between_runs() {
        let mut flow = flow(json!({
            "variables": {"tag": "first"},
            "transformations": [{"add_field": {
                "name": "seen",
                "value": true,
                "condition": "@kind == !:tag"
            }}]
        }));

        flow.process(vec![json!({"kind": "second"})]).await.unwrap();
        assert_eq!(flow.dataset("default").unwrap()[0], json!({"kind": "second"}));

        flow.variables_mut().update("tag", json!("second")).unwrap();
        flow.process(vec![json!({"kind": "second"})]).await.unwrap();
        assert_eq!(
            flow.dataset("default").unwrap()[1],
            json!({"kind": "second", "seen": true})
        );
        assert!(flow.failed_records().is_empty());
    }
}
