use crate::catalogue::TransformationCatalogue;
use crate::error::ConfigurationError;
use crate::schema::FlowSchema;
use recordflow_context::{FlowVariables, RecordflowConfig};
use recordflow_core::Transformation;
use recordflow_runtime::{FlowFailScenario, ParallelConfig};
use std::fmt;
use std::sync::Arc;

/// 校验并解析后的流程配置
#[derive(Clone)]
pub struct FlowConfiguration {
    pub description: Option<String>,
    /// Settings used by this flow, the flow's own path separator applied
    pub settings: Arc<RecordflowConfig>,
    pub parallel: bool,
    pub cores: Option<usize>,
    pub batch: Option<usize>,
    pub variables: FlowVariables,
    pub fail_scenarios: FlowFailScenario,
    pub instant_fail: bool,
    pub transformations: Vec<Arc<dyn Transformation>>,
}

impl FlowConfiguration {
    /// Resolve every transformation of `schema` through `catalogue`
    pub fn new(
        schema: FlowSchema,
        catalogue: &TransformationCatalogue,
        settings: &RecordflowConfig,
    ) -> Result<Self, ConfigurationError> {
        let mut settings = settings.clone();
        if let Some(separator) = schema.path_separator()? {
            settings.path_separator = separator;
        }
        settings.validate()?;

        let fail_scenarios = schema.fail_scenarios()?;
        let entries = schema.transformation_entries()?;

        let transformations = entries
            .into_iter()
            .map(|(name, config)| catalogue.build(name, config, &settings))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            transformations = transformations.len(),
            "Resolved flow transformations"
        );

        Ok(Self {
            description: schema.description.clone(),
            parallel: schema.parallel,
            cores: schema.cores(),
            batch: schema.batch(),
            variables: FlowVariables::from(schema.variables.clone().unwrap_or_default()),
            fail_scenarios,
            instant_fail: schema.instant_fail,
            transformations,
            settings: Arc::new(settings),
        })
    }

    pub fn parallel_config(&self) -> ParallelConfig {
        ParallelConfig {
            batch_size: self.batch,
            workers: self.cores,
        }
    }

    pub fn transformation_names(&self) -> Vec<&str> {
        self.transformations.iter().map(|t| t.name()).collect()
    }
}

impl fmt::Debug for FlowConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowConfiguration")
            .field("description", &self.description)
            .field("settings", &self.settings)
            .field("parallel", &self.parallel)
            .field("cores", &self.cores)
            .field("batch", &self.batch)
            .field("variables", &self.variables)
            .field("fail_scenarios", &self.fail_scenarios)
            .field("instant_fail", &self.instant_fail)
            .field("transformations", &self.transformation_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FlowConfigurationLoader;

    fn configuration(yaml: &str) -> Result<FlowConfiguration, ConfigurationError> {
        let schema = FlowConfigurationLoader::from_yaml_str(yaml)?;
        FlowConfiguration::new(
            schema,
            &TransformationCatalogue::new(),
            &RecordflowConfig::default(),
        )
    }

    #[test]
    fn test_resolve_transformations() {
        let configuration = configuration(
            r#"
path_separator: "."
parallel: true
batch: 5
variables:
  limit: 3
transformations:
  - add_field:
      name: a.b
      value: 1
  - prefix:
      field: a.c
      value: x
"#,
        )
        .unwrap();

        assert_eq!(configuration.transformation_names(), vec!["add_field", "prefix"]);
        assert_eq!(configuration.settings.path_separator, '.');
        assert_eq!(configuration.variables.get("limit").unwrap(), &serde_json::json!(3));
        assert_eq!(
            configuration.parallel_config(),
            ParallelConfig {
                batch_size: Some(5),
                workers: None,
            }
        );
    }

    #[test]
    fn test_unknown_transformation() {
        let err = configuration("transformations:\n  - explode: {}").unwrap_err();
        assert_eq!(err.to_string(), "Transformation 'explode' does not exist");
    }
}
