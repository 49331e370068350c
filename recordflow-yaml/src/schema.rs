use recordflow_context::{parse_separator, ConfigError};
use recordflow_runtime::{FailScenarioError, FlowFailScenario};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Cores parameter cannot be set if 'parallel' is not set to 'True'")]
    CoresWithoutParallel,

    #[error("Batch parameter cannot be set if 'parallel' is not set to 'True'")]
    BatchWithoutParallel,

    #[error("Cores parameter has to be greater than 0")]
    InvalidCores,

    #[error("Batch parameter has to be greater than 0")]
    InvalidBatch,

    #[error("Transformation at position {0} has to be a mapping with exactly one name")]
    InvalidTransformationEntry(usize),

    #[error("Fail scenario keys have to be strings")]
    InvalidFailScenarioKey,

    #[error(transparent)]
    PathSeparator(#[from] ConfigError),

    #[error(transparent)]
    FailScenario(#[from] FailScenarioError),
}

/// 流程配置文件的结构
///
/// ```yaml
/// description: Example flow
/// path_separator: "."
/// parallel: true
/// cores: 2
/// batch: 100
/// variables:
///   threshold: 10
/// fail_scenarios:
///   percentage_of_failed_records: 50
/// instant_fail: false
/// transformations:
///   - add_field:
///       name: status
///       value: new
///       condition: "@count > !:threshold"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowSchema {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub path_separator: Option<String>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub cores: Option<i64>,
    #[serde(default)]
    pub batch: Option<i64>,
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
    /// 保持配置文件中的顺序, 场景按此顺序检查
    #[serde(default)]
    pub fail_scenarios: Option<serde_yaml::Mapping>,
    #[serde(default)]
    pub instant_fail: bool,
    pub transformations: Vec<Map<String, Value>>,
}

impl FlowSchema {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if !self.parallel {
            if self.cores.is_some() {
                return Err(SchemaError::CoresWithoutParallel);
            }
            if self.batch.is_some() {
                return Err(SchemaError::BatchWithoutParallel);
            }
        }
        if matches!(self.cores, Some(cores) if cores <= 0) {
            return Err(SchemaError::InvalidCores);
        }
        if matches!(self.batch, Some(batch) if batch <= 0) {
            return Err(SchemaError::InvalidBatch);
        }

        self.path_separator()?;
        self.fail_scenarios()?;
        self.transformation_entries()?;
        Ok(())
    }

    /// Flow level override of the path separator
    pub fn path_separator(&self) -> Result<Option<char>, ConfigError> {
        self.path_separator.as_deref().map(parse_separator).transpose()
    }

    pub fn cores(&self) -> Option<usize> {
        self.cores.and_then(|cores| usize::try_from(cores).ok())
    }

    pub fn batch(&self) -> Option<usize> {
        self.batch.and_then(|batch| usize::try_from(batch).ok())
    }

    pub fn fail_scenarios(&self) -> Result<FlowFailScenario, SchemaError> {
        let Some(mapping) = &self.fail_scenarios else {
            return Ok(FlowFailScenario::default());
        };

        let mut entries = Vec::with_capacity(mapping.len());
        for (choice, value) in mapping {
            let choice = choice.as_str().ok_or(SchemaError::InvalidFailScenarioKey)?;
            let value = serde_json::to_value(value).map_err(|e| FailScenarioError::Invalid {
                scenario: choice.to_string(),
                reason: e.to_string(),
            })?;
            entries.push((choice, value));
        }

        Ok(FlowFailScenario::from_config(
            entries.iter().map(|(choice, value)| (*choice, value)),
        )?)
    }

    /// `(name, config)` of every configured transformation, in order
    pub fn transformation_entries(&self) -> Result<Vec<(&str, &Value)>, SchemaError> {
        self.transformations
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                let mut items = entry.iter();
                match (items.next(), items.next()) {
                    (Some((name, config)), None) => Ok((name.as_str(), config)),
                    _ => Err(SchemaError::InvalidTransformationEntry(position)),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(yaml: &str) -> FlowSchema {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_defaults() {
        let schema = schema("transformations: []");
        assert!(!schema.parallel);
        assert!(!schema.instant_fail);
        assert!(schema.validate().is_ok());
        assert!(schema.fail_scenarios().unwrap().is_empty());
        assert_eq!(schema.path_separator().unwrap(), None);
    }

    #[test]
    fn test_parallel_parameters() {
        assert_eq!(
            schema("cores: 2\ntransformations: []").validate(),
            Err(SchemaError::CoresWithoutParallel)
        );
        assert_eq!(
            schema("batch: 2\ntransformations: []").validate(),
            Err(SchemaError::BatchWithoutParallel)
        );
        assert_eq!(
            schema("parallel: true\ncores: 0\ntransformations: []").validate(),
            Err(SchemaError::InvalidCores)
        );
        assert_eq!(
            schema("parallel: true\nbatch: -3\ntransformations: []").validate(),
            Err(SchemaError::InvalidBatch)
        );

        let valid = schema("parallel: true\ncores: 1\nbatch: 10\ntransformations: []");
        assert!(valid.validate().is_ok());
        assert_eq!(valid.cores(), Some(1));
        assert_eq!(valid.batch(), Some(10));
    }

    #[test]
    fn test_fail_scenarios_keep_order() {
        let schema = schema(
            r#"
fail_scenarios:
  number_of_failed_records: 3
  datasets_present: [errors]
transformations: []
"#,
        );
        let scenarios = schema.fail_scenarios().unwrap();
        let names: Vec<&str> = scenarios.scenarios().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["number_of_failed_records", "datasets_present"]);
    }

    #[test]
    fn test_unknown_fail_scenario() {
        let schema = schema("fail_scenarios:\n  unknown: 1\ntransformations: []");
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::FailScenario(FailScenarioError::Unknown(_)))
        ));
    }

    #[test]
    fn test_transformation_entries() {
        let valid = schema(
            r#"
transformations:
  - add_field:
      name: a
      value: b
  - generate_uuid:
      output: id
"#,
        );
        let names: Vec<&str> = valid
            .transformation_entries()
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["add_field", "generate_uuid"]);

        let invalid = schema("transformations:\n  - {a: {}, b: {}}");
        assert_eq!(
            invalid.validate(),
            Err(SchemaError::InvalidTransformationEntry(0))
        );
    }

    #[test]
    fn test_path_separator() {
        assert_eq!(
            schema("path_separator: '.'\ntransformations: []")
                .path_separator()
                .unwrap(),
            Some('.')
        );
        assert!(schema("path_separator: ab\ntransformations: []").validate().is_err());
    }
}
