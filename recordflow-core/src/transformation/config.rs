use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Output dataset not configured properly: {0}")]
pub struct OutputDatasetError(String);

/// 输出数据集, 条件不满足时记录不会进入该数据集
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOutputDataset")]
pub struct OutputDataset {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl OutputDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: None,
        }
    }

    pub fn with_condition(name: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: Some(condition.into()),
        }
    }
}

impl fmt::Display for OutputDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Some(condition) => write!(f, "{} (if {})", self.name, condition),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OutputDatasetSpec {
    name: String,
    #[serde(default)]
    condition: Option<String>,
}

/// 支持三种写法: `"name"`, `{name, condition}`, `{name: condition}`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOutputDataset {
    Name(String),
    Spec(OutputDatasetSpec),
    Mapping(BTreeMap<String, Option<String>>),
    Other(Value),
}

impl TryFrom<RawOutputDataset> for OutputDataset {
    type Error = OutputDatasetError;

    fn try_from(raw: RawOutputDataset) -> Result<Self, Self::Error> {
        match raw {
            RawOutputDataset::Name(name) => Ok(Self::new(name)),
            RawOutputDataset::Spec(spec) => Ok(Self {
                name: spec.name,
                condition: spec.condition,
            }),
            RawOutputDataset::Mapping(map) if map.len() == 1 => {
                let Some((name, condition)) = map.into_iter().next() else {
                    return Err(OutputDatasetError("empty mapping".to_string()));
                };
                Ok(Self { name, condition })
            }
            RawOutputDataset::Mapping(map) => Err(OutputDatasetError(format!(
                "expected a single dataset, got {} entries",
                map.len()
            ))),
            RawOutputDataset::Other(value) => Err(OutputDatasetError(value.to_string())),
        }
    }
}

/// 步骤的公共配置
///
/// `required_in_record` 与 `output_fields` 由具体步骤根据自身参数填写,
/// 其余字段来自流程配置。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationConfig {
    #[serde(default)]
    pub input_datasets: Vec<String>,
    #[serde(default)]
    pub output_datasets: Vec<OutputDataset>,
    #[serde(default)]
    pub ignore_errors: Vec<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default, skip_deserializing)]
    pub required_in_record: Vec<String>,
    #[serde(default, skip_deserializing)]
    pub output_fields: Vec<String>,
}

impl TransformationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the common keys of a step configuration object, other keys are
    /// left to the step itself
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        TransformationConfig::deserialize(value)
    }

    /// Fill in the dataset defaults: no input means the default dataset,
    /// no output means one unconditioned output per input
    pub fn finalize(mut self, default_dataset: &str) -> Self {
        if self.input_datasets.is_empty() {
            self.input_datasets.push(default_dataset.to_string());
        }
        if self.output_datasets.is_empty() {
            self.output_datasets = self
                .input_datasets
                .iter()
                .map(|name| OutputDataset::new(name.clone()))
                .collect();
        }
        self
    }

    pub fn is_ignored(&self, error: &str) -> bool {
        self.ignore_errors.iter().any(|ignored| ignored == error)
    }

    pub fn ignore(&mut self, error: &str) {
        if !self.is_ignored(error) {
            self.ignore_errors.push(error.to_string());
        }
    }

    pub fn with_input(mut self, dataset: impl Into<String>) -> Self {
        self.input_datasets.push(dataset.into());
        self
    }

    pub fn with_output(mut self, output: OutputDataset) -> Self {
        self.output_datasets.push(output);
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_ignored(mut self, error: &str) -> Self {
        self.ignore(error);
        self
    }

    pub fn with_required(mut self, field: impl Into<String>) -> Self {
        self.required_in_record.push(field.into());
        self
    }

    pub fn with_output_field(mut self, field: impl Into<String>) -> Self {
        self.output_fields.push(field.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_dataset_forms() {
        let config = TransformationConfig::from_value(&json!({
            "output_datasets": [
                "plain",
                {"name": "named", "condition": "@a == 1"},
                {"short": "@b == 2"}
            ]
        }))
        .unwrap();

        assert_eq!(
            config.output_datasets,
            vec![
                OutputDataset::new("plain"),
                OutputDataset::with_condition("named", "@a == 1"),
                OutputDataset::with_condition("short", "@b == 2"),
            ]
        );
    }

    #[test]
    fn test_output_dataset_invalid() {
        for invalid in [json!([1]), json!([{"a": "x", "b": "y"}]), json!([true])] {
            let result =
                TransformationConfig::from_value(&json!({ "output_datasets": invalid }));
            let err = result.unwrap_err().to_string();
            assert!(err.contains("Output dataset not configured properly"), "{}", err);
        }
    }

    #[test]
    fn test_finalize_defaults() {
        let config = TransformationConfig::new().finalize("default");
        assert_eq!(config.input_datasets, vec!["default"]);
        assert_eq!(config.output_datasets, vec![OutputDataset::new("default")]);

        let config = TransformationConfig::new()
            .with_input("a")
            .with_input("b")
            .finalize("default");
        assert_eq!(
            config.output_datasets,
            vec![OutputDataset::new("a"), OutputDataset::new("b")]
        );
    }

    #[test]
    fn test_step_fields_are_not_read_from_config() {
        let config = TransformationConfig::from_value(&json!({
            "required_in_record": ["x"],
            "ignore_errors": ["field_does_not_exist"],
            "field": "a"
        }))
        .unwrap();
        assert!(config.required_in_record.is_empty());
        assert!(config.is_ignored("field_does_not_exist"));
    }
}
