use super::{parse, require_str};
use crate::error::ConfigurationError;
use recordflow_context::{Record, RecordflowConfig};
use recordflow_core::error::OUTPUT_ALREADY_EXISTS;
use recordflow_core::{StepError, Transformation, TransformationConfig};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Params {
    field: String,
    value: String,
    #[serde(default)]
    keep_original: bool,
    #[serde(default)]
    output: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffixPosition {
    Prefix,
    Postfix,
}

/// `prefix` / `postfix`: 在字符串字段前或后拼接固定值
///
/// 未配置 `output` 时结果写回 `field`, 同时忽略 `output_already_exists`。
#[derive(Debug)]
pub struct Affix {
    position: AffixPosition,
    field: String,
    value: String,
    keep_original: bool,
    output: String,
    config: TransformationConfig,
}

impl Affix {
    pub const PREFIX: &'static str = "prefix";
    pub const POSTFIX: &'static str = "postfix";

    pub fn build_prefix(
        value: &Value,
        settings: &RecordflowConfig,
    ) -> Result<Arc<dyn Transformation>, ConfigurationError> {
        Self::build(AffixPosition::Prefix, value, settings)
    }

    pub fn build_postfix(
        value: &Value,
        settings: &RecordflowConfig,
    ) -> Result<Arc<dyn Transformation>, ConfigurationError> {
        Self::build(AffixPosition::Postfix, value, settings)
    }

    fn build(
        position: AffixPosition,
        value: &Value,
        settings: &RecordflowConfig,
    ) -> Result<Arc<dyn Transformation>, ConfigurationError> {
        let name = match position {
            AffixPosition::Prefix => Self::PREFIX,
            AffixPosition::Postfix => Self::POSTFIX,
        };
        let (params, mut config) = parse::<Params>(name, value, settings)?;

        let output = match params.output {
            Some(output) => output,
            None => {
                config.ignore(OUTPUT_ALREADY_EXISTS);
                params.field.clone()
            }
        };

        Ok(Arc::new(Self {
            position,
            config: config
                .with_required(&params.field)
                .with_output_field(&output),
            field: params.field,
            value: params.value,
            keep_original: params.keep_original,
            output,
        }))
    }
}

impl Transformation for Affix {
    fn name(&self) -> &str {
        match self.position {
            AffixPosition::Prefix => Self::PREFIX,
            AffixPosition::Postfix => Self::POSTFIX,
        }
    }

    fn config(&self) -> &TransformationConfig {
        &self.config
    }

    fn transform(&self, record: &mut Record) -> Result<(), StepError> {
        tracing::debug!(step = %self.name(), field = %self.field, "Applying transformation");
        let current = require_str(record, &self.field)?;
        let updated = match self.position {
            AffixPosition::Prefix => format!("{}{}", self.value, current),
            AffixPosition::Postfix => format!("{}{}", current, self.value),
        };

        record.add(&self.output, Value::String(updated))?;
        if !self.keep_original && self.field != self.output {
            record.remove(&self.field, true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::{run, settings};
    use serde_json::json;

    #[test]
    fn test_prefix_in_place() {
        let step = Affix::build_prefix(&json!({"field": "a", "value": "x-"}), &settings()).unwrap();
        assert!(step.config().is_ignored("output_already_exists"));

        let result = run(step, json!({"a": "b"}));
        assert!(result.success);
        assert_eq!(result.state.dataset("default").unwrap()[0], json!({"a": "x-b"}));
    }

    #[test]
    fn test_postfix_to_output() {
        let step = Affix::build_postfix(
            &json!({"field": "a", "value": "-y", "output": "c"}),
            &settings(),
        )
        .unwrap();
        let result = run(step, json!({"a": "b"}));
        assert_eq!(result.state.dataset("default").unwrap()[0], json!({"c": "b-y"}));

        let step = Affix::build_postfix(
            &json!({"field": "a", "value": "-y", "output": "c", "keep_original": true}),
            &settings(),
        )
        .unwrap();
        let result = run(step, json!({"a": "b"}));
        assert_eq!(
            result.state.dataset("default").unwrap()[0],
            json!({"a": "b", "c": "b-y"})
        );
    }

    #[test]
    fn test_wrong_type() {
        let step = Affix::build_prefix(&json!({"field": "a", "value": "x"}), &settings()).unwrap();
        let result = run(step, json!({"a": 1}));
        let failed = &result.state.failed_records()[0];
        assert_eq!(failed.error_kind(), "field_wrong_type");
        assert_eq!(
            failed.error.to_string(),
            "Field 'a' has wrong type, expected string, got int"
        );
    }
}
