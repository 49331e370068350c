use super::parse;
use crate::error::ConfigurationError;
use recordflow_context::{Record, RecordflowConfig};
use recordflow_core::error::FIELD_DOES_NOT_EXIST;
use recordflow_core::{AnalyzerError, StepError, Transformation, TransformationConfig};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Params {
    fields: Vec<String>,
}

#[derive(Debug)]
pub struct RemoveFields {
    fields: Vec<String>,
    config: TransformationConfig,
}

impl RemoveFields {
    pub const NAME: &'static str = "remove_fields";

    pub fn build(
        value: &Value,
        settings: &RecordflowConfig,
    ) -> Result<Arc<dyn Transformation>, ConfigurationError> {
        let (params, config) = parse::<Params>(Self::NAME, value, settings)?;
        Ok(Arc::new(Self {
            fields: params.fields,
            config,
        }))
    }
}

impl Transformation for RemoveFields {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &TransformationConfig {
        &self.config
    }

    fn transform(&self, record: &mut Record) -> Result<(), StepError> {
        tracing::debug!(fields = ?self.fields, "Applying transformation: Remove Fields");
        let tolerate_missing = self.config.is_ignored(FIELD_DOES_NOT_EXIST);
        for field in &self.fields {
            if !tolerate_missing && !record.contains(field) {
                tracing::warn!(field = %field, "Record does not contain field");
                return Err(AnalyzerError::FieldDoesNotExist(field.clone()).into());
            }
            record.remove(field, false)?;
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
    fn test_remove_nested() {
        let step =
            RemoveFields::build(&json!({"fields": ["a", "b/c"]}), &settings()).unwrap();
        let result = run(step, json!({"a": 1, "b": {"c": 2, "d": 3}}));
        assert_eq!(result.state.dataset("default").unwrap()[0], json!({"b": {"d": 3}}));
    }

    #[test]
    fn test_missing_field() {
        let step = RemoveFields::build(&json!({"fields": ["a", "x"]}), &settings()).unwrap();
        let result = run(step, json!({"a": 1}));
        assert!(!result.success);
        assert_eq!(
            result.state.failed_records()[0].error_kind(),
            "field_does_not_exist"
        );

        let step = RemoveFields::build(
            &json!({"fields": ["a", "x"], "ignore_errors": ["field_does_not_exist"]}),
            &settings(),
        )
        .unwrap();
        let result = run(step, json!({"a": 1, "y": 2}));
        assert_eq!(result.state.dataset("default").unwrap()[0], json!({"y": 2}));
    }
}
