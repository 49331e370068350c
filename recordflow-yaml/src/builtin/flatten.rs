use super::{parse, require, wrong_type};
use crate::error::ConfigurationError;
use recordflow_context::{Record, RecordflowConfig};
use recordflow_core::{StepError, Transformation, TransformationConfig};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

fn default_separator() -> String {
    ".".to_string()
}

#[derive(Debug, Deserialize)]
struct Params {
    field: String,
    output: String,
    #[serde(default = "default_separator")]
    separator: String,
    #[serde(default)]
    parent_key: String,
}

/// 把嵌套映射展开为一层, 键按 `separator` 拼接
#[derive(Debug)]
pub struct Flatten {
    field: String,
    output: String,
    separator: String,
    parent_key: String,
    config: TransformationConfig,
}

impl Flatten {
    pub const NAME: &'static str = "flatten";

    pub fn build(
        value: &Value,
        settings: &RecordflowConfig,
    ) -> Result<Arc<dyn Transformation>, ConfigurationError> {
        let (params, config) = parse::<Params>(Self::NAME, value, settings)?;
        Ok(Arc::new(Self {
            config: config
                .with_required(&params.field)
                .with_output_field(&params.output),
            field: params.field,
            output: params.output,
            separator: params.separator,
            parent_key: params.parent_key,
        }))
    }

    fn flatten_into(&self, data: &Map<String, Value>, parent: &str, out: &mut Map<String, Value>) {
        for (key, value) in data {
            let key = if parent.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", parent, self.separator, key)
            };
            match value {
                Value::Object(nested) => self.flatten_into(nested, &key, out),
                other => {
                    out.insert(key, other.clone());
                }
            }
        }
    }
}

impl Transformation for Flatten {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &TransformationConfig {
        &self.config
    }

    fn transform(&self, record: &mut Record) -> Result<(), StepError> {
        tracing::debug!(field = %self.field, "Applying transformation: Flatten");
        let data = match require(record, &self.field)? {
            Value::Object(data) => data,
            other => return Err(wrong_type(&self.field, "mapping", other)),
        };

        let mut flattened = Map::new();
        self.flatten_into(data, &self.parent_key, &mut flattened);

        record.remove(&self.output, false)?;
        record.add(&self.output, Value::Object(flattened))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::{run, settings};
    use serde_json::json;

    #[test]
    fn test_flatten() {
        let step = Flatten::build(&json!({"field": "a", "output": "flat"}), &settings()).unwrap();
        let result = run(step, json!({"a": {"b": {"c": 1}, "d": [1, 2]}}));
        assert_eq!(
            result.state.dataset("default").unwrap()[0],
            json!({"a": {"b": {"c": 1}, "d": [1, 2]}, "flat": {"b.c": 1, "d": [1, 2]}})
        );
    }

    #[test]
    fn test_flatten_with_parent_key() {
        let step = Flatten::build(
            &json!({"field": "a", "output": "flat", "separator": "_", "parent_key": "p"}),
            &settings(),
        )
        .unwrap();
        let result = run(step, json!({"a": {"b": {"c": 1}}}));
        assert_eq!(
            result.state.dataset("default").unwrap()[0]
                .get("flat")
                .cloned(),
            Some(json!({"p_b_c": 1}))
        );
    }

    #[test]
    fn test_not_a_mapping() {
        let step = Flatten::build(&json!({"field": "a", "output": "flat"}), &settings()).unwrap();
        let result = run(step, json!({"a": [1]}));
        assert_eq!(result.state.failed_records()[0].error_kind(), "field_wrong_type");
    }
}
