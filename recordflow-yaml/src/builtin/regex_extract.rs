use super::{parse, require_str};
use crate::error::ConfigurationError;
use recordflow_context::{Record, RecordflowConfig};
use recordflow_core::{StepError, Transformation, TransformationConfig};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Params {
    field: String,
    output: String,
    regex: String,
}

/// 提取第一个匹配 (整体匹配), 无匹配时写入 null
#[derive(Debug)]
pub struct RegexExtract {
    field: String,
    output: String,
    regex: Regex,
    config: TransformationConfig,
}

impl RegexExtract {
    pub const NAME: &'static str = "regex_extract";

    pub fn build(
        value: &Value,
        settings: &RecordflowConfig,
    ) -> Result<Arc<dyn Transformation>, ConfigurationError> {
        let (params, config) = parse::<Params>(Self::NAME, value, settings)?;
        let regex = Regex::new(&params.regex)
            .map_err(|e| ConfigurationError::transformation(Self::NAME, e))?;
        Ok(Arc::new(Self {
            config: config
                .with_required(&params.field)
                .with_output_field(&params.output),
            field: params.field,
            output: params.output,
            regex,
        }))
    }
}

impl Transformation for RegexExtract {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &TransformationConfig {
        &self.config
    }

    fn transform(&self, record: &mut Record) -> Result<(), StepError> {
        tracing::debug!(field = %self.field, regex = %self.regex, "Applying transformation: Regex Extract");
        let extracted = self
            .regex
            .find(require_str(record, &self.field)?)
            .map(|found| Value::String(found.as_str().to_string()))
            .unwrap_or(Value::Null);
        record.add(&self.output, extracted)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::{run, settings};
    use serde_json::json;

    fn step() -> Arc<dyn Transformation> {
        RegexExtract::build(
            &json!({"field": "text", "output": "number", "regex": r"\d+"}),
            &settings(),
        )
        .unwrap()
    }

    #[test]
    fn test_extract() {
        let result = run(step(), json!({"text": "order 42 of 50"}));
        assert_eq!(
            result.state.dataset("default").unwrap()[0].get("number"),
            Some(&json!("42"))
        );

        let result = run(step(), json!({"text": "none"}));
        assert_eq!(
            result.state.dataset("default").unwrap()[0].get("number"),
            Some(&Value::Null)
        );
    }

    #[test]
    fn test_invalid_regex() {
        let err = RegexExtract::build(
            &json!({"field": "a", "output": "b", "regex": "("}),
            &settings(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ConfigurationError::TransformationNotProperlyDefined { .. }
        ));
    }
}
