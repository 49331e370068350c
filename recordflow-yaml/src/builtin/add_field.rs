use super::parse;
use crate::error::ConfigurationError;
use recordflow_context::{Record, RecordflowConfig};
use recordflow_core::{StepError, Transformation, TransformationConfig};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Params {
    name: String,
    value: Value,
}

/// 在记录中新增一个字段
///
/// ```yaml
/// - add_field:
///     name: meta/source
///     value: import
/// ```
#[derive(Debug)]
pub struct AddField {
    name: String,
    value: Value,
    config: TransformationConfig,
}

impl AddField {
    pub const NAME: &'static str = "add_field";

    pub fn build(
        value: &Value,
        settings: &RecordflowConfig,
    ) -> Result<Arc<dyn Transformation>, ConfigurationError> {
        let (params, config) = parse::<Params>(Self::NAME, value, settings)?;
        Ok(Arc::new(Self {
            config: config.with_output_field(&params.name),
            name: params.name,
            value: params.value,
        }))
    }
}

impl Transformation for AddField {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &TransformationConfig {
        &self.config
    }

    fn transform(&self, record: &mut Record) -> Result<(), StepError> {
        tracing::debug!(field = %self.name, "Applying transformation: Add Field");
        record.add(&self.name, self.value.clone())?;
        Ok(())
    }
}
