use super::{parse, require};
use crate::error::ConfigurationError;
use recordflow_context::{Record, RecordflowConfig};
use recordflow_core::{StepError, Transformation, TransformationConfig};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Params {
    field: String,
    output: String,
}

/// Move the value of `field` to `output`
#[derive(Debug)]
pub struct Rename {
    field: String,
    output: String,
    config: TransformationConfig,
}

impl Rename {
    pub const NAME: &'static str = "rename";

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
        }))
    }
}

impl Transformation for Rename {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &TransformationConfig {
        &self.config
    }

    fn transform(&self, record: &mut Record) -> Result<(), StepError> {
        tracing::debug!(field = %self.field, output = %self.output, "Applying transformation: Rename");
        require(record, &self.field)?;
        record.remove(&self.output, false)?;
        let value = record.remove(&self.field, true)?.unwrap_or(Value::Null);
        record.add(&self.output, value)?;
        Ok(())
    }
}
