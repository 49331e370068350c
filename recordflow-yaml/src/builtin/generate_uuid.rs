use super::parse;
use crate::error::ConfigurationError;
use recordflow_context::{Record, RecordflowConfig};
use recordflow_core::{StepError, Transformation, TransformationConfig};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct Params {
    output: String,
}

/// Store a fresh v4 UUID at `output`
#[derive(Debug)]
pub struct GenerateUuid {
    output: String,
    config: TransformationConfig,
}

impl GenerateUuid {
    pub const NAME: &'static str = "generate_uuid";

    pub fn build(
        value: &Value,
        settings: &RecordflowConfig,
    ) -> Result<Arc<dyn Transformation>, ConfigurationError> {
        let (params, config) = parse::<Params>(Self::NAME, value, settings)?;
        Ok(Arc::new(Self {
            config: config.with_output_field(&params.output),
            output: params.output,
        }))
    }
}

impl Transformation for GenerateUuid {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &TransformationConfig {
        &self.config
    }

    fn transform(&self, record: &mut Record) -> Result<(), StepError> {
        record.add(&self.output, Value::String(Uuid::new_v4().to_string()))?;
        Ok(())
    }
}
