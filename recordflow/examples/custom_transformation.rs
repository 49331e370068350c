use recordflow::context::RecordflowConfig;
use recordflow::expression::register_function;
use recordflow::prelude::*;
use recordflow::yaml::ConfigurationError;
use serde_json::{json, Value};
use std::sync::Arc;

/// 把字段按给定倍数放大
struct Scale {
    field: String,
    factor: f64,
    config: TransformationConfig,
}

impl Scale {
    fn build(
        value: &Value,
        settings: &RecordflowConfig,
    ) -> Result<Arc<dyn Transformation>, ConfigurationError> {
        let not_defined = |reason: &str| ConfigurationError::TransformationNotProperlyDefined {
            name: "scale".to_string(),
            reason: reason.to_string(),
        };
        let field = value
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| not_defined("'field' is required"))?
            .to_string();
        let factor = value
            .get("factor")
            .and_then(Value::as_f64)
            .ok_or_else(|| not_defined("'factor' has to be a number"))?;
        let config = TransformationConfig::from_value(value)
            .map_err(|e| not_defined(&e.to_string()))?
            .finalize(&settings.default_dataset_name)
            .with_required(&field);
        Ok(Arc::new(Self {
            field,
            factor,
            config,
        }))
    }
}

impl Transformation for Scale {
    fn name(&self) -> &str {
        "scale"
    }

    fn config(&self) -> &TransformationConfig {
        &self.config
    }

    fn transform(&self, record: &mut Record) -> Result<(), StepError> {
        let value = match record.get(&self.field) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
            Some(other) => {
                return Err(TransformationError::FieldWrongType {
                    field: self.field.clone(),
                    expected: "number".to_string(),
                    found: recordflow::expression::type_name(other).to_string(),
                }
                .into())
            }
            None => return Ok(()),
        };
        record.add(&self.field, json!(value * self.factor))?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== RecordFlow Custom Transformation Demo ===\n");

    register_function("is_even", |args: &[Value]| match args {
        [Value::Number(n)] => Ok(json!(n.as_i64().map(|n| n % 2 == 0).unwrap_or(false))),
        _ => Err("is_even expects one number".to_string()),
    });

    let mut catalogue = TransformationCatalogue::new();
    catalogue.register("scale", Scale::build, false)?;

    let yaml = r#"
description: Scale even quantities
transformations:
  - scale:
      field: quantity
      factor: 1.5
      condition: "is_even(@quantity)"
  - add_field:
      name: scaled
      value: true
      output_datasets:
        - name: scaled
          condition: "@quantity > 10"
        - small
"#;
    let mut flow = Flow::load_with(FlowSource::Yaml(yaml), &catalogue, &RecordflowConfig::default())?;
    flow.process(vec![
        json!({"quantity": 4}),
        json!({"quantity": 8}),
        json!({"quantity": 7}),
        json!({"quantity": "many"}),
    ])
    .await?;

    println!("{}", serde_json::to_string_pretty(&flow.datasets().to_value())?);
    println!("Failed records: {}", flow.failed_records().len());
    println!("=== Demo Completed ===");
    Ok(())
}
