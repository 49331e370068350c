//! # Built-in transformations
//!
//! 单条记录、无状态的内置步骤。每个步骤的配置对象同时包含公共键
//! (`input_datasets`, `output_datasets`, `ignore_errors`, `condition`)
//! 与步骤自身的参数。

mod add_field;
mod affix;
mod flatten;
mod generate_uuid;
mod regex_extract;
mod remove_fields;
mod rename;

pub use add_field::AddField;
pub use affix::{Affix, AffixPosition};
pub use flatten::Flatten;
pub use generate_uuid::GenerateUuid;
pub use regex_extract::RegexExtract;
pub use remove_fields::RemoveFields;
pub use rename::Rename;

use crate::error::ConfigurationError;
use recordflow_context::{Record, RecordflowConfig};
use recordflow_core::expression::type_name;
use recordflow_core::{
    AnalyzerError, StepError, Transformation, TransformationConfig, TransformationError,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

pub(crate) type BuiltinFactory =
    fn(&Value, &RecordflowConfig) -> Result<Arc<dyn Transformation>, ConfigurationError>;

pub(crate) const BUILTINS: &[(&str, BuiltinFactory)] = &[
    (AddField::NAME, AddField::build),
    (Rename::NAME, Rename::build),
    (Affix::PREFIX, Affix::build_prefix),
    (Affix::POSTFIX, Affix::build_postfix),
    (RemoveFields::NAME, RemoveFields::build),
    (Flatten::NAME, Flatten::build),
    (GenerateUuid::NAME, GenerateUuid::build),
    (RegexExtract::NAME, RegexExtract::build),
];

/// Split a step configuration object into its own parameters and the
/// common [`TransformationConfig`]
pub(crate) fn parse<P: DeserializeOwned>(
    name: &str,
    value: &Value,
    settings: &RecordflowConfig,
) -> Result<(P, TransformationConfig), ConfigurationError> {
    // `- generate_uuid:` 之类没有参数体的写法按空对象处理
    let empty = Value::Object(Map::new());
    let value = if value.is_null() { &empty } else { value };

    let params = P::deserialize(value).map_err(|e| ConfigurationError::transformation(name, e))?;
    let config = TransformationConfig::from_value(value)
        .map_err(|e| ConfigurationError::transformation(name, e))?
        .finalize(&settings.default_dataset_name);
    Ok((params, config))
}

/// Value at `field`, missing fields are recoverable
pub(crate) fn require<'r>(record: &'r Record, field: &str) -> Result<&'r Value, StepError> {
    record
        .get(field)
        .ok_or_else(|| AnalyzerError::FieldDoesNotExist(field.to_string()).into())
}

/// String value at `field`
pub(crate) fn require_str<'r>(record: &'r Record, field: &str) -> Result<&'r str, StepError> {
    match require(record, field)? {
        Value::String(value) => Ok(value),
        other => {
            tracing::warn!(field = %field, found = type_name(other), "Field wrong type");
            Err(wrong_type(field, "string", other))
        }
    }
}

pub(crate) fn wrong_type(field: &str, expected: &str, found: &Value) -> StepError {
    TransformationError::FieldWrongType {
        field: field.to_string(),
        expected: expected.to_string(),
        found: type_name(found).to_string(),
    }
    .into()
}
