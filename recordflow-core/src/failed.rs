use crate::error::RecoverableError;
use crate::transformation::{Transformation, TransformationConfig};
use recordflow_context::Record;
use serde_json::{json, Value};

/// 一次失败: 失败时的记录、失败步骤的名称与配置以及错误
#[derive(Debug, Clone, PartialEq)]
pub struct FailedRecord {
    pub record: Record,
    pub transformation_name: String,
    pub transformation_config: TransformationConfig,
    pub error: RecoverableError,
}

impl FailedRecord {
    pub fn new(
        record: Record,
        transformation: &dyn Transformation,
        error: RecoverableError,
    ) -> Self {
        Self {
            record,
            transformation_name: transformation.name().to_string(),
            transformation_config: transformation.config().clone(),
            error,
        }
    }

    /// Error kind, as matched by `ignore_errors`
    pub fn error_kind(&self) -> &str {
        self.error.name()
    }

    pub fn to_value(&self) -> Value {
        json!({
            "record": self.record,
            "transformation": self.transformation_name,
            "config": self.transformation_config,
            "error": {
                "kind": self.error_kind(),
                "message": self.error.to_string(),
            },
        })
    }
}
