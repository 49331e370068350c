use crate::analyzer::Analyzer;
use crate::env::ExecutionEnv;
use crate::error::{ControllerError, StepError};
use crate::failed::FailedRecord;
use crate::transformation::Transformation;
use recordflow_context::Record;

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerResult {
    /// Transformed record, or the untouched record when the step was skipped
    Processed(Record),
    Failed(FailedRecord),
}

/// 带失败隔离的单步执行
///
/// 可恢复错误转为 `FailedRecord`, 其他错误包装为 `ControllerError` 向上抛出。
pub struct Controller<'a> {
    env: &'a ExecutionEnv,
}

impl<'a> Controller<'a> {
    pub fn new(env: &'a ExecutionEnv) -> Self {
        Self { env }
    }

    pub fn process_record(
        &self,
        mut record: Record,
        transformation: &dyn Transformation,
    ) -> Result<ControllerResult, ControllerError> {
        let outcome = Analyzer::new(transformation, self.env)
            .should_perform_transformation(&record)
            .and_then(|perform| {
                if perform {
                    transformation.execute(&mut record)
                } else {
                    Ok(())
                }
            });

        match outcome {
            Ok(()) => Ok(ControllerResult::Processed(record)),
            Err(StepError::Recoverable(error)) => {
                tracing::warn!(
                    step = %transformation.name(),
                    kind = %error.name(),
                    error = %error,
                    "Record failed"
                );
                Ok(ControllerResult::Failed(FailedRecord::new(
                    record,
                    transformation,
                    error,
                )))
            }
            Err(StepError::Fatal(source)) => {
                tracing::error!(
                    step = %transformation.name(),
                    error = %source,
                    "Transformation raised an unexpected error"
                );
                Err(ControllerError::TransformationFailed {
                    step: transformation.name().to_string(),
                    source,
                })
            }
        }
    }
}
