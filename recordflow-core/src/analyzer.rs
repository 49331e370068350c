use crate::env::ExecutionEnv;
use crate::error::{
    AnalyzerError, ConditionError, ExpressionError, StepError, OUTPUT_ALREADY_EXISTS,
};
use crate::transformation::Transformation;
use recordflow_context::Record;

/// 步骤执行前的检查
///
/// 依次检查必需字段、输出字段冲突和执行条件, 遇到第一个问题即停止。
pub struct Analyzer<'a> {
    transformation: &'a dyn Transformation,
    env: &'a ExecutionEnv,
}

impl<'a> Analyzer<'a> {
    pub fn new(transformation: &'a dyn Transformation, env: &'a ExecutionEnv) -> Self {
        Self { transformation, env }
    }

    /// `Ok(false)` means skip: the condition is not met or a check failed
    /// with an ignored error kind
    pub fn should_perform_transformation(&self, record: &Record) -> Result<bool, StepError> {
        let Some(error) = self.analyze(record)? else {
            return Ok(true);
        };

        match error {
            AnalyzerError::ConditionNotMet(condition) => {
                tracing::debug!(
                    step = %self.transformation.name(),
                    condition = %condition,
                    "Condition not met, skipping transformation"
                );
                Ok(false)
            }
            error if self.transformation.config().is_ignored(error.name()) => {
                tracing::debug!(
                    step = %self.transformation.name(),
                    error = %error,
                    "Ignoring analyzer error, skipping transformation"
                );
                Ok(false)
            }
            error => Err(error.into()),
        }
    }

    // 外层错误是表达式本身不可用, 内层是记录未通过检查
    fn analyze(&self, record: &Record) -> Result<Option<AnalyzerError>, ExpressionError> {
        let config = self.transformation.config();

        if let Some(field) = config
            .required_in_record
            .iter()
            .find(|field| !record.contains(field))
        {
            return Ok(Some(AnalyzerError::FieldDoesNotExist(field.clone())));
        }

        if !config.is_ignored(OUTPUT_ALREADY_EXISTS) {
            if let Some(field) = config.output_fields.iter().find(|field| record.contains(field)) {
                return Ok(Some(AnalyzerError::OutputAlreadyExists(field.clone())));
            }
        }

        if let Some(condition) = &config.condition {
            match self.env.check_condition(condition, record) {
                Ok(()) => {}
                Err(ConditionError::NotMet(condition)) => {
                    return Ok(Some(AnalyzerError::ConditionNotMet(condition)))
                }
                Err(ConditionError::Expression(error)) => return Err(error),
            }
        }

        Ok(None)
    }
}
