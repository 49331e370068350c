//! 错误分层
//!
//! 可恢复错误 (`RecoverableError`) 会被 Controller 转成 `FailedRecord`,
//! 其余错误 (`StepError::Fatal`) 直接终止整个运行。

use recordflow_context::{RecordError, VariableError};
use thiserror::Error;

pub const FIELD_DOES_NOT_EXIST: &str = "field_does_not_exist";
pub const OUTPUT_ALREADY_EXISTS: &str = "output_already_exists";
pub const CONDITION_NOT_MET: &str = "condition_not_met";
pub const FIELD_WRONG_TYPE: &str = "field_wrong_type";
pub const VALIDATION_ERROR: &str = "validation_error";

/// Analyzer 前置检查错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    #[error("Field '{0}' does not exist in the record")]
    FieldDoesNotExist(String),

    #[error("Output field '{0}' already exists in the record")]
    OutputAlreadyExists(String),

    #[error("Condition '{0}' is not met")]
    ConditionNotMet(String),
}

impl AnalyzerError {
    /// Name used in `ignore_errors`
    pub fn name(&self) -> &str {
        match self {
            Self::FieldDoesNotExist(_) => FIELD_DOES_NOT_EXIST,
            Self::OutputAlreadyExists(_) => OUTPUT_ALREADY_EXISTS,
            Self::ConditionNotMet(_) => CONDITION_NOT_MET,
        }
    }
}

/// 转换步骤内部的数据错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformationError {
    #[error("Field '{field}' has wrong type, expected {expected}, got {found}")]
    FieldWrongType {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Record validation failed: {0}")]
    Validation(String),

    /// Step specific error kinds, `kind` is what `ignore_errors` matches
    #[error("{message}")]
    Custom { kind: String, message: String },
}

impl TransformationError {
    pub fn custom(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Custom {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::FieldWrongType { .. } => FIELD_WRONG_TYPE,
            Self::Validation(_) => VALIDATION_ERROR,
            Self::Custom { kind, .. } => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecoverableError {
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Transformation(#[from] TransformationError),
}

impl RecoverableError {
    pub fn name(&self) -> &str {
        match self {
            Self::Analyzer(e) => e.name(),
            Self::Transformation(e) => e.name(),
        }
    }
}

/// 表达式错误, 全部为致命错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Invalid expression '{expression}': {message}")]
    Syntax { expression: String, message: String },

    #[error("Unknown name '{0}' in expression")]
    UnknownName(String),

    #[error("Function '{0}' is not registered")]
    UnknownFunction(String),

    #[error(transparent)]
    Variable(#[from] VariableError),

    #[error("Flow variable '{0}' cannot be substituted into an expression")]
    UnsupportedVariable(String),

    #[error("Invalid reference pattern: {0}")]
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("Condition '{0}' is not met")]
    NotMet(String),

    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

/// 单个步骤执行结果的错误
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Recoverable(#[from] RecoverableError),

    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl StepError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable(_))
    }
}

impl From<AnalyzerError> for StepError {
    fn from(error: AnalyzerError) -> Self {
        Self::Recoverable(error.into())
    }
}

impl From<TransformationError> for StepError {
    fn from(error: TransformationError) -> Self {
        Self::Recoverable(error.into())
    }
}

impl From<RecordError> for StepError {
    fn from(error: RecordError) -> Self {
        Self::Fatal(error.into())
    }
}

impl From<ExpressionError> for StepError {
    fn from(error: ExpressionError) -> Self {
        Self::Fatal(error.into())
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Transformation '{step}' raised an unexpected error: {source}")]
    TransformationFailed {
        step: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Instant fail triggered by transformation '{step}': {error}")]
    InstantFail {
        step: String,
        error: RecoverableError,
    },

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("Condition of output dataset '{dataset}' cannot be evaluated: {source}")]
    OutputCondition {
        dataset: String,
        #[source]
        source: ExpressionError,
    },
}
