use crate::schema::SchemaError;
use recordflow_context::ConfigError;
use recordflow_core::{ExpressionError, PipelineError};
use recordflow_runtime::{FailScenarioError, FlowFailError, ParallelError};
use std::path::PathBuf;
use thiserror::Error;

/// 流程加载与构建阶段的错误
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Flow configuration file for '{0}' not found")]
    FlowConfigurationFileNotFound(String),

    #[error("Failed to read flow configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Flow schema for flow '{name}' is not properly defined: {reason}")]
    FlowSchemaNotProperlyDefined { name: String, reason: String },

    #[error("Transformation '{0}' does not exist")]
    TransformationDoesNotExist(String),

    #[error("Transformation '{0}' is already registered")]
    TransformationAlreadyRegistered(String),

    #[error("Transformation '{name}' is not properly defined: {reason}")]
    TransformationNotProperlyDefined { name: String, reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Settings(#[from] ConfigError),

    #[error(transparent)]
    FailScenario(#[from] FailScenarioError),

    #[error("Flow expressions cannot be prepared: {0}")]
    Expression(#[from] ExpressionError),
}

impl ConfigurationError {
    pub(crate) fn transformation(name: &str, reason: impl ToString) -> Self {
        Self::TransformationNotProperlyDefined {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// `Flow::process` 的错误
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Flow raised instant fail exception: {0}")]
    InstantFail(#[source] PipelineError),

    #[error("Flow failed, error: {0}")]
    Failed(#[source] PipelineError),

    #[error(transparent)]
    FailScenario(#[from] FlowFailError),

    #[error(transparent)]
    Parallel(ParallelError),

    #[error("Input record at position {0} is not a mapping")]
    NotAMapping(usize),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl From<PipelineError> for FlowError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::InstantFail { .. } => Self::InstantFail(error),
            other => Self::Failed(other),
        }
    }
}

impl From<ParallelError> for FlowError {
    fn from(error: ParallelError) -> Self {
        match error {
            ParallelError::Pipeline(error) => error.into(),
            other => Self::Parallel(other),
        }
    }
}
