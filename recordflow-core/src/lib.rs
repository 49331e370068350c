//! # RecordFlow Core
//!
//! Step contract, condition language and the per-record pipeline engine.
//!
//! A [`FlowPipeline`] runs a list of [`Transformation`]s over one submitted
//! record. Each step goes through the [`Controller`], which asks the
//! [`Analyzer`] whether the step should run and turns recoverable errors
//! into [`FailedRecord`]s.

mod analyzer;
pub mod condition;
mod controller;
mod env;
pub mod error;
pub mod expression;
mod failed;
mod pipeline;
mod resolver;
pub mod transformation;

pub use analyzer::Analyzer;
pub use condition::Condition;
pub use controller::{Controller, ControllerResult};
pub use env::ExecutionEnv;
pub use error::{
    AnalyzerError, ConditionError, ControllerError, ExpressionError,
    PipelineError, RecoverableError, StepError, TransformationError,
};
pub use failed::FailedRecord;
pub use pipeline::{FlowPipeline, FlowPipelineResult, FlowPipelineState};
pub use resolver::Resolver;
pub use transformation::{OutputDataset, Transformation, TransformationConfig};

/// Prelude module for core functionality
pub mod prelude {
    pub use crate::{
        ExecutionEnv, FailedRecord, FlowPipeline, FlowPipelineResult,
        OutputDataset, StepError, Transformation, TransformationConfig,
        TransformationError,
    };
    pub use recordflow_context::{FlowVariables, Record, RecordflowConfig};
}
