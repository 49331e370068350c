//! # RecordFlow Transformation
//!
//! 步骤契约: 每个步骤声明输入/输出数据集、必需字段、输出字段、可忽略的错误
//! 以及可选的执行条件, 并对单条记录做变换。

mod config;

pub use config::{OutputDataset, OutputDatasetError, TransformationConfig};

use crate::error::StepError;
use recordflow_context::Record;

pub trait Transformation: Send + Sync {
    fn name(&self) -> &str;

    fn config(&self) -> &TransformationConfig;

    /// Apply the step to `record` in place
    fn transform(&self, record: &mut Record) -> Result<(), StepError>;

    /// Run [`transform`](Self::transform) honouring the ignore list.
    ///
    /// An ignored recoverable error restores the record to what it was
    /// before the step ran.
    fn execute(&self, record: &mut Record) -> Result<(), StepError> {
        let config = self.config();
        if config.ignore_errors.is_empty() {
            return self.transform(record);
        }

        let original = record.clone();
        match self.transform(record) {
            Err(StepError::Recoverable(error)) if config.is_ignored(error.name()) => {
                tracing::debug!(
                    step = %self.name(),
                    error = %error,
                    "Ignoring transformation error"
                );
                *record = original;
                Ok(())
            }
            result => result,
        }
    }

    fn input_datasets(&self) -> &[String] {
        &self.config().input_datasets
    }

    fn output_datasets(&self) -> &[OutputDataset] {
        &self.config().output_datasets
    }
}
