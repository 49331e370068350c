//! # RecordFlow Context
//!
//! Records, flow variables and the shared configuration passed to every
//! component of a RecordFlow run

mod config;
mod error;
mod record;
mod variables;

pub use config::{
    parse_separator, RecordflowConfig, DEFAULT_DATASET_NAME,
    DEFAULT_FLOWS_PATH, DEFAULT_PATH_SEPARATOR,
};
pub use error::{ConfigError, RecordError, VariableError};
pub use record::Record;
pub use variables::FlowVariables;

/// Prelude module for context types
pub mod prelude {
    pub use crate::{FlowVariables, Record, RecordflowConfig};
}
