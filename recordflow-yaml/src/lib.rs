//! # RecordFlow YAML
//!
//! Flow configuration from YAML/JSON, the transformation catalogue with the
//! built-in transformations, and the [`Flow`] entry point

pub mod builtin;
mod catalogue;
mod configuration;
mod error;
mod flow;
mod loader;
mod schema;

pub use catalogue::{TransformationCatalogue, TransformationFactory};
pub use configuration::FlowConfiguration;
pub use error::{ConfigurationError, FlowError};
pub use flow::{Flow, FlowSource};
pub use loader::{FlowConfigurationLoader, INLINE_FLOW};
pub use schema::{FlowSchema, SchemaError};

/// Prelude module for YAML functionality
pub mod prelude {
    pub use crate::{
        ConfigurationError, Flow, FlowConfiguration, FlowConfigurationLoader, FlowError,
        FlowSchema, FlowSource, TransformationCatalogue,
    };
}
