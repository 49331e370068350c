//! # RecordFlow - Configuration Driven Record Pipelines
//!
//! RecordFlow applies a sequence of named, independently configured
//! transformations to structured records, routes the results across named
//! datasets and isolates per-record failures without aborting the run.
//!
//! ## Features
//!
//! - `yaml` (default): flow configuration files, built-in transformations and [`Flow`]
//! - `logger` (default): tracing subscriber setup and flow summaries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recordflow::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut flow = Flow::from_config(&json!({
//!         "transformations": [
//!             {"add_field": {"name": "status", "value": "new"}},
//!             {"prefix": {"field": "id", "value": "order-"}}
//!         ]
//!     }))?;
//!
//!     flow.process(vec![json!({"id": "1"}), json!({"id": "2"})]).await?;
//!     println!("{}", flow.datasets().to_value());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export core functionality
pub use recordflow_context as context;
pub use recordflow_core::*;
pub use recordflow_runtime as runtime;

#[cfg(feature = "logger")]
#[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
pub use recordflow_logger::Logger;

#[cfg(feature = "yaml")]
#[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
pub use recordflow_yaml as yaml;

#[cfg(feature = "yaml")]
#[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
pub use recordflow_yaml::Flow;

/// Prelude module for easy imports
pub mod prelude {
    pub use recordflow_context::prelude::*;
    pub use recordflow_core::prelude::*;
    pub use recordflow_runtime::prelude::*;

    #[cfg(feature = "logger")]
    #[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
    pub use recordflow_logger::Logger;

    #[cfg(feature = "yaml")]
    #[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
    pub use recordflow_yaml::prelude::*;
}
