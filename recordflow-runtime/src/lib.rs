//! # RecordFlow Runtime
//!
//! Everything that happens around the per-record pipeline: aggregation of
//! datasets across runs, flow statistics, fail scenarios and batch-parallel
//! execution.

mod dataset;
pub mod fail_scenario;
mod parallel;
mod statistics;

pub use dataset::{Datasets, FailedDataset};
pub use fail_scenario::{
    FailScenario, FailScenarioError, FlowFailError, FlowFailScenario,
};
pub use parallel::{ParallelConfig, ParallelError, ParallelFlow};
pub use statistics::FlowStatistics;

/// Prelude module for runtime functionality
pub mod prelude {
    pub use crate::{
        Datasets, FailedDataset, FlowFailScenario, FlowStatistics,
        ParallelConfig, ParallelFlow,
    };
}
