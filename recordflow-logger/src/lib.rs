//! # RecordFlow Logger
//!
//! Logging and tracing support for RecordFlow flows

use recordflow_runtime::{Datasets, FailedDataset, FlowStatistics};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Logger for RecordFlow flows
pub struct Logger {
    pub trace_id: String,
}

impl Logger {
    /// Create a new logger
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific trace ID
    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
        }
    }

    /// Initialize tracing subscriber
    pub fn init_tracing() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    /// Initialize a JSON tracing subscriber
    pub fn init_json_tracing() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    /// Like [`init_tracing`](Self::init_tracing), but returns `false` when a
    /// global subscriber is already installed
    pub fn try_init_tracing() -> bool {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init()
            .is_ok()
    }

    /// Log an info message
    pub fn info(&self, message: &str) {
        info!(trace_id = %self.trace_id, "{}", message);
    }

    /// Log a warning message
    pub fn warn(&self, message: &str) {
        warn!(trace_id = %self.trace_id, "{}", message);
    }

    /// Log an error message
    pub fn error(&self, message: &str) {
        error!(trace_id = %self.trace_id, "{}", message);
    }

    /// Log a debug message
    pub fn debug(&self, message: &str) {
        debug!(trace_id = %self.trace_id, "{}", message);
    }

    /// Log the statistics of one `process` call
    pub fn log_statistics(&self, stage: &str, statistics: &FlowStatistics) {
        info!(
            trace_id = %self.trace_id,
            stage = stage,
            input_records = statistics.input_records,
            output_datasets = statistics.output_datasets,
            failed_records = statistics.failed_records,
            percentage_of_failed_records = statistics.percentage_of_failed_records,
            "Flow statistics"
        );
    }

    /// Log a summary of the aggregated output
    pub fn log_flow_summary(
        &self,
        statistics: &FlowStatistics,
        datasets: &Datasets,
        failed: &[FailedDataset],
    ) {
        info!(
            trace_id = %self.trace_id,
            input_records = statistics.input_records,
            datasets = datasets.len(),
            output_records = datasets.record_count(),
            failed_runs = failed.len(),
            "Flow execution summary"
        );

        for (name, records) in datasets.iter() {
            debug!(
                trace_id = %self.trace_id,
                dataset = name,
                records = records.len(),
                "Output dataset"
            );
        }

        self.log_failed_datasets(failed);
    }

    /// Log every failed record, one event per failure
    pub fn log_failed_datasets(&self, failed: &[FailedDataset]) {
        for dataset in failed {
            for record in &dataset.failed_records {
                warn!(
                    trace_id = %self.trace_id,
                    run_id = %dataset.run_id,
                    transformation = %record.transformation_name,
                    error_kind = %record.error_kind(),
                    error = %record.error,
                    "Record failed"
                );
            }
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}
