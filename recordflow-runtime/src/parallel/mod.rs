use recordflow_context::Record;
use recordflow_core::{FlowPipeline, FlowPipelineResult, PipelineError};
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[cfg(test)]
mod tests;

/// Configuration for parallel execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Records per batch (None for a single batch with every record)
    pub batch_size: Option<usize>,
    /// Number of concurrent workers (None for every available core)
    pub workers: Option<usize>,
}

impl ParallelConfig {
    /// Create a config with a worker limit
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: Some(workers),
            ..Default::default()
        }
    }

    /// Create a config for batched execution
    pub fn batched(batch_size: usize) -> Self {
        Self {
            batch_size: Some(batch_size),
            ..Default::default()
        }
    }

    /// Set number of workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }
}

#[derive(Debug, Error)]
pub enum ParallelError {
    #[error("Desired number of cores: {desired}, available: {available}")]
    InsufficientCores { desired: usize, available: usize },

    #[error("Batch size has to be greater than 0")]
    InvalidBatchSize,

    #[error("Number of workers has to be greater than 0")]
    InvalidWorkers,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Parallel worker failed: {0}")]
    Worker(String),
}

/// Batch-parallel execution of a [`FlowPipeline`]
///
/// 记录按批次切分, 每个批次在独立的阻塞线程中用全新的管道顺序处理。
/// 全部批次结束后按批次顺序合并结果。
pub struct ParallelFlow {
    pipeline: FlowPipeline,
    config: ParallelConfig,
}

impl ParallelFlow {
    pub fn new(pipeline: FlowPipeline, config: ParallelConfig) -> Self {
        Self { pipeline, config }
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Number of execution units available to the process
    pub fn available_workers() -> usize {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    /// Process every record, one result per record in input order
    pub async fn execute(
        &self,
        records: Vec<Record>,
    ) -> Result<Vec<FlowPipelineResult>, ParallelError> {
        let available = Self::available_workers();
        let workers = self.config.workers.unwrap_or(available);
        if workers == 0 {
            return Err(ParallelError::InvalidWorkers);
        }
        if workers > available {
            return Err(ParallelError::InsufficientCores {
                desired: workers,
                available,
            });
        }
        let batch_size = match self.config.batch_size {
            Some(0) => return Err(ParallelError::InvalidBatchSize),
            Some(size) => size,
            None => records.len().max(1),
        };

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut join_set = JoinSet::new();
        let mut batches = 0;

        let mut records = records.into_iter().peekable();
        while records.peek().is_some() {
            let batch: Vec<Record> = records.by_ref().take(batch_size).collect();
            let index = batches;
            batches += 1;

            // 每个批次使用全新的管道与独立的条件缓存, 只共享步骤与只读配置
            let pipeline = FlowPipeline::new(
                self.pipeline.transformations().to_vec(),
                self.pipeline.instant_fail(),
                self.pipeline.env().fork(),
            );
            let semaphore = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, Err(ParallelError::Worker("worker pool closed".into())));
                };
                let outcome =
                    tokio::task::spawn_blocking(move || run_batch(&pipeline, batch)).await;
                let outcome = match outcome {
                    Ok(result) => result,
                    Err(e) => Err(ParallelError::Worker(format!("batch {}: {}", index, e))),
                };
                (index, outcome)
            });
        }

        tracing::info!(
            batches = batches,
            batch_size = batch_size,
            workers = workers,
            "Running flow in parallel"
        );

        let mut outcomes = Vec::with_capacity(batches);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => return Err(ParallelError::Worker(e.to_string())),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let mut results = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(batch) => results.extend(batch),
                Err(e) => {
                    tracing::error!(batch = index, error = %e, "Parallel batch failed");
                    return Err(e);
                }
            }
        }
        Ok(results)
    }
}

fn run_batch(
    pipeline: &FlowPipeline,
    batch: Vec<Record>,
) -> Result<Vec<FlowPipelineResult>, ParallelError> {
    tracing::debug!(
        pipeline_id = %pipeline.id(),
        records = batch.len(),
        "Processing batch"
    );
    batch
        .into_iter()
        .map(|record| pipeline.submit(record).map_err(ParallelError::from))
        .collect()
}
