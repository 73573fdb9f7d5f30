//! Streaming bulk load: one dispatcher feeding a pool of batching workers.
//!
//! The dispatcher pulls records from the source on a blocking thread,
//! filters them by layer and visibility, and routes each entity to the
//! bounded queue of the worker that owns its identity key. Workers turn
//! entities into [`WriteOp`](crate::sink::WriteOp)s, flush full blocks to the
//! sink, and flush their partial block once the dispatcher has finished and
//! their queue is drained.

use std::sync::Arc;

use log::{error, info};
use terraload_core::{LayerSet, LoadMode};
use thiserror::Error;
use tokio::{
    sync::{Semaphore, mpsc},
    task::JoinError,
};
use tokio_util::sync::CancellationToken;

use crate::sink::{BatchSink, SinkError};
use crate::source::{RawRecord, SourceError};

mod dispatch;
mod worker;

pub use dispatch::normalise;

use dispatch::{DispatchError, Dispatcher};
use worker::Worker;

/// Default number of operations per batch.
pub const DEFAULT_BLOCK_SIZE: usize = 1000;
/// Default number of workers.
pub const DEFAULT_CONCURRENCY: usize = 16;
/// Largest queue capacity a worker queue can be created with.
pub const MAX_QUEUE_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Tunables for a load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConfig {
    /// Insert or upsert.
    pub mode: LoadMode,
    /// Maximum operations per `bulk_write` call.
    pub block_size: usize,
    /// Number of workers.
    pub concurrency: usize,
    /// Kinds to load.
    pub layers: LayerSet,
    /// Capacity of each worker queue; defaults to the block size.
    pub queue_capacity: Option<usize>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            mode: LoadMode::Initial,
            block_size: DEFAULT_BLOCK_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            layers: LayerSet::all(),
            queue_capacity: None,
        }
    }
}

impl LoadConfig {
    /// Check that every tunable is usable.
    pub const fn validate(&self) -> Result<(), LoadConfigError> {
        if self.block_size == 0 {
            return Err(LoadConfigError::ZeroBlockSize);
        }
        if self.concurrency == 0 {
            return Err(LoadConfigError::ZeroConcurrency);
        }
        if self.layers.is_empty() {
            return Err(LoadConfigError::NoLayers);
        }
        let capacity = self.queue_capacity();
        if capacity == 0 {
            return Err(LoadConfigError::ZeroQueueCapacity);
        }
        if capacity > MAX_QUEUE_CAPACITY {
            return Err(LoadConfigError::QueueCapacityTooLarge {
                capacity,
                max: MAX_QUEUE_CAPACITY,
            });
        }
        Ok(())
    }

    /// Effective per-worker queue capacity.
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        match self.queue_capacity {
            Some(capacity) => capacity,
            None => self.block_size,
        }
    }
}

/// Rejected [`LoadConfig`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LoadConfigError {
    /// Blocks must hold at least one operation.
    #[error("block size must be at least 1")]
    ZeroBlockSize,
    /// At least one worker is required.
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    /// Nothing would be loaded.
    #[error("at least one layer must be selected")]
    NoLayers,
    /// Queues must be able to hold an entity.
    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,
    /// Queue capacity, explicit or taken from the block size, is beyond what
    /// a bounded queue supports.
    #[error("queue capacity {capacity} exceeds the maximum of {max}")]
    QueueCapacityTooLarge {
        /// Requested capacity.
        capacity: usize,
        /// Largest supported capacity.
        max: usize,
    },
}

/// Counters kept by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Records pulled from the source.
    pub seen: u64,
    /// Points handed to workers.
    pub points: u64,
    /// Paths handed to workers.
    pub paths: u64,
    /// Relations handed to workers.
    pub relations: u64,
    /// Records outside the selected layers.
    pub skipped_layer: u64,
    /// Records marked as not visible.
    pub skipped_hidden: u64,
}

impl DispatchReport {
    /// Entities handed to workers.
    #[must_use]
    pub const fn dispatched(&self) -> u64 {
        self.points + self.paths + self.relations
    }
}

/// Counters kept by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerReport {
    /// Zero-based worker index.
    pub worker: usize,
    /// Successful `bulk_write` calls.
    pub batches: u64,
    /// Operations submitted in those calls.
    pub operations: u64,
    /// Operations the sink applied.
    pub written: u64,
    /// Operations the sink rejected individually.
    pub failed: u64,
}

/// Outcome of a completed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Dispatcher counters.
    pub dispatch: DispatchReport,
    /// Per-worker counters, ordered by worker index.
    pub workers: Vec<WorkerReport>,
}

impl LoadSummary {
    /// Total `bulk_write` calls.
    #[must_use]
    pub fn batches(&self) -> u64 {
        self.workers.iter().map(|w| w.batches).sum()
    }

    /// Total operations submitted.
    #[must_use]
    pub fn operations(&self) -> u64 {
        self.workers.iter().map(|w| w.operations).sum()
    }

    /// Total operations applied.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.workers.iter().map(|w| w.written).sum()
    }

    /// Total operations rejected individually.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.workers.iter().map(|w| w.failed).sum()
    }
}

/// Failure of a load run.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The configuration cannot drive a load.
    #[error("invalid load configuration")]
    Config(#[from] LoadConfigError),
    /// The source failed mid-stream; records read before the failure were
    /// still flushed.
    #[error("failed to read the entity stream")]
    Source(#[source] SourceError),
    /// A worker's batch was rejected.
    #[error("worker {worker} failed to write a batch")]
    Sink {
        /// Index of the failing worker.
        worker: usize,
        /// Sink failure.
        #[source]
        source: SinkError,
    },
    /// A worker queue closed while the dispatcher was still producing.
    #[error("worker {worker} stopped before the stream ended")]
    QueueClosed {
        /// Index of the unreachable worker.
        worker: usize,
    },
    /// A pipeline task panicked or was cancelled.
    #[error("pipeline task did not complete")]
    Join {
        /// Runtime join failure.
        #[source]
        source: JoinError,
    },
}

/// Load every entity of `source` into `sink`.
///
/// Returns once all workers have terminated. On a source failure, entities
/// already dispatched are still written before the error is returned. The
/// first worker failure, in worker order, takes precedence over the
/// dispatcher's resulting queue error.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use terraload_data::load::{LoadConfig, load_entities};
/// use terraload_data::sink::test_support::RecordingSink;
/// use terraload_data::source::{RawRecord, SourceError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), terraload_data::load::LoadError> {
/// let sink = Arc::new(RecordingSink::default());
/// let empty: Vec<Result<RawRecord, SourceError>> = Vec::new();
/// let summary = load_entities(empty, sink.clone(), &LoadConfig::default()).await?;
/// assert_eq!(summary.operations(), 0);
/// assert_eq!(sink.calls(), 0);
/// # Ok(())
/// # }
/// ```
pub async fn load_entities<S>(
    source: S,
    sink: Arc<dyn BatchSink>,
    config: &LoadConfig,
) -> Result<LoadSummary, LoadError>
where
    S: IntoIterator<Item = Result<RawRecord, SourceError>> + Send + 'static,
{
    config.validate()?;
    info!(
        "Loading layers [{}] in {} mode: {} workers, block size {}",
        config.layers, config.mode, config.concurrency, config.block_size
    );

    let shutdown = CancellationToken::new();
    let mut queues = Vec::with_capacity(config.concurrency);
    let mut workers = Vec::with_capacity(config.concurrency);
    for index in 0..config.concurrency {
        let (sender, receiver) = mpsc::channel(config.queue_capacity());
        let worker = Worker::new(index, Arc::clone(&sink), config.mode, config.block_size);
        workers.push(tokio::spawn(worker.run(receiver, shutdown.clone())));
        queues.push(sender);
    }

    let dispatcher = Dispatcher::new(queues, config.layers);
    let dispatched = tokio::task::spawn_blocking(move || dispatcher.run(source)).await;
    // Queues are closed by now; workers drain them once released.
    shutdown.cancel();
    info!("Dispatch finished; waiting for workers to flush");

    let mut reports = Vec::with_capacity(workers.len());
    let mut worker_error = None;
    for (index, handle) in workers.into_iter().enumerate() {
        let failure = match handle.await {
            Ok(Ok(report)) => {
                reports.push(report);
                continue;
            }
            Ok(Err(source)) => LoadError::Sink {
                worker: index,
                source,
            },
            Err(source) => LoadError::Join { source },
        };
        error!("Worker {index} failed: {failure}");
        if worker_error.is_none() {
            worker_error = Some(failure);
        }
    }
    info!("All workers stopped");

    let dispatch = match dispatched {
        Ok(Ok(report)) => report,
        Ok(Err(DispatchError::Source(source))) => return Err(LoadError::Source(source)),
        Ok(Err(DispatchError::QueueClosed { worker })) => {
            return Err(worker_error.unwrap_or(LoadError::QueueClosed { worker }));
        }
        Err(source) => return Err(LoadError::Join { source }),
    };
    if let Some(failure) = worker_error {
        return Err(failure);
    }

    let summary = LoadSummary {
        dispatch,
        workers: reports,
    };
    info!(
        "Load complete: {} entities dispatched, {} written, {} failed in {} blocks",
        summary.dispatch.dispatched(),
        summary.written(),
        summary.failed(),
        summary.batches()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests;
