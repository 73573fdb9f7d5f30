//! Consumer stage: buffer entities and write them in blocks.

use std::{mem, sync::Arc};

use log::{info, warn};
use terraload_core::{Document, Entity, LoadMode};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::WorkerReport;
use crate::sink::{BatchOutcome, BatchSink, SinkError, WriteOp};

/// Upper bound on the buffer space reserved ahead of a block.
const RESERVED_OPERATIONS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Running,
    Draining,
    FlushedFinal,
    Terminated,
}

pub(super) struct Worker {
    sink: Arc<dyn BatchSink>,
    mode: LoadMode,
    block_size: usize,
    buffer: Vec<WriteOp>,
    report: WorkerReport,
}

impl Worker {
    pub(super) fn new(
        index: usize,
        sink: Arc<dyn BatchSink>,
        mode: LoadMode,
        block_size: usize,
    ) -> Self {
        Self {
            sink,
            mode,
            block_size,
            buffer: Vec::with_capacity(reserved(block_size)),
            report: WorkerReport {
                worker: index,
                ..WorkerReport::default()
            },
        }
    }

    /// Consume `queue` until it closes or `shutdown` fires, then drain what
    /// is left and flush the partial block.
    ///
    /// A failed `bulk_write` ends the worker immediately; its buffer is
    /// discarded and the queue receiver dropped.
    pub(super) async fn run(
        mut self,
        mut queue: mpsc::Receiver<Entity>,
        shutdown: CancellationToken,
    ) -> Result<WorkerReport, SinkError> {
        let mut state = WorkerState::Running;
        while state != WorkerState::Terminated {
            state = match state {
                WorkerState::Running => {
                    tokio::select! {
                        received = queue.recv() => match received {
                            Some(entity) => {
                                self.accept(entity).await?;
                                WorkerState::Running
                            }
                            None => WorkerState::Draining,
                        },
                        () = shutdown.cancelled() => WorkerState::Draining,
                    }
                }
                WorkerState::Draining => {
                    queue.close();
                    while let Some(entity) = queue.recv().await {
                        self.accept(entity).await?;
                    }
                    self.flush().await?;
                    WorkerState::FlushedFinal
                }
                WorkerState::FlushedFinal => {
                    info!(
                        "Worker {} finished: {} operations in {} blocks ({} written, {} failed)",
                        self.report.worker,
                        self.report.operations,
                        self.report.batches,
                        self.report.written,
                        self.report.failed
                    );
                    WorkerState::Terminated
                }
                WorkerState::Terminated => WorkerState::Terminated,
            };
        }
        Ok(self.report)
    }

    async fn accept(&mut self, entity: Entity) -> Result<(), SinkError> {
        let document = Document::from(entity);
        self.buffer.push(WriteOp::for_mode(self.mode, document));
        if self.buffer.len() >= self.block_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = mem::replace(&mut self.buffer, Vec::with_capacity(reserved(self.block_size)));
        let operations = batch.len();
        let outcome = self.sink.bulk_write(batch).await?;
        self.record(operations, outcome);
        Ok(())
    }

    fn record(&mut self, operations: usize, outcome: BatchOutcome) {
        let report = &mut self.report;
        report.batches += 1;
        report.operations += u64::try_from(operations).unwrap_or(u64::MAX);
        report.written += outcome.written;
        report.failed += outcome.failed;
        info!(
            "Worker {}: wrote block {} ({} operations so far)",
            report.worker, report.batches, report.operations
        );
        if outcome.failed > 0 {
            warn!(
                "Worker {}: {} of {} operations in block {} failed",
                report.worker, outcome.failed, operations, report.batches
            );
        }
    }
}

const fn reserved(block_size: usize) -> usize {
    if block_size < RESERVED_OPERATIONS {
        block_size
    } else {
        RESERVED_OPERATIONS
    }
}
