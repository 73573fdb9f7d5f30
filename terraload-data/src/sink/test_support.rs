//! In-memory sinks for exercising the pipeline without a database.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{BatchOutcome, BatchSink, SinkError, WriteOp};

/// Sink that records every batch it receives.
///
/// Optionally rejects the batch with a given zero-based call index, which
/// simulates a connectivity fault on that write.
///
/// # Example
///
/// ```
/// use terraload_data::sink::test_support::RecordingSink;
///
/// let sink = RecordingSink::default();
/// assert!(sink.batches().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<WriteOp>>>,
    fail_on_call: Option<usize>,
    calls: Mutex<usize>,
}

impl RecordingSink {
    /// Create a sink that rejects its `call`-th batch (zero-based).
    #[must_use]
    pub fn failing_on_call(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    /// Batches accepted so far, in arrival order.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<WriteOp>> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every accepted operation, flattened in arrival order.
    #[must_use]
    pub fn operations(&self) -> Vec<WriteOp> {
        self.batches().into_iter().flatten().collect()
    }

    /// Number of `bulk_write` calls, including rejected ones.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BatchSink for RecordingSink {
    async fn bulk_write(&self, batch: Vec<WriteOp>) -> Result<BatchOutcome, SinkError> {
        let call = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            let current = *calls;
            *calls += 1;
            current
        };
        if self.fail_on_call == Some(call) {
            return Err(SinkError::Rejected {
                operations: batch.len(),
                source: "simulated connectivity fault".into(),
            });
        }
        let written = u64::try_from(batch.len()).unwrap_or(u64::MAX);
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(batch);
        Ok(BatchOutcome { written, failed: 0 })
    }
}
