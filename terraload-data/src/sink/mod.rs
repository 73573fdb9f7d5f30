//! Batch sinks: the write side of the load pipeline.
//!
//! A sink receives unordered batches of [`WriteOp`]s. Failures of individual
//! operations are counted in the [`BatchOutcome`] and do not affect sibling
//! operations; only a failure of the batch as a whole is returned as a
//! [`SinkError`].

use async_trait::async_trait;
use terraload_core::{Document, IdentityKey, LoadMode};
use thiserror::Error;

mod sqlite;
#[doc(hidden)]
pub mod test_support;

pub use sqlite::{SqliteDocumentSink, SqliteSinkError};

/// One write operation inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Unconditional insert; the target is assumed not to hold the key.
    Insert(Document),
    /// Replace the document matching `key`, creating it when absent.
    UpsertByKey {
        /// Match filter.
        key: IdentityKey,
        /// Full replacement document.
        document: Document,
    },
}

impl WriteOp {
    /// Build the operation for `document` under the given load mode.
    #[must_use]
    pub fn for_mode(mode: LoadMode, document: Document) -> Self {
        match mode {
            LoadMode::Initial => Self::Insert(document),
            LoadMode::Incremental => Self::UpsertByKey {
                key: document.identity(),
                document,
            },
        }
    }

    /// Document carried by the operation.
    #[must_use]
    pub const fn document(&self) -> &Document {
        match self {
            Self::Insert(document) | Self::UpsertByKey { document, .. } => document,
        }
    }

    /// Identity key the operation writes to.
    #[must_use]
    pub const fn key(&self) -> IdentityKey {
        match self {
            Self::Insert(document) => document.identity(),
            Self::UpsertByKey { key, .. } => *key,
        }
    }
}

/// Result of a batch accepted by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    /// Operations applied.
    pub written: u64,
    /// Operations rejected individually.
    pub failed: u64,
}

/// Failure of a whole batch.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The store rejected the batch.
    #[error("sink rejected a batch of {operations} operations")]
    Rejected {
        /// Size of the rejected batch.
        operations: usize,
        /// Store-specific cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The blocking write task was cancelled or panicked.
    #[error("sink write task did not complete")]
    Interrupted {
        /// Join failure reported by the runtime.
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Destination for write batches.
///
/// Implementations execute batches with unordered semantics and must be safe
/// to share between workers.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Apply `batch`, reporting per-operation failures in the outcome.
    async fn bulk_write(&self, batch: Vec<WriteOp>) -> Result<BatchOutcome, SinkError>;
}
