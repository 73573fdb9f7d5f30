//! Loading pipeline for the Terraload bulk loader.
//!
//! Responsibilities:
//! - Decode OSM PBF streams into raw records ([`source`]).
//! - Filter, normalise and batch entities across a worker pool ([`load`]).
//! - Apply write batches to a document store ([`sink`]).
//!
//! Boundaries:
//! - Entity and document shapes live in `terraload-core`.
//! - Decoding and database access run on blocking threads, never directly on
//!   the async executor.
//!
//! Invariants:
//! - Queues between stages are bounded; a slow sink stalls the decoder.
//! - No global mutable state.

#![forbid(unsafe_code)]

pub mod load;
pub mod sink;
pub mod source;

pub use load::{
    DispatchReport, LoadConfig, LoadConfigError, LoadError, LoadSummary, WorkerReport,
    load_entities,
};
pub use sink::{BatchOutcome, BatchSink, SinkError, SqliteDocumentSink, SqliteSinkError, WriteOp};
pub use source::{PbfRecordSource, RawRecord, SourceError};
