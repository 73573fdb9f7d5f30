//! Facade crate for the Terraload bulk loader.
//!
//! This crate re-exports the core entity and document types and, behind the
//! default `pipeline` feature, the streaming load pipeline with its PBF source
//! and SQLite sink.

#![forbid(unsafe_code)]

pub use terraload_core::{
    Document, DocumentKey, ElementKind, Entity, IdentityKey, LayerSet, LoadMode, Member, Path,
    Point, Relation, Tag,
};

#[cfg(feature = "pipeline")]
pub use terraload_data::{
    BatchOutcome, BatchSink, LoadConfig, LoadError, LoadSummary, PbfRecordSource, SinkError,
    SourceError, SqliteDocumentSink, WriteOp, load_entities,
};
