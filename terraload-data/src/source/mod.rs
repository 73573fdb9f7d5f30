//! Raw records produced by the decoder, before normalisation.
//!
//! Any `IntoIterator<Item = Result<RawRecord, SourceError>>` can feed the
//! load pipeline; [`PbfRecordSource`] is the adapter for OSM PBF files. The
//! first `Err` item is terminal: the dispatcher stops pulling after it.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use geo::Coord;
use terraload_core::{ElementKind, Orientation};
use thiserror::Error;

mod pbf;

pub use pbf::PbfRecordSource;

/// Metadata attached to every raw record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInfo {
    /// Upstream version, `0` when the source carries no metadata.
    pub version: i32,
    /// Last modification time.
    pub timestamp: Option<DateTime<Utc>>,
    /// `false` when the element was deleted upstream.
    pub visible: bool,
}

impl Default for RawInfo {
    fn default() -> Self {
        Self {
            version: 0,
            timestamp: None,
            visible: true,
        }
    }
}

/// Decoded node.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    /// Upstream identifier.
    pub id: i64,
    /// Version, timestamp and visibility.
    pub info: RawInfo,
    /// Key/value pairs in source order.
    pub tags: Vec<(String, String)>,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// Decoded way.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWay {
    /// Upstream identifier.
    pub id: i64,
    /// Version, timestamp and visibility.
    pub info: RawInfo,
    /// Key/value pairs in source order.
    pub tags: Vec<(String, String)>,
    /// Referenced node identifiers in order.
    pub refs: Vec<i64>,
}

/// Decoded relation member.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMember {
    /// Kind of the referenced element.
    pub kind: ElementKind,
    /// Identifier of the referenced element.
    pub reference: i64,
    /// Role label.
    pub role: String,
    /// Member coordinates as reported by the decoder, `x = lon`, `y = lat`.
    /// Decoders without member locations report `None`.
    pub location: Option<Coord<f64>>,
    /// Ring orientation, when the decoder computes it.
    pub orientation: Option<Orientation>,
}

/// Decoded relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRelation {
    /// Upstream identifier.
    pub id: i64,
    /// Version, timestamp and visibility.
    pub info: RawInfo,
    /// Key/value pairs in source order.
    pub tags: Vec<(String, String)>,
    /// Members in order.
    pub members: Vec<RawMember>,
}

/// One record pulled from the decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// A node.
    Node(RawNode),
    /// A way.
    Way(RawWay),
    /// A relation.
    Relation(RawRelation),
}

impl RawRecord {
    /// Kind the record normalises to.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Node(_) => ElementKind::Point,
            Self::Way(_) => ElementKind::Path,
            Self::Relation(_) => ElementKind::Relation,
        }
    }

    /// Record metadata.
    #[must_use]
    pub const fn info(&self) -> &RawInfo {
        match self {
            Self::Node(node) => &node.info,
            Self::Way(way) => &way.info,
            Self::Relation(relation) => &relation.info,
        }
    }

    /// Whether the record survives the visibility filter.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.info().visible
    }
}

/// Errors raised while reading the entity stream.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source file could not be opened.
    #[error("failed to open OSM PBF file at {path:?}")]
    Open {
        /// Path of the source file.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: osmpbf::Error,
    },
    /// The stream is malformed.
    #[error("failed to decode OSM PBF data at {path:?}")]
    Decode {
        /// Path or label of the source.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: osmpbf::Error,
    },
    /// A non-PBF source reported a failure.
    #[error("entity source failed: {message}")]
    Other {
        /// Human-readable cause.
        message: String,
    },
}
