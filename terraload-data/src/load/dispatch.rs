//! Single producer stage: filter, normalise and route decoded records.
//!
//! Runs on a blocking thread. Pushing onto a full worker queue blocks the
//! dispatcher, which is the pipeline's only flow control.

use std::hash::{DefaultHasher, Hash, Hasher};

use geo::Coord;
use log::debug;
use terraload_core::{
    ElementKind, Entity, IdentityKey, LayerSet, Member, Path, Point, Relation, Tag,
};
use tokio::sync::mpsc;

use super::DispatchReport;
use crate::source::{RawMember, RawRecord, SourceError};

const PROGRESS_INTERVAL: u64 = 1_000_000;

#[derive(Debug)]
pub(super) enum DispatchError {
    Source(SourceError),
    QueueClosed { worker: usize },
}

pub(super) struct Dispatcher {
    queues: Vec<mpsc::Sender<Entity>>,
    layers: LayerSet,
    report: DispatchReport,
}

impl Dispatcher {
    pub(super) fn new(queues: Vec<mpsc::Sender<Entity>>, layers: LayerSet) -> Self {
        Self {
            queues,
            layers,
            report: DispatchReport::default(),
        }
    }

    /// Drain `source` into the worker queues.
    ///
    /// Consumes the dispatcher so the queues close as soon as it returns,
    /// whether the stream ended or failed.
    pub(super) fn run<S>(mut self, source: S) -> Result<DispatchReport, DispatchError>
    where
        S: IntoIterator<Item = Result<RawRecord, SourceError>>,
    {
        for item in source {
            let record = item.map_err(DispatchError::Source)?;
            if let Some(entity) = self.admit(record) {
                self.push(entity)?;
            }
        }
        debug!("Dispatcher reached end of stream: {:?}", self.report);
        Ok(self.report)
    }

    fn admit(&mut self, record: RawRecord) -> Option<Entity> {
        self.report.seen += 1;
        if self.report.seen.is_multiple_of(PROGRESS_INTERVAL) {
            debug!("Dispatcher progress: {:?}", self.report);
        }
        let kind = record.kind();
        if !self.layers.contains(kind) {
            self.report.skipped_layer += 1;
            return None;
        }
        if !record.is_visible() {
            self.report.skipped_hidden += 1;
            return None;
        }
        match kind {
            ElementKind::Point => self.report.points += 1,
            ElementKind::Path => self.report.paths += 1,
            ElementKind::Relation => self.report.relations += 1,
        }
        Some(normalise(record))
    }

    fn push(&self, entity: Entity) -> Result<(), DispatchError> {
        let worker = self.route(entity.identity_key());
        let queue = self
            .queues
            .get(worker)
            .ok_or(DispatchError::QueueClosed { worker })?;
        queue
            .blocking_send(entity)
            .map_err(|_| DispatchError::QueueClosed { worker })
    }

    /// Pick the worker owning `key`, so every write for one key goes through
    /// the same queue in stream order.
    fn route(&self, key: IdentityKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let buckets = u64::try_from(self.queues.len()).unwrap_or(u64::MAX);
        let slot = hasher.finish().checked_rem(buckets).unwrap_or_default();
        usize::try_from(slot).unwrap_or_default()
    }
}

/// Convert a decoded record into its pipeline entity.
///
/// Tags keep source order. A relation member keeps its coordinates only when
/// both latitude and longitude are non-zero; zero is the decoder's "no
/// location" sentinel.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use terraload_core::{ElementKind, Entity};
/// use terraload_data::load::normalise;
/// use terraload_data::source::{RawInfo, RawMember, RawRecord, RawRelation};
///
/// let record = RawRecord::Relation(RawRelation {
///     id: 3,
///     info: RawInfo::default(),
///     tags: Vec::new(),
///     members: vec![RawMember {
///         kind: ElementKind::Point,
///         reference: 1,
///         role: String::new(),
///         location: Some(Coord { x: 0.0, y: 0.0 }),
///         orientation: None,
///     }],
/// });
/// let Entity::Relation(relation) = normalise(record) else {
///     panic!("expected a relation");
/// };
/// assert_eq!(relation.members[0].location, None);
/// ```
#[must_use]
pub fn normalise(record: RawRecord) -> Entity {
    match record {
        RawRecord::Node(node) => Entity::Point(Point {
            id: node.id,
            version: node.info.version,
            timestamp: node.info.timestamp,
            tags: tags(node.tags),
            location: Coord {
                x: node.lon,
                y: node.lat,
            },
        }),
        RawRecord::Way(way) => Entity::Path(Path {
            id: way.id,
            version: way.info.version,
            timestamp: way.info.timestamp,
            tags: tags(way.tags),
            refs: way.refs,
        }),
        RawRecord::Relation(relation) => Entity::Relation(Relation {
            id: relation.id,
            version: relation.info.version,
            timestamp: relation.info.timestamp,
            tags: tags(relation.tags),
            members: relation.members.into_iter().map(member).collect(),
        }),
    }
}

fn tags(pairs: Vec<(String, String)>) -> Vec<Tag> {
    pairs
        .into_iter()
        .map(|(key, value)| Tag { key, value })
        .collect()
}

fn member(raw: RawMember) -> Member {
    Member {
        kind: raw.kind,
        reference: raw.reference,
        role: raw.role,
        location: raw
            .location
            .filter(|coord| coord.x != 0.0 && coord.y != 0.0),
        orientation: raw.orientation,
    }
}
