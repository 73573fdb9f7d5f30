//! Pull-based reader over OSM PBF blobs.
//!
//! `osmpbf` exposes callback-driven readers; the pipeline needs a forward-only
//! iterator, so blobs are decoded one at a time and their elements buffered
//! as owned [`RawRecord`]s.

use std::{
    collections::VecDeque,
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use osmpbf::{Blob, BlobDecode, BlobReader, Element, RelMemberType};
use terraload_core::ElementKind;

use super::{RawInfo, RawMember, RawNode, RawRecord, RawRelation, RawWay, SourceError};

/// Iterator of raw records decoded from an OSM PBF stream.
///
/// Yields `Err` at most once; the iterator is exhausted afterwards. The
/// underlying file is closed when the source is dropped.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use terraload_data::PbfRecordSource;
///
/// # fn main() -> Result<(), terraload_data::SourceError> {
/// let mut ways = 0;
/// for record in PbfRecordSource::open(Path::new("planet.osm.pbf"))? {
///     if record?.kind() == terraload_core::ElementKind::Path {
///         ways += 1;
///     }
/// }
/// println!("Ways: {ways}");
/// # Ok(())
/// # }
/// ```
pub struct PbfRecordSource<R: Read + Send> {
    path: PathBuf,
    blobs: BlobReader<R>,
    pending: VecDeque<RawRecord>,
    finished: bool,
}

impl PbfRecordSource<BufReader<File>> {
    /// Open a PBF file for reading.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let blobs = BlobReader::from_path(path).map_err(|source| SourceError::Open {
            source,
            path: path.to_path_buf(),
        })?;
        Ok(Self::with_blobs(path.to_path_buf(), blobs))
    }
}

impl<R: Read + Send> PbfRecordSource<R> {
    /// Read PBF data from an arbitrary reader; `label` names it in errors.
    pub fn from_reader(reader: R, label: impl Into<PathBuf>) -> Self {
        Self::with_blobs(label.into(), BlobReader::new(reader))
    }

    fn with_blobs(path: PathBuf, blobs: BlobReader<R>) -> Self {
        Self {
            path,
            blobs,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn decode_error(&mut self, source: osmpbf::Error) -> SourceError {
        self.finished = true;
        self.pending.clear();
        SourceError::Decode {
            source,
            path: self.path.clone(),
        }
    }

    fn buffer_blob(&mut self, blob: &Blob) -> Result<(), osmpbf::Error> {
        match blob.decode()? {
            BlobDecode::OsmData(block) => {
                for element in block.elements() {
                    self.pending.push_back(raw_record(element)?);
                }
            }
            BlobDecode::OsmHeader(_) | BlobDecode::Unknown(_) => {}
        }
        Ok(())
    }
}

impl<R: Read + Send> Iterator for PbfRecordSource<R> {
    type Item = Result<RawRecord, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if self.finished {
                return None;
            }
            match self.blobs.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(source)) => return Some(Err(self.decode_error(source))),
                Some(Ok(blob)) => {
                    if let Err(source) = self.buffer_blob(&blob) {
                        return Some(Err(self.decode_error(source)));
                    }
                }
            }
        }
    }
}

fn raw_record(element: Element<'_>) -> Result<RawRecord, osmpbf::Error> {
    let record = match element {
        Element::Node(node) => {
            let info = node.info();
            RawRecord::Node(RawNode {
                id: node.id(),
                info: raw_info(info.version(), info.milli_timestamp(), info.visible()),
                tags: owned_tags(node.tags()),
                lat: node.lat(),
                lon: node.lon(),
            })
        }
        Element::DenseNode(node) => {
            let info = node.info().map_or_else(RawInfo::default, |dense| {
                raw_info(
                    Some(dense.version()),
                    Some(dense.milli_timestamp()),
                    dense.visible(),
                )
            });
            RawRecord::Node(RawNode {
                id: node.id(),
                info,
                tags: owned_tags(node.tags()),
                lat: node.lat(),
                lon: node.lon(),
            })
        }
        Element::Way(way) => {
            let info = way.info();
            RawRecord::Way(RawWay {
                id: way.id(),
                info: raw_info(info.version(), info.milli_timestamp(), info.visible()),
                tags: owned_tags(way.tags()),
                refs: way.refs().collect(),
            })
        }
        Element::Relation(relation) => {
            let info = relation.info();
            let members = relation
                .members()
                .map(|member| {
                    Ok(RawMember {
                        kind: member_kind(&member.member_type),
                        reference: member.member_id,
                        role: member.role()?.to_owned(),
                        location: None,
                        orientation: None,
                    })
                })
                .collect::<Result<Vec<_>, osmpbf::Error>>()?;
            RawRecord::Relation(RawRelation {
                id: relation.id(),
                info: raw_info(info.version(), info.milli_timestamp(), info.visible()),
                tags: owned_tags(relation.tags()),
                members,
            })
        }
    };
    Ok(record)
}

fn raw_info(version: Option<i32>, milli_timestamp: Option<i64>, visible: bool) -> RawInfo {
    RawInfo {
        version: version.unwrap_or_default(),
        timestamp: milli_timestamp.and_then(DateTime::<Utc>::from_timestamp_millis),
        visible,
    }
}

fn owned_tags<'a, T>(tags: T) -> Vec<(String, String)>
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

const fn member_kind(member_type: &RelMemberType) -> ElementKind {
    match member_type {
        RelMemberType::Node => ElementKind::Point,
        RelMemberType::Way => ElementKind::Path,
        RelMemberType::Relation => ElementKind::Relation,
    }
}
