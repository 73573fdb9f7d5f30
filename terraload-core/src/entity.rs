//! Normalised entities flowing through the load pipeline.
//!
//! An [`Entity`] is built once from a decoded record, never mutated, and
//! consumed exactly once when a worker turns it into a write operation.

use std::fmt;

use chrono::{DateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Serialize};

/// Kind tag shared by entities, relation members and layer filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A single located point (an OSM node).
    Point,
    /// An ordered sequence of point references (an OSM way).
    Path,
    /// A composite of members (an OSM relation).
    Relation,
}

impl ElementKind {
    /// All kinds in canonical order.
    pub const ALL: [Self; 3] = [Self::Point, Self::Path, Self::Relation];

    /// Stable lowercase name used in documents and store keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Path => "path",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural key used to match stored documents during upserts.
///
/// The key deliberately omits the version: a later version of the same
/// element replaces the earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    /// Upstream numeric identifier.
    pub id: i64,
    /// Kind of the identified element.
    pub kind: ElementKind,
}

impl IdentityKey {
    /// Construct a key from its parts.
    #[must_use]
    pub const fn new(id: i64, kind: ElementKind) -> Self {
        Self { id, kind }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// One key/value attribute. Tag lists keep decoder order and duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Attribute name.
    pub key: String,
    /// Attribute value.
    pub value: String,
}

impl Tag {
    /// Build a tag from anything convertible into owned strings.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Direction of a member way around a multipolygon or boundary ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    /// Ring runs clockwise.
    Clockwise,
    /// Ring runs counter-clockwise.
    CounterClockwise,
}

/// Reference from a relation to another element.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// Kind of the referenced element.
    pub kind: ElementKind,
    /// Identifier of the referenced element.
    pub reference: i64,
    /// Role label, possibly empty.
    pub role: String,
    /// Location of the member when it could be resolved at dispatch time.
    /// Coordinates are WGS84 with `x = longitude`, `y = latitude`.
    pub location: Option<Coord<f64>>,
    /// Ring orientation; only present for multipolygon/boundary members.
    pub orientation: Option<Orientation>,
}

/// A located point.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Upstream identifier.
    pub id: i64,
    /// Upstream version.
    pub version: i32,
    /// Last modification time, when the source carries metadata.
    pub timestamp: Option<DateTime<Utc>>,
    /// Attributes in source order.
    pub tags: Vec<Tag>,
    /// WGS84 position with `x = longitude`, `y = latitude`.
    pub location: Coord<f64>,
}

/// An ordered sequence of point references.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Upstream identifier.
    pub id: i64,
    /// Upstream version.
    pub version: i32,
    /// Last modification time, when the source carries metadata.
    pub timestamp: Option<DateTime<Utc>>,
    /// Attributes in source order.
    pub tags: Vec<Tag>,
    /// Referenced point identifiers; duplicates and self references are legal.
    pub refs: Vec<i64>,
}

/// A composite of members.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Upstream identifier.
    pub id: i64,
    /// Upstream version.
    pub version: i32,
    /// Last modification time, when the source carries metadata.
    pub timestamp: Option<DateTime<Utc>>,
    /// Attributes in source order.
    pub tags: Vec<Tag>,
    /// Members in source order.
    pub members: Vec<Member>,
}

/// Normalised record travelling through the pipeline.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use terraload_core::{ElementKind, Entity, IdentityKey, Point};
///
/// let entity = Entity::Point(Point {
///     id: 42,
///     version: 3,
///     timestamp: None,
///     tags: Vec::new(),
///     location: Coord { x: 13.4, y: 52.5 },
/// });
/// assert_eq!(entity.kind(), ElementKind::Point);
/// assert_eq!(entity.identity_key(), IdentityKey::new(42, ElementKind::Point));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A located point.
    Point(Point),
    /// An ordered sequence of point references.
    Path(Path),
    /// A composite of members.
    Relation(Relation),
}

impl Entity {
    /// Kind tag implied by the variant.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Point(_) => ElementKind::Point,
            Self::Path(_) => ElementKind::Path,
            Self::Relation(_) => ElementKind::Relation,
        }
    }

    /// Upstream identifier.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Point(point) => point.id,
            Self::Path(path) => path.id,
            Self::Relation(relation) => relation.id,
        }
    }

    /// Upstream version.
    #[must_use]
    pub const fn version(&self) -> i32 {
        match self {
            Self::Point(point) => point.version,
            Self::Path(path) => path.version,
            Self::Relation(relation) => relation.version,
        }
    }

    /// Natural key used for upsert matching.
    #[must_use]
    pub const fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(self.id(), self.kind())
    }
}
