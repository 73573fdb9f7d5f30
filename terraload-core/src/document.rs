//! Store-side document shape shared by every entity kind.
//!
//! Documents serialise to camelCase JSON:
//!
//! ```text
//! { key: {id, kind, version}, timestamp, tags: [{key, value}],
//!   location?: {type: "Point", coordinates: [lon, lat]},
//!   pathRefs?: [id...],
//!   members?: [{kind, ref, role, location?, orientation?}] }
//! ```

use chrono::{DateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::entity::{ElementKind, Entity, IdentityKey, Member, Orientation, Tag};

/// Versioned key embedded in each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Upstream identifier.
    pub id: i64,
    /// Entity kind.
    pub kind: ElementKind,
    /// Upstream version.
    pub version: i32,
}

impl DocumentKey {
    /// Identity key without the version component.
    #[must_use]
    pub const fn identity(&self) -> IdentityKey {
        IdentityKey::new(self.id, self.kind)
    }
}

/// GeoJSON geometry type tag. Only points are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    /// A single position.
    Point,
}

/// GeoJSON point with `[longitude, latitude]` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Always [`GeometryType::Point`].
    #[serde(rename = "type")]
    pub geometry: GeometryType,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl From<Coord<f64>> for GeoPoint {
    fn from(coord: Coord<f64>) -> Self {
        Self {
            geometry: GeometryType::Point,
            coordinates: [coord.x, coord.y],
        }
    }
}

/// Serialised relation member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDocument {
    /// Kind of the referenced element.
    pub kind: ElementKind,
    /// Identifier of the referenced element.
    #[serde(rename = "ref")]
    pub reference: i64,
    /// Role label.
    pub role: String,
    /// Resolved member location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Ring orientation for multipolygon/boundary members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
}

impl From<Member> for MemberDocument {
    fn from(member: Member) -> Self {
        Self {
            kind: member.kind,
            reference: member.reference,
            role: member.role,
            location: member.location.map(GeoPoint::from),
            orientation: member.orientation,
        }
    }
}

/// Persisted form of an [`Entity`].
///
/// # Examples
///
/// ```
/// use terraload_core::{Document, Entity, Path, Tag};
///
/// let entity = Entity::Path(Path {
///     id: 2,
///     version: 1,
///     timestamp: None,
///     tags: vec![Tag::new("highway", "footway")],
///     refs: vec![1, 1],
/// });
/// let json = serde_json::to_value(Document::from(entity)).expect("serialise");
/// assert_eq!(json["key"]["kind"], "path");
/// assert_eq!(json["pathRefs"], serde_json::json!([1, 1]));
/// assert!(json.get("location").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Versioned key.
    pub key: DocumentKey,
    /// Last modification time; `null` when the source carried no metadata.
    pub timestamp: Option<DateTime<Utc>>,
    /// Attributes in source order.
    pub tags: Vec<Tag>,
    /// Point location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Path point references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_refs: Option<Vec<i64>>,
    /// Relation members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberDocument>>,
}

impl Document {
    /// Identity key used to match this document on upsert.
    #[must_use]
    pub const fn identity(&self) -> IdentityKey {
        self.key.identity()
    }

    /// Serialise the document to its JSON text form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a document from its JSON text form.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl From<Entity> for Document {
    fn from(entity: Entity) -> Self {
        let key = DocumentKey {
            id: entity.id(),
            kind: entity.kind(),
            version: entity.version(),
        };
        match entity {
            Entity::Point(point) => Self {
                key,
                timestamp: point.timestamp,
                tags: point.tags,
                location: Some(GeoPoint::from(point.location)),
                path_refs: None,
                members: None,
            },
            Entity::Path(path) => Self {
                key,
                timestamp: path.timestamp,
                tags: path.tags,
                location: None,
                path_refs: Some(path.refs),
                members: None,
            },
            Entity::Relation(relation) => Self {
                key,
                timestamp: relation.timestamp,
                tags: relation.tags,
                location: None,
                path_refs: None,
                members: Some(
                    relation
                        .members
                        .into_iter()
                        .map(MemberDocument::from)
                        .collect(),
                ),
            },
        }
    }
}
