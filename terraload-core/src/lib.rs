//! Core domain types for the Terraload bulk loader.
//!
//! Entities are modelled as a closed sum type with one variant per element
//! kind; each variant carries only the fields relevant to that kind. The
//! [`Document`] type fixes the persisted shape shared by every store adapter.
#![forbid(unsafe_code)]

pub mod document;
pub mod entity;
pub mod layer;

pub use document::{Document, DocumentKey, GeoPoint, GeometryType, MemberDocument};
pub use entity::{ElementKind, Entity, IdentityKey, Member, Orientation, Path, Point, Relation, Tag};
pub use layer::{LayerSet, LoadMode, ParseOptionError};
