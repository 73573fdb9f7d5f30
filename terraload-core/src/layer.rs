//! Operator-facing load options: which layers to import and how to write.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::ElementKind;

/// Write strategy applied by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Unconditional inserts into an empty target.
    #[default]
    Initial,
    /// Upserts matched on the identity key.
    Incremental,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initial => "initial",
            Self::Incremental => "incremental",
        })
    }
}

impl FromStr for LoadMode {
    type Err = ParseOptionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "initial" => Ok(Self::Initial),
            "incremental" => Ok(Self::Incremental),
            _ => Err(ParseOptionError::UnknownMode {
                value: raw.to_owned(),
            }),
        }
    }
}

/// Subset of element kinds enabled for import.
///
/// # Examples
///
/// ```
/// use terraload_core::{ElementKind, LayerSet};
///
/// let layers: LayerSet = "nodes,ways".parse().expect("valid layers");
/// assert!(layers.contains(ElementKind::Point));
/// assert!(layers.contains(ElementKind::Path));
/// assert!(!layers.contains(ElementKind::Relation));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerSet {
    point: bool,
    path: bool,
    relation: bool,
}

impl LayerSet {
    /// Every layer enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            point: true,
            path: true,
            relation: true,
        }
    }

    /// No layer enabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            point: false,
            path: false,
            relation: false,
        }
    }

    /// Return a copy with `kind` enabled.
    #[must_use]
    pub const fn with(mut self, kind: ElementKind) -> Self {
        match kind {
            ElementKind::Point => self.point = true,
            ElementKind::Path => self.path = true,
            ElementKind::Relation => self.relation = true,
        }
        self
    }

    /// Whether entities of `kind` pass the layer filter.
    #[must_use]
    pub const fn contains(&self, kind: ElementKind) -> bool {
        match kind {
            ElementKind::Point => self.point,
            ElementKind::Path => self.path,
            ElementKind::Relation => self.relation,
        }
    }

    /// Whether no layer is enabled.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.point || self.path || self.relation)
    }

    /// Enabled kinds in canonical order.
    pub fn kinds(&self) -> impl Iterator<Item = ElementKind> + '_ {
        ElementKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
    }
}

impl FromIterator<ElementKind> for LayerSet {
    fn from_iter<I: IntoIterator<Item = ElementKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

impl fmt::Display for LayerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.kinds().map(ElementKind::as_str).collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for ElementKind {
    type Err = ParseOptionError;

    /// Accepts the canonical names and the OSM spellings (`node(s)`, `way(s)`,
    /// `relations`).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "point" | "points" | "node" | "nodes" => Ok(Self::Point),
            "path" | "paths" | "way" | "ways" => Ok(Self::Path),
            "relation" | "relations" => Ok(Self::Relation),
            _ => Err(ParseOptionError::UnknownLayer {
                value: raw.to_owned(),
            }),
        }
    }
}

impl FromStr for LayerSet {
    type Err = ParseOptionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let layers = raw
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(ElementKind::from_str)
            .collect::<Result<Self, _>>()?;
        if layers.is_empty() {
            return Err(ParseOptionError::NoLayers);
        }
        Ok(layers)
    }
}

/// Errors raised while parsing operator-supplied options.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseOptionError {
    /// The load mode is neither `initial` nor `incremental`.
    #[error("unknown load mode {value:?} (expected initial or incremental)")]
    UnknownMode {
        /// Rejected input.
        value: String,
    },
    /// A layer name is not recognised.
    #[error("unknown layer {value:?} (expected point, path or relation)")]
    UnknownLayer {
        /// Rejected input.
        value: String,
    },
    /// The layer list selected nothing.
    #[error("at least one layer must be enabled")]
    NoLayers,
}
