use base64::{Engine as _, engine::general_purpose};
use geo::Coord;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::{Builder, TempPath};
use terraload_core::ElementKind;
use terraload_data::source::{RawInfo, RawMember, RawNode, RawRecord, RawRelation, RawWay};

/// Directory containing the encoded fixture blobs.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Decode a Base64-encoded fixture into a temporary `.osm.pbf` file.
pub fn decode_fixture(dir: &Path, stem: &str) -> TempPath {
    let encoded_path = dir.join(format!("{stem}.osm.pbf.b64"));
    let encoded = fs::read_to_string(&encoded_path).unwrap_or_else(|err| {
        panic!("failed to read base64 fixture {encoded_path:?}: {err}");
    });
    let cleaned: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let decoded = general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .unwrap_or_else(|err| {
            panic!("failed to decode base64 fixture {encoded_path:?}: {err}");
        });
    let mut tempfile = Builder::new()
        .prefix(stem)
        .suffix(".osm.pbf")
        .tempfile()
        .unwrap_or_else(|err| {
            panic!("failed to create temporary fixture for {stem}: {err}");
        });
    tempfile.write_all(&decoded).unwrap_or_else(|err| {
        panic!("failed to write decoded fixture for {stem}: {err}");
    });
    tempfile.flush().unwrap_or_else(|err| {
        panic!("failed to flush decoded fixture for {stem}: {err}");
    });
    tempfile.into_temp_path()
}

/// Raw node with a single `name` tag.
pub fn node(id: i64, version: i32) -> RawRecord {
    RawRecord::Node(RawNode {
        id,
        info: RawInfo {
            version,
            ..RawInfo::default()
        },
        tags: vec![("name".to_owned(), format!("node {id}"))],
        lat: 52.12,
        lon: 11.62,
    })
}

/// Raw way over nodes `1` and `2`.
pub fn way(id: i64) -> RawRecord {
    RawRecord::Way(RawWay {
        id,
        info: RawInfo::default(),
        tags: vec![("highway".to_owned(), "footway".to_owned())],
        refs: vec![1, 2],
    })
}

/// Raw relation with one member located at the origin.
pub fn relation(id: i64) -> RawRecord {
    RawRecord::Relation(RawRelation {
        id,
        info: RawInfo::default(),
        tags: vec![("type".to_owned(), "route".to_owned())],
        members: vec![RawMember {
            kind: ElementKind::Point,
            reference: 1,
            role: "stop".to_owned(),
            location: Some(Coord { x: 0.0, y: 0.0 }),
            orientation: None,
        }],
    })
}
