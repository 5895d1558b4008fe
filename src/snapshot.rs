//! Everything the rules look at, captured once per run.
//!
//! Rules never touch the archive themselves: they see an [`ArchiveSnapshot`]
//! of the ZIP layer and a [`StoreSnapshot`] of the Zarr hierarchy, which
//! keeps rule evaluation synchronous and repeatable.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::SchemaError;
use crate::ome::{OmeAttributes, SchemaValidator};
use crate::store::{LevelMetadata, StoreReader};
use crate::zip::{ArchiveReader, CompressionMethod, DeflateLevel};

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveSnapshot {
    pub location: String,
    pub size: u64,
    /// Central directory order, duplicates kept.
    pub entry_names: Vec<String>,
    pub comment: Vec<u8>,
    pub compression_method: CompressionMethod,
    pub compression_level: Option<DeflateLevel>,
}

impl ArchiveSnapshot {
    pub fn capture<A: ArchiveReader + ?Sized>(archive: &A) -> Self {
        Self {
            location: archive.location().to_string(),
            size: archive.size(),
            entry_names: archive
                .entry_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            comment: archive.comment().to_vec(),
            compression_method: archive.compression_method(),
            compression_level: archive.compression_level(),
        }
    }

    /// First path segment of every entry.
    pub fn root_paths(&self) -> BTreeSet<String> {
        self.entry_names
            .iter()
            .map(|name| name.split('/').next().unwrap_or(name).to_string())
            .collect()
    }

    /// The archive comment as JSON.
    ///
    /// Trailing NUL terminators are dropped and single quotes are read as
    /// double quotes; an empty comment is an empty object.
    pub fn comment_document(&self) -> Result<Value, String> {
        let text = std::str::from_utf8(&self.comment)
            .map_err(|e| format!("comment is not valid UTF-8: {e}"))?;
        let text = text.trim_end_matches('\0');
        if text.is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&text.replace('\'', "\""))
            .map_err(|e| format!("comment is not JSON ({e}): {text:?}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub root_document: Value,
    pub child_names: BTreeSet<String>,
    pub ome: Result<OmeAttributes, SchemaError>,
    /// Ascending level order, 0 being the highest resolution.
    pub levels: Vec<LevelMetadata>,
}

impl StoreSnapshot {
    pub fn capture(store: &dyn StoreReader, validator: &dyn SchemaValidator) -> Self {
        let levels = (0..store.level_count())
            .filter_map(|level| store.level_metadata(level))
            .collect();
        Self {
            root_document: store.root_document().clone(),
            child_names: store.child_names(),
            ome: validator.validate(store),
            levels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn archive(entries: &[&str], comment: &[u8]) -> ArchiveSnapshot {
        ArchiveSnapshot {
            location: "image.ozx".to_string(),
            size: 0,
            entry_names: entries.iter().map(|e| e.to_string()).collect(),
            comment: comment.to_vec(),
            compression_method: CompressionMethod::Stored,
            compression_level: None,
        }
    }

    #[test]
    fn root_paths_are_first_segments() {
        let snapshot = archive(&["zarr.json", "0/zarr.json", "0/c/0/0", "1/zarr.json"], b"");
        let expected: BTreeSet<String> =
            ["zarr.json", "0", "1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(snapshot.root_paths(), expected);
    }

    #[test]
    fn comment_parsing() {
        assert_eq!(archive(&[], b"").comment_document(), Ok(json!({})));
        assert_eq!(
            archive(&[], b"{'ome': {'version': '0.5'}}\0").comment_document(),
            Ok(json!({"ome": {"version": "0.5"}}))
        );
        assert!(archive(&[], b"not json").comment_document().is_err());
        assert!(archive(&[], b"\xff\xfe").comment_document().is_err());
    }
}
