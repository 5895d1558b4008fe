use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::zip::ArchiveReader;

use super::metadata::{ArrayMetadata, LevelMetadata};
use super::StoreReader;

/// A Zarr v3 hierarchy read from the root of an archive.
///
/// All node documents the rules need are read once on open, so the store
/// does not hold on to the archive afterwards.
#[derive(Debug, Clone)]
pub struct ZarrStore {
    root: Value,
    children: BTreeSet<String>,
    arrays: BTreeMap<String, ArrayMetadata>,
    levels: Vec<String>,
}

impl ZarrStore {
    /// Read the root document, the child node documents and any dataset
    /// arrays the root's multiscales point at.
    pub async fn open<A: ArchiveReader + ?Sized>(
        archive: &A,
        metadata_filename: &str,
    ) -> Result<Self> {
        if !archive.contains(metadata_filename) {
            return Err(Error::Format(format!(
                "{}: no root {metadata_filename}",
                archive.location()
            )));
        }
        let root = read_document(archive, metadata_filename).await?;

        let children: BTreeSet<String> = archive
            .entry_names()
            .into_iter()
            .filter_map(|name| name.split_once('/').map(|(first, _)| first))
            .filter(|first| {
                !first.is_empty() && archive.contains(&format!("{first}/{metadata_filename}"))
            })
            .map(str::to_string)
            .collect();

        let declared = declared_dataset_paths(&root);

        let mut candidates: Vec<&String> = children.iter().collect();
        candidates.extend(declared.iter().filter(|p| !children.contains(*p)));

        let mut arrays = BTreeMap::new();
        for path in candidates {
            let key = format!("{path}/{metadata_filename}");
            if !archive.contains(&key) {
                continue;
            }
            let document = read_document(archive, &key).await?;
            if document.get("node_type") != Some(&Value::String("array".into())) {
                continue;
            }
            let metadata: ArrayMetadata = serde_json::from_value(document)
                .map_err(|e| Error::Format(format!("{key}: invalid array metadata: {e}")))?;
            arrays.insert(path.clone(), metadata);
        }

        let levels = if declared.is_empty() {
            let mut paths: Vec<String> = children
                .iter()
                .filter(|c| arrays.contains_key(*c))
                .cloned()
                .collect();
            paths.sort_by(|a, b| natural_key(a).cmp(&natural_key(b)));
            paths
        } else {
            declared
                .into_iter()
                .filter(|p| arrays.contains_key(p))
                .collect()
        };

        log::debug!(
            "{}: {} children, {} arrays, levels {:?}",
            archive.location(),
            children.len(),
            arrays.len(),
            levels
        );

        Ok(Self {
            root,
            children,
            arrays,
            levels,
        })
    }
}

impl StoreReader for ZarrStore {
    fn root_document(&self) -> &Value {
        &self.root
    }

    fn child_names(&self) -> BTreeSet<String> {
        self.children.clone()
    }

    fn has_array(&self, path: &str) -> bool {
        self.arrays.contains_key(path)
    }

    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_metadata(&self, level: usize) -> Option<LevelMetadata> {
        let path = self.levels.get(level)?;
        self.arrays.get(path).map(|metadata| metadata.level(path))
    }
}

async fn read_document<A: ArchiveReader + ?Sized>(archive: &A, key: &str) -> Result<Value> {
    let bytes = archive.read_entry(key).await?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Format(format!("{key}: invalid JSON: {e}")))
}

/// Dataset paths of the first multiscale, in either attribute layout.
fn declared_dataset_paths(root: &Value) -> Vec<String> {
    ["/attributes/ome/multiscales/0/datasets", "/attributes/multiscales/0/datasets"]
        .iter()
        .find_map(|pointer| root.pointer(pointer)?.as_array())
        .map(|datasets| {
            datasets
                .iter()
                .filter_map(|d| d.get("path")?.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Numeric names sort by value ("2" before "10"), everything else after them.
fn natural_key(name: &str) -> (u64, &str) {
    (name.parse().unwrap_or(u64::MAX), name)
}
