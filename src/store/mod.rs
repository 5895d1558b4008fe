//! The Zarr v3 hierarchy stored inside an archive.
//!
//! [`StoreReader`] and [`StoreWriter`] are the seams the validator and the
//! fixture writer use; [`ZarrStore`] and [`ZarrZipWriter`] implement them on
//! top of the ZIP layer.

mod metadata;
mod reader;
mod writer;

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::pyramid::ArrayData;

pub use metadata::{
    ArrayMetadata, GroupMetadata, LevelMetadata, NamedConfiguration, NodeType, SHARDING_CODEC,
    ZARR_FORMAT, bytes_codec,
};
pub use reader::ZarrStore;
pub use writer::{ArrayHandle, ArrayLayout, ZarrZipWriter};

/// Read-only view of a hierarchy's root and its pyramid levels.
pub trait StoreReader {
    /// The root node's metadata document, as parsed JSON.
    fn root_document(&self) -> &Value;

    /// The root group's `attributes`, if the document has them.
    fn root_attributes(&self) -> Option<&Map<String, Value>> {
        self.root_document().get("attributes")?.as_object()
    }

    /// Names of the root's immediate child nodes.
    fn child_names(&self) -> BTreeSet<String>;

    /// Whether `path` (relative to the root) is an array node.
    fn has_array(&self, path: &str) -> bool;

    fn level_count(&self) -> usize;

    /// Metadata of pyramid level `level`, 0 being the highest resolution.
    fn level_metadata(&self, level: usize) -> Option<LevelMetadata>;
}

/// Creates a hierarchy: one root group and its arrays.
pub trait StoreWriter {
    type Array;

    fn create_group(&mut self, attributes: Map<String, Value>) -> Result<()>;

    /// Create an array node. With `write_data` unset only the metadata is
    /// written and the data follows through [`StoreWriter::write_array_data`].
    fn create_array(
        &mut self,
        name: &str,
        data: &ArrayData,
        layout: &ArrayLayout,
        write_data: bool,
    ) -> Result<Self::Array>;

    fn write_array_data(&mut self, array: &Self::Array, data: &ArrayData) -> Result<()>;
}
