//! Zarr v3 node metadata documents.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#array-metadata>.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const ZARR_FORMAT: u32 = 3;
pub const SHARDING_CODEC: &str = "sharding_indexed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Group,
    Array,
}

/// A `{"name": ..., "configuration": {...}}` object, as used for chunk grids,
/// chunk key encodings and codecs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedConfiguration {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
}

impl NamedConfiguration {
    pub fn new(name: &str, configuration: Value) -> Self {
        Self {
            name: name.to_string(),
            configuration: Some(configuration),
        }
    }

    fn shape_field(&self, field: &str) -> Option<Vec<u64>> {
        let values = self.configuration.as_ref()?.get(field)?.as_array()?;
        values.iter().map(Value::as_u64).collect()
    }
}

/// The `bytes` codec, little endian.
pub fn bytes_codec() -> NamedConfiguration {
    NamedConfiguration::new("bytes", json!({"endian": "little"}))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub zarr_format: u32,
    pub node_type: NodeType,

    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl GroupMetadata {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self {
            zarr_format: ZARR_FORMAT,
            node_type: NodeType::Group,
            attributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayMetadata {
    pub zarr_format: u32,
    pub node_type: NodeType,
    pub shape: Vec<u64>,
    pub data_type: Value,
    pub chunk_grid: NamedConfiguration,
    pub chunk_key_encoding: NamedConfiguration,
    pub fill_value: Value,
    pub codecs: Vec<NamedConfiguration>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_names: Option<Vec<Option<String>>>,
}

impl ArrayMetadata {
    /// Shape of the stored units of the regular grid (shards when sharded).
    pub fn grid_shape(&self) -> Option<Vec<u64>> {
        self.chunk_grid.shape_field("chunk_shape")
    }

    fn sharding_codec(&self) -> Option<&NamedConfiguration> {
        self.codecs.first().filter(|c| c.name == SHARDING_CODEC)
    }

    /// Shard shape, when the array is stored with the sharding codec.
    pub fn shards(&self) -> Option<Vec<u64>> {
        self.sharding_codec().and(self.grid_shape())
    }

    /// Shape of the individual (inner) chunks.
    pub fn chunk_shape(&self) -> Option<Vec<u64>> {
        match self.sharding_codec() {
            Some(codec) => codec.shape_field("chunk_shape"),
            None => self.grid_shape(),
        }
    }

    pub fn level(&self, path: &str) -> LevelMetadata {
        LevelMetadata {
            path: path.to_string(),
            shape: self.shape.clone(),
            chunk_shape: self.chunk_shape().unwrap_or_default(),
            data_type: match &self.data_type {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            shards: self.shards(),
        }
    }
}

/// What the rules need to know about one pyramid level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelMetadata {
    pub path: String,
    pub shape: Vec<u64>,
    pub chunk_shape: Vec<u64>,
    pub data_type: String,
    pub shards: Option<Vec<u64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(codecs: Value, grid: Value) -> ArrayMetadata {
        serde_json::from_value(json!({
            "zarr_format": 3,
            "node_type": "array",
            "shape": [100, 100],
            "data_type": "float64",
            "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": grid}},
            "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
            "fill_value": 0.0,
            "codecs": codecs
        }))
        .unwrap()
    }

    #[test]
    fn plain_array_has_no_shards() {
        let metadata = array(json!([{"name": "bytes", "configuration": {"endian": "little"}}]), json!([10, 10]));
        let level = metadata.level("0");
        assert_eq!(level.shape, vec![100, 100]);
        assert_eq!(level.chunk_shape, vec![10, 10]);
        assert_eq!(level.data_type, "float64");
        assert_eq!(level.shards, None);
    }

    #[test]
    fn sharded_array_reports_shard_and_inner_shapes() {
        let metadata = array(
            json!([{
                "name": "sharding_indexed",
                "configuration": {
                    "chunk_shape": [10, 10],
                    "codecs": [{"name": "bytes", "configuration": {"endian": "little"}}],
                    "index_codecs": [{"name": "bytes", "configuration": {"endian": "little"}}],
                    "index_location": "end"
                }
            }]),
            json!([100, 100]),
        );
        assert_eq!(metadata.shards(), Some(vec![100, 100]));
        assert_eq!(metadata.chunk_shape(), Some(vec![10, 10]));
    }
}
