use byteorder::{LittleEndian, WriteBytesExt};
use serde_json::{Map, Value, json};
use std::io::Write;

use crate::error::{Error, Result};
use crate::pyramid::{ArrayData, Indices};
use crate::zip::{WriterOptions, ZipWriter};

use super::StoreWriter;
use super::metadata::{
    ArrayMetadata, GroupMetadata, NamedConfiguration, NodeType, SHARDING_CODEC, ZARR_FORMAT,
    bytes_codec,
};

/// Chunking of a new array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayLayout {
    pub chunks: Vec<usize>,
    /// Shard shape; each dimension must be a multiple of the chunk size.
    pub shards: Option<Vec<usize>>,
    pub dimension_names: Option<Vec<String>>,
}

impl ArrayLayout {
    fn check(&self, shape: &[usize]) -> Result<()> {
        if self.chunks.len() != shape.len() || self.chunks.contains(&0) {
            return Err(Error::InvalidParameter(format!(
                "chunk shape {:?} does not fit array shape {:?}",
                self.chunks, shape
            )));
        }
        if let Some(shards) = &self.shards {
            let fits = shards.len() == shape.len()
                && shards
                    .iter()
                    .zip(&self.chunks)
                    .all(|(&s, &c)| s > 0 && s % c == 0);
            if !fits {
                return Err(Error::InvalidParameter(format!(
                    "shard shape {:?} is not a multiple of chunk shape {:?}",
                    shards, self.chunks
                )));
            }
        }
        if let Some(names) = &self.dimension_names {
            if names.len() != shape.len() {
                return Err(Error::InvalidParameter(format!(
                    "{} dimension names for {} dimensions",
                    names.len(),
                    shape.len()
                )));
            }
        }
        Ok(())
    }
}

/// An array created through [`ZarrZipWriter`].
#[derive(Debug, Clone)]
pub struct ArrayHandle {
    pub name: String,
    pub shape: Vec<usize>,
    pub layout: ArrayLayout,
}

/// Writes a Zarr v3 hierarchy of `float64` arrays into a ZIP archive.
///
/// Nodes and chunks become archive entries in the order they are written,
/// so creating every array with `write_data = false` before writing any data
/// keeps all metadata documents at the front of the archive.
pub struct ZarrZipWriter<W: Write> {
    zip: ZipWriter<W>,
    metadata_filename: String,
}

impl<W: Write> ZarrZipWriter<W> {
    pub fn new(out: W, options: WriterOptions, metadata_filename: &str) -> Result<Self> {
        Ok(Self {
            zip: ZipWriter::new(out, options)?,
            metadata_filename: metadata_filename.to_string(),
        })
    }

    /// Finish the archive and hand back the sink.
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }

    fn write_document(&mut self, key: &str, document: &impl serde::Serialize) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| Error::Format(format!("{key}: {e}")))?;
        self.zip.add_entry(key, &bytes)?;
        Ok(())
    }

    fn array_metadata(&self, shape: &[usize], layout: &ArrayLayout) -> ArrayMetadata {
        let to_u64 = |v: &[usize]| v.iter().map(|&d| d as u64).collect::<Vec<_>>();

        let (grid, codecs) = match &layout.shards {
            Some(shards) => (
                to_u64(shards),
                vec![NamedConfiguration::new(
                    SHARDING_CODEC,
                    json!({
                        "chunk_shape": to_u64(&layout.chunks),
                        "codecs": [bytes_codec()],
                        "index_codecs": [bytes_codec()],
                        "index_location": "end"
                    }),
                )],
            ),
            None => (to_u64(&layout.chunks), vec![bytes_codec()]),
        };

        ArrayMetadata {
            zarr_format: ZARR_FORMAT,
            node_type: NodeType::Array,
            shape: to_u64(shape),
            data_type: Value::String("float64".to_string()),
            chunk_grid: NamedConfiguration::new("regular", json!({"chunk_shape": grid})),
            chunk_key_encoding: NamedConfiguration::new("default", json!({"separator": "/"})),
            fill_value: json!(0.0),
            codecs,
            attributes: Map::new(),
            dimension_names: layout
                .dimension_names
                .as_ref()
                .map(|names| names.iter().cloned().map(Some).collect()),
        }
    }
}

impl<W: Write> StoreWriter for ZarrZipWriter<W> {
    type Array = ArrayHandle;

    fn create_group(&mut self, attributes: Map<String, Value>) -> Result<()> {
        let key = self.metadata_filename.clone();
        self.write_document(&key, &GroupMetadata::new(attributes))
    }

    fn create_array(
        &mut self,
        name: &str,
        data: &ArrayData,
        layout: &ArrayLayout,
        write_data: bool,
    ) -> Result<ArrayHandle> {
        layout.check(data.shape())?;

        let metadata = self.array_metadata(data.shape(), layout);
        let key = format!("{name}/{}", self.metadata_filename);
        self.write_document(&key, &metadata)?;

        let handle = ArrayHandle {
            name: name.to_string(),
            shape: data.shape().to_vec(),
            layout: layout.clone(),
        };
        if write_data {
            self.write_array_data(&handle, data)?;
        }
        Ok(handle)
    }

    fn write_array_data(&mut self, array: &ArrayHandle, data: &ArrayData) -> Result<()> {
        if data.shape() != array.shape.as_slice() {
            return Err(Error::InvalidParameter(format!(
                "{}: data shape {:?} differs from array shape {:?}",
                array.name,
                data.shape(),
                array.shape
            )));
        }

        let chunks = &array.layout.chunks;
        match &array.layout.shards {
            None => {
                for index in Indices::new(&grid_shape(&array.shape, chunks)) {
                    let origin = multiply(&index, chunks);
                    let bytes = encode_chunk(data, &origin, chunks)?;
                    self.zip.add_entry(&chunk_key(&array.name, &index), &bytes)?;
                }
            }
            Some(shards) => {
                let inner_grid: Vec<usize> =
                    shards.iter().zip(chunks).map(|(s, c)| s / c).collect();
                for shard_index in Indices::new(&grid_shape(&array.shape, shards)) {
                    let shard_origin = multiply(&shard_index, shards);
                    let bytes = encode_shard(data, &shard_origin, chunks, &inner_grid)?;
                    self.zip.add_entry(&chunk_key(&array.name, &shard_index), &bytes)?;
                }
            }
        }
        log::debug!("{}: wrote data for shape {:?}", array.name, array.shape);
        Ok(())
    }
}

fn grid_shape(shape: &[usize], unit: &[usize]) -> Vec<usize> {
    shape.iter().zip(unit).map(|(d, u)| d.div_ceil(*u)).collect()
}

fn multiply(index: &[usize], unit: &[usize]) -> Vec<usize> {
    index.iter().zip(unit).map(|(i, u)| i * u).collect()
}

/// Default chunk key encoding with `/` separator: `<array>/c/<i>/<j>/...`.
fn chunk_key(array: &str, index: &[usize]) -> String {
    let mut key = format!("{array}/c");
    for i in index {
        key.push('/');
        key.push_str(&i.to_string());
    }
    key
}

/// One chunk through the `bytes` codec; cells outside the array hold the fill value.
fn encode_chunk(data: &ArrayData, origin: &[usize], chunk: &[usize]) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(chunk.iter().product::<usize>() * 8);
    for local in Indices::new(chunk) {
        let global: Vec<usize> = local.iter().zip(origin).map(|(l, o)| l + o).collect();
        bytes.write_f64::<LittleEndian>(data.get(&global).unwrap_or(0.0))?;
    }
    Ok(bytes)
}

/// Inner chunks in C order followed by an `(offset, nbytes)` index per chunk.
fn encode_shard(
    data: &ArrayData,
    shard_origin: &[usize],
    chunk: &[usize],
    inner_grid: &[usize],
) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut index = Vec::new();
    for inner in Indices::new(inner_grid) {
        let origin: Vec<usize> = multiply(&inner, chunk)
            .iter()
            .zip(shard_origin)
            .map(|(a, b)| a + b)
            .collect();
        let encoded = encode_chunk(data, &origin, chunk)?;
        index.write_u64::<LittleEndian>(body.len() as u64)?;
        index.write_u64::<LittleEndian>(encoded.len() as u64)?;
        body.extend_from_slice(&encoded);
    }
    body.extend_from_slice(&index);
    Ok(body)
}
