//! Writing multiscale fixtures into `.ozx` archives.
//!
//! [`write_fixture`] turns one array into a pyramid, writes the root group
//! with its multiscales attributes, then every level's metadata, then all
//! chunk data, so that the metadata documents lead the archive.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::DEFAULT_METADATA_FILENAME;
use crate::error::{Error, Result};
use crate::ome::{MultiscaleBuilder, OME_VERSION, OmeAttributes};
use crate::pyramid::{ArrayData, Scaler};
use crate::store::{ArrayLayout, StoreWriter, ZarrZipWriter};
use crate::zip::WriterOptions;

/// Archive comment advertising the OME-Zarr version.
pub fn version_comment() -> Vec<u8> {
    format!("{{\"ome\":{{\"version\":\"{OME_VERSION}\"}}}}").into_bytes()
}

#[derive(Debug, Clone)]
pub struct FixtureOptions {
    /// One symbol per dimension, e.g. `tczyx`.
    pub dim_order: String,
    pub pixel_size: BTreeMap<char, f64>,
    pub translation: BTreeMap<char, f64>,
    /// Chunk size per dimension; clamped to the level shape.
    pub chunks: Vec<usize>,
    /// Bundle each level's chunks into shards.
    pub sharded: bool,
    pub scaler: Scaler,
    pub writer: WriterOptions,
    pub name: Option<String>,
    pub metadata_filename: String,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        Self {
            dim_order: "yx".to_string(),
            pixel_size: BTreeMap::from([('x', 1.0), ('y', 1.0)]),
            translation: BTreeMap::new(),
            chunks: vec![10, 10],
            sharded: true,
            scaler: Scaler::default(),
            writer: WriterOptions {
                comment: version_comment(),
                ..WriterOptions::default()
            },
            name: None,
            metadata_filename: DEFAULT_METADATA_FILENAME.to_string(),
        }
    }
}

impl FixtureOptions {
    fn layout(&self, shape: &[usize]) -> Result<ArrayLayout> {
        if self.chunks.len() != shape.len() {
            return Err(Error::InvalidParameter(format!(
                "{} chunk sizes for {} dimensions",
                self.chunks.len(),
                shape.len()
            )));
        }
        let chunks: Vec<usize> = self
            .chunks
            .iter()
            .zip(shape)
            .map(|(&c, &d)| c.clamp(1, d.max(1)))
            .collect();
        // One shard covers the whole level.
        let shards = self.sharded.then(|| {
            chunks
                .iter()
                .zip(shape)
                .map(|(&c, &d)| c * d.div_ceil(c))
                .collect()
        });
        Ok(ArrayLayout {
            chunks,
            shards,
            dimension_names: Some(self.dim_order.chars().map(String::from).collect()),
        })
    }
}

/// Write a pyramid of `data` as a zipped OME-Zarr hierarchy into `out`.
pub fn write_to<W: Write>(out: W, data: ArrayData, options: &FixtureOptions) -> Result<W> {
    if options.dim_order.chars().count() != data.ndim() {
        return Err(Error::InvalidParameter(format!(
            "dimension order {:?} does not match {} dimensions",
            options.dim_order,
            data.ndim()
        )));
    }

    let levels = options.scaler.pyramid(data);
    let mut builder = MultiscaleBuilder::new(&options.dim_order)
        .pixel_size(options.pixel_size.clone())
        .translation(options.translation.clone())
        .levels(options.scaler.max_level, options.scaler.downscale as f64);
    if let Some(name) = &options.name {
        builder = builder.name(name.clone());
    }
    let attributes = OmeAttributes::new(vec![builder.build()]).to_attributes();

    let mut store = ZarrZipWriter::new(out, options.writer.clone(), &options.metadata_filename)?;
    store.create_group(attributes)?;

    let mut arrays = Vec::with_capacity(levels.len());
    for (level, level_data) in levels.iter().enumerate() {
        let layout = options.layout(level_data.shape())?;
        arrays.push(store.create_array(&level.to_string(), level_data, &layout, false)?);
    }
    for (array, level_data) in arrays.iter().zip(&levels) {
        store.write_array_data(array, level_data)?;
    }

    store.finish()
}

/// Write a fixture to a new file at `path`.
pub fn write_fixture(path: &Path, data: ArrayData, options: &FixtureOptions) -> Result<()> {
    let file = File::create(path)?;
    let mut out = write_to(BufWriter::new(file), data, options)?;
    out.flush()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// A freshly written fixture, possibly living in a temporary directory that
/// is removed when this value is dropped.
#[derive(Debug)]
pub struct PreparedArchive {
    pub path: PathBuf,
    _temp_dir: Option<TempDir>,
}

/// Write a fixture for `uri` so it can be validated.
///
/// A bare file name is placed in a new temporary directory. Any other path
/// is written in place, unless something already exists there.
pub fn prepare(uri: &str, data: ArrayData, options: &FixtureOptions) -> Result<PreparedArchive> {
    let target = Path::new(uri);
    let bare = target
        .parent()
        .is_none_or(|parent| parent.as_os_str().is_empty());

    let (path, temp_dir) = if bare {
        let dir = tempfile::tempdir()?;
        (dir.path().join(target), Some(dir))
    } else if target.exists() {
        return Err(Error::FileExists(uri.to_string()));
    } else {
        (target.to_path_buf(), None)
    };

    write_fixture(&path, data, options)?;
    Ok(PreparedArchive {
        path,
        _temp_dir: temp_dir,
    })
}
