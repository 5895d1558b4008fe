//! Archive fixtures shared by unit tests.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Crc;
use serde_json::{Value, json};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use crate::io::LocalFileReader;
use crate::zip::{WriterOptions, ZipArchive, ZipWriter};

pub(crate) fn write_archive(path: &Path, options: WriterOptions, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ZipWriter::new(file, options).unwrap();
    for (name, data) in entries {
        writer.add_entry(name, data).unwrap();
    }
    writer.finish().unwrap();
}

/// Write `entries` to `image.ozx` in a fresh temporary directory and open it.
pub(crate) async fn archive_with(
    entries: Vec<(&str, Vec<u8>)>,
) -> (TempDir, ZipArchive<LocalFileReader>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.ozx");
    let borrowed: Vec<(&str, &[u8])> = entries.iter().map(|(n, d)| (*n, d.as_slice())).collect();
    write_archive(&path, WriterOptions::default(), &borrowed);
    let reader = LocalFileReader::new(&path).unwrap();
    let archive = ZipArchive::open(Arc::new(reader)).await.unwrap();
    (dir, archive)
}

pub(crate) fn group_document(attributes: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "zarr_format": 3,
        "node_type": "group",
        "attributes": attributes
    }))
    .unwrap()
}

/// A single stored entry whose central directory record takes both sizes
/// from a ZIP64 extra field holding `declared_size`, with the local header
/// claimed at `lfh_offset`.
pub(crate) fn archive_declaring(
    name: &str,
    data: &[u8],
    declared_size: u64,
    lfh_offset: u32,
) -> Vec<u8> {
    let mut crc = Crc::new();
    crc.update(data);
    let mut out = Vec::new();

    out.write_all(b"PK\x03\x04").unwrap();
    // version needed, flags, method, time, date
    for value in [45u16, 0, 0, 0, 0] {
        out.write_u16::<LittleEndian>(value).unwrap();
    }
    out.write_u32::<LittleEndian>(crc.sum()).unwrap();
    out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
    out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_all(name.as_bytes()).unwrap();
    out.write_all(data).unwrap();

    let cd_offset = out.len() as u32;
    out.write_all(b"PK\x01\x02").unwrap();
    // version made by, version needed, flags, method, time, date
    for value in [45u16, 45, 0, 0, 0, 0] {
        out.write_u16::<LittleEndian>(value).unwrap();
    }
    out.write_u32::<LittleEndian>(crc.sum()).unwrap();
    out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
    out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(20).unwrap();
    // comment length, disk number, internal attributes
    for value in [0u16, 0, 0] {
        out.write_u16::<LittleEndian>(value).unwrap();
    }
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(lfh_offset).unwrap();
    out.write_all(name.as_bytes()).unwrap();
    out.write_u16::<LittleEndian>(0x0001).unwrap();
    out.write_u16::<LittleEndian>(16).unwrap();
    out.write_u64::<LittleEndian>(declared_size).unwrap();
    out.write_u64::<LittleEndian>(declared_size).unwrap();
    let cd_size = out.len() as u32 - cd_offset;

    out.write_all(b"PK\x05\x06").unwrap();
    for value in [0u16, 0, 1, 1] {
        out.write_u16::<LittleEndian>(value).unwrap();
    }
    out.write_u32::<LittleEndian>(cd_size).unwrap();
    out.write_u32::<LittleEndian>(cd_offset).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out
}
