use async_trait::async_trait;
use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::parser::{CentralDirectory, ZipParser};
use super::structures::{CompressionMethod, DeflateLevel, ZipFileEntry};

/// Upper bound of the DEFLATE expansion ratio; caps the size hint of an entry.
const MAX_DEFLATE_RATIO: u64 = 1032;

/// Read access to a ZIP container, independent of any store abstraction.
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    /// File path or URL of the container
    fn location(&self) -> &str;

    /// Container size in bytes
    fn size(&self) -> u64;

    /// Entry names in central directory order
    fn entry_names(&self) -> Vec<&str>;

    /// Raw archive comment
    fn comment(&self) -> &[u8];

    /// STORE when every entry is stored, otherwise the first other method found.
    fn compression_method(&self) -> CompressionMethod;

    /// DEFLATE option of the first compressed entry, if any.
    fn compression_level(&self) -> Option<DeflateLevel>;

    fn contains(&self, name: &str) -> bool;

    /// Read and decompress one entry.
    async fn read_entry(&self, name: &str) -> Result<Vec<u8>>;
}

/// ZIP container opened through a [`ReadAt`] source.
///
/// The central directory is read once on open; entry data is fetched on demand.
pub struct ZipArchive<R: ReadAt> {
    parser: ZipParser<R>,
    directory: CentralDirectory,
    index: HashMap<String, usize>,
}

impl<R: ReadAt> ZipArchive<R> {
    /// Open a container, failing with [`Error::Format`] when it is not a usable ZIP.
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let location = reader.location().to_string();
        let parser = ZipParser::new(reader);
        let directory = parser
            .read_central_directory()
            .await
            .map_err(|e| Error::Format(format!("{location}: {e}")))?;

        if directory.entries.is_empty() {
            return Err(Error::Format(format!("{location}: archive has no entries")));
        }

        let mut index = HashMap::with_capacity(directory.entries.len());
        for (i, entry) in directory.entries.iter().enumerate() {
            index.entry(entry.file_name.clone()).or_insert(i);
        }

        log::debug!(
            "{location}: {} entries, {} comment bytes, zip64 end records: {}",
            directory.entries.len(),
            directory.comment.len(),
            directory.zip64
        );

        Ok(Self {
            parser,
            directory,
            index,
        })
    }

    /// Whether the end of central directory record pointed at ZIP64 records.
    pub fn uses_zip64_records(&self) -> bool {
        self.directory.zip64
    }

    async fn read_raw(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let data_offset = self
            .parser
            .get_data_offset(entry)
            .await
            .map_err(Error::format)?;
        let size = self.parser.reader().size();
        let data_end = data_offset.checked_add(entry.compressed_size);
        if data_end.is_none_or(|end| end > size) {
            return Err(Error::Format(format!(
                "{}: {} bytes of entry data at offset {} exceed the {} byte archive",
                entry.file_name, entry.compressed_size, data_offset, size
            )));
        }
        let mut buf = vec![0u8; entry.compressed_size as usize];
        let read = self
            .parser
            .reader()
            .read_at(data_offset, &mut buf)
            .await
            .map_err(Error::format)?;
        if read != buf.len() {
            return Err(Error::Format(format!(
                "{}: truncated entry data ({} of {} bytes)",
                entry.file_name,
                read,
                buf.len()
            )));
        }
        Ok(buf)
    }
}

#[async_trait]
impl<R: ReadAt> ArchiveReader for ZipArchive<R> {
    fn location(&self) -> &str {
        self.parser.reader().location()
    }

    fn size(&self) -> u64 {
        self.parser.reader().size()
    }

    fn entry_names(&self) -> Vec<&str> {
        self.directory
            .entries
            .iter()
            .map(|e| e.file_name.as_str())
            .collect()
    }

    fn comment(&self) -> &[u8] {
        &self.directory.comment
    }

    fn compression_method(&self) -> CompressionMethod {
        self.directory
            .entries
            .iter()
            .map(|e| e.compression_method)
            .find(|m| *m != CompressionMethod::Stored)
            .unwrap_or(CompressionMethod::Stored)
    }

    fn compression_level(&self) -> Option<DeflateLevel> {
        self.directory.entries.iter().find_map(|e| e.deflate_level())
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    async fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .index
            .get(name)
            .map(|&i| &self.directory.entries[i])
            .ok_or_else(|| Error::Format(format!("entry not found: {name}")))?;

        let raw = self.read_raw(entry).await?;
        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let capacity = entry
                    .uncompressed_size
                    .min(raw.len() as u64 * MAX_DEFLATE_RATIO);
                let mut data = Vec::with_capacity(capacity as usize);
                DeflateDecoder::new(raw.as_slice())
                    .read_to_end(&mut data)
                    .map_err(|e| Error::Format(format!("{name}: {e}")))?;
                data
            }
            CompressionMethod::Unknown(method) => {
                return Err(Error::Format(format!(
                    "{name}: unsupported compression method {method}"
                )));
            }
        };

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            return Err(Error::Format(format!("{name}: CRC-32 mismatch")));
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::LocalFileReader;
    use crate::testing::{archive_declaring, write_archive};
    use crate::zip::{Compression, WriterOptions};
    use std::io::Write;
    use std::path::Path;

    async fn open(path: &Path) -> Result<ZipArchive<LocalFileReader>> {
        ZipArchive::open(Arc::new(LocalFileReader::new(path)?)).await
    }

    #[tokio::test]
    async fn lists_entries_in_central_directory_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.ozx");
        let options = WriterOptions {
            comment: b"{\"ome\":{\"version\":\"0.5\"}}".to_vec(),
            ..WriterOptions::default()
        };
        write_archive(
            &path,
            options,
            &[("zarr.json", b"{}"), ("0/zarr.json", b"{}"), ("0/c/0/0", b"\x01\x02\x03")],
        );

        let archive = open(&path).await.unwrap();
        assert_eq!(archive.entry_names(), vec!["zarr.json", "0/zarr.json", "0/c/0/0"]);
        assert_eq!(archive.comment(), b"{\"ome\":{\"version\":\"0.5\"}}");
        assert_eq!(archive.compression_method(), CompressionMethod::Stored);
        assert_eq!(archive.compression_level(), None);
        assert!(archive.uses_zip64_records());
        assert_eq!(archive.read_entry("0/c/0/0").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn inflates_deflated_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deflated.ozx");
        let options = WriterOptions {
            compression: Compression::Deflate(9),
            zip64: false,
            ..WriterOptions::default()
        };
        let document = br#"{"zarr_format":3,"node_type":"group","attributes":{}}"#;
        write_archive(&path, options, &[("zarr.json", document)]);

        let archive = open(&path).await.unwrap();
        assert!(!archive.uses_zip64_records());
        assert_eq!(archive.compression_method(), CompressionMethod::Deflate);
        assert_eq!(archive.compression_level(), Some(DeflateLevel::Maximum));
        assert_eq!(archive.read_entry("zarr.json").await.unwrap(), document.to_vec());
    }

    #[tokio::test]
    async fn rejects_files_that_are_not_zip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a zip archive, just some text").unwrap();
        assert!(matches!(open(file.path()).await, Err(Error::Format(_))));
    }

    #[tokio::test]
    async fn rejects_empty_archives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.ozx");
        write_archive(&path, WriterOptions::default(), &[]);
        assert!(matches!(open(&path).await, Err(Error::Format(_))));
    }

    #[tokio::test]
    async fn missing_entry_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.ozx");
        write_archive(&path, WriterOptions::default(), &[("zarr.json", b"{}")]);
        let archive = open(&path).await.unwrap();
        assert!(!archive.contains("0/zarr.json"));
        assert!(matches!(
            archive.read_entry("0/zarr.json").await,
            Err(Error::Format(_))
        ));
    }

    async fn open_bytes(
        dir: &tempfile::TempDir,
        bytes: &[u8],
    ) -> Result<ZipArchive<LocalFileReader>> {
        let path = dir.path().join("crafted.ozx");
        std::fs::write(&path, bytes).unwrap();
        open(&path).await
    }

    #[tokio::test]
    async fn reads_sizes_from_zip64_extra_field() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = archive_declaring("zarr.json", b"{}", 2, 0);
        let archive = open_bytes(&dir, &bytes).await.unwrap();
        assert_eq!(archive.read_entry("zarr.json").await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn declared_size_beyond_the_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = archive_declaring("zarr.json", b"{}", 1 << 62, 0);
        let archive = open_bytes(&dir, &bytes).await.unwrap();
        let err = archive.read_entry("zarr.json").await.unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{err}");
        assert!(err.to_string().contains("exceed"));
    }

    #[tokio::test]
    async fn local_header_outside_the_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = archive_declaring("zarr.json", b"{}", 2, 1_000_000);
        assert!(matches!(open_bytes(&dir, &bytes).await, Err(Error::Format(_))));
    }
}
