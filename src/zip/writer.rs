//! Minimal streaming ZIP writer.
//!
//! Entries are written in the order they are added, and the central
//! directory repeats that order. Every entry is buffered in memory before
//! its local header is written, so sizes and CRC are always known up front
//! and no data descriptors are needed.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Crc;
use flate2::write::DeflateEncoder;
use std::borrow::Cow;
use std::io::{self, Write};

use super::structures::*;

/// DOS date for 1980-01-01, so archives are reproducible byte for byte.
const DOS_DATE: u16 = (1 << 5) | 1;
const DOS_TIME: u16 = 0;

/// Regular file, rw-r--r--
const UNIX_FILE_ATTRS: u32 = 0o100644 << 16;
const VERSION_MADE_BY_UNIX: u16 = 3 << 8;

const VERSION_STORED: u16 = 10;
const VERSION_DEFLATE: u16 = 20;
const VERSION_ZIP64: u16 = 45;

/// How entry data is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Stored,
    /// DEFLATE with a zlib-style level (0-9)
    Deflate(u32),
}

#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub compression: Compression,
    /// Emit ZIP64 end records even when the archive does not need them.
    pub zip64: bool,
    pub comment: Vec<u8>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Stored,
            zip64: true,
            comment: Vec::new(),
        }
    }
}

struct WrittenEntry {
    name: String,
    flags: u16,
    method: CompressionMethod,
    crc32: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    lfh_offset: u64,
}

impl WrittenEntry {
    fn needs_zip64(&self) -> bool {
        self.compressed_size >= 0xFFFFFFFF
            || self.uncompressed_size >= 0xFFFFFFFF
            || self.lfh_offset >= 0xFFFFFFFF
    }

    fn version_needed(&self) -> u16 {
        if self.needs_zip64() {
            VERSION_ZIP64
        } else if self.method == CompressionMethod::Deflate {
            VERSION_DEFLATE
        } else {
            VERSION_STORED
        }
    }
}

/// ZIP writer over any byte sink.
pub struct ZipWriter<W: Write> {
    out: W,
    options: WriterOptions,
    entries: Vec<WrittenEntry>,
    offset: u64,
}

impl<W: Write> ZipWriter<W> {
    pub fn new(out: W, options: WriterOptions) -> io::Result<Self> {
        if options.comment.len() > u16::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("archive comment is {} bytes, at most 65535 allowed", options.comment.len()),
            ));
        }
        Ok(Self {
            out,
            options,
            entries: Vec::new(),
            offset: 0,
        })
    }

    /// Number of entries written so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append one entry with its data.
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        if name.len() > u16::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("entry name is {} bytes, at most 65535 allowed", name.len()),
            ));
        }
        let mut crc = Crc::new();
        crc.update(data);

        let (method, flags, payload): (_, _, Cow<'_, [u8]>) = match self.options.compression {
            Compression::Stored => (CompressionMethod::Stored, FLAG_UTF8, Cow::Borrowed(data)),
            Compression::Deflate(level) => {
                let mut encoder =
                    DeflateEncoder::new(Vec::new(), flate2::Compression::new(level.min(9)));
                encoder.write_all(data)?;
                let flags = FLAG_UTF8 | DeflateLevel::from_level(level).as_flags();
                (CompressionMethod::Deflate, flags, Cow::Owned(encoder.finish()?))
            }
        };

        let entry = WrittenEntry {
            name: name.to_string(),
            flags,
            method,
            crc32: crc.sum(),
            compressed_size: payload.len() as u64,
            uncompressed_size: data.len() as u64,
            lfh_offset: self.offset,
        };

        let sizes_overflow =
            entry.compressed_size >= 0xFFFFFFFF || entry.uncompressed_size >= 0xFFFFFFFF;
        let mut extra = Vec::new();
        if sizes_overflow {
            extra.write_u16::<LittleEndian>(ZIP64_EXTRA_ID)?;
            extra.write_u16::<LittleEndian>(16)?;
            extra.write_u64::<LittleEndian>(entry.uncompressed_size)?;
            extra.write_u64::<LittleEndian>(entry.compressed_size)?;
        }

        let mut header = Vec::with_capacity(LFH_SIZE + name.len() + extra.len());
        header.write_all(LFH_SIGNATURE)?;
        header.write_u16::<LittleEndian>(entry.version_needed())?;
        header.write_u16::<LittleEndian>(entry.flags)?;
        header.write_u16::<LittleEndian>(entry.method.as_u16())?;
        header.write_u16::<LittleEndian>(DOS_TIME)?;
        header.write_u16::<LittleEndian>(DOS_DATE)?;
        header.write_u32::<LittleEndian>(entry.crc32)?;
        header.write_u32::<LittleEndian>(saturate(entry.compressed_size, sizes_overflow))?;
        header.write_u32::<LittleEndian>(saturate(entry.uncompressed_size, sizes_overflow))?;
        header.write_u16::<LittleEndian>(name.len() as u16)?;
        header.write_u16::<LittleEndian>(extra.len() as u16)?;
        header.write_all(name.as_bytes())?;
        header.write_all(&extra)?;

        self.write(&header)?;
        self.write(&payload)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Write the central directory and end records, returning the sink.
    pub fn finish(mut self) -> io::Result<W> {
        let cd_offset = self.offset;
        let entries = std::mem::take(&mut self.entries);
        for entry in &entries {
            let record = central_directory_record(entry)?;
            self.write(&record)?;
        }
        let cd_size = self.offset - cd_offset;
        let total = entries.len() as u64;

        let zip64 = self.options.zip64
            || total >= 0xFFFF
            || cd_size >= 0xFFFFFFFF
            || cd_offset >= 0xFFFFFFFF;

        let mut tail = Vec::new();
        if zip64 {
            let eocd64_offset = self.offset;
            Zip64EOCD {
                // Size of the remaining record, excluding the leading 12 bytes
                eocd64_size: (Zip64EOCD::MIN_SIZE - 12) as u64,
                version_made_by: VERSION_MADE_BY_UNIX | VERSION_ZIP64,
                version_needed: VERSION_ZIP64,
                disk_number: 0,
                disk_with_cd: 0,
                disk_entries: total,
                total_entries: total,
                cd_size,
                cd_offset,
            }
            .write_to(&mut tail)?;
            Zip64EOCDLocator {
                disk_with_eocd64: 0,
                eocd64_offset,
                total_disks: 1,
            }
            .write_to(&mut tail)?;
        }

        let entry_count = if zip64 { 0xFFFF } else { total as u16 };
        EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: entry_count,
            total_entries: entry_count,
            cd_size: saturate(cd_size, zip64),
            cd_offset: saturate(cd_offset, zip64),
            comment_len: self.options.comment.len() as u16,
        }
        .write_to(&mut tail)?;
        tail.extend_from_slice(&self.options.comment);

        self.write(&tail)?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }
}

fn saturate(value: u64, force: bool) -> u32 {
    if force || value >= 0xFFFFFFFF {
        0xFFFFFFFF
    } else {
        value as u32
    }
}

fn central_directory_record(entry: &WrittenEntry) -> io::Result<Vec<u8>> {
    let big_usize = entry.uncompressed_size >= 0xFFFFFFFF;
    let big_csize = entry.compressed_size >= 0xFFFFFFFF;
    let big_offset = entry.lfh_offset >= 0xFFFFFFFF;

    // Field order is fixed by the format: uncompressed, compressed, offset
    let mut values = Vec::new();
    if big_usize {
        values.push(entry.uncompressed_size);
    }
    if big_csize {
        values.push(entry.compressed_size);
    }
    if big_offset {
        values.push(entry.lfh_offset);
    }
    let mut extra = Vec::new();
    if !values.is_empty() {
        extra.write_u16::<LittleEndian>(ZIP64_EXTRA_ID)?;
        extra.write_u16::<LittleEndian>((values.len() * 8) as u16)?;
        for value in values {
            extra.write_u64::<LittleEndian>(value)?;
        }
    }

    let mut record = Vec::with_capacity(CDFH_MIN_SIZE + entry.name.len() + extra.len());
    record.write_all(CDFH_SIGNATURE)?;
    record.write_u16::<LittleEndian>(VERSION_MADE_BY_UNIX | VERSION_ZIP64)?;
    record.write_u16::<LittleEndian>(entry.version_needed())?;
    record.write_u16::<LittleEndian>(entry.flags)?;
    record.write_u16::<LittleEndian>(entry.method.as_u16())?;
    record.write_u16::<LittleEndian>(DOS_TIME)?;
    record.write_u16::<LittleEndian>(DOS_DATE)?;
    record.write_u32::<LittleEndian>(entry.crc32)?;
    record.write_u32::<LittleEndian>(saturate(entry.compressed_size, false))?;
    record.write_u32::<LittleEndian>(saturate(entry.uncompressed_size, false))?;
    record.write_u16::<LittleEndian>(entry.name.len() as u16)?;
    record.write_u16::<LittleEndian>(extra.len() as u16)?;
    record.write_u16::<LittleEndian>(0)?; // file comment length
    record.write_u16::<LittleEndian>(0)?; // disk number start
    record.write_u16::<LittleEndian>(0)?; // internal attributes
    record.write_u32::<LittleEndian>(UNIX_FILE_ATTRS)?;
    record.write_u32::<LittleEndian>(saturate(entry.lfh_offset, false))?;
    record.write_all(entry.name.as_bytes())?;
    record.write_all(&extra)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ends_with_comment(bytes: &[u8], comment: &[u8]) -> bool {
        let eocd_start = bytes.len() - comment.len() - EndOfCentralDirectory::SIZE;
        &bytes[eocd_start..eocd_start + 4] == EndOfCentralDirectory::SIGNATURE
            && bytes.ends_with(comment)
    }

    #[test]
    fn zip64_records_precede_eocd() {
        let mut writer = ZipWriter::new(Vec::new(), WriterOptions::default()).unwrap();
        writer.add_entry("zarr.json", b"{}").unwrap();
        let bytes = writer.finish().unwrap();

        let eocd_start = bytes.len() - EndOfCentralDirectory::SIZE;
        let locator_start = eocd_start - Zip64EOCDLocator::SIZE;
        assert_eq!(&bytes[locator_start..locator_start + 4], Zip64EOCDLocator::SIGNATURE);
        let eocd = EndOfCentralDirectory::from_bytes(&bytes[eocd_start..]).unwrap();
        assert!(eocd.is_zip64());
    }

    #[test]
    fn plain_archive_has_no_locator() {
        let options = WriterOptions {
            zip64: false,
            comment: b"{\"ome\":{\"version\":\"0.5\"}}".to_vec(),
            ..WriterOptions::default()
        };
        let comment = options.comment.clone();
        let mut writer = ZipWriter::new(Vec::new(), options).unwrap();
        writer.add_entry("zarr.json", b"{}").unwrap();
        writer.add_entry("0/zarr.json", b"{}").unwrap();
        assert_eq!(writer.len(), 2);
        let bytes = writer.finish().unwrap();

        assert!(ends_with_comment(&bytes, &comment));
        assert!(!bytes.windows(4).any(|w| w == Zip64EOCDLocator::SIGNATURE));
    }

    #[test]
    fn rejects_oversized_entry_name() {
        let mut writer = ZipWriter::new(Vec::new(), WriterOptions::default()).unwrap();
        let name = "a".repeat(70_000);
        let err = writer.add_entry(&name, b"{}").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(writer.is_empty());
    }

    #[test]
    fn rejects_oversized_comment() {
        let options = WriterOptions {
            comment: vec![b'x'; 70_000],
            ..WriterOptions::default()
        };
        assert!(ZipWriter::new(Vec::new(), options).is_err());
    }
}
