use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

use anyhow::{Result, bail};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMethod::Stored => write!(f, "STORE"),
            CompressionMethod::Deflate => write!(f, "DEFLATE"),
            CompressionMethod::Unknown(v) => write!(f, "method {v}"),
        }
    }
}

/// DEFLATE compression option, stored in general purpose flag bits 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeflateLevel {
    Normal,
    Maximum,
    Fast,
    SuperFast,
}

impl DeflateLevel {
    pub fn from_flags(flags: u16) -> Self {
        match (flags >> 1) & 0b11 {
            0b01 => DeflateLevel::Maximum,
            0b10 => DeflateLevel::Fast,
            0b11 => DeflateLevel::SuperFast,
            _ => DeflateLevel::Normal,
        }
    }

    /// Option bits for a zlib-style level (0-9).
    pub fn from_level(level: u32) -> Self {
        match level {
            8.. => DeflateLevel::Maximum,
            2 => DeflateLevel::Fast,
            0 | 1 => DeflateLevel::SuperFast,
            _ => DeflateLevel::Normal,
        }
    }

    pub fn as_flags(&self) -> u16 {
        let bits = match self {
            DeflateLevel::Normal => 0b00,
            DeflateLevel::Maximum => 0b01,
            DeflateLevel::Fast => 0b10,
            DeflateLevel::SuperFast => 0b11,
        };
        bits << 1
    }
}

impl std::fmt::Display for DeflateLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeflateLevel::Normal => "normal",
            DeflateLevel::Maximum => "maximum",
            DeflateLevel::Fast => "fast",
            DeflateLevel::SuperFast => "super fast",
        };
        f.write_str(name)
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid End of Central Directory");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Write the record without the trailing comment bytes.
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(Self::SIGNATURE)?;
        out.write_u16::<LittleEndian>(self.disk_number)?;
        out.write_u16::<LittleEndian>(self.disk_with_cd)?;
        out.write_u16::<LittleEndian>(self.disk_entries)?;
        out.write_u16::<LittleEndian>(self.total_entries)?;
        out.write_u32::<LittleEndian>(self.cd_size)?;
        out.write_u32::<LittleEndian>(self.cd_offset)?;
        out.write_u16::<LittleEndian>(self.comment_len)
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 format");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(Self::SIGNATURE)?;
        out.write_u32::<LittleEndian>(self.disk_with_eocd64)?;
        out.write_u64::<LittleEndian>(self.eocd64_offset)?;
        out.write_u32::<LittleEndian>(self.total_disks)
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 format");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>()?,
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            disk_with_cd: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(Self::SIGNATURE)?;
        out.write_u64::<LittleEndian>(self.eocd64_size)?;
        out.write_u16::<LittleEndian>(self.version_made_by)?;
        out.write_u16::<LittleEndian>(self.version_needed)?;
        out.write_u32::<LittleEndian>(self.disk_number)?;
        out.write_u32::<LittleEndian>(self.disk_with_cd)?;
        out.write_u64::<LittleEndian>(self.disk_entries)?;
        out.write_u64::<LittleEndian>(self.total_entries)?;
        out.write_u64::<LittleEndian>(self.cd_size)?;
        out.write_u64::<LittleEndian>(self.cd_offset)
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Extra field id of the ZIP64 extended information block
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// General purpose flag: file name and comment are UTF-8
pub const FLAG_UTF8: u16 = 1 << 11;

/// Parsed ZIP file entry information
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
}

impl ZipFileEntry {
    /// Compression option recorded for DEFLATE entries; `None` for any other method.
    pub fn deflate_level(&self) -> Option<DeflateLevel> {
        match self.compression_method {
            CompressionMethod::Deflate => Some(DeflateLevel::from_flags(self.flags)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eocd_survives_write_and_parse() {
        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: 3,
            total_entries: 3,
            cd_size: 150,
            cd_offset: 4096,
            comment_len: 24,
        };
        let mut buf = Vec::new();
        eocd.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), EndOfCentralDirectory::SIZE);
        assert_eq!(EndOfCentralDirectory::from_bytes(&buf).unwrap(), eocd);
        assert!(!eocd.is_zip64());
    }

    #[test]
    fn locator_rejects_wrong_signature() {
        let mut buf = Vec::new();
        Zip64EOCDLocator {
            disk_with_eocd64: 0,
            eocd64_offset: 77,
            total_disks: 1,
        }
        .write_to(&mut buf)
        .unwrap();
        assert_eq!(buf.len(), Zip64EOCDLocator::SIZE);
        assert_eq!(Zip64EOCDLocator::from_bytes(&buf).unwrap().eocd64_offset, 77);

        buf[2] = 0x05;
        assert!(Zip64EOCDLocator::from_bytes(&buf).is_err());
    }

    #[test]
    fn deflate_level_flag_bits() {
        assert_eq!(DeflateLevel::from_flags(0), DeflateLevel::Normal);
        assert_eq!(DeflateLevel::from_flags(0b010), DeflateLevel::Maximum);
        assert_eq!(DeflateLevel::from_flags(0b100 | FLAG_UTF8), DeflateLevel::Fast);
        assert_eq!(DeflateLevel::from_flags(DeflateLevel::SuperFast.as_flags()), DeflateLevel::SuperFast);
        assert_eq!(DeflateLevel::from_level(9), DeflateLevel::Maximum);
        assert_eq!(DeflateLevel::from_level(6), DeflateLevel::Normal);
    }
}
