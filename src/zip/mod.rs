//! ZIP container access.
//!
//! This module reads and writes the ZIP layer of `.ozx` archives without any
//! knowledge of the Zarr hierarchy stored inside.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`archive`]: The [`ArchiveReader`] view used by validation
//! - [`writer`]: Sequential writer used to produce archives
//! - [`scanner`]: Trailing-window search for the ZIP64 locator signature
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and (possibly compressed) data for each entry
//! 2. Central Directory with metadata for all entries, in entry order
//! 3. Optional ZIP64 End of Central Directory record and locator
//! 4. End of Central Directory (EOCD) record, followed by the archive comment
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - STORED and DEFLATE only

mod archive;
mod parser;
pub mod scanner;
mod structures;
mod writer;

pub use archive::{ArchiveReader, ZipArchive};
pub use parser::{CentralDirectory, ZipParser};
pub use structures::*;
pub use writer::{Compression, WriterOptions, ZipWriter};
