//! # ozxcheck
//!
//! Conformance checks for zipped OME-Zarr archives (`.ozx`).
//!
//! An archive is read once through a random-access source (a local file or an
//! HTTP server answering Range requests). Its ZIP layer and the Zarr v3
//! hierarchy inside are captured as snapshots, and a fixed list of rules runs
//! on them: three requirements (one hierarchy at the archive root, no nesting
//! in another hierarchy, no multi-part archives) and six recommendations
//! (ZIP64, no ZIP compression, sharding, metadata entries first, a version
//! comment, the `.ozx` extension).
//!
//! The crate can also write conformant fixtures: a multiscale pyramid of an
//! in-memory array stored as `float64` Zarr arrays in a new archive.
//!
//! ## Example
//!
//! ```no_run
//! use ozxcheck::{Validator, ValidatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> ozxcheck::Result<()> {
//!     let validator = Validator::new(ValidatorConfig::default())?;
//!     let report = validator
//!         .validate_location("https://example.com/image.ozx")
//!         .await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod fixture;
pub mod io;
pub mod ome;
pub mod pyramid;
pub mod report;
pub mod rules;
pub mod snapshot;
pub mod store;
mod validator;
pub mod zip;

#[cfg(test)]
mod testing;

pub use cli::Cli;
pub use config::ValidatorConfig;
pub use error::{Error, Result, SchemaError};
pub use fixture::{FixtureOptions, PreparedArchive, prepare, write_fixture};
pub use io::{HttpRangeReader, LocalFileReader, ReadAt};
pub use report::{Outcome, RuleClass, RuleReport, ValidationReport};
pub use rules::{LocatorScan, RuleEngine};
pub use snapshot::{ArchiveSnapshot, StoreSnapshot};
pub use validator::Validator;
