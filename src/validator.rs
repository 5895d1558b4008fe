use std::path::Path;
use std::sync::Arc;

use crate::config::ValidatorConfig;
use crate::error::{Error, Result};
use crate::fixture::{self, FixtureOptions};
use crate::io::{HttpRangeReader, LocalFileReader, ReadAt, is_http_url};
use crate::ome::{OmeValidator, SchemaValidator};
use crate::pyramid::ArrayData;
use crate::report::ValidationReport;
use crate::rules::{LocatorScan, RuleEngine};
use crate::snapshot::{ArchiveSnapshot, StoreSnapshot};
use crate::store::ZarrStore;
use crate::zip::{ArchiveReader, ZipArchive, scanner};

/// Opens archives, captures their snapshots and runs the rules on them.
pub struct Validator {
    config: ValidatorConfig,
    schema: Box<dyn SchemaValidator>,
    engine: RuleEngine,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        let engine = RuleEngine::new(&config)?;
        Ok(Self {
            config,
            schema: Box::new(OmeValidator),
            engine,
        })
    }

    /// Replace the bundled OME attribute checks.
    pub fn with_schema_validator(mut self, schema: Box<dyn SchemaValidator>) -> Self {
        self.schema = schema;
        self
    }

    /// Validate an archive that is already open.
    pub async fn validate_archive<A: ArchiveReader + ?Sized>(
        &self,
        archive: &A,
        scan: LocatorScan,
    ) -> Result<ValidationReport> {
        let store = ZarrStore::open(archive, &self.config.metadata_filename).await?;
        let archive_snapshot = ArchiveSnapshot::capture(archive);
        let store_snapshot = StoreSnapshot::capture(&store, self.schema.as_ref());
        if let Err(e) = &store_snapshot.ome {
            log::debug!("{}: OME metadata rejected: {e}", archive.location());
        }

        let report = self
            .engine
            .evaluate(&archive_snapshot, &store_snapshot, &scan);
        log::info!(
            "{}: {}",
            report.location,
            if report.is_conformant() {
                "conformant"
            } else {
                "not conformant"
            }
        );
        Ok(report)
    }

    /// Open the archive behind `reader`, scan its tail for the ZIP64 locator
    /// and validate it.
    pub async fn validate_reader<R: ReadAt + 'static>(
        &self,
        reader: Arc<R>,
    ) -> Result<ValidationReport> {
        let archive = ZipArchive::open(reader.clone()).await?;
        let scan = match scanner::scan_reader(reader.as_ref(), self.config.zip64_window).await {
            Ok(true) => LocatorScan::Found,
            Ok(false) => LocatorScan::Missing,
            Err(e) => {
                log::warn!("{}: ZIP64 locator scan failed: {e}", reader.location());
                LocatorScan::Unavailable(e.to_string())
            }
        };
        self.validate_archive(&archive, scan).await
    }

    pub async fn validate_path(&self, path: &Path) -> Result<ValidationReport> {
        let reader = LocalFileReader::new(path)?;
        self.validate_reader(Arc::new(reader)).await
    }

    /// Validate a remote archive through HTTP Range requests.
    pub async fn validate_url(&self, url: &str) -> Result<ValidationReport> {
        let reader = HttpRangeReader::new(url.to_string())
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        let reader = Arc::new(reader);
        let report = self.validate_reader(reader.clone()).await?;
        log::info!("{url}: {} bytes transferred", reader.transferred_bytes());
        Ok(report)
    }

    /// Validate a local path or an `http(s)://` URL.
    pub async fn validate_location(&self, location: &str) -> Result<ValidationReport> {
        if is_http_url(location) {
            self.validate_url(location).await
        } else {
            self.validate_path(Path::new(location)).await
        }
    }

    /// Write `data` as a fixture at `uri` (see [`fixture::prepare`]) and
    /// validate the result. A temporary fixture is removed before returning.
    pub async fn generate_and_validate(
        &self,
        uri: &str,
        data: ArrayData,
        options: &FixtureOptions,
    ) -> Result<ValidationReport> {
        if options.metadata_filename != self.config.metadata_filename {
            return Err(Error::InvalidParameter(format!(
                "fixture metadata file {:?} differs from validated {:?}",
                options.metadata_filename, self.config.metadata_filename
            )));
        }
        let prepared = fixture::prepare(uri, data, options)?;
        self.validate_path(&prepared.path).await
    }
}
