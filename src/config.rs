/// Name of the per-node metadata document in a Zarr v3 hierarchy.
pub const DEFAULT_METADATA_FILENAME: &str = "zarr.json";

/// File extension a zipped OME-Zarr archive should carry.
pub const DEFAULT_EXTENSION: &str = ".ozx";

/// Marker that identifies a directory as part of a Zarr hierarchy (`.zarr`, `.zar`).
pub const DEFAULT_NESTING_MARKER: &str = ".zar";

/// Size of the trailing window searched for the ZIP64 locator.
pub const DEFAULT_ZIP64_WINDOW: u64 = 1024;

/// Settings shared by the introspector and the rule engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub metadata_filename: String,
    pub extension: String,
    pub nesting_marker: String,
    pub zip64_window: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            metadata_filename: DEFAULT_METADATA_FILENAME.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            nesting_marker: DEFAULT_NESTING_MARKER.to_string(),
            zip64_window: DEFAULT_ZIP64_WINDOW,
        }
    }
}
