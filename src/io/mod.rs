mod http;
mod local;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for random access reading from an archive source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// File path or URL the data is read from
    fn location(&self) -> &str;

    /// Read the last `len` bytes of the source (fewer if the source is smaller).
    async fn read_tail(&self, len: u64) -> Result<Vec<u8>> {
        let len = len.min(self.size());
        let mut buf = vec![0u8; len as usize];
        let read = self.read_at(self.size() - len, &mut buf).await?;
        buf.truncate(read);
        Ok(buf)
    }
}

/// Whether a location string should be read over HTTP rather than from disk.
pub fn is_http_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
