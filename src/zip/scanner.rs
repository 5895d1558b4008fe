//! ZIP64 end of central directory locator detection.
//!
//! The locator (`PK\x06\x07`) normally sits 20 bytes before the EOCD record,
//! which itself may be followed by up to 64 KiB of archive comment. This
//! scanner only looks at a fixed trailing window (1 KiB by default), so an
//! archive whose comment pushes the locator further back is reported as not
//! using ZIP64. The approximation is intentional: conformance reports depend
//! on it, and [`ZipParser::find_eocd`](super::ZipParser::find_eocd) is the
//! place to build an exact check from.

use std::path::Path;

use crate::config::DEFAULT_ZIP64_WINDOW;
use crate::io::{LocalFileReader, ReadAt};

use super::structures::Zip64EOCDLocator;

/// Whether the locator signature occurs anywhere in `window`.
pub fn contains_locator(window: &[u8]) -> bool {
    window
        .windows(Zip64EOCDLocator::SIGNATURE.len())
        .any(|w| w == Zip64EOCDLocator::SIGNATURE)
}

/// Whether the locator signature occurs in the last `min(len, window)` bytes of `data`.
pub fn tail_contains_locator(data: &[u8], window: u64) -> bool {
    let start = data.len().saturating_sub(window.min(usize::MAX as u64) as usize);
    contains_locator(&data[start..])
}

/// Scan a local file's trailing 1 KiB for the locator signature.
pub async fn scan_path(path: &Path) -> anyhow::Result<bool> {
    scan_path_with_window(path, DEFAULT_ZIP64_WINDOW).await
}

pub async fn scan_path_with_window(path: &Path, window: u64) -> anyhow::Result<bool> {
    let reader = LocalFileReader::new(path)?;
    scan_reader(&reader, window).await
}

/// Scan the trailing window of any random-access source.
pub async fn scan_reader<R: ReadAt + ?Sized>(reader: &R, window: u64) -> anyhow::Result<bool> {
    let tail = reader.read_tail(window).await?;
    Ok(contains_locator(&tail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SIG: &[u8] = b"PK\x06\x07";

    fn buffer_with_signature_at_distance(len: usize, from_end: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        let start = len - from_end;
        data[start..start + SIG.len()].copy_from_slice(SIG);
        data
    }

    #[test]
    fn finds_signature_inside_window() {
        let data = buffer_with_signature_at_distance(4096, 1024);
        assert!(tail_contains_locator(&data, 1024));

        let data = buffer_with_signature_at_distance(4096, 42);
        assert!(tail_contains_locator(&data, 1024));
    }

    #[test]
    fn misses_signature_just_outside_window() {
        // Known limitation: a locator 1025 bytes from the end is not seen
        let data = buffer_with_signature_at_distance(4096, 1025);
        assert!(!tail_contains_locator(&data, 1024));
        assert!(tail_contains_locator(&data, 2048));
    }

    #[test]
    fn partial_signature_does_not_match() {
        let mut data = vec![0u8; 64];
        data[60..63].copy_from_slice(&SIG[..3]);
        assert!(!contains_locator(&data));
    }

    #[tokio::test]
    async fn small_files_are_scanned_whole() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&buffer_with_signature_at_distance(100, 100)).unwrap();
        assert!(scan_path(file.path()).await.unwrap());
    }

    #[tokio::test]
    async fn boundary_holds_for_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&buffer_with_signature_at_distance(2000, 1025)).unwrap();
        assert!(!scan_path(file.path()).await.unwrap());
        assert!(scan_path_with_window(file.path(), 1025).await.unwrap());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_path(&dir.path().join("nope.ozx")).await.is_err());
    }
}
