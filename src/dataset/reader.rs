//! Dataset loader.
//!
//! Reads a flat sequence of fixed-width records from a byte buffer, a reader
//! or a file. There is no header: the record count is the byte length
//! divided by [`RECORD_SIZE`], and a short tail is dropped with a
//! [`LoadWarning::TruncatedInput`].

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::format::*;
use crate::error::{LoadError, LoadWarning};

/// Load-time facts about a dataset, kept for operator diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    /// Human-readable origin (file path or `"<bytes>"`)
    pub source: String,
    /// Number of complete records decoded
    pub records: usize,
    /// Bytes past the last complete record
    pub trailing_bytes: usize,
    /// SHA-256 of the raw input
    pub sha256: [u8; 32],
}

impl DatasetInfo {
    /// Hex form of the SHA-256 digest.
    pub fn fingerprint(&self) -> String {
        self.sha256.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// A decoded dataset: ranges in file order plus any non-fatal warnings.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub ranges: Vec<IpRange>,
    pub warnings: Vec<LoadWarning>,
    pub info: DatasetInfo,
}

impl Dataset {
    pub fn is_truncated(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, LoadWarning::TruncatedInput { .. }))
    }
}

/// Decodes datasets in a fixed byte order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetLoader {
    order: ByteOrder,
}

impl DatasetLoader {
    /// Loader for native-endian datasets.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_byte_order(order: ByteOrder) -> Self {
        Self { order }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Open a dataset file.
    ///
    /// Missing or unreadable files yield [`LoadError::SourceUnavailable`].
    pub fn load_path(&self, path: &Path) -> Result<Dataset, LoadError> {
        let source_name = path.display().to_string();
        let file = File::open(path).map_err(|e| LoadError::unavailable(&source_name, e))?;
        let metadata = file
            .metadata()
            .map_err(|e| LoadError::unavailable(&source_name, e))?;

        if metadata.is_dir() {
            let cause = std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory");
            return Err(LoadError::unavailable(source_name, cause));
        }

        // Copied, not mapped: the dataset may be rewritten in place while we read.
        self.load_reader(file, &source_name)
    }

    /// Read a dataset to the end of `reader`.
    pub fn load_reader<R: Read>(
        &self,
        mut reader: R,
        source_name: &str,
    ) -> Result<Dataset, LoadError> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| LoadError::unavailable(source_name, e))?;
        self.decode(&data, source_name.to_string())
    }

    /// Decode a dataset held in memory.
    pub fn load_bytes(&self, data: &[u8]) -> Result<Dataset, LoadError> {
        self.decode(data, "<bytes>".to_string())
    }

    fn decode(&self, data: &[u8], source: String) -> Result<Dataset, LoadError> {
        let records = data.len() / RECORD_SIZE;
        let trailing_bytes = data.len() % RECORD_SIZE;

        let mut ranges = Vec::with_capacity(records);
        for (index, chunk) in data.chunks_exact(RECORD_SIZE).enumerate() {
            let Ok(record) = <&[u8; RECORD_SIZE]>::try_from(chunk) else {
                break;
            };
            let range = IpRange::decode(record, self.order);
            if !range.is_well_formed() {
                return Err(LoadError::MalformedRange {
                    index,
                    start: range.start,
                    end: range.end,
                });
            }
            ranges.push(range);
        }

        let mut warnings = Vec::new();
        if trailing_bytes != 0 {
            log::warn!(
                "Dataset {} is truncated: {} trailing bytes ignored after {} records",
                source,
                trailing_bytes,
                records
            );
            warnings.push(LoadWarning::TruncatedInput { trailing_bytes });
        }

        let mut sha256 = [0u8; 32];
        sha256.copy_from_slice(&Sha256::digest(data));

        let info = DatasetInfo {
            source,
            records,
            trailing_bytes,
            sha256,
        };

        log::debug!("Decoded {} records from {}", info.records, info.source);

        Ok(Dataset {
            ranges,
            warnings,
            info,
        })
    }
}
