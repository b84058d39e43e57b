//! Dataset writer.

use ahash::AHashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use super::format::*;
use crate::error::LoadError;
use crate::Result;

/// Ordered, de-duplicated ranges waiting to be serialized.
///
/// Insertion order is preserved because it is the match precedence of the
/// resulting dataset.
#[derive(Debug, Default)]
pub struct IntermediateRanges {
    ranges: Vec<IpRange>,
    seen: AHashSet<IpRange>,
}

impl IntermediateRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a range unless an identical one was already added.
    ///
    /// Returns `true` if the range was appended.
    pub fn add(&mut self, range: IpRange) -> bool {
        if !self.seen.insert(range) {
            return false;
        }
        self.ranges.push(range);
        true
    }

    pub fn ranges(&self) -> &[IpRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Serializes ranges into the flat dataset format.
pub struct DatasetWriter {
    order: ByteOrder,
    buffer: Vec<u8>,
}

impl DatasetWriter {
    /// Writer producing native-endian datasets.
    pub fn new() -> Self {
        Self::with_byte_order(ByteOrder::Native)
    }

    pub fn with_byte_order(order: ByteOrder) -> Self {
        Self {
            order,
            buffer: Vec::new(),
        }
    }

    /// Serialize `ranges` in order.
    ///
    /// Inverted ranges are refused so the output always loads.
    pub fn write(&mut self, ranges: &[IpRange]) -> std::result::Result<Vec<u8>, LoadError> {
        self.buffer.clear();
        self.buffer.reserve(ranges.len() * RECORD_SIZE);

        for (index, range) in ranges.iter().enumerate() {
            if !range.is_well_formed() {
                return Err(LoadError::MalformedRange {
                    index,
                    start: range.start,
                    end: range.end,
                });
            }
            self.buffer.extend_from_slice(&range.encode(self.order));
        }

        Ok(std::mem::take(&mut self.buffer))
    }

    /// Serialize `ranges` and write them to `path`.
    ///
    /// The data is written to a sibling temp file first and renamed into
    /// place, so a concurrent loader sees either the old or the new dataset.
    pub fn write_to_path(&mut self, ranges: &[IpRange], path: &Path) -> Result<usize> {
        let data = self.write(ranges)?;

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = Path::new(&temp_name);

        let mut file = fs::File::create(temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        fs::rename(temp_path, path)?;

        Ok(data.len())
    }
}

impl Default for DatasetWriter {
    fn default() -> Self {
        Self::new()
    }
}
