//! Binary dataset format for IP range blocklists.
//!
//! A dataset is a flat concatenation of fixed-width records with no header,
//! footer, record count or checksum.
//!
//! # Record Layout
//!
//! ```text
//! +-------------+-------------+-------------+
//! | start (u32) |  end (u32)  | kind (u32)  |   12 bytes, no padding
//! +-------------+-------------+-------------+
//! | start (u32) |  end (u32)  | kind (u32)  |
//! +-------------+-------------+-------------+
//! |                   ...                   |
//! ```
//!
//! Fields are host-native by default; see [`ByteOrder`].

mod format;
mod reader;
pub mod writer;

#[cfg(test)]
mod tests;

pub use format::*;
pub use reader::{Dataset, DatasetInfo, DatasetLoader};
pub use writer::{DatasetWriter, IntermediateRanges};
