//! In-memory range index.
//!
//! The index answers one question: which range, in load order, is the first
//! to cover an address. Ranges may overlap and the earliest-loaded one wins,
//! so the order of the dataset is part of its meaning.
//!
//! Lookups run against a flattened segment table built once at load time.
//! Every range contributes two boundaries (`start` and `end + 1`); between two
//! neighbouring boundaries the set of covering ranges is constant, so each
//! elementary interval can be tagged with the lowest covering load index.
//! Neighbouring intervals with the same winner are merged. A lookup is then a
//! binary search over segment starts.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::dataset::IpRange;
use crate::error::LoadError;

/// One entry of the segment table: addresses from `start` up to the next
/// segment's start are won by `winner` (a load index), or by nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    start: u32,
    winner: Option<usize>,
}

/// Immutable index over an ordered set of ranges.
#[derive(Debug, Clone, Default)]
pub struct RangeIndex {
    /// Ranges in load order
    ranges: Vec<IpRange>,
    /// Sorted by `start`, no two neighbours share a winner
    segments: Vec<Segment>,
}

impl RangeIndex {
    /// Build an index, rejecting any range with `start > end`.
    pub fn build(ranges: Vec<IpRange>) -> Result<Self, LoadError> {
        if let Some((index, range)) = ranges
            .iter()
            .enumerate()
            .find(|(_, r)| !r.is_well_formed())
        {
            return Err(LoadError::MalformedRange {
                index,
                start: range.start,
                end: range.end,
            });
        }

        let segments = build_segments(&ranges);
        log::debug!(
            "Built range index: {} ranges, {} segments",
            ranges.len(),
            segments.len()
        );

        Ok(Self { ranges, segments })
    }

    /// Kind of the first range covering `addr`.
    #[inline]
    pub fn lookup(&self, addr: u32) -> Option<u32> {
        self.winner(addr)
            .and_then(|index| self.ranges.get(index))
            .map(|range| range.kind)
    }

    /// Load index and range of the first range covering `addr`.
    pub fn find(&self, addr: u32) -> Option<(usize, &IpRange)> {
        let index = self.winner(addr)?;
        self.ranges.get(index).map(|range| (index, range))
    }

    /// Reference scan over the ranges in load order.
    ///
    /// Same answer as [`lookup`](Self::lookup) in O(n).
    pub fn lookup_linear(&self, addr: u32) -> Option<u32> {
        self.ranges
            .iter()
            .find(|range| range.contains(addr))
            .map(|range| range.kind)
    }

    #[inline]
    fn winner(&self, addr: u32) -> Option<usize> {
        let pos = self.segments.partition_point(|s| s.start <= addr);
        if pos == 0 {
            return None;
        }
        self.segments[pos - 1].winner
    }

    /// Ranges in load order.
    pub fn ranges(&self) -> &[IpRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

fn build_segments(ranges: &[IpRange]) -> Vec<Segment> {
    // u64 so that `end + 1` of a range ending at 255.255.255.255 fits
    let mut points: Vec<u64> = ranges
        .iter()
        .flat_map(|r| [r.start as u64, r.end as u64 + 1])
        .collect();
    points.sort_unstable();
    points.dedup();

    let mut by_start: Vec<usize> = (0..ranges.len()).collect();
    by_start.sort_by_key(|&i| ranges[i].start);

    let mut active: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
    let mut pending = by_start.into_iter().peekable();
    let mut segments: Vec<Segment> = Vec::new();

    for point in points {
        if point > u32::MAX as u64 {
            break;
        }

        while let Some(&i) = pending.peek() {
            if ranges[i].start as u64 > point {
                break;
            }
            active.push(Reverse(i));
            pending.next();
        }

        // Expired entries are only discarded once they reach the top; a
        // lower index always outranks them, and expiry never reverses.
        while let Some(&Reverse(i)) = active.peek() {
            if (ranges[i].end as u64) < point {
                active.pop();
            } else {
                break;
            }
        }

        let winner = active.peek().map(|&Reverse(i)| i);
        if segments.last().map(|s| s.winner) == Some(winner) {
            continue;
        }
        segments.push(Segment {
            start: point as u32,
            winner,
        });
    }

    segments
}
