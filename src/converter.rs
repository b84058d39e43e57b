//! Plain-text address list parser.
//!
//! Turns lists of addresses into dataset ranges. One entry per line, `#`
//! starts a comment. Accepted entries:
//!
//! ```text
//! 10.0.0.0/8            # CIDR network (host bits are ignored)
//! 192.0.2.7             # single address
//! 198.51.100.10-198.51.100.20   # inclusive range
//! ```
//!
//! IPv6 entries cannot be represented in the dataset and are skipped.

use ipnet::{IpNet, Ipv4Net};
use std::io::{BufRead, BufReader, Read};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::dataset::{IntermediateRanges, IpRange};
use crate::error::{Error, Result};

/// Kind written for IPv4 entries when none is given: the address family tag
/// used by the existing dataset tooling.
pub const DEFAULT_KIND: u32 = 4;

/// Counters collected while parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub added: usize,
    pub duplicates: usize,
    pub skipped_ipv6: usize,
    pub invalid: usize,
}

/// Address list parser.
#[derive(Debug, Clone, Copy)]
pub struct ListParser {
    kind: u32,
    strict: bool,
}

impl Default for ListParser {
    fn default() -> Self {
        Self::new(DEFAULT_KIND)
    }
}

impl ListParser {
    /// Parser tagging every range with `kind`.
    pub fn new(kind: u32) -> Self {
        Self {
            kind,
            strict: false,
        }
    }

    /// Fail on the first invalid line instead of skipping it.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse a whole list into a fresh range set.
    pub fn parse<R: Read>(&self, reader: R) -> Result<(IntermediateRanges, ParseStats)> {
        let mut ranges = IntermediateRanges::new();
        let stats = self.parse_into(reader, &mut ranges)?;
        Ok((ranges, stats))
    }

    /// Parse a list, appending to `ranges`.
    ///
    /// Appending keeps earlier lists ahead of later ones in match precedence.
    pub fn parse_into<R: Read>(
        &self,
        reader: R,
        ranges: &mut IntermediateRanges,
    ) -> Result<ParseStats> {
        let mut stats = ParseStats::default();

        for (line_no, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let entry = match line.find('#') {
                Some(idx) => &line[..idx],
                None => &line,
            };
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            match parse_entry(entry) {
                Some(Entry::V4(start, end)) => {
                    if ranges.add(IpRange::new(start, end, self.kind)) {
                        stats.added += 1;
                    } else {
                        stats.duplicates += 1;
                    }
                }
                Some(Entry::V6) => {
                    log::warn!("Skipping IPv6 entry on line {}: {}", line_no + 1, entry);
                    stats.skipped_ipv6 += 1;
                }
                None => {
                    if self.strict {
                        return Err(Error::InvalidEntry {
                            line: line_no + 1,
                            entry: entry.to_string(),
                        });
                    }
                    log::warn!("Skipping invalid entry on line {}: {}", line_no + 1, entry);
                    stats.invalid += 1;
                }
            }
        }

        Ok(stats)
    }
}

enum Entry {
    V4(u32, u32),
    V6,
}

fn parse_entry(entry: &str) -> Option<Entry> {
    if let Some((first, last)) = entry.split_once('-') {
        let (first, last) = (first.trim(), last.trim());
        if first.parse::<Ipv6Addr>().is_ok() || last.parse::<Ipv6Addr>().is_ok() {
            return Some(Entry::V6);
        }
        let first: Ipv4Addr = first.parse().ok()?;
        let last: Ipv4Addr = last.parse().ok()?;
        let (first, last) = (u32::from(first), u32::from(last));
        if first > last {
            return None;
        }
        return Some(Entry::V4(first, last));
    }

    if entry.contains('/') {
        // Non-strict: 10.1.2.3/8 means 10.0.0.0/8
        return match entry.parse::<IpNet>().ok()? {
            IpNet::V4(net) => {
                let net: Ipv4Net = net.trunc();
                Some(Entry::V4(
                    u32::from(net.network()),
                    u32::from(net.broadcast()),
                ))
            }
            IpNet::V6(_) => Some(Entry::V6),
        };
    }

    match entry.parse::<IpAddr>().ok()? {
        IpAddr::V4(addr) => Some(Entry::V4(u32::from(addr), u32::from(addr))),
        IpAddr::V6(_) => Some(Entry::V6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let text = r#"
# Blocked networks
10.0.0.0/24
192.0.2.7        # single host
198.51.100.10 - 198.51.100.20
10.0.0.0/24
2001:db8::/32
not-an-address
"#;

        let (ranges, stats) = ListParser::default().parse(text.as_bytes()).unwrap();

        assert_eq!(
            ranges.ranges(),
            &[
                IpRange::new(167772160, 167772415, 4),
                IpRange::new(0xC0000207, 0xC0000207, 4),
                IpRange::new(0xC633640A, 0xC6336414, 4),
            ]
        );
        assert_eq!(
            stats,
            ParseStats {
                added: 3,
                duplicates: 1,
                skipped_ipv6: 1,
                invalid: 1,
            }
        );
    }

    #[test]
    fn test_host_bits_truncated() {
        let (ranges, _) = ListParser::new(9).parse("10.1.2.3/8".as_bytes()).unwrap();
        assert_eq!(ranges.ranges(), &[IpRange::new(0x0A000000, 0x0AFFFFFF, 9)]);
    }

    #[test]
    fn test_inverted_dash_range_invalid() {
        let (ranges, stats) = ListParser::default()
            .parse("10.0.0.9-10.0.0.1".as_bytes())
            .unwrap();
        assert!(ranges.is_empty());
        assert_eq!(stats.invalid, 1);
    }

    #[test]
    fn test_ipv6_dash_range_skipped() {
        let list = "2001:db8::1-2001:db8::9\n10.0.0.1 - 2001:db8::9\n";

        let (ranges, stats) = ListParser::default().parse(list.as_bytes()).unwrap();
        assert!(ranges.is_empty());
        assert_eq!(stats.skipped_ipv6, 2);
        assert_eq!(stats.invalid, 0);

        let (_, stats) = ListParser::default()
            .strict(true)
            .parse(list.as_bytes())
            .unwrap();
        assert_eq!(stats.skipped_ipv6, 2);
    }

    #[test]
    fn test_strict_mode_reports_line() {
        let err = ListParser::default()
            .strict(true)
            .parse("10.0.0.1\n\nbogus\n".as_bytes())
            .unwrap_err();
        match err {
            Error::InvalidEntry { line, entry } => {
                assert_eq!(line, 3);
                assert_eq!(entry, "bogus");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_into_preserves_list_order() {
        let mut ranges = IntermediateRanges::new();
        ListParser::new(1)
            .parse_into("10.0.0.0/8".as_bytes(), &mut ranges)
            .unwrap();
        ListParser::new(2)
            .parse_into("10.0.0.0/8\n10.0.0.0/16".as_bytes(), &mut ranges)
            .unwrap();

        let kinds: Vec<u32> = ranges.ranges().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![1, 2, 2]);
    }
}
