//! Source address normalization.
//!
//! Maps the address a connection arrived from onto the 32-bit space the
//! range index works in. IPv4 and IPv4-mapped IPv6 addresses normalize to the
//! same value; everything else is reported as [`Normalized::Unsupported`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// A raw socket-level source address as handed over by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawAddress {
    /// IPv4 address octets in network order
    V4([u8; 4]),
    /// IPv6 address octets in network order
    V6([u8; 16]),
    /// Any other address family (e.g. `AF_UNIX`), identified by number
    Other(u16),
}

/// Result of normalizing a [`RawAddress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {
    /// IPv4 address in host byte order
    V4(u32),
    /// Address the engine cannot evaluate
    Unsupported,
}

impl Normalized {
    #[inline]
    pub fn addr(self) -> Option<u32> {
        match self {
            Normalized::V4(addr) => Some(addr),
            Normalized::Unsupported => None,
        }
    }
}

/// Normalize a raw source address.
#[inline]
pub fn normalize(raw: RawAddress) -> Normalized {
    match raw {
        RawAddress::V4(octets) => Normalized::V4(u32::from_be_bytes(octets)),
        RawAddress::V6(octets) => match v4_mapped(&octets) {
            Some(addr) => Normalized::V4(addr),
            None => Normalized::Unsupported,
        },
        RawAddress::Other(_) => Normalized::Unsupported,
    }
}

/// Low 32 bits of an `::ffff:a.b.c.d` address.
#[inline]
fn v4_mapped(octets: &[u8; 16]) -> Option<u32> {
    const PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff];

    if octets[..12] != PREFIX {
        return None;
    }
    Some(u32::from_be_bytes([
        octets[12], octets[13], octets[14], octets[15],
    ]))
}

impl From<Ipv4Addr> for RawAddress {
    fn from(addr: Ipv4Addr) -> Self {
        RawAddress::V4(addr.octets())
    }
}

impl From<Ipv6Addr> for RawAddress {
    fn from(addr: Ipv6Addr) -> Self {
        RawAddress::V6(addr.octets())
    }
}

impl From<IpAddr> for RawAddress {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl From<SocketAddrV4> for RawAddress {
    fn from(addr: SocketAddrV4) -> Self {
        (*addr.ip()).into()
    }
}

impl From<SocketAddrV6> for RawAddress {
    fn from(addr: SocketAddrV6) -> Self {
        (*addr.ip()).into()
    }
}

impl From<SocketAddr> for RawAddress {
    fn from(addr: SocketAddr) -> Self {
        addr.ip().into()
    }
}
