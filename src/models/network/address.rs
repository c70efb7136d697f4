//! Address and prefix primitives.

use crate::error::ParserError;
use ipnet::IpNet;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Address Family Identifier. See IANA AFI registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Afi {
    Ipv4,
    Ipv6,
}

/// Subsequent Address Family Identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Safi {
    Unicast,
    Multicast,
}

/// A tagged address value -- IPv4 (4 bytes) or IPv6 (16 bytes).
///
/// This is a thin wrapper over [`IpAddr`] rather than a byte-array variant:
/// equality, ordering, hashing, and text round-tripping are all delegated to
/// the standard library, which already orders IPv4 before IPv6 and then by
/// bytes within a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address(IpAddr);

impl Address {
    pub const fn v4(addr: Ipv4Addr) -> Self {
        Address(IpAddr::V4(addr))
    }

    pub const fn v6(addr: Ipv6Addr) -> Self {
        Address(IpAddr::V6(addr))
    }

    pub const fn inner(&self) -> IpAddr {
        self.0
    }

    pub const fn is_ipv4(&self) -> bool {
        self.0.is_ipv4()
    }

    pub const fn is_ipv6(&self) -> bool {
        self.0.is_ipv6()
    }
}

impl From<IpAddr> for Address {
    fn from(v: IpAddr) -> Self {
        Address(v)
    }
}

impl From<Ipv4Addr> for Address {
    fn from(v: Ipv4Addr) -> Self {
        Address(IpAddr::V4(v))
    }
}

impl From<Ipv6Addr> for Address {
    fn from(v: Ipv6Addr) -> Self {
        Address(IpAddr::V6(v))
    }
}

impl From<Address> for IpAddr {
    fn from(v: Address) -> Self {
        v.0
    }
}

impl FromStr for Address {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IpAddr::from_str(s)
            .map(Address)
            .map_err(|_| ParserError::Corrupted(format!("malformed address: {}", s)))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// (address, mask-length) pair. Host bits below the mask are not significant
/// for equality: `PartialEq`/`Hash` compare the truncated network, not the
/// raw stored address, since `IpNet` itself keeps whatever host bits were
/// passed to `new`.
///
/// The "exact" vs "any / more-specific / less-specific" interpretation lives
/// in filter state (see [`crate::filter::FilterDimension`]), not here.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Prefix {
    pub net: IpNet,
}

impl PartialEq for Prefix {
    fn eq(&self, other: &Self) -> bool {
        self.net.trunc() == other.net.trunc()
    }
}

impl Eq for Prefix {}

impl std::hash::Hash for Prefix {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.net.trunc().hash(state);
    }
}

impl Prefix {
    pub fn new(addr: IpAddr, mask_len: u8) -> Result<Self, ParserError> {
        let net = IpNet::new(addr, mask_len)
            .map_err(|_| ParserError::Corrupted(format!("invalid mask length {}", mask_len)))?;
        Ok(Prefix { net })
    }

    pub const fn afi(&self) -> Afi {
        match self.net {
            IpNet::V4(_) => Afi::Ipv4,
            IpNet::V6(_) => Afi::Ipv6,
        }
    }

    /// True if `self` covers `other` -- i.e. `other` is equal to or a
    /// more-specific sub-prefix of `self`.
    pub fn covers(&self, other: &Prefix) -> bool {
        self.net.contains(&other.net)
    }

    /// True if `other` covers `self` -- i.e. `self` is a less-specific
    /// super-prefix of `other`.
    pub fn covered_by(&self, other: &Prefix) -> bool {
        other.net.contains(&self.net)
    }
}

impl FromStr for Prefix {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let net = IpNet::from_str(s)
            .map_err(|_| ParserError::Corrupted(format!("malformed prefix: {}", s)))?;
        Ok(Prefix { net })
    }
}

impl Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrip() {
        for s in ["192.0.2.1", "::1", "2001:db8::1", "10.0.0.0"] {
            let addr = Address::from_str(s).unwrap();
            assert_eq!(addr.to_string(), s);
        }
    }

    #[test]
    fn address_rejects_malformed() {
        assert!(Address::from_str("not-an-ip").is_err());
    }

    #[test]
    fn prefix_roundtrip() {
        for s in ["10.0.0.0/24", "2001:db8::/32"] {
            let p = Prefix::from_str(s).unwrap();
            assert_eq!(p.to_string(), s);
        }
    }

    #[test]
    fn prefix_host_bits_ignored_for_equality() {
        let a = Prefix::from_str("10.0.0.1/24").unwrap();
        let b = Prefix::from_str("10.0.0.0/24").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn prefix_covers() {
        let wide = Prefix::from_str("10.0.0.0/16").unwrap();
        let narrow = Prefix::from_str("10.0.1.0/24").unwrap();
        assert!(wide.covers(&narrow));
        assert!(narrow.covered_by(&wide));
        assert!(!narrow.covers(&wide));
    }
}
