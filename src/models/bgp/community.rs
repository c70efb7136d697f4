//! BGP community sets (16-bit ASN/value pairs).

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A single community: (high-16, low-16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Community {
    pub asn: u16,
    pub value: u16,
}

impl Community {
    pub const NO_EXPORT: Community = Community {
        asn: 0xFFFF,
        value: 0xFF01,
    };
    pub const NO_ADVERTISE: Community = Community {
        asn: 0xFFFF,
        value: 0xFF02,
    };
    pub const NO_EXPORT_SUBCONFED: Community = Community {
        asn: 0xFFFF,
        value: 0xFF03,
    };

    pub const fn new(asn: u16, value: u16) -> Self {
        Community { asn, value }
    }

    pub const fn to_u32(self) -> u32 {
        ((self.asn as u32) << 16) | self.value as u32
    }

    pub const fn from_u32(v: u32) -> Self {
        Community {
            asn: (v >> 16) as u16,
            value: (v & 0xFFFF) as u16,
        }
    }
}

impl Display for Community {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.asn, self.value)
    }
}

impl FromStr for Community {
    type Err = crate::error::ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (asn, value) = s
            .split_once(':')
            .ok_or_else(|| crate::error::ParserError::Corrupted(format!("bad community: {}", s)))?;
        let asn = asn
            .parse::<u16>()
            .map_err(|_| crate::error::ParserError::Corrupted(format!("bad community: {}", s)))?;
        let value = value
            .parse::<u16>()
            .map_err(|_| crate::error::ParserError::Corrupted(format!("bad community: {}", s)))?;
        Ok(Community { asn, value })
    }
}

/// Ordered sequence of communities, order-preserving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommunitySet(pub Vec<Community>);

impl CommunitySet {
    pub fn new() -> Self {
        CommunitySet::default()
    }

    pub fn push(&mut self, c: Community) {
        self.0.push(c);
    }

    pub fn contains(&self, c: &Community) -> bool {
        self.0.contains(c)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for CommunitySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{}", rendered)
    }
}

impl FromStr for CommunitySet {
    type Err = crate::error::ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = CommunitySet::new();
        for tok in s.split_whitespace() {
            set.push(Community::from_str(tok)?);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn community_roundtrip() {
        let set = CommunitySet(vec![Community::new(65000, 100), Community::new(1, 2)]);
        let rendered = set.to_string();
        let parsed = CommunitySet::from_str(&rendered).unwrap();
        assert_eq!(set, parsed);
    }

    #[test]
    fn well_known_values() {
        assert_eq!(Community::NO_EXPORT.to_u32(), 0xFFFFFF01);
        assert_eq!(Community::from_u32(0xFFFFFF02), Community::NO_ADVERTISE);
    }
}
