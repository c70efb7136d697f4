//! Address/prefix/community/AS-path primitives.

pub mod address;
pub mod asn;

pub use address::{Address, Afi, Prefix, Safi};
pub use asn::{Asn, AsnLength};
