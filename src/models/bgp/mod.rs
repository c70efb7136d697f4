//! BGP value types: AS paths and communities.

pub mod aspath;
pub mod community;

pub use aspath::{AsPath, AsPathSegment};
pub use community::{Community, CommunitySet};
