//! In-memory value types shared by the transport, format, and streaming
//! layers: addresses/prefixes/AS-paths/communities, elems and records.

pub mod bgp;
pub mod elem;
pub mod network;
pub mod record;

pub use bgp::{AsPath, AsPathSegment, Community, CommunitySet};
pub use elem::{Elem, ElemType, Origin, PeerState};
pub use network::{Address, Afi, Asn, AsnLength, Prefix, Safi};
pub use record::{
    DumpPosition, PathAttributes, PeerStatePayload, Record, RecordPayload, RecordStatus,
    RecordType, RibEntryPayload, UpdatePayload,
};
