//! Elem: one peer-scoped routing observation.

use crate::models::bgp::aspath::AsPath;
use crate::models::bgp::community::CommunitySet;
use crate::models::network::address::{Address, Prefix};
use crate::models::network::asn::Asn;

/// Kind of routing observation an [`Elem`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElemType {
    Rib,
    Announcement,
    Withdrawal,
    PeerState,
}

/// `ORIGIN` path attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Origin {
    Igp,
    Egp,
    Incomplete,
}

/// BGP FSM peer state, used by [`ElemType::PeerState`] elems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeerState {
    #[default]
    Unknown,
    Idle,
    Connect,
    Active,
    OpenSent,
    OpenConfirm,
    Established,
}

/// One flattened, peer-scoped routing observation.
///
/// Not every field applies to every [`ElemType`]: `prefix`/`next_hop` are
/// only meaningful for RIB/announcement/withdrawal, and `old_state`/
/// `new_state` only for peer-state elems. This mirrors the union-of-fields
/// shape of the C representation this crate is modeled on: one flat struct
/// rather than four separate record kinds, because most consumer code
/// switches on `elem_type` and otherwise treats elems uniformly.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Elem {
    pub elem_type: ElemType,
    pub peer_ip: Address,
    pub peer_asn: Asn,

    pub prefix: Option<Prefix>,
    pub next_hop: Option<Address>,

    pub as_path: Option<AsPath>,
    pub communities: CommunitySet,
    pub origin: Option<Origin>,
    pub med: Option<u32>,
    pub local_pref: Option<u32>,
    pub atomic_aggregate: bool,
    pub aggregator: Option<(Asn, Address)>,

    pub old_state: Option<PeerState>,
    pub new_state: Option<PeerState>,
}

impl Elem {
    /// A blank elem of the given type with an unset peer; callers fill in
    /// the rest before it's handed to a consumer.
    pub fn new(elem_type: ElemType, peer_ip: Address, peer_asn: Asn) -> Self {
        Elem {
            elem_type,
            peer_ip,
            peer_asn,
            prefix: None,
            next_hop: None,
            as_path: None,
            communities: CommunitySet::new(),
            origin: None,
            med: None,
            local_pref: None,
            atomic_aggregate: false,
            aggregator: None,
            old_state: None,
            new_state: None,
        }
    }
}
