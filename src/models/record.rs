//! Record: one input message as it crossed the transport/format boundary
//!, plus the opaque per-message payload the elem generator
//! consumes.

use crate::models::bgp::aspath::AsPath;
use crate::models::bgp::community::CommunitySet;
use crate::models::elem::{Origin, PeerState};
use crate::models::network::address::{Address, Prefix};
use crate::models::network::asn::Asn;

/// RIB full-table snapshot vs incremental UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Rib,
    Update,
}

/// Record-level status, per spec.md 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    Valid,
    FilteredSource,
    EmptySource,
    CorruptedSource,
    CorruptedRecord,
    Unsupported,
    OutsideTimeInterval,
}

impl RecordStatus {
    pub const fn is_valid(&self) -> bool {
        matches!(self, RecordStatus::Valid)
    }
}

/// Where in its source dump this record falls -- used by the reader manager
/// to decide whether a finished reader's last pre-fetched record still
/// counts as the true end of a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DumpPosition {
    Start,
    Middle,
    End,
}

/// Path attributes materialized for one UPDATE/RIB entry, carried unreconciled
/// (both `as_path` and `as4_path` are kept) so the elem generator can apply
/// the AS_PATH/AS4_PATH reconciliation rule exactly once, lazily, before the
/// first announcement is emitted.
#[derive(Debug, Clone, Default)]
pub struct PathAttributes {
    pub origin: Option<Origin>,
    pub as_path: Option<AsPath>,
    pub as4_path: Option<AsPath>,
    pub next_hop_v4: Option<Address>,
    pub med: Option<u32>,
    pub local_pref: Option<u32>,
    pub atomic_aggregate: bool,
    pub aggregator: Option<(Asn, Address)>,
    pub as4_aggregator: Option<(Asn, Address)>,
    pub communities: CommunitySet,
    pub mp_next_hop: Option<Address>,
}

/// One parsed UPDATE's NLRI lists, split by AFI and withdrawn/announced --
/// exactly the four counters the elem generator in spec.md 4.5 walks.
#[derive(Debug, Clone, Default)]
pub struct UpdatePayload {
    pub peer_ip: Address,
    pub peer_asn: Asn,
    pub withdrawn_v4: Vec<Prefix>,
    pub withdrawn_v6: Vec<Prefix>,
    pub announced_v4: Vec<Prefix>,
    pub announced_v6: Vec<Prefix>,
    pub attrs: PathAttributes,
}

/// One RIB table-dump entry: a single prefix snapshot for one peer.
#[derive(Debug, Clone)]
pub struct RibEntryPayload {
    pub peer_ip: Address,
    pub peer_asn: Asn,
    pub prefix: Prefix,
    pub attrs: PathAttributes,
}

/// One peer FSM transition (BMP PEER_UP/PEER_DOWN, RIS-Live `R` message).
#[derive(Debug, Clone)]
pub struct PeerStatePayload {
    pub peer_ip: Address,
    pub peer_asn: Asn,
    pub old_state: PeerState,
    pub new_state: PeerState,
}

/// The opaque, format-specific payload a [`Record`] carries. Format layer
/// produces one of these per record; the elem generator consumes
/// it to lazily unfold elems.
#[derive(Debug, Clone)]
pub enum RecordPayload {
    Update(UpdatePayload),
    RibEntry(RibEntryPayload),
    PeerState(PeerStatePayload),
}

/// One input message as it crossed the transport/format boundary.
#[derive(Debug, Clone)]
pub struct Record {
    pub time_sec: u32,
    pub time_usec: u32,
    pub project_name: String,
    pub collector_name: String,
    pub router_name: Option<String>,
    pub record_type: RecordType,
    pub status: RecordStatus,
    pub dump_pos: DumpPosition,
    pub payload: Option<RecordPayload>,
}

impl Record {
    pub fn empty(project_name: impl Into<String>, collector_name: impl Into<String>) -> Self {
        Record {
            time_sec: 0,
            time_usec: 0,
            project_name: project_name.into(),
            collector_name: collector_name.into(),
            router_name: None,
            record_type: RecordType::Update,
            status: RecordStatus::EmptySource,
            dump_pos: DumpPosition::Middle,
            payload: None,
        }
    }

    /// Reset this record in place for reuse across iterations -- spec.md 3
    /// notes records are "mutated (cleared) at the start of each step"
    /// rather than reallocated.
    pub fn clear(&mut self) {
        self.time_sec = 0;
        self.time_usec = 0;
        self.router_name = None;
        self.status = RecordStatus::EmptySource;
        self.dump_pos = DumpPosition::Middle;
        self.payload = None;
    }

    pub fn time_f64(&self) -> f64 {
        self.time_sec as f64 + (self.time_usec as f64) / 1_000_000.0
    }
}
