//! Elem generator: a lazy, resumable expansion of one parsed
//! record into its constituent elems.
//!
//! Rather than eagerly materializing every elem up front, this walks the
//! record's NLRI lists on demand so a consumer that stops early after a few
//! elems never pays for the rest.

use crate::error::ParserResult;
use crate::models::elem::{Elem, ElemType};
use crate::models::record::{Record, RecordPayload};

/// Per-record state, reset whenever [`ElemGenerator::start`] is called on a
/// new record. Four counters track how many withdrawals/announcements (per
/// AFI) remain; `path_attr_done` ensures path-attribute materialization
/// happens exactly once, and `next_hop_v6_done` ensures the shared
/// announcement template is swapped from the v4 to the v6 next-hop exactly
/// once, right before the first v6 announcement.
#[derive(Debug, Default)]
pub struct ElemGenerator {
    ready: bool,
    single_shot_emitted: bool,
    withdrawal_v4_idx: usize,
    withdrawal_v6_idx: usize,
    announce_v4_idx: usize,
    announce_v6_idx: usize,
    path_attr_done: bool,
    next_hop_v6_done: bool,
    shared: Option<Elem>,
}

impl ElemGenerator {
    pub fn new() -> Self {
        ElemGenerator::default()
    }

    /// Reset all per-record state. Must be called once per new record before
    /// the first [`ElemGenerator::next`] call -- mirrors
    /// `bgpstream_elem_generator_clear`.
    pub fn start(&mut self) {
        *self = ElemGenerator::default();
    }

    fn materialize_shared(&mut self, payload: &crate::models::record::UpdatePayload, peer_ip: crate::models::Address, peer_asn: crate::models::Asn) {
        if self.path_attr_done {
            return;
        }
        let as_path = crate::models::AsPath::reconcile(
            payload.attrs.as_path.as_ref(),
            payload.attrs.as4_path.as_ref(),
        );
        let mut elem = Elem::new(ElemType::Announcement, peer_ip, peer_asn);
        elem.as_path = Some(as_path);
        elem.origin = payload.attrs.origin;
        elem.med = payload.attrs.med;
        elem.local_pref = payload.attrs.local_pref;
        elem.atomic_aggregate = payload.attrs.atomic_aggregate;
        // AGGREGATOR prefers AS4_AGGREGATOR when present.
        elem.aggregator = payload.attrs.as4_aggregator.or(payload.attrs.aggregator);
        elem.communities = payload.attrs.communities.clone();
        // v4 announcements are emitted before v6 ones, so the shared
        // template starts out carrying the v4 next-hop; the v6 loop below
        // overwrites it once, before its first announcement, so every
        // cloned elem in a family -- not just the first -- carries the
        // right next-hop.
        elem.next_hop = payload.attrs.next_hop_v4;
        self.shared = Some(elem);
        self.path_attr_done = true;
    }

    /// Advance the generator by one elem, or return `None` once the record
    /// is exhausted. Call repeatedly until `None` to drain a record.
    pub fn next(&mut self, record: &Record) -> ParserResult<Option<Elem>> {
        let Some(payload) = &record.payload else {
            return Ok(None);
        };

        match payload {
            RecordPayload::Update(u) => self.next_update(u),
            RecordPayload::RibEntry(r) => self.next_rib(r),
            RecordPayload::PeerState(p) => self.next_peer_state(p),
        }
    }

    fn next_update(
        &mut self,
        u: &crate::models::record::UpdatePayload,
    ) -> ParserResult<Option<Elem>> {
        if !self.ready {
            self.ready = true;
        }

        // 1. withdrawals v4
        if self.withdrawal_v4_idx < u.withdrawn_v4.len() {
            let prefix = u.withdrawn_v4[self.withdrawal_v4_idx];
            self.withdrawal_v4_idx += 1;
            let mut elem = Elem::new(ElemType::Withdrawal, u.peer_ip, u.peer_asn);
            elem.prefix = Some(prefix);
            return Ok(Some(elem));
        }
        // 2. withdrawals v6
        if self.withdrawal_v6_idx < u.withdrawn_v6.len() {
            let prefix = u.withdrawn_v6[self.withdrawal_v6_idx];
            self.withdrawal_v6_idx += 1;
            let mut elem = Elem::new(ElemType::Withdrawal, u.peer_ip, u.peer_asn);
            elem.prefix = Some(prefix);
            return Ok(Some(elem));
        }

        // 3. materialize path attributes exactly once, before the first
        // announcement.
        if !u.announced_v4.is_empty() || !u.announced_v6.is_empty() {
            self.materialize_shared(u, u.peer_ip, u.peer_asn);
        }

        // 4. announcements v4 (next-hop from NEXT_HOP attr, materialized
        // once into the shared template so every v4 clone carries it)
        if self.announce_v4_idx < u.announced_v4.len() {
            let prefix = u.announced_v4[self.announce_v4_idx];
            self.announce_v4_idx += 1;
            let mut elem = self.shared.clone().expect("path attrs materialized above");
            elem.elem_type = ElemType::Announcement;
            elem.prefix = Some(prefix);
            return Ok(Some(elem));
        }
        // 5. announcements v6 (next-hop from MP_REACH.next_hop, swapped
        // into the shared template once before the first v6 elem so every
        // clone in this family -- not just the first -- carries it)
        if self.announce_v6_idx < u.announced_v6.len() {
            if !self.next_hop_v6_done {
                if let Some(shared) = self.shared.as_mut() {
                    shared.next_hop = u.attrs.mp_next_hop;
                }
                self.next_hop_v6_done = true;
            }
            let prefix = u.announced_v6[self.announce_v6_idx];
            self.announce_v6_idx += 1;
            let mut elem = self.shared.clone().expect("path attrs materialized above");
            elem.elem_type = ElemType::Announcement;
            elem.prefix = Some(prefix);
            return Ok(Some(elem));
        }

        Ok(None)
    }

    fn next_rib(
        &mut self,
        r: &crate::models::record::RibEntryPayload,
    ) -> ParserResult<Option<Elem>> {
        if self.single_shot_emitted {
            return Ok(None);
        }
        self.single_shot_emitted = true;
        let as_path = crate::models::AsPath::reconcile(
            r.attrs.as_path.as_ref(),
            r.attrs.as4_path.as_ref(),
        );
        let mut elem = Elem::new(ElemType::Rib, r.peer_ip, r.peer_asn);
        elem.prefix = Some(r.prefix);
        elem.next_hop = r.attrs.next_hop_v4.or(r.attrs.mp_next_hop);
        elem.as_path = Some(as_path);
        elem.origin = r.attrs.origin;
        elem.med = r.attrs.med;
        elem.local_pref = r.attrs.local_pref;
        elem.atomic_aggregate = r.attrs.atomic_aggregate;
        elem.aggregator = r.attrs.as4_aggregator.or(r.attrs.aggregator);
        elem.communities = r.attrs.communities.clone();
        Ok(Some(elem))
    }

    fn next_peer_state(
        &mut self,
        p: &crate::models::record::PeerStatePayload,
    ) -> ParserResult<Option<Elem>> {
        if self.single_shot_emitted {
            return Ok(None);
        }
        self.single_shot_emitted = true;
        let mut elem = Elem::new(ElemType::PeerState, p.peer_ip, p.peer_asn);
        elem.old_state = Some(p.old_state);
        elem.new_state = Some(p.new_state);
        Ok(Some(elem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::network::address::{Address, Prefix};
    use crate::models::network::asn::Asn;
    use crate::models::record::{DumpPosition, PathAttributes, RecordStatus, RecordType, UpdatePayload};
    use std::str::FromStr;

    fn test_record(u: UpdatePayload) -> Record {
        Record {
            time_sec: 0,
            time_usec: 0,
            project_name: "test".into(),
            collector_name: "test".into(),
            router_name: None,
            record_type: RecordType::Update,
            status: RecordStatus::Valid,
            dump_pos: DumpPosition::Middle,
            payload: Some(RecordPayload::Update(u)),
        }
    }

    #[test]
    fn s3_ordering_and_single_materialization() {
        let peer_ip = Address::from_str("192.0.2.1").unwrap();
        let peer_asn = Asn::new(65000);
        let next_hop_v6 = Address::from_str("2001:db8::1").unwrap();

        let u = UpdatePayload {
            peer_ip,
            peer_asn,
            withdrawn_v4: vec![
                Prefix::from_str("10.0.0.0/24").unwrap(),
                Prefix::from_str("10.0.1.0/24").unwrap(),
            ],
            withdrawn_v6: vec![Prefix::from_str("2001:db8::/32").unwrap()],
            announced_v4: vec![Prefix::from_str("192.0.2.0/24").unwrap()],
            announced_v6: vec![Prefix::from_str("2001:db8:1::/48").unwrap()],
            attrs: PathAttributes {
                mp_next_hop: Some(next_hop_v6),
                ..Default::default()
            },
        };
        let record = test_record(u);
        let mut gen = ElemGenerator::new();
        gen.start();

        let mut seen = vec![];
        while let Some(elem) = gen.next(&record).unwrap() {
            seen.push(elem);
        }

        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0].elem_type, ElemType::Withdrawal);
        assert_eq!(seen[0].prefix.unwrap().to_string(), "10.0.0.0/24");
        assert_eq!(seen[1].prefix.unwrap().to_string(), "10.0.1.0/24");
        assert_eq!(seen[2].prefix.unwrap().to_string(), "2001:db8::/32");
        assert_eq!(seen[3].elem_type, ElemType::Announcement);
        assert_eq!(seen[3].prefix.unwrap().to_string(), "192.0.2.0/24");
        assert_eq!(seen[4].prefix.unwrap().to_string(), "2001:db8:1::/48");
        assert_eq!(seen[4].next_hop, Some(next_hop_v6));

        // exhausted
        assert!(gen.next(&record).unwrap().is_none());
    }

    #[test]
    fn exhaustion_count_matches_w_plus_a() {
        let peer_ip = Address::from_str("192.0.2.1").unwrap();
        let peer_asn = Asn::new(65000);
        let u = UpdatePayload {
            peer_ip,
            peer_asn,
            withdrawn_v4: vec![Prefix::from_str("10.0.0.0/24").unwrap()],
            withdrawn_v6: vec![],
            announced_v4: vec![
                Prefix::from_str("192.0.2.0/24").unwrap(),
                Prefix::from_str("192.0.3.0/24").unwrap(),
            ],
            announced_v6: vec![],
            attrs: PathAttributes::default(),
        };
        let record = test_record(u);
        let mut gen = ElemGenerator::new();
        gen.start();
        let mut count = 0;
        while gen.next(&record).unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn multiple_v4_announcements_all_carry_the_shared_next_hop() {
        let peer_ip = Address::from_str("192.0.2.1").unwrap();
        let peer_asn = Asn::new(65000);
        let next_hop_v4 = Address::from_str("192.0.2.254").unwrap();

        let u = UpdatePayload {
            peer_ip,
            peer_asn,
            withdrawn_v4: vec![],
            withdrawn_v6: vec![],
            announced_v4: vec![
                Prefix::from_str("192.0.2.0/24").unwrap(),
                Prefix::from_str("192.0.3.0/24").unwrap(),
                Prefix::from_str("192.0.4.0/24").unwrap(),
            ],
            announced_v6: vec![],
            attrs: PathAttributes {
                next_hop_v4: Some(next_hop_v4),
                ..Default::default()
            },
        };
        let record = test_record(u);
        let mut gen = ElemGenerator::new();
        gen.start();

        let mut seen = vec![];
        while let Some(elem) = gen.next(&record).unwrap() {
            seen.push(elem);
        }

        assert_eq!(seen.len(), 3);
        for elem in &seen {
            assert_eq!(elem.next_hop, Some(next_hop_v4));
        }
    }
}
