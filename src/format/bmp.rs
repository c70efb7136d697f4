//! BMP binary format (RFC 7854), grounded in the same on-wire-walk style as
//! [`crate::format::mrt`] but over BMP's per-peer header framing.
//!
//! Supported message types: `ROUTE_MONITORING` (embeds a full BGP UPDATE,
//! reusing [`bgp_message`]), `PEER_UP_NOTIFICATION`, `PEER_DOWN_NOTIFICATION`
//! (both synthesized into [`crate::models::record::PeerStatePayload`]).
//! `INITIATION`, `TERMINATION`, `STATISTICS_REPORT`, and `ROUTE_MIRRORING`
//! carry no route or peer-FSM information this crate surfaces and are
//! skipped without producing a record.

use crate::error::{ParserError, ParserResult};
use crate::format::bgp_message::{self, BgpMessageType};
use crate::format::buffer::{FillOutcome, RefillBuffer};
use crate::format::cursor::Cursor;
use crate::format::{Format, PopulateOutcome};
use crate::generator::ElemGenerator;
use crate::models::elem::{Elem, PeerState};
use crate::models::network::address::Address;
use crate::models::network::asn::{Asn, AsnLength};
use crate::models::record::{
    DumpPosition, PeerStatePayload, Record, RecordPayload, RecordStatus, RecordType, UpdatePayload,
};
use crate::transport::Transport;

const BMP_COMMON_HEADER_LEN: usize = 6;
const BMP_PER_PEER_HEADER_LEN: usize = 42;

const MSG_TYPE_ROUTE_MONITORING: u8 = 0;
const MSG_TYPE_PEER_DOWN: u8 = 2;
const MSG_TYPE_PEER_UP: u8 = 3;

const PEER_FLAG_IPV6: u8 = 0x80;
const PEER_FLAG_LEGACY_ASN: u8 = 0x20;

struct PeerHeader {
    peer_ip: Address,
    peer_asn: Asn,
    asn_len: AsnLength,
    time_sec: u32,
    time_usec: u32,
}

fn read_peer_header(cursor: &mut Cursor) -> ParserResult<PeerHeader> {
    let _peer_type = cursor.u8()?;
    let flags = cursor.u8()?;
    cursor.skip(8)?; // peer distinguisher, unused: no VRF/RD modeling here
    let addr_bytes = cursor.bytes(16)?;
    let peer_ip = if flags & PEER_FLAG_IPV6 != 0 {
        let arr: [u8; 16] = addr_bytes.try_into().unwrap();
        Address::from(std::net::Ipv6Addr::from(arr))
    } else {
        let arr: [u8; 4] = addr_bytes[12..16].try_into().unwrap();
        Address::from(std::net::Ipv4Addr::from(arr))
    };
    let peer_asn = Asn::new(cursor.u32()?);
    let _peer_bgp_id = cursor.u32()?;
    let time_sec = cursor.u32()?;
    let time_usec = cursor.u32()?;
    let asn_len = if flags & PEER_FLAG_LEGACY_ASN != 0 {
        AsnLength::Bits16
    } else {
        AsnLength::Bits32
    };
    Ok(PeerHeader {
        peer_ip,
        peer_asn,
        asn_len,
        time_sec,
        time_usec,
    })
}

enum StepResult {
    Done(Option<PopulateOutcome>),
    Corrupted,
}

pub struct BmpFormat {
    transport: Box<dyn Transport>,
    buf: RefillBuffer,
    need_refill: bool,
    is_live: bool,
    generator: ElemGenerator,
    project_name: String,
    collector_name: String,
}

impl BmpFormat {
    pub fn new(
        transport: Box<dyn Transport>,
        project_name: impl Into<String>,
        collector_name: impl Into<String>,
    ) -> Self {
        Self::with_liveness(transport, project_name, collector_name, false)
    }

    /// See [`crate::format::mrt::MrtFormat::with_liveness`].
    pub fn with_liveness(
        transport: Box<dyn Transport>,
        project_name: impl Into<String>,
        collector_name: impl Into<String>,
        is_live: bool,
    ) -> Self {
        BmpFormat {
            transport,
            buf: RefillBuffer::new(),
            need_refill: false,
            is_live,
            generator: ElemGenerator::new(),
            project_name: project_name.into(),
            collector_name: collector_name.into(),
        }
    }

    fn step(&mut self, record: &mut Record) -> ParserResult<StepResult> {
        let slice = self.buf.as_slice();
        if slice.len() < BMP_COMMON_HEADER_LEN {
            return Err(ParserError::Truncated("BMP common header".into()));
        }
        let mut header_cursor = Cursor::new(&slice[..BMP_COMMON_HEADER_LEN]);
        let _version = header_cursor.u8()?;
        let total_len = header_cursor.u32()? as usize;
        let msg_type = header_cursor.u8()?;

        if total_len < BMP_COMMON_HEADER_LEN {
            return Err(ParserError::Corrupted(format!(
                "BMP message length {} shorter than header",
                total_len
            )));
        }
        if slice.len() < total_len {
            return Err(ParserError::Truncated("BMP message body".into()));
        }
        let body = slice[BMP_COMMON_HEADER_LEN..total_len].to_vec();

        let dispatch_result = self.dispatch(msg_type, &body, record);
        self.buf.consume(total_len);

        match dispatch_result {
            Ok(opt) => Ok(StepResult::Done(opt)),
            Err(_) => Ok(StepResult::Corrupted),
        }
    }

    fn dispatch(
        &mut self,
        msg_type: u8,
        body: &[u8],
        record: &mut Record,
    ) -> ParserResult<Option<PopulateOutcome>> {
        match msg_type {
            MSG_TYPE_ROUTE_MONITORING => self.load_route_monitoring(body, record),
            MSG_TYPE_PEER_UP => self.load_peer_transition(body, record, PeerState::Idle, PeerState::Established),
            MSG_TYPE_PEER_DOWN => self.load_peer_transition(body, record, PeerState::Established, PeerState::Idle),
            _ => Ok(None),
        }
    }

    fn load_route_monitoring(
        &mut self,
        body: &[u8],
        record: &mut Record,
    ) -> ParserResult<Option<PopulateOutcome>> {
        if body.len() < BMP_PER_PEER_HEADER_LEN {
            return Err(ParserError::Truncated("BMP per-peer header".into()));
        }
        let mut cursor = Cursor::new(&body[..BMP_PER_PEER_HEADER_LEN]);
        let peer = read_peer_header(&mut cursor)?;

        let mut msg_cursor = Cursor::new(&body[BMP_PER_PEER_HEADER_LEN..]);
        let (msg_type, body_len) = bgp_message::read_header(&mut msg_cursor)?;
        let msg_body = msg_cursor.bytes(body_len)?;

        if msg_type != BgpMessageType::Update {
            return Ok(None);
        }

        let parsed = bgp_message::parse_update_body(msg_body, peer.asn_len)?;
        record.time_sec = peer.time_sec;
        record.time_usec = peer.time_usec;
        record.project_name = self.project_name.clone();
        record.collector_name = self.collector_name.clone();
        record.router_name = None;
        record.record_type = RecordType::Update;
        record.status = RecordStatus::Valid;
        record.dump_pos = DumpPosition::Middle;
        record.payload = Some(RecordPayload::Update(UpdatePayload {
            peer_ip: peer.peer_ip,
            peer_asn: peer.peer_asn,
            withdrawn_v4: parsed.withdrawn_v4,
            withdrawn_v6: parsed.withdrawn_v6,
            announced_v4: parsed.announced_v4,
            announced_v6: parsed.announced_v6,
            attrs: parsed.attrs,
        }));
        self.generator.start();
        Ok(Some(PopulateOutcome::Ok))
    }

    fn load_peer_transition(
        &mut self,
        body: &[u8],
        record: &mut Record,
        old_state: PeerState,
        new_state: PeerState,
    ) -> ParserResult<Option<PopulateOutcome>> {
        if body.len() < BMP_PER_PEER_HEADER_LEN {
            return Err(ParserError::Truncated("BMP per-peer header".into()));
        }
        let mut cursor = Cursor::new(&body[..BMP_PER_PEER_HEADER_LEN]);
        let peer = read_peer_header(&mut cursor)?;

        record.time_sec = peer.time_sec;
        record.time_usec = peer.time_usec;
        record.project_name = self.project_name.clone();
        record.collector_name = self.collector_name.clone();
        record.router_name = None;
        record.record_type = RecordType::Update;
        record.status = RecordStatus::Valid;
        record.dump_pos = DumpPosition::Middle;
        record.payload = Some(RecordPayload::PeerState(PeerStatePayload {
            peer_ip: peer.peer_ip,
            peer_asn: peer.peer_asn,
            old_state,
            new_state,
        }));
        self.generator.start();
        Ok(Some(PopulateOutcome::Ok))
    }
}

impl Format for BmpFormat {
    fn populate_record(&mut self, record: &mut Record) -> ParserResult<PopulateOutcome> {
        loop {
            if self.buf.remaining() == 0 || self.need_refill {
                match self.buf.fill(self.transport.as_mut(), self.is_live)? {
                    FillOutcome::Eos => return Ok(PopulateOutcome::EndOfDump),
                    FillOutcome::NoProgress => return Ok(PopulateOutcome::CorruptedDump),
                    FillOutcome::Progressed => self.need_refill = false,
                    FillOutcome::Pending => {
                        std::thread::sleep(std::time::Duration::from_millis(5));
                    }
                }
                continue;
            }

            match self.step(record) {
                Ok(StepResult::Done(Some(outcome))) => return Ok(outcome),
                Ok(StepResult::Done(None)) => continue,
                Ok(StepResult::Corrupted) => {
                    record.status = RecordStatus::CorruptedRecord;
                    record.dump_pos = DumpPosition::Middle;
                    record.payload = None;
                    return Ok(PopulateOutcome::Ok);
                }
                Err(ParserError::Truncated(_)) => {
                    self.need_refill = true;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn get_next_elem(&mut self, record: &Record) -> ParserResult<Option<Elem>> {
        self.generator.next(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SliceTransport {
        data: Vec<u8>,
        pos: usize,
    }
    impl Transport for SliceTransport {
        fn read(&mut self, buf: &mut [u8]) -> ParserResult<usize> {
            let remaining = &self.data[self.pos..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            Ok(n)
        }
        fn readline(&mut self, _buf: &mut Vec<u8>) -> ParserResult<usize> {
            unimplemented!()
        }
    }

    fn bmp_frame(msg_type: u8, body: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.push(3); // version
        frame.extend_from_slice(&((BMP_COMMON_HEADER_LEN + body.len()) as u32).to_be_bytes());
        frame.push(msg_type);
        frame.extend_from_slice(body);
        frame
    }

    fn per_peer_header(peer_ip: [u8; 4], peer_asn: u32) -> Vec<u8> {
        let mut h = Vec::new();
        h.push(0); // peer type
        h.push(0); // flags: IPv4, 4-byte ASN, pre-policy
        h.extend_from_slice(&[0u8; 8]); // peer distinguisher
        h.extend_from_slice(&[0u8; 12]);
        h.extend_from_slice(&peer_ip);
        h.extend_from_slice(&peer_asn.to_be_bytes());
        h.extend_from_slice(&[0u8; 4]); // peer bgp id
        h.extend_from_slice(&[0u8; 4]); // timestamp sec
        h.extend_from_slice(&[0u8; 4]); // timestamp usec
        h
    }

    fn bgp_update_with_marker() -> Vec<u8> {
        let nlri = {
            let mut v = vec![24u8];
            v.extend_from_slice(&[192, 0, 2]);
            v
        };
        let attrs = vec![0x40, 1, 1, 0]; // ORIGIN = IGP
        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_be_bytes()); // withdrawn len
        body.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
        body.extend_from_slice(&attrs);
        body.extend_from_slice(&nlri);

        let mut msg = vec![0xFFu8; 16]; // marker
        let total_len = 19 + body.len();
        msg.extend_from_slice(&(total_len as u16).to_be_bytes());
        msg.push(2); // UPDATE
        msg.extend_from_slice(&body);
        msg
    }

    #[test]
    fn route_monitoring_yields_one_announcement() {
        let mut body = per_peer_header([192, 0, 2, 1], 65001);
        body.extend_from_slice(&bgp_update_with_marker());
        let data = bmp_frame(MSG_TYPE_ROUTE_MONITORING, &body);

        let transport = Box::new(SliceTransport { data, pos: 0 });
        let mut fmt = BmpFormat::new(transport, "p", "c");
        let mut record = Record::empty("p", "c");
        assert_eq!(
            fmt.populate_record(&mut record).unwrap(),
            PopulateOutcome::Ok
        );
        assert_eq!(record.status, RecordStatus::Valid);
        let elem = fmt.get_next_elem(&record).unwrap().unwrap();
        assert_eq!(elem.peer_asn, Asn::new(65001));
        assert_eq!(elem.prefix.unwrap().to_string(), "192.0.2.0/24");
    }

    #[test]
    fn peer_up_and_down_synthesize_peer_state_elems() {
        let up_body = per_peer_header([192, 0, 2, 2], 65002);
        let mut data = bmp_frame(MSG_TYPE_PEER_UP, &up_body);
        data.extend_from_slice(&bmp_frame(MSG_TYPE_PEER_DOWN, &up_body));

        let transport = Box::new(SliceTransport { data, pos: 0 });
        let mut fmt = BmpFormat::new(transport, "p", "c");

        let mut record = Record::empty("p", "c");
        fmt.populate_record(&mut record).unwrap();
        let elem = fmt.get_next_elem(&record).unwrap().unwrap();
        assert_eq!(elem.old_state, Some(PeerState::Idle));
        assert_eq!(elem.new_state, Some(PeerState::Established));

        let mut record2 = Record::empty("p", "c");
        fmt.populate_record(&mut record2).unwrap();
        let elem2 = fmt.get_next_elem(&record2).unwrap().unwrap();
        assert_eq!(elem2.old_state, Some(PeerState::Established));
        assert_eq!(elem2.new_state, Some(PeerState::Idle));
    }

    #[test]
    fn unsupported_message_type_is_skipped_without_a_record() {
        let mut data = bmp_frame(4, &[]); // INITIATION
        data.extend_from_slice(&bmp_frame(
            MSG_TYPE_PEER_UP,
            &per_peer_header([10, 0, 0, 1], 65003),
        ));

        let transport = Box::new(SliceTransport { data, pos: 0 });
        let mut fmt = BmpFormat::new(transport, "p", "c");
        let mut record = Record::empty("p", "c");
        assert_eq!(
            fmt.populate_record(&mut record).unwrap(),
            PopulateOutcome::Ok
        );
        match record.payload {
            Some(RecordPayload::PeerState(p)) => assert_eq!(p.peer_asn, Asn::new(65003)),
            other => panic!("expected peer state, got {:?}", other),
        }
    }
}
