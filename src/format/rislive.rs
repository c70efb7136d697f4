//! RIPE RIS-Live JSON-line format.
//!
//! One JSON object per line, envelope `{"type": "ris_message" | "ris_error",
//! "data": {...}}`. `ris_message` carries a `data.type` one-character
//! discriminator (`U`pdate, `O`pen, `N`otification, `K`eepalive, `R`IS peer
//! state); `ris_error` is logged and skipped. Unlike MRT/BMP this format has
//! no binary framing of its own -- each line is a complete, independent
//! message, so there's no refillable buffer here, only `readline`.

use crate::error::{ParserError, ParserResult};
use crate::format::bgp_message::{self, BgpMessageType};
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
use serde::Deserialize;
use std::str::FromStr;

const MAX_RAW_HEX_LEN: usize = 8192;

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RisData {
    timestamp: f64,
    peer: String,
    peer_asn: String,
    host: String,
    #[serde(rename = "type")]
    msg_type: String,
    raw: Option<String>,
    state: Option<String>,
}

pub struct RisLiveFormat {
    transport: Box<dyn Transport>,
    line_buf: Vec<u8>,
    generator: ElemGenerator,
    project_name: String,
}

impl RisLiveFormat {
    pub fn new(transport: Box<dyn Transport>, project_name: impl Into<String>) -> Self {
        RisLiveFormat {
            transport,
            line_buf: Vec::new(),
            generator: ElemGenerator::new(),
            project_name: project_name.into(),
        }
    }

    fn parse_line(&mut self, record: &mut Record) -> ParserResult<Option<PopulateOutcome>> {
        let envelope: Envelope = serde_json::from_slice(&self.line_buf)
            .map_err(|e| ParserError::Corrupted(format!("malformed RIS-Live JSON: {}", e)))?;

        match envelope.kind.as_str() {
            "ris_error" => {
                if let Some(message) = envelope
                    .data
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(|v| v.as_str())
                {
                    log::debug!("RIS-Live error envelope: {}", message);
                }
                Ok(None)
            }
            "ris_message" => {
                let data = envelope
                    .data
                    .ok_or_else(|| ParserError::Corrupted("ris_message envelope without data".into()))?;
                let data: RisData = serde_json::from_value(data).map_err(|e| {
                    ParserError::Corrupted(format!("malformed RIS-Live data object: {}", e))
                })?;
                self.handle_data(data, record)
            }
            other => Err(ParserError::Corrupted(format!(
                "unknown RIS-Live envelope type {}",
                other
            ))),
        }
    }

    fn handle_data(
        &mut self,
        data: RisData,
        record: &mut Record,
    ) -> ParserResult<Option<PopulateOutcome>> {
        let peer_ip = Address::from_str(&data.peer)?;
        let peer_asn = Asn::new(
            data.peer_asn
                .parse::<u32>()
                .map_err(|_| ParserError::Corrupted(format!("bad peer_asn {}", data.peer_asn)))?,
        );
        let time_sec = data.timestamp.trunc() as u32;
        let time_usec = (data.timestamp.fract() * 1_000_000.0).round() as u32;

        record.time_sec = time_sec;
        record.time_usec = time_usec;
        record.project_name = self.project_name.clone();
        record.collector_name = data.host.clone();
        record.router_name = None;
        record.record_type = RecordType::Update;
        record.dump_pos = DumpPosition::Middle;

        match data.msg_type.as_str() {
            "R" => {
                let new_state = match data.state.as_deref() {
                    Some("down") => PeerState::Idle,
                    Some("connected") => PeerState::Connect,
                    Some("up") => PeerState::Established,
                    other => {
                        return Err(ParserError::Corrupted(format!(
                            "unknown RIS-Live peer state {:?}",
                            other
                        )))
                    }
                };
                record.status = RecordStatus::Valid;
                record.payload = Some(RecordPayload::PeerState(PeerStatePayload {
                    peer_ip,
                    peer_asn,
                    old_state: PeerState::Unknown,
                    new_state,
                }));
                self.generator.start();
                Ok(Some(PopulateOutcome::Ok))
            }
            "U" => {
                let raw = data
                    .raw
                    .ok_or_else(|| ParserError::Corrupted("U message without raw field".into()))?;
                if raw.len() % 2 != 0 || raw.len() > MAX_RAW_HEX_LEN {
                    return Err(ParserError::Corrupted(format!(
                        "raw hex length {} invalid",
                        raw.len()
                    )));
                }
                let bytes = hex::decode(&raw)
                    .map_err(|e| ParserError::Corrupted(format!("bad raw hex: {}", e)))?;
                let mut cursor = Cursor::new(&bytes);
                let (msg_type, body_len) = bgp_message::read_header_no_marker(&mut cursor)?;
                if msg_type != BgpMessageType::Update {
                    return Err(ParserError::Corrupted(
                        "RIS-Live 'U' envelope did not decode to a BGP UPDATE".into(),
                    ));
                }
                let body = cursor.bytes(body_len)?;
                let parsed = bgp_message::parse_update_body(body, AsnLength::Bits32)?;

                record.status = RecordStatus::Valid;
                record.payload = Some(RecordPayload::Update(UpdatePayload {
                    peer_ip,
                    peer_asn,
                    withdrawn_v4: parsed.withdrawn_v4,
                    withdrawn_v6: parsed.withdrawn_v6,
                    announced_v4: parsed.announced_v4,
                    announced_v6: parsed.announced_v6,
                    attrs: parsed.attrs,
                }));
                self.generator.start();
                Ok(Some(PopulateOutcome::Ok))
            }
            "O" | "N" | "K" => Ok(None),
            _ => {
                record.status = RecordStatus::Unsupported;
                record.payload = None;
                Ok(Some(PopulateOutcome::Unsupported))
            }
        }
    }
}

impl Format for RisLiveFormat {
    fn populate_record(&mut self, record: &mut Record) -> ParserResult<PopulateOutcome> {
        loop {
            self.line_buf.clear();
            let n = self.transport.readline(&mut self.line_buf)?;
            if n == 0 {
                return Ok(PopulateOutcome::EndOfDump);
            }

            match self.parse_line(record) {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => continue,
                Err(_) => {
                    record.status = RecordStatus::CorruptedRecord;
                    record.collector_name = String::new();
                    record.dump_pos = DumpPosition::Middle;
                    record.payload = None;
                    return Ok(PopulateOutcome::Ok);
                }
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

    struct LineTransport {
        lines: Vec<Vec<u8>>,
        idx: usize,
    }
    impl Transport for LineTransport {
        fn read(&mut self, _buf: &mut [u8]) -> ParserResult<usize> {
            unimplemented!()
        }
        fn readline(&mut self, buf: &mut Vec<u8>) -> ParserResult<usize> {
            if self.idx >= self.lines.len() {
                return Ok(0);
            }
            let line = &self.lines[self.idx];
            self.idx += 1;
            buf.extend_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn peer_state_up_message_yields_established_elem() {
        let line = br#"{"type":"ris_message","data":{"timestamp":1500000000.0,"host":"rrc00","peer":"10.0.0.1","peer_asn":"65001","type":"R","state":"up"}}"#.to_vec();
        let transport = Box::new(LineTransport {
            lines: vec![line],
            idx: 0,
        });
        let mut fmt = RisLiveFormat::new(transport, "ris");
        let mut record = Record::empty("ris", "");
        assert_eq!(
            fmt.populate_record(&mut record).unwrap(),
            PopulateOutcome::Ok
        );
        assert_eq!(record.collector_name, "rrc00");
        assert_eq!(record.time_sec, 1_500_000_000);
        let elem = fmt.get_next_elem(&record).unwrap().unwrap();
        assert_eq!(elem.new_state, Some(PeerState::Established));
        assert!(fmt.get_next_elem(&record).unwrap().is_none());
    }

    #[test]
    fn non_json_line_yields_corrupted_record_and_continues() {
        let good = br#"{"type":"ris_message","data":{"timestamp":1.0,"host":"rrc00","peer":"10.0.0.1","peer_asn":"65001","type":"R","state":"down"}}"#.to_vec();
        let transport = Box::new(LineTransport {
            lines: vec![b"not json at all".to_vec(), good],
            idx: 0,
        });
        let mut fmt = RisLiveFormat::new(transport, "ris");

        let mut record = Record::empty("ris", "");
        assert_eq!(
            fmt.populate_record(&mut record).unwrap(),
            PopulateOutcome::Ok
        );
        assert_eq!(record.status, RecordStatus::CorruptedRecord);
        assert_eq!(record.collector_name, "");

        let mut record2 = Record::empty("ris", "");
        assert_eq!(
            fmt.populate_record(&mut record2).unwrap(),
            PopulateOutcome::Ok
        );
        assert_eq!(record2.status, RecordStatus::Valid);
    }

    #[test]
    fn ris_error_envelope_is_skipped() {
        let error_line = br#"{"type":"ris_error","data":{"message":"boom"}}"#.to_vec();
        let good = br#"{"type":"ris_message","data":{"timestamp":1.0,"host":"rrc00","peer":"10.0.0.1","peer_asn":"65001","type":"R","state":"down"}}"#.to_vec();
        let transport = Box::new(LineTransport {
            lines: vec![error_line, good],
            idx: 0,
        });
        let mut fmt = RisLiveFormat::new(transport, "ris");
        let mut record = Record::empty("ris", "");
        assert_eq!(
            fmt.populate_record(&mut record).unwrap(),
            PopulateOutcome::Ok
        );
        assert_eq!(record.status, RecordStatus::Valid);
    }
}
