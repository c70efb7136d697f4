//! Shared BGP UPDATE message parser used by both the MRT (`BGP4MP`) and BMP
//! (`ROUTE_MONITORING`) format variants.
//!
//! Walks the flag/type/length path attribute TLVs over a borrowing
//! [`Cursor`] instead of a `std::io::Take` reader, so a truncated attribute
//! becomes a typed error rather than a short read silently treated as EOF.

use crate::error::{ParserError, ParserResult};
use crate::format::cursor::Cursor;
use crate::models::bgp::aspath::{AsPath, AsPathSegment};
use crate::models::bgp::community::{Community, CommunitySet};
use crate::models::elem::Origin;
use crate::models::network::address::{Address, Prefix};
use crate::models::network::asn::{Asn, AsnLength};
use crate::models::record::PathAttributes;
use num_enum::TryFromPrimitive;
use std::net::IpAddr;

pub const BGP_MARKER_LEN: usize = 16;
pub const BGP_HEADER_LEN: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum BgpMessageType {
    Open = 1,
    Update = 2,
    Notification = 3,
    Keepalive = 4,
}

impl BgpMessageType {
    fn from_u8(v: u8) -> ParserResult<Self> {
        BgpMessageType::try_from(v)
            .map_err(|_| ParserError::Unsupported(format!("unknown BGP message type {}", v)))
    }
}

/// The NLRI and path-attribute content of one parsed `UPDATE` message, before
/// the elem generator's lazy walk. AS_PATH / AS4_PATH are kept unreconciled
/// here -- reconciliation happens when the elem generator materializes
/// path attributes.
#[derive(Debug, Clone, Default)]
pub struct ParsedUpdate {
    pub withdrawn_v4: Vec<Prefix>,
    pub withdrawn_v6: Vec<Prefix>,
    pub announced_v4: Vec<Prefix>,
    pub announced_v6: Vec<Prefix>,
    pub attrs: PathAttributes,
}

const ATTR_ORIGIN: u8 = 1;
const ATTR_AS_PATH: u8 = 2;
const ATTR_NEXT_HOP: u8 = 3;
const ATTR_MULTI_EXIT_DISC: u8 = 4;
const ATTR_LOCAL_PREF: u8 = 5;
const ATTR_ATOMIC_AGGREGATE: u8 = 6;
const ATTR_AGGREGATOR: u8 = 7;
const ATTR_COMMUNITIES: u8 = 8;
const ATTR_MP_REACH_NLRI: u8 = 14;
const ATTR_MP_UNREACH_NLRI: u8 = 15;
const ATTR_AS4_PATH: u8 = 17;
const ATTR_AS4_AGGREGATOR: u8 = 18;

const FLAG_EXTENDED_LENGTH: u8 = 0x10;

const AFI_IPV4: u16 = 1;
const AFI_IPV6: u16 = 2;

/// Reads the 19-byte common header and returns `(message_type, body_len)`;
/// `cursor` is positioned at the start of the body on return.
pub fn read_header(cursor: &mut Cursor) -> ParserResult<(BgpMessageType, usize)> {
    cursor.skip(BGP_MARKER_LEN)?;
    let total_len = cursor.u16()? as usize;
    let msg_type = BgpMessageType::from_u8(cursor.u8()?)?;
    if total_len < BGP_HEADER_LEN {
        return Err(ParserError::Corrupted(format!(
            "BGP message length {} shorter than header",
            total_len
        )));
    }
    Ok((msg_type, total_len - BGP_HEADER_LEN))
}

/// Like [`read_header`] but for a message whose leading 16-byte marker was
/// never included -- RIS-Live's `raw` field strips it before hex-encoding.
/// The wire length field still counts the full (elided) marker, so body
/// length is computed the same way.
pub fn read_header_no_marker(cursor: &mut Cursor) -> ParserResult<(BgpMessageType, usize)> {
    let total_len = cursor.u16()? as usize;
    let msg_type = BgpMessageType::from_u8(cursor.u8()?)?;
    if total_len < BGP_HEADER_LEN {
        return Err(ParserError::Corrupted(format!(
            "BGP message length {} shorter than header",
            total_len
        )));
    }
    Ok((msg_type, total_len - BGP_HEADER_LEN))
}

/// Parses one `UPDATE` message body (everything after the 19-byte common
/// header) given the wire width of plain `AS_PATH` ASNs. Returns `None` for
/// any other message type -- callers treat that as unsupported rather than
/// an error.
pub fn parse_update_body(body: &[u8], asn_len: AsnLength) -> ParserResult<ParsedUpdate> {
    let mut cursor = Cursor::new(body);
    let mut update = ParsedUpdate::default();

    let withdrawn_len = cursor.u16()? as usize;
    {
        let mut wdr_cursor = cursor.sub_cursor(withdrawn_len)?;
        while wdr_cursor.has_remaining() {
            update.withdrawn_v4.push(read_nlri_v4(&mut wdr_cursor)?);
        }
    }

    let attr_len = cursor.u16()? as usize;
    {
        let mut attr_cursor = cursor.sub_cursor(attr_len)?;
        parse_attributes(&mut attr_cursor, asn_len, &mut update)?;
    }

    while cursor.has_remaining() {
        update.announced_v4.push(read_nlri_v4(&mut cursor)?);
    }

    Ok(update)
}

fn read_nlri_v4(cursor: &mut Cursor) -> ParserResult<Prefix> {
    let bit_len = cursor.u8()?;
    if bit_len > 32 {
        return Err(ParserError::Corrupted(format!(
            "invalid IPv4 NLRI mask length {}",
            bit_len
        )));
    }
    let byte_len = bit_len.div_ceil(8) as usize;
    let raw = cursor.bytes(byte_len)?;
    let mut octets = [0u8; 4];
    octets[..byte_len].copy_from_slice(raw);
    Prefix::new(IpAddr::from(octets), bit_len)
}

fn read_nlri_v6(cursor: &mut Cursor) -> ParserResult<Prefix> {
    let bit_len = cursor.u8()?;
    if bit_len > 128 {
        return Err(ParserError::Corrupted(format!(
            "invalid IPv6 NLRI mask length {}",
            bit_len
        )));
    }
    let byte_len = bit_len.div_ceil(8) as usize;
    let raw = cursor.bytes(byte_len)?;
    let mut octets = [0u8; 16];
    octets[..byte_len].copy_from_slice(raw);
    Prefix::new(IpAddr::from(octets), bit_len)
}

fn parse_attributes(
    cursor: &mut Cursor,
    asn_len: AsnLength,
    update: &mut ParsedUpdate,
) -> ParserResult<()> {
    while cursor.has_remaining() {
        let flags = cursor.u8()?;
        let attr_type = cursor.u8()?;
        let length = if flags & FLAG_EXTENDED_LENGTH != 0 {
            cursor.u16()? as usize
        } else {
            cursor.u8()? as usize
        };
        let mut body = cursor.sub_cursor(length)?;

        match attr_type {
            ATTR_ORIGIN => update.attrs.origin = Some(parse_origin(&mut body)?),
            ATTR_AS_PATH => update.attrs.as_path = Some(parse_as_path(&mut body, asn_len)?),
            ATTR_NEXT_HOP => update.attrs.next_hop_v4 = Some(Address::from(body.ipv4()?)),
            ATTR_MULTI_EXIT_DISC => update.attrs.med = Some(body.u32()?),
            ATTR_LOCAL_PREF => update.attrs.local_pref = Some(body.u32()?),
            ATTR_ATOMIC_AGGREGATE => update.attrs.atomic_aggregate = true,
            ATTR_AGGREGATOR => update.attrs.aggregator = Some(parse_aggregator(&mut body, asn_len)?),
            ATTR_AS4_AGGREGATOR => {
                update.attrs.as4_aggregator = Some(parse_aggregator(&mut body, AsnLength::Bits32)?)
            }
            ATTR_COMMUNITIES => update.attrs.communities = parse_communities(&mut body)?,
            ATTR_AS4_PATH => {
                update.attrs.as4_path = Some(parse_as_path(&mut body, AsnLength::Bits32)?)
            }
            ATTR_MP_REACH_NLRI => parse_mp_reach(&mut body, update)?,
            ATTR_MP_UNREACH_NLRI => parse_mp_unreach(&mut body, update)?,
            _ => {
                // unrecognised/optional attribute: value already isolated in
                // `body`, drop it by letting the sub-cursor go out of scope.
            }
        }
    }
    Ok(())
}

fn parse_origin(cursor: &mut Cursor) -> ParserResult<Origin> {
    match cursor.u8()? {
        0 => Ok(Origin::Igp),
        1 => Ok(Origin::Egp),
        2 => Ok(Origin::Incomplete),
        other => Err(ParserError::Corrupted(format!("unknown ORIGIN value {}", other))),
    }
}

fn parse_as_path(cursor: &mut Cursor, asn_len: AsnLength) -> ParserResult<AsPath> {
    let mut path = AsPath::new();
    while cursor.has_remaining() {
        let segment_type = cursor.u8()?;
        let count = cursor.u8()? as usize;
        let mut asns = Vec::with_capacity(count);
        for _ in 0..count {
            asns.push(read_asn(cursor, asn_len)?);
        }
        let segment = match segment_type {
            1 => AsPathSegment::Set(asns),
            2 => AsPathSegment::Sequence(asns),
            3 => AsPathSegment::ConfedSequence(asns),
            4 => AsPathSegment::ConfedSet(asns),
            other => {
                return Err(ParserError::Corrupted(format!(
                    "unknown AS_PATH segment type {}",
                    other
                )))
            }
        };
        path.append_segment(segment);
    }
    Ok(path)
}

fn read_asn(cursor: &mut Cursor, asn_len: AsnLength) -> ParserResult<Asn> {
    match asn_len {
        AsnLength::Bits16 => Ok(Asn::new(cursor.u16()? as u32)),
        AsnLength::Bits32 => Ok(Asn::new(cursor.u32()?)),
    }
}

fn parse_aggregator(cursor: &mut Cursor, asn_len: AsnLength) -> ParserResult<(Asn, Address)> {
    let asn = read_asn(cursor, asn_len)?;
    let addr = Address::from(cursor.ipv4()?);
    Ok((asn, addr))
}

fn parse_communities(cursor: &mut Cursor) -> ParserResult<CommunitySet> {
    let mut set = CommunitySet::new();
    while cursor.has_remaining() {
        let raw = cursor.u32()?;
        set.push(Community::from_u32(raw));
    }
    Ok(set)
}

fn parse_mp_reach(cursor: &mut Cursor, update: &mut ParsedUpdate) -> ParserResult<()> {
    let afi = cursor.u16()?;
    let _safi = cursor.u8()?;
    let next_hop_len = cursor.u8()? as usize;
    let next_hop_bytes = cursor.bytes(next_hop_len)?;
    let _snpa_count = cursor.u8()?; // always 0 in practice, reserved field

    if afi != AFI_IPV6 {
        // only IPv4/IPv6 unicast are exposed; other AFI/SAFI NLRI is skipped
        // without attempting to decode it (format unknown to this parser).
        return Ok(());
    }
    if next_hop_bytes.len() >= 16 {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&next_hop_bytes[..16]);
        update.attrs.mp_next_hop = Some(Address::from(std::net::Ipv6Addr::from(octets)));
    }
    while cursor.has_remaining() {
        update.announced_v6.push(read_nlri_v6(cursor)?);
    }
    Ok(())
}

fn parse_mp_unreach(cursor: &mut Cursor, update: &mut ParsedUpdate) -> ParserResult<()> {
    let afi = cursor.u16()?;
    let _safi = cursor.u8()?;
    if afi != AFI_IPV6 {
        return Ok(());
    }
    while cursor.has_remaining() {
        update.withdrawn_v6.push(read_nlri_v6(cursor)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_update(withdrawn: &[u8], attrs: &[u8], nlri: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&(withdrawn.len() as u16).to_be_bytes());
        body.extend_from_slice(withdrawn);
        body.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
        body.extend_from_slice(attrs);
        body.extend_from_slice(nlri);
        body
    }

    fn encode_v4_nlri(bits: u8, octets: &[u8]) -> Vec<u8> {
        let mut v = vec![bits];
        v.extend_from_slice(octets);
        v
    }

    #[test]
    fn parses_origin_as_path_and_one_v4_announcement() {
        let nlri = encode_v4_nlri(24, &[192, 0, 2]);
        let mut attrs = Vec::new();
        // ORIGIN = IGP
        attrs.extend_from_slice(&[0x40, ATTR_ORIGIN, 1, 0]);
        // AS_PATH: one SEQUENCE of [65001] as 4-byte ASN
        attrs.extend_from_slice(&[0x40, ATTR_AS_PATH, 6, 2, 1, 0, 0, 0xFD, 0xE9]);
        // NEXT_HOP = 192.0.2.1
        attrs.extend_from_slice(&[0x40, ATTR_NEXT_HOP, 4, 192, 0, 2, 1]);

        let body = encode_update(&[], &attrs, &nlri);
        let parsed = parse_update_body(&body, AsnLength::Bits32).unwrap();

        assert_eq!(parsed.announced_v4.len(), 1);
        assert_eq!(parsed.announced_v4[0].to_string(), "192.0.2.0/24");
        assert_eq!(parsed.attrs.origin, Some(Origin::Igp));
        assert!(parsed.attrs.as_path.is_some());
        assert_eq!(
            parsed.attrs.as_path.as_ref().unwrap().path_length(),
            1
        );
        assert_eq!(
            parsed.attrs.next_hop_v4.unwrap().to_string(),
            "192.0.2.1"
        );
    }

    #[test]
    fn parses_withdrawn_v4_only() {
        let withdrawn = encode_v4_nlri(16, &[10, 0]);
        let body = encode_update(&withdrawn, &[], &[]);
        let parsed = parse_update_body(&body, AsnLength::Bits32).unwrap();
        assert_eq!(parsed.withdrawn_v4.len(), 1);
        assert_eq!(parsed.withdrawn_v4[0].to_string(), "10.0.0.0/16");
        assert!(parsed.announced_v4.is_empty());
    }

    #[test]
    fn truncated_attribute_length_errors_instead_of_panicking() {
        // claims a 10-byte ORIGIN attribute but supplies only 1.
        let attrs = vec![0x40, ATTR_ORIGIN, 10, 0];
        let body = encode_update(&[], &attrs, &[]);
        assert!(parse_update_body(&body, AsnLength::Bits32).is_err());
    }
}
