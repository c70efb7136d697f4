//! Black-box integration coverage driven only through the public API:
//! multiple file resources merged into one time-ordered, filtered stream.
//! Synthetic local fixtures only, no live network.

use bgpstream_core::{
    BgpStream, ElemType, FilterDimension, FormatKind, RecordKindFilter, RecordType, Resource,
    TransportKind,
};
use std::io::Write;

/// Builds a minimal MRT file containing one BGP4MP_MESSAGE_AS4 UPDATE frame
/// announcing `prefix/24` at `timestamp`, from peer AS `peer_asn`.
fn write_mrt_update(path: &std::path::Path, timestamp: u32, peer_asn: u32, prefix: [u8; 3]) {
    let nlri = {
        let mut v = vec![24u8];
        v.extend_from_slice(&prefix);
        v
    };
    let attrs = vec![0x40u8, 1, 1, 0]; // ORIGIN = IGP
    let mut bgp_body = Vec::new();
    bgp_body.extend_from_slice(&0u16.to_be_bytes()); // withdrawn len
    bgp_body.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
    bgp_body.extend_from_slice(&attrs);
    bgp_body.extend_from_slice(&nlri);

    let mut bgp_msg = vec![0xFFu8; 16];
    let total_len = 19 + bgp_body.len();
    bgp_msg.extend_from_slice(&(total_len as u16).to_be_bytes());
    bgp_msg.push(2); // UPDATE
    bgp_msg.extend_from_slice(&bgp_body);

    let mut mrt_body = Vec::new();
    mrt_body.extend_from_slice(&peer_asn.to_be_bytes());
    mrt_body.extend_from_slice(&65000u32.to_be_bytes()); // local asn
    mrt_body.extend_from_slice(&0u16.to_be_bytes()); // interface index
    mrt_body.extend_from_slice(&1u16.to_be_bytes()); // afi = ipv4
    mrt_body.extend_from_slice(&[192, 0, 2, 1]); // peer ip
    mrt_body.extend_from_slice(&[192, 0, 2, 2]); // local ip
    mrt_body.extend_from_slice(&bgp_msg);

    let mut frame = Vec::new();
    frame.extend_from_slice(&timestamp.to_be_bytes());
    frame.extend_from_slice(&16u16.to_be_bytes()); // MRT_TYPE_BGP4MP
    frame.extend_from_slice(&4u16.to_be_bytes()); // SUBTYPE_BGP4MP_MESSAGE_AS4
    frame.extend_from_slice(&(mrt_body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&mrt_body);

    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(&frame).unwrap();
}

fn file_resource(path: &std::path::Path, time: u32) -> Resource {
    Resource::new(
        TransportKind::File,
        FormatKind::Mrt,
        format!("file://{}", path.display()),
        time,
        60,
        "test-project",
        "test-collector",
        RecordKindFilter::Update,
    )
}

#[test]
fn multiple_resources_merge_in_ascending_time_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let early = dir.path().join("early.mrt");
    let late = dir.path().join("late.mrt");
    write_mrt_update(&late, 2_000_000, 65001, [192, 0, 2]);
    write_mrt_update(&early, 1_000_000, 65002, [198, 51, 100]);

    let mut stream = BgpStream::new();
    // registered out of time order; the stream must still emit ascending.
    stream.add_resource_source(file_resource(&late, 2_000_000)).unwrap();
    stream.add_resource_source(file_resource(&early, 1_000_000)).unwrap();
    stream.start().unwrap();

    let mut record = bgpstream_core::Record::empty("", "");
    let mut times = Vec::new();
    while stream.get_next_record(&mut record).unwrap() == 1 {
        times.push(record.time_sec);
        assert_eq!(record.record_type, RecordType::Update);
    }
    assert_eq!(times, vec![1_000_000, 2_000_000]);
}

#[test]
fn peer_asn_filter_drops_elems_from_other_peers() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("one.mrt");
    write_mrt_update(&path, 1_000, 65001, [192, 0, 2]);

    let mut stream = BgpStream::new();
    stream.add_resource_source(file_resource(&path, 1_000)).unwrap();
    stream.add_filter(FilterDimension::PeerAsn(65099)).unwrap();
    stream.start().unwrap();

    let mut record = bgpstream_core::Record::empty("", "");
    assert_eq!(stream.get_next_record(&mut record).unwrap(), 1);

    let mut elem = bgpstream_core::Elem::new(
        ElemType::Announcement,
        "0.0.0.0".parse().unwrap(),
        bgpstream_core::Asn::new(0),
    );
    // record passed (no record-level peer filter), but its only elem is
    // from AS65001, which the peer-asn filter rejects.
    assert_eq!(stream.get_next_elem(&mut elem).unwrap(), 0);
}

#[test]
fn project_filter_rejects_whole_resource_before_any_elem() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("one.mrt");
    write_mrt_update(&path, 1_000, 65001, [192, 0, 2]);

    let mut stream = BgpStream::new();
    stream.add_resource_source(file_resource(&path, 1_000)).unwrap();
    stream
        .add_filter(FilterDimension::Project("some-other-project".into()))
        .unwrap();
    stream.start().unwrap();

    let mut record = bgpstream_core::Record::empty("", "");
    assert_eq!(stream.get_next_record(&mut record).unwrap(), 0);
}

#[test]
fn corrupted_resource_is_skipped_without_aborting_the_stream() {
    let dir = tempfile::TempDir::new().unwrap();
    let garbage = dir.path().join("garbage.mrt");
    std::fs::write(&garbage, b"not an mrt file at all, just noise").unwrap();
    let good = dir.path().join("good.mrt");
    write_mrt_update(&good, 5_000, 65001, [203, 0, 113]);

    let mut stream = BgpStream::new();
    stream.add_resource_source(file_resource(&garbage, 1_000)).unwrap();
    stream.add_resource_source(file_resource(&good, 5_000)).unwrap();
    stream.start().unwrap();

    let mut record = bgpstream_core::Record::empty("", "");
    let mut saw_good = false;
    while stream.get_next_record(&mut record).unwrap() == 1 {
        if record.time_sec == 5_000 {
            saw_good = true;
        }
    }
    assert!(saw_good);
}
