//! Reader manager: owns one [`Reader`] per open
//! resource, keeps them in a queue sorted ascending by pre-fetched record
//! time with "RIB before UPDATE, then FIFO" tie-break, and pops/refills the
//! head on every [`ReaderManager::get_next_record`] call.
//!
//! A plain `Vec` kept sorted by insertion is enough at the resource counts
//! a single stream is expected to hold concurrently (tens, not millions),
//! and is simpler to reason about than a linked list threaded through
//! borrowed pointers.

use crate::error::{ParserError, ParserResult};
use crate::filter::FilterManager;
use crate::models::record::{Record, RecordType};
use crate::reader::{Reader, ReaderStatus};
use crate::resource::Resource;
use std::path::PathBuf;

struct Slot {
    id: u64,
    reader: Reader,
}

#[derive(Default)]
pub struct ReaderManager {
    queue: Vec<Slot>,
    cache_dir: Option<PathBuf>,
    next_id: u64,
    /// id of the reader that produced the most recent [`get_next_record`]
    /// result, so [`get_next_elem`] can route to the right reader without
    /// guessing from record fields alone.
    active_id: Option<u64>,
    /// A reader whose source reached END/CORRUPTED/EMPTY is kept here
    /// rather than dropped immediately: it's destroyed only once its final
    /// pre-fetched record's elems have been fully consumed. Overwritten
    /// (dropping the old one) the next time a reader retires, since by then
    /// the previous record's elems must already be drained -- only one
    /// generator is ever live at a time.
    retiring: Option<Slot>,
}

impl ReaderManager {
    pub fn new() -> Self {
        ReaderManager::default()
    }

    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        ReaderManager {
            queue: Vec::new(),
            cache_dir: Some(cache_dir),
            next_id: 0,
            active_id: None,
            retiring: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Opens a reader for each resource not skipped by RIB throttling and
    /// inserts it sorted by its pre-fetched record time. Resources whose
    /// transport/format fails to open are dropped with a warning rather
    /// than aborting the whole batch.
    pub fn add_resources(&mut self, resources: Vec<Resource>, filters: &mut FilterManager) {
        for resource in resources {
            if resource.record_type == crate::resource::RecordKindFilter::Rib
                && !filters.admit_rib(&resource.project, &resource.collector, resource.initial_time)
            {
                log::debug!(
                    "skipping RIB resource for ({}, {}) at t={}: within rib_period",
                    resource.project,
                    resource.collector,
                    resource.initial_time
                );
                continue;
            }

            let uri = resource.uri.clone();
            match Reader::open(resource, self.cache_dir.as_deref()) {
                Ok(reader) => self.insert_sorted(reader),
                Err(e) => {
                    log::warn!("failed to open resource {}: {}", uri, e);
                }
            }
        }
    }

    /// Inserts `reader` into the queue ascending by pre-fetched record time,
    /// RIBs before UPDATEs at equal times, FIFO among equals. A reader with
    /// no pre-fetched record (already exhausted on open) is dropped
    /// immediately.
    fn insert_sorted(&mut self, reader: Reader) {
        if reader.is_exhausted() {
            return;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.insert_slot(Slot { id, reader });
    }

    fn insert_slot(&mut self, slot: Slot) {
        let (new_time, _) = slot.reader.peek_time().expect("checked not exhausted above");
        let new_is_rib = slot.reader.peek_is_rib();

        let mut idx = self.queue.len();
        for (i, existing) in self.queue.iter().enumerate() {
            let (existing_time, _) = existing
                .reader
                .peek_time()
                .expect("queue only holds live readers");
            let existing_is_rib = existing.reader.peek_is_rib();
            let goes_after_existing = match existing_time.cmp(&new_time) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => {
                    // RIBs sort before UPDATEs at equal times; among same
                    // kind, FIFO (the new reader goes after existing ones).
                    match (existing_is_rib, new_is_rib) {
                        (true, false) => true,
                        (false, true) => false,
                        _ => true,
                    }
                }
            };
            if goes_after_existing {
                continue;
            }
            idx = i;
            break;
        }
        self.queue.insert(idx, slot);
    }

    /// Moves the head reader's pre-fetched record into `out`, advances that
    /// reader, and re-inserts/pops it to keep the queue sorted. Returns `1`
    /// on success, `0` on an empty queue (EOS), `-1` on an invariant
    /// violation.
    pub fn get_next_record(&mut self, out: &mut Record) -> ParserResult<i32> {
        if self.queue.is_empty() {
            self.active_id = None;
            return Ok(0);
        }

        let mut slot = self.queue.remove(0);
        let produced = slot
            .reader
            .advance()
            .ok_or_else(|| ParserError::Resource("head reader had no pre-fetched record".into()))?;
        let produced_time = (produced.time_sec, produced.time_usec);
        *out = produced;
        self.active_id = Some(slot.id);

        if slot.reader.is_exhausted() {
            let status = slot.reader.status;
            if matches!(
                status,
                ReaderStatus::End | ReaderStatus::Corrupted | ReaderStatus::Empty
            ) {
                out.dump_pos = crate::models::record::DumpPosition::End;
            }
            // any other status leaves `dump_pos` as the format set it. The
            // reader itself is kept in `retiring` until its final record's
            // elems are drained -- see the `retiring` field doc.
            self.retiring = Some(slot);
        } else {
            let (new_time, _) = slot.reader.peek_time().expect("checked not exhausted above");
            if new_time != produced_time.0 {
                self.insert_slot(slot);
            } else {
                // same timestamp as the record just emitted: keep draining
                // this reader at the head without re-sorting.
                self.queue.insert(0, slot);
            }
        }

        Ok(1)
    }

    pub fn get_next_elem(
        &mut self,
        record: &Record,
    ) -> ParserResult<Option<crate::models::Elem>> {
        let Some(active_id) = self.active_id else {
            return Ok(None);
        };
        if let Some(slot) = &mut self.retiring {
            if slot.id == active_id {
                return slot.reader.get_next_elem(record);
            }
        }
        match self.queue.iter_mut().find(|slot| slot.id == active_id) {
            Some(slot) => slot.reader.get_next_elem(record),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Helper used by [`crate::stream::BgpStream`] to decide RIB-before-UPDATE
/// ordering when constructing synthetic test fixtures.
pub const fn record_sort_rank(record_type: RecordType) -> u8 {
    match record_type {
        RecordType::Rib => 0,
        RecordType::Update => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{FormatKind, RecordKindFilter, TransportKind};
    use std::io::Write;

    fn write_mrt_update_at(path: &std::path::Path, timestamp: u32) {
        // one BGP4MP_MESSAGE_AS4 frame carrying an UPDATE with a single
        // announcement, used to synthesize a resource a reader can open.
        let nlri = {
            let mut v = vec![24u8];
            v.extend_from_slice(&[192, 0, 2]);
            v
        };
        let attrs = vec![0x40u8, 1, 1, 0]; // ORIGIN = IGP
        let mut bgp_body = Vec::new();
        bgp_body.extend_from_slice(&0u16.to_be_bytes());
        bgp_body.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
        bgp_body.extend_from_slice(&attrs);
        bgp_body.extend_from_slice(&nlri);

        let mut bgp_msg = vec![0xFFu8; 16];
        let total_len = 19 + bgp_body.len();
        bgp_msg.extend_from_slice(&(total_len as u16).to_be_bytes());
        bgp_msg.push(2); // UPDATE
        bgp_msg.extend_from_slice(&bgp_body);

        let mut mrt_body = Vec::new();
        mrt_body.extend_from_slice(&65001u32.to_be_bytes()); // peer asn
        mrt_body.extend_from_slice(&65002u32.to_be_bytes()); // local asn
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

    #[test]
    fn reader_queue_orders_by_ascending_record_time() {
        let dir = tempfile::TempDir::new().unwrap();
        let path_a = dir.path().join("a.mrt");
        let path_b = dir.path().join("b.mrt");
        write_mrt_update_at(&path_a, 2_000);
        write_mrt_update_at(&path_b, 1_000);

        let resource = |path: &std::path::Path, time: u32| {
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
        };

        let mut mgr = ReaderManager::new();
        let mut filters = FilterManager::new();
        mgr.add_resources(
            vec![resource(&path_a, 2_000), resource(&path_b, 1_000)],
            &mut filters,
        );

        let mut record = Record::empty("test-project", "test-collector");
        assert_eq!(mgr.get_next_record(&mut record).unwrap(), 1);
        assert_eq!(record.time_sec, 1_000);
        assert_eq!(mgr.get_next_record(&mut record).unwrap(), 1);
        assert_eq!(record.time_sec, 2_000);
        assert_eq!(mgr.get_next_record(&mut record).unwrap(), 0);
    }
}
