//! Top-level stream object: the single public iterator a
//! consumer drives. Ties resource manager -> reader manager -> current
//! record/elem generator together behind an `ALLOCATED -> ON -> OFF` state
//! machine.

use crate::error::{ParserError, ParserResult};
use crate::filter::{FilterDimension, FilterManager};
use crate::models::elem::Elem;
use crate::models::record::Record;
use crate::reader_manager::ReaderManager;
use crate::resource::Resource;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Allocated,
    On,
    Off,
}

/// The single public iterator this crate exposes. Not a [`std::iter::Iterator`]
/// impl -- the API is pull-based over two distinct calls (`get_next_record`,
/// `get_next_elem`) because an elem generator is keyed to a particular
/// record, not to the stream as a whole.
pub struct BgpStream {
    state: State,
    resources: crate::resource::ResourceManager,
    readers: ReaderManager,
    filters: FilterManager,
    current: Record,
    has_resource_source: bool,
}

impl BgpStream {
    pub fn new() -> Self {
        BgpStream {
            state: State::Allocated,
            resources: crate::resource::ResourceManager::new(),
            readers: ReaderManager::new(),
            filters: FilterManager::new(),
            current: Record::empty("", ""),
            has_resource_source: false,
        }
    }

    /// Like [`BgpStream::new`] but resources of [`crate::resource::TransportKind::Cache`]
    /// will read/write through `cache_dir`.
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        BgpStream {
            state: State::Allocated,
            resources: crate::resource::ResourceManager::new(),
            readers: ReaderManager::with_cache_dir(cache_dir),
            filters: FilterManager::new(),
            current: Record::empty("", ""),
            has_resource_source: false,
        }
    }

    /// Registers one resource the stream may eventually read from. Takes a
    /// single concrete [`Resource`] per call -- a broker/discovery client
    /// would call this once per URI it produces.
    pub fn add_resource_source(&mut self, resource: Resource) -> ParserResult<()> {
        if self.state != State::Allocated {
            return Err(ParserError::Resource(
                "add_resource_source must be called before start()".into(),
            ));
        }
        self.has_resource_source = true;
        self.resources.push(resource);
        Ok(())
    }

    pub fn add_filter(&mut self, dimension: FilterDimension) -> ParserResult<()> {
        self.filters.add_filter(dimension)
    }

    /// `ALLOCATED -> ON`. Asserts at least one resource source was
    /// registered.
    pub fn start(&mut self) -> ParserResult<()> {
        if self.state != State::Allocated {
            return Err(ParserError::Resource("start() called out of order".into()));
        }
        if !self.has_resource_source {
            return Err(ParserError::Resource(
                "start() requires at least one resource source".into(),
            ));
        }
        self.state = State::On;
        Ok(())
    }

    /// `ON -> OFF`. Drops the resource/reader/filter managers in that order
    /// (here: replaced with fresh empty instances, since Rust drop order for
    /// struct fields is declaration order and the managers have no
    /// cross-references to unwind manually).
    pub fn stop(&mut self) -> ParserResult<()> {
        if self.state != State::On {
            return Err(ParserError::Resource("stop() called out of order".into()));
        }
        self.resources = crate::resource::ResourceManager::new();
        self.readers = ReaderManager::new();
        self.filters = FilterManager::new();
        self.state = State::Off;
        Ok(())
    }

    /// Pulls the next record that passes record-level filters into `out`.
    /// `1` = record produced, `0` = clean EOS, `-1` = misuse/fatal error.
    pub fn get_next_record(&mut self, out: &mut Record) -> ParserResult<i32> {
        if self.state != State::On {
            return Err(ParserError::Resource(
                "get_next_record called outside the ON state".into(),
            ));
        }

        loop {
            if self.readers.is_empty() {
                let batch = self.resources.get_batch();
                if batch.is_empty() {
                    return Ok(0);
                }
                self.readers.add_resources(batch, &mut self.filters);
                if self.readers.is_empty() {
                    // every resource in the batch was throttled or failed to
                    // open; try the next batch rather than reporting EOS.
                    continue;
                }
            }

            let rc = self.readers.get_next_record(&mut self.current)?;
            if rc == 0 {
                continue;
            }
            if !self.filters.matches_record(&self.current) {
                continue;
            }
            *out = self.current.clone();
            return Ok(1);
        }
    }

    /// Drives the current record's elem generator, re-applying elem-level
    /// filters, returning the first elem that passes. `1` = elem produced,
    /// `0` = the current record is exhausted.
    pub fn get_next_elem(&mut self, out: &mut Elem) -> ParserResult<i32> {
        if self.state != State::On {
            return Err(ParserError::Resource(
                "get_next_elem called outside the ON state".into(),
            ));
        }
        loop {
            match self.readers.get_next_elem(&self.current)? {
                None => return Ok(0),
                Some(elem) => {
                    if self.filters.matches_elem(&elem) {
                        *out = elem;
                        return Ok(1);
                    }
                }
            }
        }
    }
}

impl Default for BgpStream {
    fn default() -> Self {
        BgpStream::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{FormatKind, RecordKindFilter, TransportKind};
    use std::io::Write;

    fn write_mrt_update_at(path: &std::path::Path, timestamp: u32, prefix_octets: [u8; 3]) {
        let nlri = {
            let mut v = vec![24u8];
            v.extend_from_slice(&prefix_octets);
            v
        };
        let attrs = vec![0x40u8, 1, 1, 0];
        let mut bgp_body = Vec::new();
        bgp_body.extend_from_slice(&0u16.to_be_bytes());
        bgp_body.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
        bgp_body.extend_from_slice(&attrs);
        bgp_body.extend_from_slice(&nlri);

        let mut bgp_msg = vec![0xFFu8; 16];
        let total_len = 19 + bgp_body.len();
        bgp_msg.extend_from_slice(&(total_len as u16).to_be_bytes());
        bgp_msg.push(2);
        bgp_msg.extend_from_slice(&bgp_body);

        let mut mrt_body = Vec::new();
        mrt_body.extend_from_slice(&65001u32.to_be_bytes());
        mrt_body.extend_from_slice(&65002u32.to_be_bytes());
        mrt_body.extend_from_slice(&0u16.to_be_bytes());
        mrt_body.extend_from_slice(&1u16.to_be_bytes());
        mrt_body.extend_from_slice(&[192, 0, 2, 1]);
        mrt_body.extend_from_slice(&[192, 0, 2, 2]);
        mrt_body.extend_from_slice(&bgp_msg);

        let mut frame = Vec::new();
        frame.extend_from_slice(&timestamp.to_be_bytes());
        frame.extend_from_slice(&16u16.to_be_bytes());
        frame.extend_from_slice(&4u16.to_be_bytes());
        frame.extend_from_slice(&(mrt_body.len() as u32).to_be_bytes());
        frame.extend_from_slice(&mrt_body);

        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(&frame).unwrap();
    }

    fn resource(uri: String, time: u32) -> Resource {
        Resource::new(
            TransportKind::File,
            FormatKind::Mrt,
            uri,
            time,
            60,
            "test-project",
            "test-collector",
            RecordKindFilter::Update,
        )
    }

    #[test]
    fn full_pipeline_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("one.mrt");
        write_mrt_update_at(&path, 1_000, [192, 0, 2]);

        let mut stream = BgpStream::new();
        stream
            .add_resource_source(resource(format!("file://{}", path.display()), 1_000))
            .unwrap();
        stream.start().unwrap();

        let mut record = Record::empty("", "");
        assert_eq!(stream.get_next_record(&mut record).unwrap(), 1);
        assert_eq!(record.time_sec, 1_000);

        let mut elem = Elem::new(
            crate::models::ElemType::Announcement,
            "0.0.0.0".parse().unwrap(),
            crate::models::Asn::new(0),
        );
        assert_eq!(stream.get_next_elem(&mut elem).unwrap(), 1);
        assert_eq!(elem.prefix.unwrap().to_string(), "192.0.2.0/24");
        assert_eq!(stream.get_next_elem(&mut elem).unwrap(), 0);

        assert_eq!(stream.get_next_record(&mut record).unwrap(), 0);
        stream.stop().unwrap();
    }

    #[test]
    fn start_without_resource_source_errors() {
        let mut stream = BgpStream::new();
        assert!(stream.start().is_err());
    }

    #[test]
    fn project_filter_drops_non_matching_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("one.mrt");
        write_mrt_update_at(&path, 1_000, [192, 0, 2]);

        let mut stream = BgpStream::new();
        stream
            .add_resource_source(resource(format!("file://{}", path.display()), 1_000))
            .unwrap();
        stream
            .add_filter(FilterDimension::Project("other-project".into()))
            .unwrap();
        stream.start().unwrap();

        let mut record = Record::empty("", "");
        assert_eq!(stream.get_next_record(&mut record).unwrap(), 0);
    }
}
