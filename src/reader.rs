//! One live cursor over one resource: owns an
//! initialised transport+format stack and keeps exactly one pre-fetched
//! record ahead of the consumer, per spec.md 3's Reader lifecycle.

use crate::error::ParserResult;
use crate::format::{Format, PopulateOutcome};
use crate::models::record::{Record, RecordStatus};
use crate::resource::{FormatKind, Resource, TransportKind};
use crate::transport::Transport;

/// Coarse reader status, per spec.md 3's Reader fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderStatus {
    Valid,
    End,
    Filtered,
    Empty,
    CantOpen,
    Corrupted,
}

pub struct Reader {
    pub resource: Resource,
    format: Box<dyn Format>,
    pub next: Option<Record>,
    pub status: ReaderStatus,
    pub successful_reads: u64,
    pub valid_reads: u64,
}

fn build_transport(resource: &Resource, cache_dir: Option<&std::path::Path>) -> ParserResult<Box<dyn Transport>> {
    match resource.transport_kind {
        TransportKind::File => {
            #[cfg(feature = "parser")]
            {
                Ok(Box::new(crate::transport::file::FileTransport::new(&resource.uri)?))
            }
            #[cfg(not(feature = "parser"))]
            {
                Err(crate::error::ParserError::Resource(
                    "file transport requires the `parser` feature".into(),
                ))
            }
        }
        TransportKind::Kafka => {
            #[cfg(feature = "kafka-transport")]
            {
                Ok(Box::new(crate::transport::kafka::KafkaTransport::new(resource)?))
            }
            #[cfg(not(feature = "kafka-transport"))]
            {
                Err(crate::error::ParserError::Resource(
                    "kafka transport requires the `kafka-transport` feature".into(),
                ))
            }
        }
        TransportKind::Cache => {
            #[cfg(feature = "cache-transport")]
            {
                let dir = cache_dir.ok_or_else(|| {
                    crate::error::ParserError::Resource(
                        "cache transport requires a cache directory".into(),
                    )
                })?;
                let inner = resource.clone();
                crate::transport::cache::CacheTransport::new(resource, dir, move || {
                    build_transport(
                        &Resource {
                            transport_kind: TransportKind::File,
                            ..inner
                        },
                        None,
                    )
                })
                .map(|t| Box::new(t) as Box<dyn Transport>)
            }
            #[cfg(not(feature = "cache-transport"))]
            {
                let _ = cache_dir;
                Err(crate::error::ParserError::Resource(
                    "cache transport requires the `cache-transport` feature".into(),
                ))
            }
        }
    }
}

fn build_format(resource: &Resource, transport: Box<dyn Transport>) -> ParserResult<Box<dyn Format>> {
    match resource.format_kind {
        FormatKind::Mrt => Ok(Box::new(crate::format::mrt::MrtFormat::with_liveness(
            transport,
            resource.project.clone(),
            resource.collector.clone(),
            resource.is_live(),
        ))),
        FormatKind::Bmp => Ok(Box::new(crate::format::bmp::BmpFormat::with_liveness(
            transport,
            resource.project.clone(),
            resource.collector.clone(),
            resource.is_live(),
        ))),
        #[cfg(feature = "rislive")]
        FormatKind::RisLive => Ok(Box::new(crate::format::rislive::RisLiveFormat::new(
            transport,
            resource.project.clone(),
        ))),
        #[cfg(not(feature = "rislive"))]
        FormatKind::RisLive => Err(crate::error::ParserError::Resource(
            "RIS-Live format requires the `rislive` feature".into(),
        )),
    }
}

impl Reader {
    /// Opens `resource`'s transport+format stack and pre-fetches its first
    /// record. `cache_dir` is only consulted for [`TransportKind::Cache`]
    /// resources.
    pub fn open(resource: Resource, cache_dir: Option<&std::path::Path>) -> ParserResult<Self> {
        let transport = build_transport(&resource, cache_dir)?;
        let format = build_format(&resource, transport)?;
        let mut reader = Reader {
            resource,
            format,
            next: None,
            status: ReaderStatus::Valid,
            successful_reads: 0,
            valid_reads: 0,
        };
        reader.prefetch();
        Ok(reader)
    }

    /// Pulls the next record out of the format layer into `self.next`,
    /// updating status/counters. Leaves `self.next` as `None` once the
    /// underlying source is exhausted.
    fn prefetch(&mut self) {
        loop {
            let mut record = Record::empty(self.resource.project.clone(), self.resource.collector.clone());
            let outcome = match self.format.populate_record(&mut record) {
                Ok(o) => o,
                Err(_) => {
                    self.status = ReaderStatus::Corrupted;
                    self.next = None;
                    return;
                }
            };
            match outcome {
                PopulateOutcome::EndOfDump => {
                    self.status = ReaderStatus::End;
                    self.next = None;
                    return;
                }
                PopulateOutcome::CorruptedDump => {
                    self.status = ReaderStatus::Corrupted;
                    self.next = None;
                    return;
                }
                PopulateOutcome::EmptyDump => {
                    self.status = ReaderStatus::Empty;
                    self.next = None;
                    return;
                }
                PopulateOutcome::OutsideTimeInterval => {
                    self.status = ReaderStatus::End;
                    self.next = None;
                    return;
                }
                PopulateOutcome::FilteredDump => {
                    self.status = ReaderStatus::Filtered;
                    continue;
                }
                PopulateOutcome::Unsupported => {
                    self.successful_reads += 1;
                    continue;
                }
                PopulateOutcome::Ok => {
                    self.successful_reads += 1;
                    if record.status.is_valid() {
                        self.valid_reads += 1;
                    }
                    self.status = ReaderStatus::Valid;
                    self.next = Some(record);
                    return;
                }
            }
        }
    }

    /// Takes the pre-fetched record, advancing the reader so the following
    /// call returns the one after it. Returns `None` once exhausted.
    pub fn advance(&mut self) -> Option<Record> {
        let record = self.next.take()?;
        self.prefetch();
        Some(record)
    }

    pub fn peek_time(&self) -> Option<(u32, u32)> {
        self.next
            .as_ref()
            .map(|r| (r.time_sec, r.time_usec))
    }

    pub fn peek_is_rib(&self) -> bool {
        self.next
            .as_ref()
            .map(|r| r.record_type == crate::models::record::RecordType::Rib)
            .unwrap_or(false)
    }

    pub fn get_next_elem(&mut self, record: &Record) -> ParserResult<Option<crate::models::Elem>> {
        self.format.get_next_elem(record)
    }

    pub const fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }

    pub const fn status_as_record_status(&self) -> RecordStatus {
        match self.status {
            ReaderStatus::Valid => RecordStatus::Valid,
            ReaderStatus::Filtered => RecordStatus::FilteredSource,
            ReaderStatus::Empty => RecordStatus::EmptySource,
            ReaderStatus::CantOpen | ReaderStatus::Corrupted => RecordStatus::CorruptedSource,
            ReaderStatus::End => RecordStatus::Valid,
        }
    }
}
