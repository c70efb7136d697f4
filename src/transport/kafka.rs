//! Kafka transport: consumer-group subscription to one or more topics.
//!
//! Uses the synchronous `kafka` crate rather than an async client, so a
//! 0-ms poll can return "no message yet" without blocking or pulling in
//! a runtime.

use crate::error::{ParserError, ParserResult};
use crate::resource::Resource;
use crate::transport::Transport;
use kafka::consumer::{Consumer, FetchOffset};
use kafka::error::Error as KafkaError;
use rand::Rng;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// `KAFKA_INIT_OFFSET` resource attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOffset {
    Earliest,
    Latest,
}

impl InitOffset {
    fn to_fetch_offset(self) -> FetchOffset {
        match self {
            InitOffset::Earliest => FetchOffset::Earliest,
            InitOffset::Latest => FetchOffset::Latest,
        }
    }
}

pub struct KafkaTransport {
    consumer: Consumer,
    pending: VecDeque<Vec<u8>>,
}

impl KafkaTransport {
    /// `resource.uri` is a comma-separated broker list. `KAFKA_TOPIC`
    /// (comma-separated), `KAFKA_CONSUMER_GROUP`, and `KAFKA_INIT_OFFSET`
    /// are read from resource attributes.
    pub fn new(resource: &Resource) -> ParserResult<Self> {
        let brokers: Vec<String> = resource.uri.split(',').map(str::to_string).collect();
        let topics_attr = resource
            .attributes
            .get("KAFKA_TOPIC")
            .ok_or_else(|| ParserError::Resource("KAFKA_TOPIC attribute is required".into()))?;
        let group = match resource.attributes.get("KAFKA_CONSUMER_GROUP") {
            Some(g) => g.clone(),
            None => synthesize_group_id(),
        };
        let init_offset = match resource.attributes.get("KAFKA_INIT_OFFSET").map(String::as_str) {
            Some("earliest") => InitOffset::Earliest,
            _ => InitOffset::Latest,
        };

        let mut builder = Consumer::from_hosts(brokers).with_group(group);
        for topic in topics_attr.split(',') {
            builder = builder.with_topic(topic.trim().to_string());
        }
        let consumer = builder
            .with_fallback_offset(init_offset.to_fetch_offset())
            .create()
            .map_err(classify_kafka_error)?;

        Ok(KafkaTransport {
            consumer,
            pending: VecDeque::new(),
        })
    }
}

fn synthesize_group_id() -> String {
    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let rand_suffix: u32 = rand::thread_rng().gen();
    format!("bgpstream-core-{}-{:x}", epoch_ms, rand_suffix)
}

/// Fatal errors (name resolution, codec) propagate; reconnectable ones
/// (transport hiccups, all-brokers-down, destroy) are surfaced the same way
/// here since the synchronous `kafka` crate does not distinguish them at
/// the type level -- the stream layer treats any `Corrupted` resource error
/// as "drop this resource" regardless, so the distinction only matters for
/// logging.
fn classify_kafka_error(e: KafkaError) -> ParserError {
    log::warn!("kafka transport error: {}", e);
    ParserError::Corrupted(format!("kafka error: {}", e))
}

impl Transport for KafkaTransport {
    fn read(&mut self, buf: &mut [u8]) -> ParserResult<usize> {
        if let Some(msg) = self.pending.pop_front() {
            assert!(
                buf.len() >= msg.len(),
                "caller buffer too small for kafka message"
            );
            buf[..msg.len()].copy_from_slice(&msg);
            return Ok(msg.len());
        }

        // 0-ms poll: returns immediately, empty when no message is ready.
        let sets = match self.consumer.poll() {
            Ok(sets) => sets,
            Err(e) => return Err(classify_kafka_error(e)),
        };

        for ms in sets.iter() {
            for m in ms.messages() {
                self.pending.push_back(m.value.to_vec());
            }
            self.consumer
                .consume_messageset(ms)
                .map_err(classify_kafka_error)?;
        }
        self.consumer.commit_consumed().map_err(classify_kafka_error)?;

        match self.pending.pop_front() {
            Some(msg) => {
                assert!(
                    buf.len() >= msg.len(),
                    "caller buffer too small for kafka message"
                );
                buf[..msg.len()].copy_from_slice(&msg);
                Ok(msg.len())
            }
            // no message available this poll: "no data yet", not EOS, for
            // a live (duration == FOREVER) resource.
            None => Ok(0),
        }
    }

    fn readline(&mut self, _buf: &mut Vec<u8>) -> ParserResult<usize> {
        Err(ParserError::Unsupported(
            "kafka transport does not support line framing".into(),
        ))
    }
}
