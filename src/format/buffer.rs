//! Shared refillable byte buffer for the binary format variants (MRT, BMP):
//! a fixed-size (>= 1 MiB) buffer that's topped up from the transport
//! whenever the previous decode attempt ran dry or came back truncated,
//! with surviving bytes kept at the front.

use crate::error::ParserResult;
use crate::transport::Transport;
use bytes::{Buf, BytesMut};

pub const MIN_FILL_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// New bytes were appended; retry the decode.
    Progressed,
    /// Nothing was pending and the transport produced nothing more: clean
    /// end of stream.
    Eos,
    /// Bytes were pending (a previously truncated message) but the
    /// transport produced nothing new -- treated as corruption, not EOS.
    NoProgress,
    /// A live resource's transport (Kafka's 0-ms poll) had nothing new and
    /// nothing pending: not EOS, just "no data yet". Retry later.
    Pending,
}

pub struct RefillBuffer {
    data: BytesMut,
    fill_size: usize,
}

impl RefillBuffer {
    pub fn new() -> Self {
        RefillBuffer {
            data: BytesMut::with_capacity(MIN_FILL_SIZE),
            fill_size: MIN_FILL_SIZE,
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Drops the first `n` bytes of buffered data -- called after a message
    /// is successfully decoded out of the front of the buffer.
    pub fn consume(&mut self, n: usize) {
        self.data.advance(n);
    }

    /// `is_live` (the owning resource's `duration == FOREVER`) controls how
    /// a no-pending, zero-byte read is interpreted: a bounded resource
    /// treats it as EOS, a live one (a Kafka 0-ms poll with nothing ready)
    /// treats it as "nothing yet, try again" instead.
    pub fn fill(&mut self, transport: &mut dyn Transport, is_live: bool) -> ParserResult<FillOutcome> {
        let had_pending = !self.data.is_empty();
        let mut chunk = vec![0u8; self.fill_size];
        let n = transport.read(&mut chunk)?;
        if n == 0 {
            return Ok(if had_pending {
                FillOutcome::NoProgress
            } else if is_live {
                FillOutcome::Pending
            } else {
                FillOutcome::Eos
            });
        }
        self.data.extend_from_slice(&chunk[..n]);
        Ok(FillOutcome::Progressed)
    }
}

impl Default for RefillBuffer {
    fn default() -> Self {
        RefillBuffer::new()
    }
}
