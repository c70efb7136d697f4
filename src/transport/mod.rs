//! Transport layer: uniform byte-stream read from file,
//! Kafka, and cache sources.

#[cfg(feature = "parser")]
pub mod file;
#[cfg(feature = "cache-transport")]
pub mod cache;
#[cfg(feature = "kafka-transport")]
pub mod kafka;

use crate::error::ParserResult;

/// Uniform transport contract. `read` is non-blocking for live sources
/// (Kafka: a 0-ms poll that returns 0 bytes rather than blocking when no
/// message is ready) and may block on I/O for file/HTTP sources -- no
/// timeout is interposed on top of it.
pub trait Transport: Send {
    /// Read up to `buf.len()` bytes. Returns the number of bytes written
    /// into the front of `buf`. `Ok(0)` from a bounded (non-`FOREVER`)
    /// source means end of stream; `Ok(0)` from a live source means "no
    /// data yet", not EOS -- callers distinguish by resource duration, not
    /// by this return value alone.
    fn read(&mut self, buf: &mut [u8]) -> ParserResult<usize>;

    /// Read up to (but not across) the next newline into `buf`, appending
    /// bytes without the trailing `\n`. Returns the number of bytes
    /// appended; `Ok(0)` is EOS. Required by JSON-line formats (RIS-Live).
    fn readline(&mut self, buf: &mut Vec<u8>) -> ParserResult<usize>;
}
