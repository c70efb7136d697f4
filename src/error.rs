//! Error types shared across the transport, format, and streaming layers.

use std::fmt::{self, Display, Formatter};
use std::io;

/// A single error type for the whole crate.
///
/// Mirrors the taxonomy in the system design: transport errors get lifted
/// into format errors, format errors into [`crate::record::RecordStatus`],
/// and eventually into the stream iterator's `-1` return code. Unparseable
/// single messages never produce a `ParserError` that ends the stream --
/// they are reported as a record/elem status instead. A `ParserError` is
/// reserved for the unrecoverable cases: argument misuse,
/// I/O failure with no forward progress, or resource/config misuse.
#[derive(Debug)]
pub enum ParserError {
    /// Underlying I/O failure (disk, network) that isn't a clean EOF.
    Io(io::Error),
    /// Reader hit EOF with no bytes read and no pending data -- a clean end
    /// of stream, not normally surfaced to callers as an error.
    Eof,
    /// A transport/format produced fewer bytes than a length-prefixed
    /// message claims it needs, and no further bytes will come (fill made
    /// no progress). Surfaces as a CORRUPTED status on the record, not as a
    /// fatal error.
    Truncated(String),
    /// A message could not be decoded at all (bad framing, bad JSON, odd
    /// hex length, etc).
    Corrupted(String),
    /// A well-formed message of a kind this crate intentionally does not
    /// parse further (e.g. BGP OPEN/NOTIFICATION/KEEPALIVE on a RIS-Live
    /// line, BMP INIT/TERM messages).
    Unsupported(String),
    /// Bad filter type/value pair passed to `add_filter`/`FilterManager`.
    Filter(String),
    /// Resource/reader/stream invariant violation (e.g. calling
    /// `get_next_record` before `start()`).
    Resource(String),
}

impl std::error::Error for ParserError {}

impl Display for ParserError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::Io(e) => write!(f, "io error: {}", e),
            ParserError::Eof => write!(f, "end of stream"),
            ParserError::Truncated(s) => write!(f, "truncated message: {}", s),
            ParserError::Corrupted(s) => write!(f, "corrupted message: {}", s),
            ParserError::Unsupported(s) => write!(f, "unsupported message: {}", s),
            ParserError::Filter(s) => write!(f, "invalid filter: {}", s),
            ParserError::Resource(s) => write!(f, "resource error: {}", s),
        }
    }
}

impl From<io::Error> for ParserError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => ParserError::Eof,
            _ => ParserError::Io(e),
        }
    }
}

#[cfg(feature = "parser")]
impl From<oneio::OneIoError> for ParserError {
    fn from(e: oneio::OneIoError) -> Self {
        ParserError::Io(io::Error::other(e.to_string()))
    }
}

pub type ParserResult<T> = Result<T, ParserError>;
