//! File transport: local paths, http(s) URLs, or any scheme `oneio`
//! recognises, with transparent gzip/bzip2/xz decompression.
//!
//! `oneio` already sets a library `User-Agent` header and treats an
//! early-closed HTTP body as an I/O error, which this transport lifts into
//! [`crate::error::ParserError::Corrupted`] rather than propagating it as a
//! fatal I/O failure.

use crate::error::{ParserError, ParserResult};
use crate::transport::Transport;
use std::io::{BufRead, BufReader, Read};

pub struct FileTransport {
    reader: BufReader<Box<dyn Read + Send>>,
}

impl FileTransport {
    pub fn new(uri: &str) -> ParserResult<Self> {
        let reader = oneio::get_reader(uri)?;
        Ok(FileTransport {
            reader: BufReader::with_capacity(1 << 20, reader),
        })
    }
}

impl Transport for FileTransport {
    fn read(&mut self, buf: &mut [u8]) -> ParserResult<usize> {
        match self.reader.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(0),
            Err(e) => Err(ParserError::Corrupted(format!(
                "file transport read failed: {}",
                e
            ))),
        }
    }

    fn readline(&mut self, buf: &mut Vec<u8>) -> ParserResult<usize> {
        match self.reader.read_until(b'\n', buf) {
            Ok(0) => Ok(0),
            Ok(n) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                Ok(n)
            }
            Err(e) => Err(ParserError::Corrupted(format!(
                "file transport readline failed: {}",
                e
            ))),
        }
    }
}
