//! Format layer: given a transport, produce a stream of
//! decoded records, then lazily expand the current record into elems.
//!
//! Expressed as a [`Format`] trait plus ordinary Rust construction/`Drop`
//! rather than an opaque state pointer with paired init/clear/destroy
//! callbacks: construction is the variant's `new`, teardown folds into
//! `Drop`, and resetting a record for reuse is
//! [`crate::models::record::Record::clear`].

pub mod buffer;
pub mod cursor;

#[cfg(feature = "parser")]
pub mod bgp_message;
#[cfg(feature = "parser")]
pub mod bmp;
#[cfg(feature = "parser")]
pub mod mrt;
#[cfg(feature = "rislive")]
pub mod rislive;

use crate::error::ParserResult;
use crate::models::elem::Elem;
use crate::models::record::Record;

/// Outcome of one [`Format::populate_record`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulateOutcome {
    Ok,
    EmptyDump,
    FilteredDump,
    EndOfDump,
    CorruptedDump,
    OutsideTimeInterval,
    Unsupported,
}

/// A decoder sitting on top of one transport, producing records and -- for
/// the record currently populated -- elems.
pub trait Format: Send {
    fn populate_record(&mut self, record: &mut Record) -> ParserResult<PopulateOutcome>;
    fn get_next_elem(&mut self, record: &Record) -> ParserResult<Option<Elem>>;
}
