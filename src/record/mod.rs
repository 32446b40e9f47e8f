//! # Record Codec
//!
//! Decodes a single record from text or binary bytes into an owned
//! [`Record`] and encodes it back. The binary layout of a record's auxiliary
//! tail depends on the header's declared field schema, so every codec entry
//! point takes the file [`Header`](crate::header::Header).

mod ascii;
mod binary;
mod record;

pub use binary::EOF_MARKER;
pub use record::{Record, RecordBuilder};

pub(crate) use ascii::{decode_row, encode_row};
pub(crate) use binary::{
    decode_body, decode_unit, encode_body, encode_eof_framed, encode_framed, is_eof_body,
};
