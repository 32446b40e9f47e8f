//! Binary codec for one framed record.
//!
//! On disk a record is a u64 little-endian length prefix followed by exactly
//! that many bytes: the record *body* when the file is uncompressed, or one
//! complete gzip member inflating to the body when the file's method is
//! gzip. The prefix always counts the on-disk bytes that follow it, which is
//! the same convention the index persists, so a `(offset, length)` pair
//! bounds one decodable unit in either mode.
//!
//! Body layout (all integers little-endian):
//!
//! ```text
//! u16 id_len | id bytes
//! u32 read_group | f32 digitisation | f64 offset | f64 range | f64 sampling_rate
//! u64 len_raw_signal | i16 * len_raw_signal
//! one entry per header-declared auxiliary field, in declared order
//! (arrays lead with a u64 element count)
//! ```

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::aux::{read_value, take};
use crate::error::{ParseError, Result};
use crate::header::Header;
use crate::press::{Method, Press};
use crate::record::Record;

/// Body of the end-of-file marker, framed like a record at the tail of every
/// binary file (its own gzip member when the file is compressed).
pub const EOF_MARKER: [u8; 5] = *b"5WOLB";

/// Whether a decoded unit body is the end-of-file marker rather than a
/// record. No record body can collide: a real body is at least the id-length
/// prefix plus the fixed-width primary fields.
#[must_use]
pub(crate) fn is_eof_body(body: &[u8]) -> bool {
    body == EOF_MARKER
}

/// Encodes the record body (uncompressed, no length prefix).
pub(crate) fn encode_body(record: &Record, header: &Header) -> Result<Vec<u8>> {
    let aux_values = record.aux_in_schema_order(header)?;

    let mut body = Vec::with_capacity(
        2 + record.read_id().len()
            + 32
            + 8
            + record.raw_signal().len() * 2
            + aux_values.iter().map(|v| v.encoded_len()).sum::<usize>(),
    );
    body.write_u16::<LittleEndian>(record.read_id().len() as u16)?;
    body.extend_from_slice(record.read_id().as_bytes());
    body.write_u32::<LittleEndian>(record.read_group())?;
    body.write_f32::<LittleEndian>(record.digitisation())?;
    body.write_f64::<LittleEndian>(record.offset())?;
    body.write_f64::<LittleEndian>(record.range())?;
    body.write_f64::<LittleEndian>(record.sampling_rate())?;
    body.write_u64::<LittleEndian>(record.len_raw_signal())?;
    for sample in record.raw_signal() {
        body.write_i16::<LittleEndian>(*sample)?;
    }
    for value in aux_values {
        value.write_binary(&mut body)?;
    }
    Ok(body)
}

/// Encodes a complete on-disk frame: length prefix plus the unit.
///
/// The body passes through the active compressor as its own finalized member
/// when the session method is gzip; the prefix counts the unit's on-disk
/// bytes either way.
pub(crate) fn encode_framed(record: &Record, header: &Header, press: &mut Press) -> Result<Vec<u8>> {
    let body = encode_body(record, header)?;
    frame_unit(&body, press)
}

/// Encodes the framed end-of-file marker.
pub(crate) fn encode_eof_framed(press: &mut Press) -> Result<Vec<u8>> {
    frame_unit(&EOF_MARKER, press)
}

fn frame_unit(body: &[u8], press: &mut Press) -> Result<Vec<u8>> {
    let unit = press.compress_now(body)?;
    let mut out = Vec::with_capacity(8 + unit.len());
    out.write_u64::<LittleEndian>(unit.len() as u64)?;
    out.extend_from_slice(&unit);
    Ok(out)
}

/// Decodes one on-disk unit (the bytes a length prefix counted), inflating
/// it first when the file's method is gzip.
pub(crate) fn decode_unit(unit: &[u8], method: Method, header: &Header) -> Result<Record> {
    let body = Press::decompress_one_shot(method, unit)?;
    decode_body(&body, header)
}

/// Decodes one uncompressed record body.
pub(crate) fn decode_body(body: &[u8], header: &Header) -> Result<Record> {
    let mut cursor = body;

    let id_len = LittleEndian::read_u16(take(&mut cursor, 2, "read_id")?) as usize;
    let read_id = std::str::from_utf8(take(&mut cursor, id_len, "read_id")?)?.to_string();
    let read_group = LittleEndian::read_u32(take(&mut cursor, 4, "read_group")?);
    let digitisation = LittleEndian::read_f32(take(&mut cursor, 4, "digitisation")?);
    let offset = LittleEndian::read_f64(take(&mut cursor, 8, "offset")?);
    let range = LittleEndian::read_f64(take(&mut cursor, 8, "range")?);
    let sampling_rate = LittleEndian::read_f64(take(&mut cursor, 8, "sampling_rate")?);
    let len_raw_signal = LittleEndian::read_u64(take(&mut cursor, 8, "len_raw_signal")?) as usize;
    let signal_bytes = take(&mut cursor, len_raw_signal * 2, "raw_signal")?;
    let mut raw_signal = vec![0i16; len_raw_signal];
    LittleEndian::read_i16_into(signal_bytes, &mut raw_signal);

    let mut record = Record::builder(&read_id)
        .read_group(read_group)
        .digitisation(digitisation)
        .offset(offset)
        .range(range)
        .sampling_rate(sampling_rate)
        .raw_signal(raw_signal)
        .build();

    for (name, ty) in header.aux_names().iter().zip(header.aux_types()) {
        let value = read_value(*ty, name, &mut cursor)?;
        record.set_aux(name, value);
    }

    if !cursor.is_empty() {
        return Err(ParseError::TrailingBytes(cursor.len()).into());
    }
    Ok(record)
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::aux::{AuxValue, FieldType, Primitive};
    use crate::error::Error;

    fn test_header() -> Header {
        let mut header = Header::new(1).unwrap();
        header
            .add_aux_field("median_before", FieldType::Scalar(Primitive::Double))
            .unwrap();
        header
            .add_aux_field("samples", FieldType::Array(Primitive::Uint64))
            .unwrap();
        header
    }

    fn test_record() -> Record {
        Record::builder("read_001")
            .read_group(0)
            .digitisation(8192.0)
            .offset(4.0)
            .range(1467.61)
            .sampling_rate(4000.0)
            .raw_signal(vec![10, -20, 30, 32767, -32768])
            .aux("median_before", AuxValue::Double(219.5))
            .aux("samples", AuxValue::Uint64Array(vec![1, 2, 3]))
            .build()
    }

    #[test]
    fn test_body_round_trip() {
        let header = test_header();
        let record = test_record();
        let body = encode_body(&record, &header).unwrap();
        assert_eq!(decode_body(&body, &header).unwrap(), record);
    }

    #[test]
    fn test_framed_round_trip_both_methods() {
        let header = test_header();
        let record = test_record();
        for method in [Method::None, Method::Gzip] {
            let mut press = Press::new(method);
            let frame = encode_framed(&record, &header, &mut press).unwrap();

            // the prefix counts exactly the on-disk bytes that follow it
            let unit_len = LittleEndian::read_u64(&frame[..8]) as usize;
            assert_eq!(frame.len(), 8 + unit_len);

            let decoded = decode_unit(&frame[8..], method, &header).unwrap();
            assert_eq!(decoded, record);
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let header = test_header();
        let mut body = encode_body(&test_record(), &header).unwrap();
        body.push(0);
        let err = decode_body(&body, &header).unwrap_err();
        assert!(matches!(
            err,
            Error::ParseError(ParseError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_truncated_body_rejected() {
        let header = test_header();
        let body = encode_body(&test_record(), &header).unwrap();
        let err = decode_body(&body[..body.len() - 3], &header).unwrap_err();
        assert!(matches!(
            err,
            Error::ParseError(ParseError::TruncatedBody(_))
        ));
    }

    #[test]
    fn test_eof_marker_framing() {
        for method in [Method::None, Method::Gzip] {
            let mut press = Press::new(method);
            let frame = encode_eof_framed(&mut press).unwrap();
            let unit_len = LittleEndian::read_u64(&frame[..8]) as usize;
            assert_eq!(frame.len(), 8 + unit_len);
            let body = Press::decompress_one_shot(method, &frame[8..]).unwrap();
            assert!(is_eof_body(&body));
        }
    }

    #[test]
    fn test_empty_signal_and_empty_array() {
        let mut header = Header::new(1).unwrap();
        header
            .add_aux_field("samples", FieldType::Array(Primitive::Uint64))
            .unwrap();
        let record = Record::builder("r1")
            .aux("samples", AuxValue::Uint64Array(Vec::new()))
            .build();
        let body = encode_body(&record, &header).unwrap();
        assert_eq!(decode_body(&body, &header).unwrap(), record);
    }
}
