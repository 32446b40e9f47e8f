//! Text codec for one record row.
//!
//! A row is the eight primary columns followed by one column per
//! header-declared auxiliary field, separated by tabs. The raw-signal column
//! is itself a comma-separated sub-list whose length must equal
//! `len_raw_signal`; an empty signal encodes as the `.` marker. Any
//! column-count mismatch, non-numeric primary field, or auxiliary value whose
//! count disagrees with the declared type is a parse error, never a silent
//! coercion.

use std::io::Write;

use crate::aux::{parse_value, EMPTY_MARKER};
use crate::error::{ParseError, Result};
use crate::header::{Header, PRIMARY_COLUMNS, SEP};
use crate::record::Record;

fn bad_field(field: &'static str, value: &str) -> ParseError {
    ParseError::InvalidNumericField {
        field,
        value: value.to_string(),
    }
}

/// Decodes one text row into a record.
///
/// A trailing `\n` or `\r\n` is tolerated; the row must otherwise match the
/// header's column layout exactly.
pub(crate) fn decode_row(line: &str, header: &Header) -> Result<Record> {
    let trimmed = line.trim_end_matches(['\n', '\r']);
    let columns: Vec<&str> = trimmed.split(SEP).collect();
    let expected = PRIMARY_COLUMNS.len() + header.aux_names().len();
    if columns.len() != expected {
        return Err(ParseError::ColumnCountMismatch {
            expected,
            got: columns.len(),
        }
        .into());
    }

    let read_group: u32 = columns[1]
        .parse()
        .map_err(|_| bad_field("read_group", columns[1]))?;
    let digitisation: f32 = columns[2]
        .parse()
        .map_err(|_| bad_field("digitisation", columns[2]))?;
    let offset: f64 = columns[3]
        .parse()
        .map_err(|_| bad_field("offset", columns[3]))?;
    let range: f64 = columns[4]
        .parse()
        .map_err(|_| bad_field("range", columns[4]))?;
    let sampling_rate: f64 = columns[5]
        .parse()
        .map_err(|_| bad_field("sampling_rate", columns[5]))?;
    let len_raw_signal: u64 = columns[6]
        .parse()
        .map_err(|_| bad_field("len_raw_signal", columns[6]))?;

    let raw_signal = decode_signal(columns[7], len_raw_signal)?;

    let mut record = Record::builder(columns[0])
        .read_group(read_group)
        .digitisation(digitisation)
        .offset(offset)
        .range(range)
        .sampling_rate(sampling_rate)
        .raw_signal(raw_signal)
        .build();

    for ((name, ty), column) in header
        .aux_names()
        .iter()
        .zip(header.aux_types())
        .zip(&columns[PRIMARY_COLUMNS.len()..])
    {
        record.set_aux(name, parse_value(*ty, name, column)?);
    }
    Ok(record)
}

fn decode_signal(column: &str, declared: u64) -> Result<Vec<i16>> {
    if column == EMPTY_MARKER {
        if declared != 0 {
            return Err(ParseError::SignalLengthMismatch {
                expected: declared,
                got: 0,
            }
            .into());
        }
        return Ok(Vec::new());
    }
    let samples: Vec<i16> = column
        .split(',')
        .map(|tok| tok.parse().map_err(|_| bad_field("raw_signal", tok).into()))
        .collect::<Result<_>>()?;
    if samples.len() as u64 != declared {
        return Err(ParseError::SignalLengthMismatch {
            expected: declared,
            got: samples.len() as u64,
        }
        .into());
    }
    Ok(samples)
}

/// Encodes one record as a text row, trailing newline included.
///
/// The auxiliary columns follow the header's declared order; the record must
/// satisfy the header schema.
pub(crate) fn encode_row(record: &Record, header: &Header) -> Result<Vec<u8>> {
    let aux_values = record.aux_in_schema_order(header)?;

    let mut out = Vec::new();
    let mut itoa_buf = itoa::Buffer::new();
    out.extend_from_slice(record.read_id().as_bytes());
    out.push(b'\t');
    out.extend_from_slice(itoa_buf.format(record.read_group()).as_bytes());
    let _ = write!(
        out,
        "\t{}\t{}\t{}\t{}",
        record.digitisation(),
        record.offset(),
        record.range(),
        record.sampling_rate()
    );
    out.push(b'\t');
    out.extend_from_slice(itoa_buf.format(record.len_raw_signal()).as_bytes());
    out.push(b'\t');
    if record.raw_signal().is_empty() {
        out.extend_from_slice(EMPTY_MARKER.as_bytes());
    } else {
        for (i, sample) in record.raw_signal().iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            out.extend_from_slice(itoa_buf.format(*sample).as_bytes());
        }
    }
    for value in aux_values {
        out.push(b'\t');
        value.write_text(&mut out);
    }
    out.push(b'\n');
    Ok(out)
}
