use std::io::Write;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use super::types::{FieldType, Primitive};
use crate::error::{ParseError, Result};

/// The text marker for an empty auxiliary array.
pub(crate) const EMPTY_MARKER: &str = ".";

/// One auxiliary value: a tagged payload matching its declared [`FieldType`].
///
/// Scalars always carry a concrete value; arrays may be empty. `char` arrays
/// are strings.
#[derive(Debug, Clone, PartialEq)]
pub enum AuxValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    Char(u8),
    Int8Array(Vec<i8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    Uint8Array(Vec<u8>),
    Uint16Array(Vec<u16>),
    Uint32Array(Vec<u32>),
    Uint64Array(Vec<u64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    Str(String),
}
impl AuxValue {
    /// The declared type this value encodes as.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            AuxValue::Int8(_) => FieldType::Scalar(Primitive::Int8),
            AuxValue::Int16(_) => FieldType::Scalar(Primitive::Int16),
            AuxValue::Int32(_) => FieldType::Scalar(Primitive::Int32),
            AuxValue::Int64(_) => FieldType::Scalar(Primitive::Int64),
            AuxValue::Uint8(_) => FieldType::Scalar(Primitive::Uint8),
            AuxValue::Uint16(_) => FieldType::Scalar(Primitive::Uint16),
            AuxValue::Uint32(_) => FieldType::Scalar(Primitive::Uint32),
            AuxValue::Uint64(_) => FieldType::Scalar(Primitive::Uint64),
            AuxValue::Float(_) => FieldType::Scalar(Primitive::Float),
            AuxValue::Double(_) => FieldType::Scalar(Primitive::Double),
            AuxValue::Char(_) => FieldType::Scalar(Primitive::Char),
            AuxValue::Int8Array(_) => FieldType::Array(Primitive::Int8),
            AuxValue::Int16Array(_) => FieldType::Array(Primitive::Int16),
            AuxValue::Int32Array(_) => FieldType::Array(Primitive::Int32),
            AuxValue::Int64Array(_) => FieldType::Array(Primitive::Int64),
            AuxValue::Uint8Array(_) => FieldType::Array(Primitive::Uint8),
            AuxValue::Uint16Array(_) => FieldType::Array(Primitive::Uint16),
            AuxValue::Uint32Array(_) => FieldType::Array(Primitive::Uint32),
            AuxValue::Uint64Array(_) => FieldType::Array(Primitive::Uint64),
            AuxValue::FloatArray(_) => FieldType::Array(Primitive::Float),
            AuxValue::DoubleArray(_) => FieldType::Array(Primitive::Double),
            AuxValue::Str(_) => FieldType::Array(Primitive::Char),
        }
    }

    /// Element count: 1 for scalars, the array length otherwise.
    #[must_use]
    pub fn element_count(&self) -> u64 {
        match self {
            AuxValue::Int8Array(v) => v.len() as u64,
            AuxValue::Int16Array(v) => v.len() as u64,
            AuxValue::Int32Array(v) => v.len() as u64,
            AuxValue::Int64Array(v) => v.len() as u64,
            AuxValue::Uint8Array(v) => v.len() as u64,
            AuxValue::Uint16Array(v) => v.len() as u64,
            AuxValue::Uint32Array(v) => v.len() as u64,
            AuxValue::Uint64Array(v) => v.len() as u64,
            AuxValue::FloatArray(v) => v.len() as u64,
            AuxValue::DoubleArray(v) => v.len() as u64,
            AuxValue::Str(v) => v.len() as u64,
            _ => 1,
        }
    }

    #[must_use]
    pub fn as_i8(&self) -> Option<i8> {
        match self {
            AuxValue::Int8(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i16(&self) -> Option<i16> {
        match self {
            AuxValue::Int16(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            AuxValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AuxValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            AuxValue::Uint8(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            AuxValue::Uint16(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            AuxValue::Uint32(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AuxValue::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            AuxValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AuxValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_char(&self) -> Option<u8> {
        match self {
            AuxValue::Char(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i16_array(&self) -> Option<&[i16]> {
        match self {
            AuxValue::Int16Array(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64_array(&self) -> Option<&[u64]> {
        match self {
            AuxValue::Uint64Array(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64_array(&self) -> Option<&[f64]> {
        match self {
            AuxValue::DoubleArray(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AuxValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Appends the text encoding of this value to `out`.
    ///
    /// Integers format through `itoa`, floats through `Display` (shortest
    /// exact round-trip), arrays comma-separate their elements, and empty
    /// arrays emit the `.` marker.
    pub fn write_text(&self, out: &mut Vec<u8>) {
        let mut itoa_buf = itoa::Buffer::new();
        match self {
            AuxValue::Int8(v) => out.extend_from_slice(itoa_buf.format(*v).as_bytes()),
            AuxValue::Int16(v) => out.extend_from_slice(itoa_buf.format(*v).as_bytes()),
            AuxValue::Int32(v) => out.extend_from_slice(itoa_buf.format(*v).as_bytes()),
            AuxValue::Int64(v) => out.extend_from_slice(itoa_buf.format(*v).as_bytes()),
            AuxValue::Uint8(v) => out.extend_from_slice(itoa_buf.format(*v).as_bytes()),
            AuxValue::Uint16(v) => out.extend_from_slice(itoa_buf.format(*v).as_bytes()),
            AuxValue::Uint32(v) => out.extend_from_slice(itoa_buf.format(*v).as_bytes()),
            AuxValue::Uint64(v) => out.extend_from_slice(itoa_buf.format(*v).as_bytes()),
            AuxValue::Float(v) => {
                let _ = write!(out, "{v}");
            }
            AuxValue::Double(v) => {
                let _ = write!(out, "{v}");
            }
            AuxValue::Char(v) => out.push(*v),
            AuxValue::Int8Array(v) => write_int_array(out, v, &mut itoa_buf),
            AuxValue::Int16Array(v) => write_int_array(out, v, &mut itoa_buf),
            AuxValue::Int32Array(v) => write_int_array(out, v, &mut itoa_buf),
            AuxValue::Int64Array(v) => write_int_array(out, v, &mut itoa_buf),
            AuxValue::Uint8Array(v) => write_int_array(out, v, &mut itoa_buf),
            AuxValue::Uint16Array(v) => write_int_array(out, v, &mut itoa_buf),
            AuxValue::Uint32Array(v) => write_int_array(out, v, &mut itoa_buf),
            AuxValue::Uint64Array(v) => write_int_array(out, v, &mut itoa_buf),
            AuxValue::FloatArray(v) => write_float_array(out, v),
            AuxValue::DoubleArray(v) => write_float_array(out, v),
            AuxValue::Str(v) => {
                if v.is_empty() {
                    out.extend_from_slice(EMPTY_MARKER.as_bytes());
                } else {
                    out.extend_from_slice(v.as_bytes());
                }
            }
        }
    }

    /// On-disk byte length of the binary encoding, array count prefix included.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let ty = self.field_type();
        let width = ty.primitive().width();
        if ty.is_array() {
            8 + self.element_count() as usize * width
        } else {
            width
        }
    }

    /// Appends the binary encoding of this value to `out`.
    ///
    /// Arrays lead with a u64 little-endian element count.
    pub fn write_binary(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.field_type().is_array() {
            out.write_u64::<LittleEndian>(self.element_count())?;
        }
        match self {
            AuxValue::Int8(v) => out.write_i8(*v)?,
            AuxValue::Int16(v) => out.write_i16::<LittleEndian>(*v)?,
            AuxValue::Int32(v) => out.write_i32::<LittleEndian>(*v)?,
            AuxValue::Int64(v) => out.write_i64::<LittleEndian>(*v)?,
            AuxValue::Uint8(v) | AuxValue::Char(v) => out.write_u8(*v)?,
            AuxValue::Uint16(v) => out.write_u16::<LittleEndian>(*v)?,
            AuxValue::Uint32(v) => out.write_u32::<LittleEndian>(*v)?,
            AuxValue::Uint64(v) => out.write_u64::<LittleEndian>(*v)?,
            AuxValue::Float(v) => out.write_f32::<LittleEndian>(*v)?,
            AuxValue::Double(v) => out.write_f64::<LittleEndian>(*v)?,
            AuxValue::Int8Array(v) => {
                for x in v {
                    out.write_i8(*x)?;
                }
            }
            AuxValue::Int16Array(v) => {
                for x in v {
                    out.write_i16::<LittleEndian>(*x)?;
                }
            }
            AuxValue::Int32Array(v) => {
                for x in v {
                    out.write_i32::<LittleEndian>(*x)?;
                }
            }
            AuxValue::Int64Array(v) => {
                for x in v {
                    out.write_i64::<LittleEndian>(*x)?;
                }
            }
            AuxValue::Uint8Array(v) => out.extend_from_slice(v),
            AuxValue::Uint16Array(v) => {
                for x in v {
                    out.write_u16::<LittleEndian>(*x)?;
                }
            }
            AuxValue::Uint32Array(v) => {
                for x in v {
                    out.write_u32::<LittleEndian>(*x)?;
                }
            }
            AuxValue::Uint64Array(v) => {
                for x in v {
                    out.write_u64::<LittleEndian>(*x)?;
                }
            }
            AuxValue::FloatArray(v) => {
                for x in v {
                    out.write_f32::<LittleEndian>(*x)?;
                }
            }
            AuxValue::DoubleArray(v) => {
                for x in v {
                    out.write_f64::<LittleEndian>(*x)?;
                }
            }
            AuxValue::Str(v) => out.extend_from_slice(v.as_bytes()),
        }
        Ok(())
    }
}

fn write_int_array<T: itoa::Integer + Copy>(out: &mut Vec<u8>, v: &[T], buf: &mut itoa::Buffer) {
    if v.is_empty() {
        out.extend_from_slice(EMPTY_MARKER.as_bytes());
        return;
    }
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        out.extend_from_slice(buf.format(*x).as_bytes());
    }
}

fn write_float_array<T: std::fmt::Display>(out: &mut Vec<u8>, v: &[T]) {
    if v.is_empty() {
        out.extend_from_slice(EMPTY_MARKER.as_bytes());
        return;
    }
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        let _ = write!(out, "{x}");
    }
}

fn bad_value(field: &str, value: &str) -> ParseError {
    ParseError::InvalidAuxValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn parse_scalar(prim: Primitive, field: &str, s: &str) -> Result<AuxValue> {
    let value = match prim {
        Primitive::Int8 => AuxValue::Int8(s.parse().map_err(|_| bad_value(field, s))?),
        Primitive::Int16 => AuxValue::Int16(s.parse().map_err(|_| bad_value(field, s))?),
        Primitive::Int32 => AuxValue::Int32(s.parse().map_err(|_| bad_value(field, s))?),
        Primitive::Int64 => AuxValue::Int64(s.parse().map_err(|_| bad_value(field, s))?),
        Primitive::Uint8 => AuxValue::Uint8(s.parse().map_err(|_| bad_value(field, s))?),
        Primitive::Uint16 => AuxValue::Uint16(s.parse().map_err(|_| bad_value(field, s))?),
        Primitive::Uint32 => AuxValue::Uint32(s.parse().map_err(|_| bad_value(field, s))?),
        Primitive::Uint64 => AuxValue::Uint64(s.parse().map_err(|_| bad_value(field, s))?),
        Primitive::Float => AuxValue::Float(s.parse().map_err(|_| bad_value(field, s))?),
        Primitive::Double => AuxValue::Double(s.parse().map_err(|_| bad_value(field, s))?),
        Primitive::Char => {
            let bytes = s.as_bytes();
            if bytes.len() != 1 {
                return Err(bad_value(field, s).into());
            }
            AuxValue::Char(bytes[0])
        }
    };
    Ok(value)
}

fn parse_number_array<T: std::str::FromStr>(field: &str, s: &str) -> Result<Vec<T>> {
    s.split(',')
        .map(|tok| tok.parse().map_err(|_| bad_value(field, tok).into()))
        .collect()
}

/// Parses one text column into a value of the declared type.
///
/// The `.` marker parses to an empty array for array types and is rejected
/// for scalars, which have no absent encoding.
pub(crate) fn parse_value(ty: FieldType, field: &str, s: &str) -> Result<AuxValue> {
    match ty {
        FieldType::Scalar(prim) => parse_scalar(prim, field, s),
        FieldType::Array(prim) => {
            if prim == Primitive::Char {
                let text = if s == EMPTY_MARKER { "" } else { s };
                return Ok(AuxValue::Str(text.to_string()));
            }
            if s == EMPTY_MARKER {
                return Ok(empty_array(prim));
            }
            let value = match prim {
                Primitive::Int8 => AuxValue::Int8Array(parse_number_array(field, s)?),
                Primitive::Int16 => AuxValue::Int16Array(parse_number_array(field, s)?),
                Primitive::Int32 => AuxValue::Int32Array(parse_number_array(field, s)?),
                Primitive::Int64 => AuxValue::Int64Array(parse_number_array(field, s)?),
                Primitive::Uint8 => AuxValue::Uint8Array(parse_number_array(field, s)?),
                Primitive::Uint16 => AuxValue::Uint16Array(parse_number_array(field, s)?),
                Primitive::Uint32 => AuxValue::Uint32Array(parse_number_array(field, s)?),
                Primitive::Uint64 => AuxValue::Uint64Array(parse_number_array(field, s)?),
                Primitive::Float => AuxValue::FloatArray(parse_number_array(field, s)?),
                Primitive::Double => AuxValue::DoubleArray(parse_number_array(field, s)?),
                Primitive::Char => unreachable!("char arrays handled above"),
            };
            Ok(value)
        }
    }
}

fn empty_array(prim: Primitive) -> AuxValue {
    match prim {
        Primitive::Int8 => AuxValue::Int8Array(Vec::new()),
        Primitive::Int16 => AuxValue::Int16Array(Vec::new()),
        Primitive::Int32 => AuxValue::Int32Array(Vec::new()),
        Primitive::Int64 => AuxValue::Int64Array(Vec::new()),
        Primitive::Uint8 => AuxValue::Uint8Array(Vec::new()),
        Primitive::Uint16 => AuxValue::Uint16Array(Vec::new()),
        Primitive::Uint32 => AuxValue::Uint32Array(Vec::new()),
        Primitive::Uint64 => AuxValue::Uint64Array(Vec::new()),
        Primitive::Float => AuxValue::FloatArray(Vec::new()),
        Primitive::Double => AuxValue::DoubleArray(Vec::new()),
        Primitive::Char => AuxValue::Str(String::new()),
    }
}

pub(crate) fn take<'a>(buf: &mut &'a [u8], n: usize, field: &str) -> Result<&'a [u8]> {
    if buf.len() < n {
        return Err(ParseError::TruncatedBody(field.to_string()).into());
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

/// Decodes one binary value of the declared type from the front of `buf`,
/// advancing it past the consumed bytes.
pub(crate) fn read_value(ty: FieldType, field: &str, buf: &mut &[u8]) -> Result<AuxValue> {
    let prim = ty.primitive();
    let count = if ty.is_array() {
        LittleEndian::read_u64(take(buf, 8, field)?) as usize
    } else {
        1
    };
    let payload = take(buf, count * prim.width(), field)?;

    let value = match ty {
        FieldType::Scalar(Primitive::Int8) => AuxValue::Int8(payload[0] as i8),
        FieldType::Scalar(Primitive::Int16) => AuxValue::Int16(LittleEndian::read_i16(payload)),
        FieldType::Scalar(Primitive::Int32) => AuxValue::Int32(LittleEndian::read_i32(payload)),
        FieldType::Scalar(Primitive::Int64) => AuxValue::Int64(LittleEndian::read_i64(payload)),
        FieldType::Scalar(Primitive::Uint8) => AuxValue::Uint8(payload[0]),
        FieldType::Scalar(Primitive::Uint16) => AuxValue::Uint16(LittleEndian::read_u16(payload)),
        FieldType::Scalar(Primitive::Uint32) => AuxValue::Uint32(LittleEndian::read_u32(payload)),
        FieldType::Scalar(Primitive::Uint64) => AuxValue::Uint64(LittleEndian::read_u64(payload)),
        FieldType::Scalar(Primitive::Float) => AuxValue::Float(LittleEndian::read_f32(payload)),
        FieldType::Scalar(Primitive::Double) => AuxValue::Double(LittleEndian::read_f64(payload)),
        FieldType::Scalar(Primitive::Char) => AuxValue::Char(payload[0]),
        FieldType::Array(Primitive::Int8) => {
            AuxValue::Int8Array(payload.iter().map(|b| *b as i8).collect())
        }
        FieldType::Array(Primitive::Int16) => {
            let mut v = vec![0i16; count];
            LittleEndian::read_i16_into(payload, &mut v);
            AuxValue::Int16Array(v)
        }
        FieldType::Array(Primitive::Int32) => {
            let mut v = vec![0i32; count];
            LittleEndian::read_i32_into(payload, &mut v);
            AuxValue::Int32Array(v)
        }
        FieldType::Array(Primitive::Int64) => {
            let mut v = vec![0i64; count];
            LittleEndian::read_i64_into(payload, &mut v);
            AuxValue::Int64Array(v)
        }
        FieldType::Array(Primitive::Uint8) => AuxValue::Uint8Array(payload.to_vec()),
        FieldType::Array(Primitive::Uint16) => {
            let mut v = vec![0u16; count];
            LittleEndian::read_u16_into(payload, &mut v);
            AuxValue::Uint16Array(v)
        }
        FieldType::Array(Primitive::Uint32) => {
            let mut v = vec![0u32; count];
            LittleEndian::read_u32_into(payload, &mut v);
            AuxValue::Uint32Array(v)
        }
        FieldType::Array(Primitive::Uint64) => {
            let mut v = vec![0u64; count];
            LittleEndian::read_u64_into(payload, &mut v);
            AuxValue::Uint64Array(v)
        }
        FieldType::Array(Primitive::Float) => {
            let mut v = vec![0f32; count];
            LittleEndian::read_f32_into(payload, &mut v);
            AuxValue::FloatArray(v)
        }
        FieldType::Array(Primitive::Double) => {
            let mut v = vec![0f64; count];
            LittleEndian::read_f64_into(payload, &mut v);
            AuxValue::DoubleArray(v)
        }
        FieldType::Array(Primitive::Char) => AuxValue::Str(std::str::from_utf8(payload)?.to_string()),
    };
    Ok(value)
}
