use std::fmt;

use crate::error::ParseError;

/// The 11 primitive auxiliary types.
///
/// Canonical names follow the C-style spelling used in the text header's
/// column-type line. Pure metadata: a primitive knows its byte width and its
/// name, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
    Char,
}
impl Primitive {
    /// All primitives in tag order.
    pub const ALL: [Primitive; 11] = [
        Primitive::Int8,
        Primitive::Int16,
        Primitive::Int32,
        Primitive::Int64,
        Primitive::Uint8,
        Primitive::Uint16,
        Primitive::Uint32,
        Primitive::Uint64,
        Primitive::Float,
        Primitive::Double,
        Primitive::Char,
    ];

    /// Width of one element in bytes.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Primitive::Int8 | Primitive::Uint8 | Primitive::Char => 1,
            Primitive::Int16 | Primitive::Uint16 => 2,
            Primitive::Int32 | Primitive::Uint32 | Primitive::Float => 4,
            Primitive::Int64 | Primitive::Uint64 | Primitive::Double => 8,
        }
    }

    /// Canonical scalar name as it appears in the column-type header line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int8 => "int8_t",
            Primitive::Int16 => "int16_t",
            Primitive::Int32 => "int32_t",
            Primitive::Int64 => "int64_t",
            Primitive::Uint8 => "uint8_t",
            Primitive::Uint16 => "uint16_t",
            Primitive::Uint32 => "uint32_t",
            Primitive::Uint64 => "uint64_t",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Char => "char",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Primitive::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// A declared auxiliary field type: one of the 11 primitives, scalar or array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A single element of the primitive type
    Scalar(Primitive),
    /// A length-prefixed array of the primitive type
    Array(Primitive),
}
impl FieldType {
    /// The element primitive of this type.
    #[must_use]
    pub fn primitive(self) -> Primitive {
        match self {
            FieldType::Scalar(p) | FieldType::Array(p) => p,
        }
    }

    /// Whether this is an array type.
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(self, FieldType::Array(_))
    }

    /// Canonical name: the primitive name, with a trailing `*` for arrays.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Scalar(p) => p.name(),
            FieldType::Array(Primitive::Int8) => "int8_t*",
            FieldType::Array(Primitive::Int16) => "int16_t*",
            FieldType::Array(Primitive::Int32) => "int32_t*",
            FieldType::Array(Primitive::Int64) => "int64_t*",
            FieldType::Array(Primitive::Uint8) => "uint8_t*",
            FieldType::Array(Primitive::Uint16) => "uint16_t*",
            FieldType::Array(Primitive::Uint32) => "uint32_t*",
            FieldType::Array(Primitive::Uint64) => "uint64_t*",
            FieldType::Array(Primitive::Float) => "float*",
            FieldType::Array(Primitive::Double) => "double*",
            FieldType::Array(Primitive::Char) => "char*",
        }
    }

    /// Parses a canonical type name back into a `FieldType`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnknownTypeName`] for names outside the table.
    pub fn parse(name: &str) -> std::result::Result<Self, ParseError> {
        if let Some(base) = name.strip_suffix('*') {
            Primitive::from_name(base)
                .map(FieldType::Array)
                .ok_or_else(|| ParseError::UnknownTypeName(name.to_string()))
        } else {
            Primitive::from_name(name)
                .map(FieldType::Scalar)
                .ok_or_else(|| ParseError::UnknownTypeName(name.to_string()))
        }
    }
}
impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(Primitive::Int8.width(), 1);
        assert_eq!(Primitive::Uint16.width(), 2);
        assert_eq!(Primitive::Float.width(), 4);
        assert_eq!(Primitive::Double.width(), 8);
        assert_eq!(Primitive::Char.width(), 1);
    }

    #[test]
    fn test_name_round_trip() {
        for p in Primitive::ALL {
            let scalar = FieldType::Scalar(p);
            assert_eq!(FieldType::parse(scalar.name()).unwrap(), scalar);
            let array = FieldType::Array(p);
            assert_eq!(FieldType::parse(array.name()).unwrap(), array);
        }
    }

    #[test]
    fn test_parse_unknown_name() {
        assert!(matches!(
            FieldType::parse("long double"),
            Err(ParseError::UnknownTypeName(_))
        ));
        assert!(matches!(
            FieldType::parse("int8_t**"),
            Err(ParseError::UnknownTypeName(_))
        ));
    }

    #[test]
    fn test_char_array_is_string_type() {
        let ty = FieldType::parse("char*").unwrap();
        assert!(ty.is_array());
        assert_eq!(ty.primitive(), Primitive::Char);
    }
}
