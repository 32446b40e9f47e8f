//! # Auxiliary Field System
//!
//! Records carry an open set of extra named attributes beyond the eight
//! primary columns. The set is declared once in the file header (name and
//! type per field) and every record written under that schema must resolve
//! each declared field to a value.
//!
//! The type system is a closed table of 11 primitive types (signed and
//! unsigned integers from 8 to 64 bits, `float`, `double`, `char`) plus an
//! array counterpart for each, named with a trailing `*` (`int16_t*`,
//! `char*`, ...). `char*` is a string.

mod types;
mod value;

pub use types::{FieldType, Primitive};
pub use value::AuxValue;

pub(crate) use value::{parse_value, read_value, take, EMPTY_MARKER};
