//! # slow5
//!
//! A file-format library for nanopore-sequencer signal data, stored as
//! self-describing tabular records in either a human-readable text encoding
//! (`.slow5`) or a compact binary encoding (`.blow5`), with a sidecar index
//! for O(1) random access by read identifier.
//!
//! ## Overview
//!
//! * **Records** carry eight fixed primary fields (identifier, read group,
//!   calibration constants, and the raw signal array) plus an open set of
//!   typed auxiliary fields declared once per file in the header.
//! * **Headers** bundle a semantic version, one or more read groups sharing
//!   an attribute schema, and the auxiliary-field table.
//! * **The index** maps identifiers to on-disk byte ranges and persists as a
//!   plain-text sidecar (`<path>.index`), rebuilt automatically when missing
//!   or corrupt.
//! * **Compression** frames each binary record as its own gzip member, so an
//!   indexed byte range is always independently decodable.
//!
//! ## Usage
//!
//! ```rust
//! use slow5::prelude::*;
//! use slow5::aux_types;
//!
//! let dir = std::env::temp_dir();
//! let path = dir.join("example.slow5");
//!
//! // Describe the file: one read group, one auxiliary field
//! let mut header = Header::new(1).unwrap();
//! header.add_attr("run_id").unwrap();
//! header.set_attr("run_id", "a32f", 0).unwrap();
//! header
//!     .add_aux_field("read_number", aux_types::INT32)
//!     .unwrap();
//!
//! // Write a record
//! let mut writer = Slow5Writer::create(&path, header).unwrap();
//! let record = Record::builder("read_001")
//!     .digitisation(8192.0)
//!     .range(1467.61)
//!     .sampling_rate(4000.0)
//!     .raw_signal(vec![430, 472, 463])
//!     .aux("read_number", AuxValue::Int32(7))
//!     .build();
//! writer.add_record(&record).unwrap();
//! writer.finish().unwrap();
//!
//! // Read it back by identifier
//! let mut file = Slow5File::open(&path).unwrap();
//! let fetched = file.get("read_001").unwrap();
//! assert_eq!(fetched.raw_signal(), &[430, 472, 463]);
//! assert_eq!(fetched.aux_i32("read_number").unwrap(), 7);
//! # std::fs::remove_file(&path).unwrap();
//! # std::fs::remove_file(dir.join("example.slow5.index")).unwrap();
//! ```

mod aux;
mod error;
mod file;
mod format;
mod header;
mod index;
mod press;
mod record;

pub mod prelude;

pub use aux::{AuxValue, FieldType, Primitive};
pub use error::{
    AuxError, Error, HeaderError, IndexError, ParseError, PressError, ReadError, Result,
    WriteError,
};
pub use file::{Slow5File, Slow5Writer};
pub use format::{Format, ASCII_EXTENSION, BINARY_EXTENSION};
pub use header::{Header, MAGIC, PREAMBLE_SIZE, VERSION};
pub use index::{IndexEntry, RecordIndex, INDEX_SUFFIX};
pub use press::{Method, Press};
pub use record::{Record, RecordBuilder, EOF_MARKER};

/// Shorthand constants for the auxiliary field types.
pub mod aux_types {
    use crate::{FieldType, Primitive};

    pub const INT8: FieldType = FieldType::Scalar(Primitive::Int8);
    pub const INT16: FieldType = FieldType::Scalar(Primitive::Int16);
    pub const INT32: FieldType = FieldType::Scalar(Primitive::Int32);
    pub const INT64: FieldType = FieldType::Scalar(Primitive::Int64);
    pub const UINT8: FieldType = FieldType::Scalar(Primitive::Uint8);
    pub const UINT16: FieldType = FieldType::Scalar(Primitive::Uint16);
    pub const UINT32: FieldType = FieldType::Scalar(Primitive::Uint32);
    pub const UINT64: FieldType = FieldType::Scalar(Primitive::Uint64);
    pub const FLOAT: FieldType = FieldType::Scalar(Primitive::Float);
    pub const DOUBLE: FieldType = FieldType::Scalar(Primitive::Double);
    pub const CHAR: FieldType = FieldType::Scalar(Primitive::Char);
    pub const INT8_ARRAY: FieldType = FieldType::Array(Primitive::Int8);
    pub const INT16_ARRAY: FieldType = FieldType::Array(Primitive::Int16);
    pub const INT32_ARRAY: FieldType = FieldType::Array(Primitive::Int32);
    pub const INT64_ARRAY: FieldType = FieldType::Array(Primitive::Int64);
    pub const UINT8_ARRAY: FieldType = FieldType::Array(Primitive::Uint8);
    pub const UINT16_ARRAY: FieldType = FieldType::Array(Primitive::Uint16);
    pub const UINT32_ARRAY: FieldType = FieldType::Array(Primitive::Uint32);
    pub const UINT64_ARRAY: FieldType = FieldType::Array(Primitive::Uint64);
    pub const FLOAT_ARRAY: FieldType = FieldType::Array(Primitive::Float);
    pub const DOUBLE_ARRAY: FieldType = FieldType::Array(Primitive::Double);
    pub const STRING: FieldType = FieldType::Array(Primitive::Char);
}

#[cfg(test)]
mod testing {
    use super::prelude::*;
    use super::{aux_types, RecordIndex};
    use anyhow::Result;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(name)
    }

    fn cleanup(path: &std::path::Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(RecordIndex::sidecar_path(path));
    }

    fn run_header() -> Result<Header> {
        let mut header = Header::new(1)?;
        header.add_attr("run_id")?;
        header.set_attr("run_id", "7a30a", 0)?;
        header.add_aux_field("start_time", aux_types::UINT64)?;
        header.add_aux_field("channel_number", aux_types::STRING)?;
        Ok(header)
    }

    fn signal_record(read_id: &str, start_time: u64) -> Record {
        Record::builder(read_id)
            .digitisation(8192.0)
            .offset(23.0)
            .range(1467.61)
            .sampling_rate(4000.0)
            .raw_signal((0..64).map(|i| (i * 37 % 999) as i16).collect())
            .aux("start_time", AuxValue::Uint64(start_time))
            .aux("channel_number", AuxValue::Str("231".to_string()))
            .build()
    }

    #[test]
    fn test_end_to_end_text_and_binary() -> Result<()> {
        for (name, format, method) in [
            ("test_lib_e2e.slow5", Format::Ascii, Method::None),
            ("test_lib_e2e_raw.blow5", Format::Binary, Method::None),
            ("test_lib_e2e_gz.blow5", Format::Binary, Method::Gzip),
        ] {
            let path = temp_path(name);
            cleanup(&path);

            let mut writer = Slow5Writer::create_with(&path, run_header()?, format, method)?;
            let records: Vec<Record> =
                (0..10).map(|i| signal_record(&format!("read_{i:03}"), i)).collect();
            for record in &records {
                writer.add_record(record)?;
            }
            writer.finish()?;

            // sequential pass returns every record in order
            let mut file = Slow5File::open(&path)?;
            for record in &records {
                assert_eq!(&file.get_next()?, record);
            }
            assert!(file.get_next().unwrap_err().is_eof());

            // random access agrees with the sequential pass
            assert_eq!(file.get("read_007")?, records[7]);
            assert_eq!(file.get("read_000")?, records[0]);

            cleanup(&path);
        }
        Ok(())
    }

    #[test]
    fn test_explicit_format_open() -> Result<()> {
        let path = temp_path("test_lib_explicit.slow5");
        cleanup(&path);
        let mut writer = Slow5Writer::create(&path, run_header()?)?;
        writer.add_record(&signal_record("r1", 0))?;
        writer.finish()?;

        let mut file = Slow5File::open_with(&path, Format::Ascii)?;
        assert_eq!(file.get_next()?.read_id(), "r1");
        cleanup(&path);
        Ok(())
    }
}
