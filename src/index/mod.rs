//! # Index Subsystem
//!
//! Maps read identifiers to the byte range of their record in the data file,
//! enabling random access without full scans. The index is built once per
//! handle: a sidecar file (`<path>.index`) is loaded when present and intact,
//! otherwise a single forward scan of the data file rebuilds it and persists
//! the sidecar. A corrupt or truncated sidecar is detected on load and
//! treated as absent, never trusted.
//!
//! Offsets and lengths are into the file as written on disk: each entry's
//! offset points just past the record's length prefix and its length equals
//! the prefix value (for text files, the full line including its newline),
//! so reading `length` bytes at `offset` always yields one decodable unit:
//! pre-decompression for compressed binary files, where the unit is one gzip
//! member.
//!
//! Sidecar wire format:
//!
//! ```text
//! #read_id<TAB>offset<TAB>length
//! <id><TAB><offset><TAB><length>     (one row per record, first-seen order)
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use log::warn;

use crate::error::{IndexError, ParseError, ReadError, Result};
use crate::format::Format;
use crate::press::{Method, Press};
use crate::record::is_eof_body;

/// Suffix appended to the data file's path to name its sidecar index.
pub const INDEX_SUFFIX: &str = ".index";

const INDEX_HEADER_LINE: &str = "#read_id\toffset\tlength";

/// Byte range of one record in the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Offset of the record start, just past its length prefix
    pub offset: u64,
    /// On-disk byte length of the record unit
    pub length: u64,
}

/// Identifier-to-byte-range map for one data file.
///
/// Lookup is hash-based, average O(1); first-seen order is kept for stable
/// sidecar persistence. One entry per identifier: duplicates are rejected,
/// not merged.
#[derive(Debug, Default)]
pub struct RecordIndex {
    /// Identifiers in first-seen order
    ids: Vec<String>,
    map: HashMap<String, IndexEntry>,
}
impl RecordIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifiers in first-seen order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[must_use]
    pub fn contains(&self, read_id: &str) -> bool {
        self.map.contains_key(read_id)
    }

    /// Records a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DuplicateRead`] if the identifier is already
    /// present; the index is left unchanged.
    pub fn insert(&mut self, read_id: &str, entry: IndexEntry) -> Result<()> {
        if self.map.contains_key(read_id) {
            return Err(IndexError::DuplicateRead(read_id.to_string()).into());
        }
        self.ids.push(read_id.to_string());
        self.map.insert(read_id.to_string(), entry);
        Ok(())
    }

    /// Looks up the byte range of one record.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::ReadNotFound`] for an absent identifier.
    pub fn get(&self, read_id: &str) -> Result<IndexEntry> {
        self.map
            .get(read_id)
            .copied()
            .ok_or_else(|| IndexError::ReadNotFound(read_id.to_string()).into())
    }

    /// The sidecar path for a data file: the full path plus [`INDEX_SUFFIX`].
    #[must_use]
    pub fn sidecar_path<P: AsRef<Path>>(data_path: P) -> PathBuf {
        let mut os = data_path.as_ref().as_os_str().to_os_string();
        os.push(INDEX_SUFFIX);
        PathBuf::from(os)
    }

    /// Loads a persisted sidecar index.
    ///
    /// Any deviation from the sidecar wire format (header-line mismatch,
    /// malformed row) is an error; callers treat it as "absent" and rebuild
    /// rather than trusting possibly stale offsets.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = File::open(path).map(BufReader::new)?;
        let mut line = String::new();
        reader.read_line(&mut line)?;
        if line.trim_end_matches(['\n', '\r']) != INDEX_HEADER_LINE {
            return Err(ParseError::MissingHeaderLine("#read_id\toffset\tlength").into());
        }

        let mut index = Self::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            let mut tokens = trimmed.split('\t');
            let (Some(read_id), Some(offset), Some(length), None) = (
                tokens.next(),
                tokens.next(),
                tokens.next(),
                tokens.next(),
            ) else {
                return Err(ParseError::MissingHeaderLine("<id>\t<offset>\t<length>").into());
            };
            let offset: u64 = offset.parse().map_err(|_| ParseError::InvalidNumericField {
                field: "offset",
                value: offset.to_string(),
            })?;
            let length: u64 = length.parse().map_err(|_| ParseError::InvalidNumericField {
                field: "length",
                value: length.to_string(),
            })?;
            index.insert(read_id, IndexEntry { offset, length })?;
        }
        Ok(index)
    }

    /// Persists the index as a sidecar file, rows in first-seen order.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = File::create(path).map(BufWriter::new)?;
        writeln!(writer, "{INDEX_HEADER_LINE}")?;
        let mut itoa_buf = itoa::Buffer::new();
        for read_id in &self.ids {
            let entry = self.map[read_id];
            writer.write_all(read_id.as_bytes())?;
            writer.write_all(b"\t")?;
            writer.write_all(itoa_buf.format(entry.offset).as_bytes())?;
            writer.write_all(b"\t")?;
            writer.write_all(itoa_buf.format(entry.length).as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Loads the sidecar for `data_path`, or rebuilds it by scanning the
    /// data file and persists the result.
    ///
    /// `data_start` is the byte offset of the first record (just past the
    /// parsed header); `method` is only consulted for binary files.
    pub fn load_or_build<P: AsRef<Path>>(
        data_path: P,
        format: Format,
        method: Method,
        data_start: u64,
    ) -> Result<Self> {
        let sidecar = Self::sidecar_path(&data_path);
        if sidecar.exists() {
            match Self::load(&sidecar) {
                Ok(index) => return Ok(index),
                Err(err) => {
                    warn!(
                        "sidecar index {} unusable ({err}); rebuilding from data file",
                        sidecar.display()
                    );
                }
            }
        }
        let index = Self::build(&data_path, format, method, data_start)?;
        index.save(&sidecar)?;
        Ok(index)
    }

    /// Builds the index with a single forward scan of the data file.
    pub fn build<P: AsRef<Path>>(
        data_path: P,
        format: Format,
        method: Method,
        data_start: u64,
    ) -> Result<Self> {
        match format {
            Format::Ascii => Self::build_ascii(data_path, data_start),
            Format::Binary => Self::build_binary(data_path, method, data_start),
        }
    }

    fn build_ascii<P: AsRef<Path>>(data_path: P, data_start: u64) -> Result<Self> {
        let mut reader = File::open(data_path).map(BufReader::new)?;
        reader.seek(SeekFrom::Start(data_start))?;

        let mut index = Self::new();
        let mut offset = data_start;
        let mut line = String::new();
        loop {
            line.clear();
            let length = reader.read_line(&mut line)? as u64;
            if length == 0 {
                break;
            }
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if !trimmed.is_empty() {
                let read_id = trimmed.split('\t').next().unwrap_or("");
                index.insert(read_id, IndexEntry { offset, length })?;
            }
            offset += length;
        }
        Ok(index)
    }

    fn build_binary<P: AsRef<Path>>(data_path: P, method: Method, data_start: u64) -> Result<Self> {
        let file = File::open(data_path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };

        let mut index = Self::new();
        let mut pos = data_start as usize;
        while pos < mmap.len() {
            if pos + 8 > mmap.len() {
                return Err(ReadError::Truncated(pos as u64).into());
            }
            let length = LittleEndian::read_u64(&mmap[pos..pos + 8]) as usize;
            let start = pos + 8;
            if start + length > mmap.len() {
                return Err(ReadError::Truncated(pos as u64).into());
            }
            let unit = &mmap[start..start + length];
            let body = Press::decompress_one_shot(method, unit)?;
            if is_eof_body(&body) {
                break;
            }
            let read_id = read_id_of_body(&body)?;
            index.insert(
                &read_id,
                IndexEntry {
                    offset: start as u64,
                    length: length as u64,
                },
            )?;
            pos = start + length;
        }
        Ok(index)
    }
}

/// Extracts just the identifier from a record body without a full decode.
fn read_id_of_body(body: &[u8]) -> Result<String> {
    if body.len() < 2 {
        return Err(ParseError::TruncatedBody("read_id".to_string()).into());
    }
    let id_len = LittleEndian::read_u16(&body[..2]) as usize;
    if body.len() < 2 + id_len {
        return Err(ParseError::TruncatedBody("read_id".to_string()).into());
    }
    Ok(std::str::from_utf8(&body[2..2 + id_len])?.to_string())
}
