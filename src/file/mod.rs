//! # File Handle / Session
//!
//! A [`Slow5File`] ties an open descriptor, its parsed header, a
//! lazily-built record index, and the session compression context together,
//! exposing the read-side operations (`get`, `get_next`). A [`Slow5Writer`]
//! owns the write side: it emits the header at creation, appends framed
//! records, rejects duplicate identifiers against its live index, and seals
//! the file (end-of-file marker plus sidecar index) on [`Slow5Writer::finish`].
//!
//! Handles are single-threaded and synchronous: every operation runs to
//! completion on the calling thread, and nothing here is safe to share
//! across threads without external synchronization.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{IndexError, ReadError, Result, WriteError};
use crate::format::Format;
use crate::header::Header;
use crate::index::{IndexEntry, RecordIndex};
use crate::press::{Method, Press};
use crate::record::{
    decode_body, decode_row, decode_unit, encode_eof_framed, encode_framed, encode_row,
    is_eof_body, Record,
};

/// Read session over one slow5 file.
pub struct Slow5File {
    path: PathBuf,
    reader: BufReader<File>,
    format: Format,
    method: Method,
    header: Header,
    press: Press,
    /// Absent until the first identifier lookup
    index: Option<RecordIndex>,
    /// Byte offset of the first record, just past the header
    data_start: u64,
    exhausted: bool,
}
impl Slow5File {
    /// Opens a file for reading, auto-detecting the format from the
    /// extension (`.slow5` text, `.blow5` binary).
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::UnknownExtension`] for any other extension;
    /// use [`Slow5File::open_with`] to name the format explicitly.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let format = Format::from_path(&path)?;
        Self::open_inner(path, format)
    }

    /// Opens a file for reading with an explicit format.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::FormatMismatch`] when the extension is
    /// recognized and disagrees with the requested format.
    pub fn open_with<P: AsRef<Path>>(path: P, format: Format) -> Result<Self> {
        if let Some(implied) = Format::from_path_opt(&path) {
            if implied != format {
                return Err(ReadError::FormatMismatch {
                    requested: format.name(),
                    implied: implied.name(),
                    path: path.as_ref().to_string_lossy().to_string(),
                }
                .into());
            }
        }
        Self::open_inner(path, format)
    }

    fn open_inner<P: AsRef<Path>>(path: P, format: Format) -> Result<Self> {
        let mut reader = File::open(&path).map(BufReader::new)?;
        let (header, method) = match format {
            Format::Ascii => (Header::from_text_reader(&mut reader)?, Method::None),
            Format::Binary => Header::from_binary_reader(&mut reader)?,
        };
        if header.format() != format {
            return Err(ReadError::FormatMismatch {
                requested: format.name(),
                implied: header.format().name(),
                path: path.as_ref().to_string_lossy().to_string(),
            }
            .into());
        }
        let data_start = reader.stream_position()?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            reader,
            format,
            method,
            header,
            press: Press::new(method),
            index: None,
            data_start,
            exhausted: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[must_use]
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Ensures the index is built: loads the sidecar or rebuilds it from the
    /// data file (persisting the result). Built at most once per handle.
    pub fn load_index(&mut self) -> Result<()> {
        if self.index.is_none() {
            self.index = Some(RecordIndex::load_or_build(
                &self.path,
                self.format,
                self.method,
                self.data_start,
            )?);
        }
        Ok(())
    }

    /// The index, if it has been built.
    #[must_use]
    pub fn index(&self) -> Option<&RecordIndex> {
        self.index.as_ref()
    }

    /// Fetches one record by identifier, building the index on first use.
    ///
    /// The sequential [`Slow5File::get_next`] position is preserved across
    /// this call.
    pub fn get(&mut self, read_id: &str) -> Result<Record> {
        self.load_index()?;
        let entry = match &self.index {
            Some(index) => index.get(read_id)?,
            None => return Err(IndexError::Unavailable.into()),
        };
        let unit = self.read_range(entry)?;
        match self.format {
            Format::Ascii => decode_row(std::str::from_utf8(&unit)?, &self.header),
            // fresh one-shot context: the frame is unrelated to the
            // sequential stream position
            Format::Binary => decode_unit(&unit, self.method, &self.header),
        }
    }

    fn read_range(&mut self, entry: IndexEntry) -> Result<Vec<u8>> {
        let restore = self.reader.stream_position()?;
        let result: Result<Vec<u8>> = (|| {
            self.reader.seek(SeekFrom::Start(entry.offset))?;
            let mut unit = vec![0u8; entry.length as usize];
            self.reader.read_exact(&mut unit)?;
            Ok(unit)
        })();
        self.reader.seek(SeekFrom::Start(restore))?;
        result
    }

    /// Reads the next record in file order.
    ///
    /// Returns [`ReadError::EndOfFile`] past the last record, on every
    /// subsequent call rather than as a one-time sentinel.
    pub fn get_next(&mut self) -> Result<Record> {
        if self.exhausted {
            return Err(ReadError::EndOfFile.into());
        }
        match self.format {
            Format::Ascii => self.next_ascii(),
            Format::Binary => self.next_binary(),
        }
    }

    fn next_ascii(&mut self) -> Result<Record> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                self.exhausted = true;
                return Err(ReadError::EndOfFile.into());
            }
            if !line.trim_end_matches(['\n', '\r']).is_empty() {
                return decode_row(&line, &self.header);
            }
        }
    }

    fn next_binary(&mut self) -> Result<Record> {
        let pos = self.reader.stream_position()?;
        let length = match self.reader.read_u64::<LittleEndian>() {
            Ok(length) => length,
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ReadError::Truncated(pos).into());
            }
            Err(err) => return Err(err.into()),
        };
        let mut unit = vec![0u8; length as usize];
        self.reader
            .read_exact(&mut unit)
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::UnexpectedEof => ReadError::Truncated(pos).into(),
                _ => crate::error::Error::from(err),
            })?;
        let body = self.press.decompress(&unit)?;
        if is_eof_body(&body) {
            self.exhausted = true;
            return Err(ReadError::EndOfFile.into());
        }
        decode_body(&body, &self.header)
    }

    /// Closes the handle, releasing the descriptor.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}

/// Write session over one slow5 file.
///
/// The header is written at creation and must not change afterwards; records
/// append through [`Slow5Writer::add_record`]. [`Slow5Writer::finish`] seals
/// the file and persists the sidecar index; dropping an unfinished writer
/// finishes it.
#[derive(Debug)]
pub struct Slow5Writer {
    path: PathBuf,
    writer: BufWriter<File>,
    format: Format,
    header: Header,
    press: Press,
    /// Live index: duplicate rejection plus sidecar persistence on finish
    index: RecordIndex,
    /// Current write offset in the output file
    pos: u64,
    finished: bool,
}
impl Slow5Writer {
    /// Creates an uncompressed file, auto-detecting the format from the
    /// extension.
    pub fn create<P: AsRef<Path>>(path: P, header: Header) -> Result<Self> {
        let format = Format::from_path(&path)?;
        Self::create_inner(path, header, format, Method::None)
    }

    /// Creates a file with an explicit format and compression method.
    ///
    /// # Errors
    ///
    /// Compression is a binary framing choice: requesting it for a text file
    /// is [`WriteError::InvalidConfiguration`]. A recognized extension that
    /// disagrees with `format` is [`ReadError::FormatMismatch`].
    pub fn create_with<P: AsRef<Path>>(
        path: P,
        header: Header,
        format: Format,
        method: Method,
    ) -> Result<Self> {
        if format == Format::Ascii && method != Method::None {
            return Err(WriteError::InvalidConfiguration(
                "text files do not support compression",
            )
            .into());
        }
        if let Some(implied) = Format::from_path_opt(&path) {
            if implied != format {
                return Err(ReadError::FormatMismatch {
                    requested: format.name(),
                    implied: implied.name(),
                    path: path.as_ref().to_string_lossy().to_string(),
                }
                .into());
            }
        }
        Self::create_inner(path, header, format, method)
    }

    fn create_inner<P: AsRef<Path>>(
        path: P,
        mut header: Header,
        format: Format,
        method: Method,
    ) -> Result<Self> {
        header.set_format(format);
        let mut press = Press::new(method);
        let bytes = match format {
            Format::Ascii => header.to_text(),
            Format::Binary => {
                let mut bytes = Vec::new();
                header.write_binary(&mut bytes, &mut press)?;
                bytes
            }
        };
        let mut writer = File::create(&path).map(BufWriter::new)?;
        writer.write_all(&bytes)?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            writer,
            format,
            header,
            press,
            index: RecordIndex::new(),
            pos: bytes.len() as u64,
            finished: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of records written so far.
    #[must_use]
    pub fn num_records(&self) -> usize {
        self.index.len()
    }

    /// Appends one record.
    ///
    /// The record is validated against the header schema and encoded before
    /// anything is written, so a rejected record (duplicate identifier,
    /// missing or mistyped auxiliary field) leaves both the file and the
    /// index unchanged.
    pub fn add_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(
                WriteError::InvalidConfiguration("writer is already finished").into(),
            );
        }
        if self.index.contains(record.read_id()) {
            return Err(IndexError::DuplicateRead(record.read_id().to_string()).into());
        }
        let (bytes, entry) = match self.format {
            Format::Ascii => {
                let row = encode_row(record, &self.header)?;
                let entry = IndexEntry {
                    offset: self.pos,
                    length: row.len() as u64,
                };
                (row, entry)
            }
            Format::Binary => {
                let frame = encode_framed(record, &self.header, &mut self.press)?;
                let entry = IndexEntry {
                    offset: self.pos + 8,
                    length: frame.len() as u64 - 8,
                };
                (frame, entry)
            }
        };
        self.writer.write_all(&bytes)?;
        self.pos += bytes.len() as u64;
        self.index.insert(record.read_id(), entry)?;
        Ok(())
    }

    /// Random access needs a finished file and a read handle; a half-written
    /// file cannot be scanned mid-call.
    pub fn get(&self, _read_id: &str) -> Result<Record> {
        Err(IndexError::Unavailable.into())
    }

    /// Seals the file: writes the end-of-file marker (binary), flushes, and
    /// persists the sidecar index. Idempotent.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if self.format == Format::Binary {
            let frame = encode_eof_framed(&mut self.press)?;
            self.writer.write_all(&frame)?;
            self.pos += frame.len() as u64;
        }
        self.writer.flush()?;
        self.index.save(RecordIndex::sidecar_path(&self.path))?;
        self.finished = true;
        Ok(())
    }

    /// Finishes and closes the handle.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }
}
impl Drop for Slow5Writer {
    fn drop(&mut self) {
        if !self.finished {
            self.finish().expect("Slow5Writer: failed to finish file");
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::aux::{AuxValue, FieldType, Primitive};
    use crate::error::Error;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(name)
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(RecordIndex::sidecar_path(path));
    }

    fn test_header() -> Header {
        let mut header = Header::new(2).unwrap();
        header.add_attr("asic_id").unwrap();
        header.set_attr("asic_id", "3574887596", 0).unwrap();
        header.set_attr("asic_id", "420170566", 1).unwrap();
        header
            .add_aux_field("read_number", FieldType::Scalar(Primitive::Int32))
            .unwrap();
        header
            .add_aux_field("channel_number", FieldType::Array(Primitive::Char))
            .unwrap();
        header
    }

    fn test_record(read_id: &str, read_number: i32) -> Record {
        Record::builder(read_id)
            .read_group(read_number as u32 % 2)
            .digitisation(8192.0)
            .offset(4.0)
            .range(1467.61)
            .sampling_rate(4000.0)
            .raw_signal(vec![10, -20, 30, 40])
            .aux("read_number", AuxValue::Int32(read_number))
            .aux("channel_number", AuxValue::Str("109".to_string()))
            .build()
    }

    fn write_file(path: &Path, format: Format, method: Method, records: &[Record]) {
        let mut writer =
            Slow5Writer::create_with(path, test_header(), format, method).unwrap();
        for record in records {
            writer.add_record(record).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_ascii_write_read_round_trip() {
        let path = temp_path("test_session_ascii.slow5");
        cleanup(&path);
        let records = [test_record("r1", 1), test_record("r2", 2)];
        write_file(&path, Format::Ascii, Method::None, &records);

        let mut file = Slow5File::open(&path).unwrap();
        assert_eq!(file.header().attr("asic_id", 1).unwrap(), Some("420170566"));
        assert_eq!(file.get_next().unwrap(), records[0]);
        assert_eq!(file.get_next().unwrap(), records[1]);
        assert!(file.get_next().unwrap_err().is_eof());
        cleanup(&path);
    }

    #[test]
    fn test_binary_write_read_round_trip_both_methods() {
        for method in [Method::None, Method::Gzip] {
            let path = temp_path(&format!("test_session_binary_{}.blow5", method.tag()));
            cleanup(&path);
            let records = [test_record("r1", 1), test_record("r2", 2)];
            write_file(&path, Format::Binary, method, &records);

            let mut file = Slow5File::open(&path).unwrap();
            assert_eq!(file.method(), method);
            assert_eq!(file.get_next().unwrap(), records[0]);
            assert_eq!(file.get_next().unwrap(), records[1]);
            assert!(file.get_next().unwrap_err().is_eof());
            cleanup(&path);
        }
    }

    #[test]
    fn test_get_by_id_random_access() {
        for (format, method, name) in [
            (Format::Ascii, Method::None, "test_session_get.slow5"),
            (Format::Binary, Method::None, "test_session_get0.blow5"),
            (Format::Binary, Method::Gzip, "test_session_get1.blow5"),
        ] {
            let path = temp_path(name);
            cleanup(&path);
            let records = [
                test_record("r1", 1),
                test_record("r2", 2),
                test_record("r3", 3),
            ];
            write_file(&path, format, method, &records);

            let mut file = Slow5File::open(&path).unwrap();
            assert_eq!(file.get("r3").unwrap(), records[2]);
            assert_eq!(file.get("r1").unwrap(), records[0]);
            assert!(matches!(
                file.get("r9"),
                Err(Error::IndexError(IndexError::ReadNotFound(_)))
            ));
            cleanup(&path);
        }
    }

    #[test]
    fn test_get_preserves_sequential_position() {
        let path = temp_path("test_session_interleave.slow5");
        cleanup(&path);
        let records = [
            test_record("r1", 1),
            test_record("r2", 2),
            test_record("r3", 3),
        ];
        write_file(&path, Format::Ascii, Method::None, &records);

        let mut file = Slow5File::open(&path).unwrap();
        assert_eq!(file.get_next().unwrap(), records[0]);
        assert_eq!(file.get("r3").unwrap(), records[2]);
        // sequential position is unaffected by the random access
        assert_eq!(file.get_next().unwrap(), records[1]);
        cleanup(&path);
    }

    #[test]
    fn test_single_record_idempotent_exhaustion() {
        let path = temp_path("test_session_single.slow5");
        cleanup(&path);
        write_file(&path, Format::Ascii, Method::None, &[test_record("r1", 1)]);

        let mut file = Slow5File::open(&path).unwrap();
        assert!(file.get_next().is_ok());
        for _ in 0..3 {
            assert!(file.get_next().unwrap_err().is_eof());
        }
        cleanup(&path);
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let path = temp_path("test_session_duplicate.blow5");
        cleanup(&path);
        let mut writer =
            Slow5Writer::create_with(&path, test_header(), Format::Binary, Method::None)
                .unwrap();
        writer.add_record(&test_record("r1", 1)).unwrap();
        let err = writer.add_record(&test_record("r1", 2)).unwrap_err();
        assert!(matches!(
            err,
            Error::IndexError(IndexError::DuplicateRead(_))
        ));
        assert_eq!(writer.num_records(), 1);
        writer.finish().unwrap();

        // file holds exactly the one accepted record
        let mut file = Slow5File::open(&path).unwrap();
        assert_eq!(file.get_next().unwrap().read_id(), "r1");
        assert!(file.get_next().unwrap_err().is_eof());
        cleanup(&path);
    }

    #[test]
    fn test_get_on_writer_is_unavailable() {
        let path = temp_path("test_session_writer_get.slow5");
        cleanup(&path);
        let mut writer = Slow5Writer::create(&path, test_header()).unwrap();
        writer.add_record(&test_record("r1", 1)).unwrap();
        assert!(matches!(
            writer.get("r1"),
            Err(Error::IndexError(IndexError::Unavailable))
        ));
        writer.finish().unwrap();
        cleanup(&path);
    }

    #[test]
    fn test_open_unknown_extension() {
        assert!(matches!(
            Slow5File::open("reads.fast5"),
            Err(Error::ReadError(ReadError::UnknownExtension(_)))
        ));
    }

    #[test]
    fn test_open_with_format_mismatch() {
        assert!(matches!(
            Slow5File::open_with("reads.slow5", Format::Binary),
            Err(Error::ReadError(ReadError::FormatMismatch { .. }))
        ));
    }

    #[test]
    fn test_ascii_compression_rejected() {
        let err = Slow5Writer::create_with(
            temp_path("test_session_reject.slow5"),
            test_header(),
            Format::Ascii,
            Method::Gzip,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::WriteError(WriteError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_sidecar_reused_after_finish() {
        let path = temp_path("test_session_sidecar.slow5");
        cleanup(&path);
        write_file(
            &path,
            Format::Ascii,
            Method::None,
            &[test_record("r1", 1), test_record("r2", 2)],
        );
        let sidecar = RecordIndex::sidecar_path(&path);
        assert!(sidecar.exists());

        // reader loads the persisted sidecar rather than rescanning
        let mut file = Slow5File::open(&path).unwrap();
        assert_eq!(file.get("r2").unwrap().read_id(), "r2");
        cleanup(&path);
    }

    #[test]
    fn test_corrupt_sidecar_forces_rebuild() {
        let path = temp_path("test_session_corrupt_sidecar.slow5");
        cleanup(&path);
        write_file(&path, Format::Ascii, Method::None, &[test_record("r1", 1)]);

        let sidecar = RecordIndex::sidecar_path(&path);
        std::fs::write(&sidecar, "#garbage\n").unwrap();

        let mut file = Slow5File::open(&path).unwrap();
        assert_eq!(file.get("r1").unwrap().read_id(), "r1");
        // the rebuilt index was persisted back
        let reloaded = RecordIndex::load(&sidecar).unwrap();
        assert!(reloaded.contains("r1"));
        cleanup(&path);
    }

    #[test]
    fn test_truncated_binary_get_next() {
        let path = temp_path("test_session_truncated.blow5");
        cleanup(&path);
        write_file(&path, Format::Binary, Method::None, &[test_record("r1", 1)]);

        // chop the EOF marker and part of the record
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 20]).unwrap();

        let mut file = Slow5File::open(&path).unwrap();
        let err = file.get_next().unwrap_err();
        assert!(matches!(err, Error::ReadError(ReadError::Truncated(_))));
        cleanup(&path);
    }
}
